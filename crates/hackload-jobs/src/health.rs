// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-service health counters and the tri-state classification derived
//! from them.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

const UNHEALTHY_CONSECUTIVE_FAILURES: u32 = 3;
const DEGRADED_ERROR_RATE_PERCENT: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
	Unhealthy,
}

impl HealthState {
	pub fn as_str(&self) -> &'static str {
		match self {
			HealthState::Healthy => "healthy",
			HealthState::Degraded => "degraded",
			HealthState::Unhealthy => "unhealthy",
		}
	}

	/// Value exported on the `service_health` gauge.
	pub fn gauge_value(&self) -> f64 {
		match self {
			HealthState::Healthy => 1.0,
			HealthState::Degraded => 0.5,
			HealthState::Unhealthy => 0.0,
		}
	}
}

/// Raw counters for one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealthState {
	pub service_name: String,
	pub total_runs: u64,
	pub error_count: u64,
	pub consecutive_failures: u32,
	pub last_run_time: Option<DateTime<Utc>>,
	pub last_success_time: Option<DateTime<Utc>>,
}

impl ServiceHealthState {
	pub fn new(service_name: impl Into<String>) -> Self {
		Self {
			service_name: service_name.into(),
			total_runs: 0,
			error_count: 0,
			consecutive_failures: 0,
			last_run_time: None,
			last_success_time: None,
		}
	}

	/// Percentage of runs that failed; 0 before the first run.
	pub fn error_rate(&self) -> f64 {
		if self.total_runs == 0 {
			return 0.0;
		}
		self.error_count as f64 / self.total_runs as f64 * 100.0
	}

	pub fn status(&self) -> HealthState {
		classify_health(self.consecutive_failures, self.error_rate())
	}

	pub fn to_health(&self) -> ServiceHealth {
		ServiceHealth {
			service_name: self.service_name.clone(),
			status: self.status(),
			last_run_time: self.last_run_time,
			last_success_time: self.last_success_time,
			error_rate: self.error_rate(),
			consecutive_failures: self.consecutive_failures,
		}
	}
}

pub fn classify_health(consecutive_failures: u32, error_rate: f64) -> HealthState {
	if consecutive_failures >= UNHEALTHY_CONSECUTIVE_FAILURES {
		HealthState::Unhealthy
	} else if consecutive_failures > 0 || error_rate > DEGRADED_ERROR_RATE_PERCENT {
		HealthState::Degraded
	} else {
		HealthState::Healthy
	}
}

/// Health of one service as reported by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
	pub service_name: String,
	pub status: HealthState,
	pub last_run_time: Option<DateTime<Utc>>,
	pub last_success_time: Option<DateTime<Utc>>,
	pub error_rate: f64,
	pub consecutive_failures: u32,
}

/// Mutable health counters owned by a single job.
///
/// Only the owning job mutates its tracker; everything else reads snapshots.
#[derive(Debug)]
pub struct HealthTracker {
	state: Mutex<ServiceHealthState>,
}

impl HealthTracker {
	pub fn new(service_name: impl Into<String>) -> Self {
		Self {
			state: Mutex::new(ServiceHealthState::new(service_name)),
		}
	}

	pub fn record_run_started(&self, at: DateTime<Utc>) {
		let mut state = self.state.lock();
		state.last_run_time = Some(at);
		state.total_runs += 1;
	}

	pub fn record_success(&self, at: DateTime<Utc>) {
		let mut state = self.state.lock();
		state.last_success_time = Some(at);
		state.consecutive_failures = 0;
	}

	pub fn record_failure(&self) {
		let mut state = self.state.lock();
		// A failure always belongs to a started run.
		if state.error_count < state.total_runs {
			state.error_count += 1;
		}
		state.consecutive_failures = state.consecutive_failures.saturating_add(1);
	}

	pub fn snapshot(&self) -> ServiceHealthState {
		self.state.lock().clone()
	}

	pub fn health(&self) -> ServiceHealth {
		self.state.lock().to_health()
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
	pub total: usize,
	pub healthy: usize,
	pub degraded: usize,
	pub unhealthy: usize,
}

/// Rolled-up health across every registered service.
#[derive(Debug, Clone, Serialize)]
pub struct JobsHealthStatus {
	pub status: HealthState,
	pub services: Vec<ServiceHealth>,
}

impl JobsHealthStatus {
	pub fn from_services(services: Vec<ServiceHealth>) -> Self {
		Self {
			status: aggregate_health(&services),
			services,
		}
	}

	pub fn summary(&self) -> HealthSummary {
		let mut summary = HealthSummary {
			total: self.services.len(),
			..Default::default()
		};
		for service in &self.services {
			match service.status {
				HealthState::Healthy => summary.healthy += 1,
				HealthState::Degraded => summary.degraded += 1,
				HealthState::Unhealthy => summary.unhealthy += 1,
			}
		}
		summary
	}
}

/// Unhealthy if any service is unhealthy or there are none at all, degraded
/// if any is degraded, healthy otherwise.
pub fn aggregate_health(services: &[ServiceHealth]) -> HealthState {
	if services.is_empty() {
		return HealthState::Unhealthy;
	}

	let mut worst = HealthState::Healthy;
	for service in services {
		match service.status {
			HealthState::Unhealthy => return HealthState::Unhealthy,
			HealthState::Degraded => worst = HealthState::Degraded,
			HealthState::Healthy => {}
		}
	}
	worst
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn service(name: &str, status: HealthState) -> ServiceHealth {
		ServiceHealth {
			service_name: name.to_string(),
			status,
			last_run_time: None,
			last_success_time: None,
			error_rate: 0.0,
			consecutive_failures: 0,
		}
	}

	#[test]
	fn test_new_tracker_is_healthy() {
		let tracker = HealthTracker::new("svc");
		let health = tracker.health();
		assert_eq!(health.status, HealthState::Healthy);
		assert_eq!(health.error_rate, 0.0);
		assert!(health.last_run_time.is_none());
	}

	#[test]
	fn test_error_rate_over_ten_percent_is_degraded() {
		let tracker = HealthTracker::new("svc");
		for i in 0..10 {
			tracker.record_run_started(Utc::now());
			if i < 2 {
				tracker.record_failure();
			} else {
				tracker.record_success(Utc::now());
			}
		}

		let state = tracker.snapshot();
		assert_eq!(state.total_runs, 10);
		assert_eq!(state.error_count, 2);
		assert_eq!(state.consecutive_failures, 0);
		assert_eq!(state.error_rate(), 20.0);
		assert_eq!(state.status(), HealthState::Degraded);
	}

	#[test]
	fn test_three_consecutive_failures_is_unhealthy() {
		let tracker = HealthTracker::new("svc");
		for _ in 0..3 {
			tracker.record_run_started(Utc::now());
			tracker.record_failure();
		}
		assert_eq!(tracker.health().status, HealthState::Unhealthy);
		assert_eq!(tracker.health().consecutive_failures, 3);
	}

	#[test]
	fn test_success_resets_consecutive_failures() {
		let tracker = HealthTracker::new("svc");
		tracker.record_run_started(Utc::now());
		tracker.record_failure();
		tracker.record_run_started(Utc::now());
		tracker.record_failure();
		assert_eq!(tracker.health().status, HealthState::Degraded);

		let now = Utc::now();
		tracker.record_run_started(now);
		tracker.record_success(now);
		let state = tracker.snapshot();
		assert_eq!(state.consecutive_failures, 0);
		assert_eq!(state.last_success_time, Some(now));
		assert_eq!(state.last_run_time, Some(now));
	}

	#[test]
	fn test_single_failure_is_degraded_even_with_low_error_rate() {
		let tracker = HealthTracker::new("svc");
		for _ in 0..99 {
			tracker.record_run_started(Utc::now());
			tracker.record_success(Utc::now());
		}
		tracker.record_run_started(Utc::now());
		tracker.record_failure();
		assert_eq!(tracker.health().status, HealthState::Degraded);
	}

	#[test]
	fn test_gauge_values() {
		assert_eq!(HealthState::Healthy.gauge_value(), 1.0);
		assert_eq!(HealthState::Degraded.gauge_value(), 0.5);
		assert_eq!(HealthState::Unhealthy.gauge_value(), 0.0);
	}

	#[test]
	fn test_aggregate_empty_is_unhealthy() {
		assert_eq!(aggregate_health(&[]), HealthState::Unhealthy);
	}

	#[test]
	fn test_aggregate_worst_wins() {
		let services = vec![
			service("a", HealthState::Healthy),
			service("b", HealthState::Degraded),
		];
		assert_eq!(aggregate_health(&services), HealthState::Degraded);

		let services = vec![
			service("a", HealthState::Degraded),
			service("b", HealthState::Unhealthy),
			service("c", HealthState::Healthy),
		];
		assert_eq!(aggregate_health(&services), HealthState::Unhealthy);

		let services = vec![service("a", HealthState::Healthy)];
		assert_eq!(aggregate_health(&services), HealthState::Healthy);
	}

	#[test]
	fn test_summary_counts() {
		let status = JobsHealthStatus::from_services(vec![
			service("a", HealthState::Healthy),
			service("b", HealthState::Degraded),
			service("c", HealthState::Healthy),
		]);
		let summary = status.summary();
		assert_eq!(status.status, HealthState::Degraded);
		assert_eq!(summary.total, 3);
		assert_eq!(summary.healthy, 2);
		assert_eq!(summary.degraded, 1);
		assert_eq!(summary.unhealthy, 0);
	}

	#[test]
	fn test_health_state_serializes_lowercase() {
		let json = serde_json::to_value(HealthState::Unhealthy).unwrap();
		assert_eq!(json, serde_json::json!("unhealthy"));
	}

	proptest! {
		#[test]
		fn error_count_never_exceeds_total_runs(outcomes in proptest::collection::vec(any::<bool>(), 0..64)) {
			let tracker = HealthTracker::new("prop");
			for ok in &outcomes {
				tracker.record_run_started(Utc::now());
				if *ok {
					tracker.record_success(Utc::now());
				} else {
					tracker.record_failure();
				}
			}
			let state = tracker.snapshot();
			prop_assert!(state.error_count <= state.total_runs);
			prop_assert_eq!(state.total_runs, outcomes.len() as u64);

			let trailing_failures = outcomes.iter().rev().take_while(|ok| !**ok).count() as u32;
			prop_assert_eq!(state.consecutive_failures, trailing_failures);
		}

		#[test]
		fn classification_matches_thresholds(consecutive in 0u32..10, rate in 0.0f64..100.0) {
			let state = classify_health(consecutive, rate);
			if consecutive >= 3 {
				prop_assert_eq!(state, HealthState::Unhealthy);
			} else if consecutive > 0 || rate > 10.0 {
				prop_assert_eq!(state, HealthState::Degraded);
			} else {
				prop_assert_eq!(state, HealthState::Healthy);
			}
		}
	}
}
