// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process execution metrics with Prometheus text exposition.
//!
//! Counters live in a plain snapshot structure behind one lock. The Prometheus
//! exposition is rebuilt from a snapshot on every scrape, so the text and the
//! JSON view can never disagree.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use prometheus::{Encoder, Gauge, GaugeVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::MetricsError;
use crate::health::{HealthState, ServiceHealth};

pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionCounts {
	pub total: u64,
	pub successful: u64,
	pub failed: u64,
}

impl ExecutionCounts {
	fn record(&mut self, success: bool) {
		self.total += 1;
		if success {
			self.successful += 1;
		} else {
			self.failed += 1;
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExecutions {
	pub total: u64,
	pub successful: u64,
	pub failed: u64,
	pub by_service: BTreeMap<String, ExecutionCounts>,
}

/// Duration statistics in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationStats {
	pub min: u64,
	pub max: u64,
	pub avg: f64,
	pub last: u64,
	pub count: u64,
}

impl DurationStats {
	fn first(duration_ms: u64) -> Self {
		Self {
			min: duration_ms,
			max: duration_ms,
			avg: duration_ms as f64,
			last: duration_ms,
			count: 1,
		}
	}

	fn record(&mut self, duration_ms: u64) {
		self.count += 1;
		self.min = self.min.min(duration_ms);
		self.max = self.max.max(duration_ms);
		self.avg += (duration_ms as f64 - self.avg) / self.count as f64;
		self.last = duration_ms;
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamsProcessed {
	pub total: u64,
	pub by_service: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealthGauge {
	pub status: HealthState,
	pub last_run_time: Option<DateTime<Utc>>,
	pub last_success_time: Option<DateTime<Utc>>,
	pub error_rate: f64,
	pub consecutive_failures: u32,
}

impl From<&ServiceHealth> for ServiceHealthGauge {
	fn from(health: &ServiceHealth) -> Self {
		Self {
			status: health.status,
			last_run_time: health.last_run_time,
			last_success_time: health.last_success_time,
			error_rate: health.error_rate,
			consecutive_failures: health.consecutive_failures,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
	pub uptime_ms: u64,
	pub start_time: DateTime<Utc>,
	pub last_metrics_reset: DateTime<Utc>,
	pub active_services: usize,
}

/// Point-in-time copy of every collected metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
	pub job_executions: JobExecutions,
	pub job_durations: BTreeMap<String, DurationStats>,
	pub teams_processed: TeamsProcessed,
	pub service_health: BTreeMap<String, ServiceHealthGauge>,
	pub system_metrics: SystemMetrics,
}

impl MetricsSnapshot {
	fn empty(start_time: DateTime<Utc>, last_metrics_reset: DateTime<Utc>) -> Self {
		Self {
			job_executions: JobExecutions::default(),
			job_durations: BTreeMap::new(),
			teams_processed: TeamsProcessed::default(),
			service_health: BTreeMap::new(),
			system_metrics: SystemMetrics {
				uptime_ms: 0,
				start_time,
				last_metrics_reset,
				active_services: 0,
			},
		}
	}
}

/// Collects job execution metrics for the whole process.
///
/// Constructed once and shared by `Arc` between the scheduler and the health
/// server.
#[derive(Debug)]
pub struct MetricsCollector {
	started: Instant,
	start_time: DateTime<Utc>,
	state: Mutex<MetricsSnapshot>,
}

impl Default for MetricsCollector {
	fn default() -> Self {
		Self::new()
	}
}

impl MetricsCollector {
	pub fn new() -> Self {
		let start_time = Utc::now();
		Self {
			started: Instant::now(),
			start_time,
			state: Mutex::new(MetricsSnapshot::empty(start_time, start_time)),
		}
	}

	pub fn record_job_execution(
		&self,
		service_name: &str,
		success: bool,
		duration_ms: u64,
		teams_processed: u64,
	) {
		let mut state = self.state.lock();

		state.job_executions.total += 1;
		if success {
			state.job_executions.successful += 1;
		} else {
			state.job_executions.failed += 1;
		}
		state
			.job_executions
			.by_service
			.entry(service_name.to_string())
			.or_default()
			.record(success);

		state
			.job_durations
			.entry(service_name.to_string())
			.and_modify(|stats| stats.record(duration_ms))
			.or_insert_with(|| DurationStats::first(duration_ms));

		state.teams_processed.total += teams_processed;
		*state
			.teams_processed
			.by_service
			.entry(service_name.to_string())
			.or_default() += teams_processed;
	}

	pub fn update_service_health(&self, health: &ServiceHealth) {
		self
			.state
			.lock()
			.service_health
			.insert(health.service_name.clone(), ServiceHealthGauge::from(health));
	}

	pub fn update_system_metrics(&self, active_services: usize) {
		let uptime_ms = self.uptime_ms();
		let mut state = self.state.lock();
		state.system_metrics.uptime_ms = uptime_ms;
		state.system_metrics.active_services = active_services;
	}

	/// A deep copy of the current metrics with uptime refreshed.
	pub fn get_metrics(&self) -> MetricsSnapshot {
		let uptime_ms = self.uptime_ms();
		let mut state = self.state.lock();
		state.system_metrics.uptime_ms = uptime_ms;
		state.clone()
	}

	pub fn render_prometheus(&self) -> Result<String, MetricsError> {
		render_prometheus(&self.get_metrics())
	}

	/// Zeroes every counter and gauge. The uptime baseline is kept.
	pub fn reset(&self) {
		let mut state = self.state.lock();
		*state = MetricsSnapshot::empty(self.start_time, Utc::now());
		state.system_metrics.uptime_ms = self.uptime_ms();
	}

	fn uptime_ms(&self) -> u64 {
		self.started.elapsed().as_millis() as u64
	}
}

/// Renders a snapshot in the Prometheus text exposition format.
pub fn render_prometheus(snapshot: &MetricsSnapshot) -> Result<String, MetricsError> {
	let registry = Registry::new();

	let executions = IntCounterVec::new(
		Opts::new("job_executions_total", "Total number of job executions"),
		&["service", "status"],
	)?;
	registry.register(Box::new(executions.clone()))?;
	for (service, counts) in &snapshot.job_executions.by_service {
		executions
			.with_label_values(&[service.as_str(), "success"])
			.inc_by(counts.successful);
		executions
			.with_label_values(&[service.as_str(), "failure"])
			.inc_by(counts.failed);
	}

	let duration_gauge =
		|name: &str, help: &str| GaugeVec::new(Opts::new(name, help), &["service"]);
	let min = duration_gauge("job_duration_seconds_min", "Shortest job execution in seconds")?;
	let max = duration_gauge("job_duration_seconds_max", "Longest job execution in seconds")?;
	let avg = duration_gauge("job_duration_seconds_avg", "Average job execution in seconds")?;
	let last = duration_gauge("job_duration_seconds_last", "Most recent job execution in seconds")?;
	for gauge in [&min, &max, &avg, &last] {
		registry.register(Box::new(gauge.clone()))?;
	}
	for (service, stats) in &snapshot.job_durations {
		let labels = [service.as_str()];
		min.with_label_values(&labels).set(stats.min as f64 / 1000.0);
		max.with_label_values(&labels).set(stats.max as f64 / 1000.0);
		avg.with_label_values(&labels).set(stats.avg / 1000.0);
		last.with_label_values(&labels).set(stats.last as f64 / 1000.0);
	}

	let teams = IntCounterVec::new(
		Opts::new("teams_processed_total", "Total teams processed"),
		&["service"],
	)?;
	registry.register(Box::new(teams.clone()))?;
	for (service, count) in &snapshot.teams_processed.by_service {
		teams.with_label_values(&[service.as_str()]).inc_by(*count);
	}

	let health = GaugeVec::new(
		Opts::new(
			"service_health",
			"Service health status (1=healthy, 0.5=degraded, 0=unhealthy)",
		),
		&["service"],
	)?;
	let error_rate = GaugeVec::new(
		Opts::new("service_error_rate", "Percentage of failed runs per service"),
		&["service"],
	)?;
	let consecutive = IntGaugeVec::new(
		Opts::new(
			"service_consecutive_failures",
			"Consecutive failed runs per service",
		),
		&["service"],
	)?;
	registry.register(Box::new(health.clone()))?;
	registry.register(Box::new(error_rate.clone()))?;
	registry.register(Box::new(consecutive.clone()))?;
	for (service, gauge) in &snapshot.service_health {
		let labels = [service.as_str()];
		health.with_label_values(&labels).set(gauge.status.gauge_value());
		error_rate.with_label_values(&labels).set(gauge.error_rate);
		consecutive
			.with_label_values(&labels)
			.set(i64::from(gauge.consecutive_failures));
	}

	let uptime = Gauge::new("system_uptime_seconds", "System uptime in seconds")?;
	registry.register(Box::new(uptime.clone()))?;
	uptime.set(snapshot.system_metrics.uptime_ms as f64 / 1000.0);

	let active = IntGauge::new("active_services_total", "Number of active services")?;
	registry.register(Box::new(active.clone()))?;
	active.set(snapshot.system_metrics.active_services as i64);

	let mut buffer = Vec::new();
	TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
	Ok(String::from_utf8(buffer)?)
}
