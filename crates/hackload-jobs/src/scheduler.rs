// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::Utc;
use chrono_tz::Tz;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{JobError, Result};
use crate::health::{JobsHealthStatus, ServiceHealth};
use crate::job::Job;
use crate::metrics::MetricsCollector;
use crate::schedule::CronSchedule;
use crate::types::{RunSummary, ServiceConfig};

const BASE_RETRY_DELAY_MS: u64 = 1_000;
const MAX_RETRY_DELAY_MS: u64 = 30_000;
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
	Idle,
	Running,
}

/// Non-reentrant gate around one service's executions.
#[derive(Debug)]
pub struct RunGate {
	state: Mutex<RunState>,
}

impl Default for RunGate {
	fn default() -> Self {
		Self::new()
	}
}

impl RunGate {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(RunState::Idle),
		}
	}

	pub fn state(&self) -> RunState {
		*self.state.lock()
	}

	/// Moves the gate to `Running`, or returns `None` if it already is.
	pub fn try_acquire(&self) -> Option<RunGuard<'_>> {
		let mut state = self.state.lock();
		match *state {
			RunState::Running => None,
			RunState::Idle => {
				*state = RunState::Running;
				Some(RunGuard { gate: self })
			}
		}
	}
}

/// Returns its gate to `Idle` when dropped.
#[derive(Debug)]
pub struct RunGuard<'a> {
	gate: &'a RunGate,
}

impl Drop for RunGuard<'_> {
	fn drop(&mut self) {
		*self.gate.state.lock() = RunState::Idle;
	}
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
	/// Timezone cron expressions are evaluated in.
	pub timezone: Tz,
	/// How long `stop` waits after cancelling timers.
	pub shutdown_grace: Duration,
}

impl Default for SchedulerOptions {
	fn default() -> Self {
		Self {
			timezone: Tz::UTC,
			shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
		}
	}
}

struct RegisteredService {
	job: Arc<dyn Job>,
	config: Arc<ServiceConfig>,
	gate: Arc<RunGate>,
}

struct ServiceTimer {
	token: CancellationToken,
	handle: JoinHandle<()>,
	paused: bool,
}

#[derive(Default)]
struct SchedulerState {
	running: bool,
	timers: HashMap<String, ServiceTimer>,
}

/// Everything a timer needs to execute its service, detached from the
/// scheduler's own lifetime.
#[derive(Clone)]
struct Execution {
	job: Arc<dyn Job>,
	config: Arc<ServiceConfig>,
	gate: Arc<RunGate>,
	metrics: Arc<MetricsCollector>,
}

impl Execution {
	async fn fire(&self) {
		let Some(_guard) = self.gate.try_acquire() else {
			warn!(
				service = %self.config.service_name,
				"previous run still in progress, skipping this firing"
			);
			return;
		};
		// Exhausted retries are already logged and recorded.
		let _ = execute_job(self.job.as_ref(), &self.config, &self.metrics).await;
	}
}

/// Fires registered services on their cron schedules.
pub struct JobScheduler {
	services: BTreeMap<String, RegisteredService>,
	metrics: Arc<MetricsCollector>,
	options: SchedulerOptions,
	state: Mutex<SchedulerState>,
}

impl JobScheduler {
	pub fn new(metrics: Arc<MetricsCollector>) -> Self {
		Self::with_options(metrics, SchedulerOptions::default())
	}

	pub fn with_options(metrics: Arc<MetricsCollector>, options: SchedulerOptions) -> Self {
		Self {
			services: BTreeMap::new(),
			metrics,
			options,
			state: Mutex::new(SchedulerState::default()),
		}
	}

	/// Registers `job` under `config.service_name`. A second registration
	/// under the same name replaces the first.
	pub fn register_service(&mut self, job: Arc<dyn Job>, config: ServiceConfig) {
		let name = config.service_name.clone();
		if self.services.contains_key(&name) {
			warn!(service = %name, "service already registered, replacing registration");
		}
		info!(
			service = %name,
			cron = %config.cron_expression,
			timeout_ms = config.timeout_ms,
			max_retries = config.max_retries,
			enabled = config.enabled,
			"registered service"
		);
		self.services.insert(
			name,
			RegisteredService {
				job,
				config: Arc::new(config),
				gate: Arc::new(RunGate::new()),
			},
		);
	}

	/// Starts a timer for every enabled service. Must be called from within a
	/// Tokio runtime.
	#[instrument(skip(self))]
	pub fn start(&self) {
		let mut state = self.state.lock();
		if state.running {
			warn!("job scheduler already running");
			return;
		}

		for (name, service) in &self.services {
			if !service.config.enabled {
				info!(service = %name, "service disabled, not scheduling");
				continue;
			}
			match self.spawn_timer(service) {
				Ok(timer) => {
					info!(service = %name, cron = %service.config.cron_expression, "scheduled service");
					state.timers.insert(name.clone(), timer);
				}
				Err(e) => {
					error!(service = %name, error = %e, "failed to schedule service");
				}
			}
		}

		state.running = true;
		self.metrics.update_system_metrics(self.services.len());
		info!(active_timers = state.timers.len(), "job scheduler started");
	}

	/// Cancels every timer, waits the shutdown grace period, then marks the
	/// scheduler stopped. In-flight executions are left to finish.
	#[instrument(skip(self))]
	pub async fn stop(&self) {
		{
			let state = self.state.lock();
			if !state.running {
				debug!("job scheduler not running");
				return;
			}
			for timer in state.timers.values() {
				timer.token.cancel();
			}
		}

		tokio::time::sleep(self.options.shutdown_grace).await;

		let timers: Vec<ServiceTimer> = {
			let mut state = self.state.lock();
			state.running = false;
			state.timers.drain().map(|(_, timer)| timer).collect()
		};
		for timer in timers {
			if let Err(e) = timer.handle.await {
				warn!(error = %e, "timer task ended abnormally");
			}
		}

		info!("job scheduler stopped");
	}

	#[instrument(skip(self))]
	pub fn pause(&self, service_name: &str) {
		let mut state = self.state.lock();
		match state.timers.get_mut(service_name) {
			Some(timer) if timer.paused => {
				debug!(service = %service_name, "service already paused");
			}
			Some(timer) => {
				timer.token.cancel();
				timer.paused = true;
				info!(service = %service_name, "paused service");
			}
			None => {
				warn!(service = %service_name, "no timer for service, cannot pause");
			}
		}
	}

	#[instrument(skip(self))]
	pub fn resume(&self, service_name: &str) {
		let mut state = self.state.lock();
		let Some(timer) = state.timers.get_mut(service_name) else {
			warn!(service = %service_name, "no timer for service, cannot resume");
			return;
		};
		if !timer.paused {
			debug!(service = %service_name, "service not paused");
			return;
		}
		let Some(service) = self.services.get(service_name) else {
			warn!(service = %service_name, "service not registered, cannot resume");
			return;
		};

		match self.spawn_timer(service) {
			Ok(fresh) => {
				*timer = fresh;
				info!(service = %service_name, "resumed service");
			}
			Err(e) => {
				error!(service = %service_name, error = %e, "failed to resume service");
			}
		}
	}

	/// Runs `service_name` once, now, through the executor.
	#[instrument(skip(self))]
	pub async fn trigger(&self, service_name: &str) -> Result<RunSummary> {
		let service = self
			.services
			.get(service_name)
			.ok_or_else(|| JobError::NotFound(service_name.to_string()))?;

		let _guard = service
			.gate
			.try_acquire()
			.ok_or_else(|| JobError::AlreadyRunning(service_name.to_string()))?;

		execute_job(service.job.as_ref(), &service.config, &self.metrics).await
	}

	/// Per-service health, sorted by service name.
	pub fn get_status(&self) -> Vec<ServiceHealth> {
		self.services.values().map(|s| s.job.health()).collect()
	}

	pub fn health_status(&self) -> JobsHealthStatus {
		JobsHealthStatus::from_services(self.get_status())
	}

	/// Number of timers currently armed (paused timers excluded).
	pub fn active_timers(&self) -> usize {
		self.state.lock().timers.values().filter(|t| !t.paused).count()
	}

	pub fn is_running(&self) -> bool {
		self.state.lock().running
	}

	pub fn service_names(&self) -> Vec<String> {
		self.services.keys().cloned().collect()
	}

	pub fn metrics(&self) -> &Arc<MetricsCollector> {
		&self.metrics
	}

	fn spawn_timer(&self, service: &RegisteredService) -> Result<ServiceTimer> {
		let schedule = CronSchedule::parse(&service.config.cron_expression)?;
		let token = CancellationToken::new();
		let execution = Execution {
			job: Arc::clone(&service.job),
			config: Arc::clone(&service.config),
			gate: Arc::clone(&service.gate),
			metrics: Arc::clone(&self.metrics),
		};
		let handle = tokio::spawn(run_timer(
			schedule,
			self.options.timezone,
			execution,
			token.clone(),
		));
		Ok(ServiceTimer {
			token,
			handle,
			paused: false,
		})
	}
}

async fn run_timer(
	schedule: CronSchedule,
	timezone: Tz,
	execution: Execution,
	token: CancellationToken,
) {
	let service = execution.config.service_name.clone();
	let mut last_fire = Utc::now();

	loop {
		let now = Utc::now();
		let Some(next) = schedule.next_after(last_fire.max(now), timezone) else {
			warn!(service = %service, cron = %schedule.expression(), "schedule has no further occurrences");
			break;
		};
		let wait = (next - now).to_std().unwrap_or_default();
		debug!(service = %service, next = %next, "timer armed");

		tokio::select! {
			_ = token.cancelled() => {
				debug!(service = %service, "timer cancelled");
				break;
			}
			_ = tokio::time::sleep(wait) => {}
		}

		last_fire = next;
		let execution = execution.clone();
		tokio::spawn(async move { execution.fire().await });
	}
}

/// Runs `job` with the retry, timeout and backoff policy of `config`,
/// recording the outcome into `metrics`.
///
/// Each attempt races `run()` against the timeout; a timed-out attempt is
/// dropped and counts as a failure. After `max_retries` retries the last error
/// is returned. The run's duration spans every attempt and backoff.
pub async fn execute_job(
	job: &dyn Job,
	config: &ServiceConfig,
	metrics: &MetricsCollector,
) -> Result<RunSummary> {
	let service = config.service_name.as_str();
	let started = tokio::time::Instant::now();
	let mut attempt = 0u32;

	info!(service = %service, "starting job");

	let outcome = loop {
		let result = match tokio::time::timeout(config.timeout(), job.run()).await {
			Ok(result) => result,
			Err(_) => {
				let err = JobError::Timeout {
					timeout_ms: config.timeout_ms,
				};
				job.record_abandoned_run(&err);
				Err(err)
			}
		};

		match result {
			Ok(summary) => break Ok(summary),
			Err(e) => {
				attempt += 1;
				if attempt > config.max_retries {
					break Err(e);
				}
				let delay = calculate_backoff_delay(attempt);
				warn!(
					service = %service,
					attempt,
					max_retries = config.max_retries,
					delay_ms = delay.as_millis() as u64,
					error = %e,
					"job failed, retrying"
				);
				tokio::time::sleep(delay).await;
			}
		}
	};

	let duration_ms = started.elapsed().as_millis() as u64;
	match &outcome {
		Ok(summary) => {
			metrics.record_job_execution(service, true, duration_ms, summary.teams_processed as u64);
			info!(
				service = %service,
				duration_ms,
				teams_processed = summary.teams_processed,
				"job completed"
			);
		}
		Err(e) => {
			metrics.record_job_execution(service, false, duration_ms, 0);
			error!(
				service = %service,
				attempts = attempt,
				duration_ms,
				error = %e,
				"job failed after all retries"
			);
		}
	}
	metrics.update_service_health(&job.health());

	outcome
}

/// Delay before retry number `attempt` (1-based): doubles from one second,
/// capped at thirty.
pub fn calculate_backoff_delay(attempt: u32) -> Duration {
	let exponent = attempt.saturating_sub(1).min(16);
	Duration::from_millis((BASE_RETRY_DELAY_MS << exponent).min(MAX_RETRY_DELAY_MS))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::health::{HealthState, HealthTracker};
	use async_trait::async_trait;
	use proptest::prelude::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	struct CountingJob {
		name: String,
		runs: AtomicU32,
		health: HealthTracker,
	}

	impl CountingJob {
		fn new(name: &str) -> Self {
			Self {
				name: name.to_string(),
				runs: AtomicU32::new(0),
				health: HealthTracker::new(name),
			}
		}
	}

	#[async_trait]
	impl Job for CountingJob {
		fn service_name(&self) -> &str {
			&self.name
		}

		async fn run(&self) -> Result<RunSummary> {
			self.runs.fetch_add(1, Ordering::SeqCst);
			self.health.record_run_started(Utc::now());
			self.health.record_success(Utc::now());
			Ok(RunSummary::default())
		}

		fn health(&self) -> ServiceHealth {
			self.health.health()
		}
	}

	fn scheduler() -> JobScheduler {
		JobScheduler::with_options(
			Arc::new(MetricsCollector::new()),
			SchedulerOptions {
				timezone: Tz::UTC,
				shutdown_grace: Duration::from_millis(10),
			},
		)
	}

	#[test]
	fn test_calculate_backoff_delay() {
		assert_eq!(calculate_backoff_delay(1), Duration::from_millis(1000));
		assert_eq!(calculate_backoff_delay(2), Duration::from_millis(2000));
		assert_eq!(calculate_backoff_delay(3), Duration::from_millis(4000));
		assert_eq!(calculate_backoff_delay(4), Duration::from_millis(8000));
		assert_eq!(calculate_backoff_delay(5), Duration::from_millis(16000));
		assert_eq!(calculate_backoff_delay(6), Duration::from_millis(30000));
		assert_eq!(calculate_backoff_delay(100), Duration::from_millis(30000));
	}

	#[test]
	fn test_run_gate_is_not_reentrant() {
		let gate = RunGate::new();
		assert_eq!(gate.state(), RunState::Idle);

		let guard = gate.try_acquire().unwrap();
		assert_eq!(gate.state(), RunState::Running);
		assert!(gate.try_acquire().is_none());

		drop(guard);
		assert_eq!(gate.state(), RunState::Idle);
		assert!(gate.try_acquire().is_some());
	}

	#[test]
	fn test_register_duplicate_replaces() {
		let mut scheduler = scheduler();
		let first = Arc::new(CountingJob::new("svc"));
		let second = Arc::new(CountingJob::new("svc"));
		scheduler.register_service(first, ServiceConfig::new("svc", "* * * * *"));
		scheduler.register_service(
			second,
			ServiceConfig::new("svc", "*/5 * * * *").with_max_retries(0),
		);

		assert_eq!(scheduler.service_names(), vec!["svc".to_string()]);
		let registered = &scheduler.services["svc"];
		assert_eq!(registered.config.cron_expression, "*/5 * * * *");
		assert_eq!(registered.config.max_retries, 0);
	}

	#[tokio::test]
	async fn test_start_skips_disabled_and_invalid_services() {
		let mut scheduler = scheduler();
		scheduler.register_service(
			Arc::new(CountingJob::new("enabled")),
			ServiceConfig::new("enabled", "*/15 * * * *"),
		);
		scheduler.register_service(
			Arc::new(CountingJob::new("disabled")),
			ServiceConfig::new("disabled", "*/15 * * * *").with_enabled(false),
		);
		scheduler.register_service(
			Arc::new(CountingJob::new("broken")),
			ServiceConfig::new("broken", "not a cron"),
		);

		scheduler.start();

		assert!(scheduler.is_running());
		assert_eq!(scheduler.active_timers(), 1);

		scheduler.stop().await;
		assert!(!scheduler.is_running());
		assert_eq!(scheduler.active_timers(), 0);
	}

	#[tokio::test]
	async fn test_start_and_stop_are_idempotent() {
		let mut scheduler = scheduler();
		scheduler.register_service(
			Arc::new(CountingJob::new("a")),
			ServiceConfig::new("a", "*/15 * * * *"),
		);
		scheduler.register_service(
			Arc::new(CountingJob::new("b")),
			ServiceConfig::new("b", "*/10 * * * *"),
		);

		scheduler.start();
		scheduler.start();
		assert_eq!(scheduler.active_timers(), 2);

		scheduler.stop().await;
		scheduler.stop().await;
		assert!(!scheduler.is_running());
		assert_eq!(scheduler.active_timers(), 0);
	}

	#[tokio::test]
	async fn test_pause_and_resume() {
		let mut scheduler = scheduler();
		scheduler.register_service(
			Arc::new(CountingJob::new("a")),
			ServiceConfig::new("a", "*/15 * * * *"),
		);
		scheduler.start();

		scheduler.pause("a");
		assert_eq!(scheduler.active_timers(), 0);
		scheduler.pause("a");
		scheduler.pause("unknown");

		scheduler.resume("a");
		assert_eq!(scheduler.active_timers(), 1);
		scheduler.resume("a");
		assert_eq!(scheduler.active_timers(), 1);

		scheduler.stop().await;
	}

	#[tokio::test]
	async fn test_trigger_unknown_service() {
		let scheduler = scheduler();
		let err = scheduler.trigger("missing").await.unwrap_err();
		assert!(matches!(err, JobError::NotFound(name) if name == "missing"));
	}

	#[tokio::test]
	async fn test_trigger_runs_once_and_records_metrics() {
		let mut scheduler = scheduler();
		let job = Arc::new(CountingJob::new("a"));
		scheduler.register_service(job.clone(), ServiceConfig::new("a", "*/15 * * * *"));

		scheduler.trigger("a").await.unwrap();

		assert_eq!(job.runs.load(Ordering::SeqCst), 1);
		let snapshot = scheduler.metrics().get_metrics();
		assert_eq!(snapshot.job_executions.by_service["a"].successful, 1);
		assert_eq!(snapshot.service_health["a"].status, HealthState::Healthy);
	}

	#[tokio::test]
	async fn test_status_is_sorted_by_service_name() {
		let mut scheduler = scheduler();
		for name in ["zeta", "alpha", "mid"] {
			scheduler.register_service(
				Arc::new(CountingJob::new(name)),
				ServiceConfig::new(name, "*/15 * * * *"),
			);
		}

		let names: Vec<_> = scheduler
			.get_status()
			.into_iter()
			.map(|s| s.service_name)
			.collect();
		assert_eq!(names, vec!["alpha", "mid", "zeta"]);
	}

	struct SlowJob {
		runs: AtomicU32,
		health: HealthTracker,
	}

	#[async_trait]
	impl Job for SlowJob {
		fn service_name(&self) -> &str {
			"slow"
		}

		async fn run(&self) -> Result<RunSummary> {
			self.runs.fetch_add(1, Ordering::SeqCst);
			tokio::time::sleep(Duration::from_secs(10)).await;
			Ok(RunSummary::default())
		}

		fn health(&self) -> ServiceHealth {
			self.health.health()
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_overlapping_firing_is_skipped() {
		let job = Arc::new(SlowJob {
			runs: AtomicU32::new(0),
			health: HealthTracker::new("slow"),
		});
		let metrics = Arc::new(MetricsCollector::new());
		let execution = Execution {
			job: job.clone(),
			config: Arc::new(ServiceConfig::new("slow", "* * * * * *").with_timeout_ms(60_000)),
			gate: Arc::new(RunGate::new()),
			metrics: metrics.clone(),
		};

		let first = tokio::spawn({
			let execution = execution.clone();
			async move { execution.fire().await }
		});
		while execution.gate.state() == RunState::Idle {
			tokio::task::yield_now().await;
		}

		execution.fire().await;
		assert_eq!(job.runs.load(Ordering::SeqCst), 1);

		first.await.unwrap();
		assert_eq!(execution.gate.state(), RunState::Idle);
		assert_eq!(job.runs.load(Ordering::SeqCst), 1);
		assert_eq!(metrics.get_metrics().job_executions.total, 1);
	}

	#[tokio::test]
	async fn test_timer_fires_on_schedule() {
		let mut scheduler = scheduler();
		let job = Arc::new(CountingJob::new("every-second"));
		scheduler.register_service(job.clone(), ServiceConfig::new("every-second", "* * * * * *"));

		scheduler.start();
		tokio::time::sleep(Duration::from_millis(1500)).await;
		scheduler.stop().await;

		assert!(job.runs.load(Ordering::SeqCst) >= 1);
	}

	#[test]
	fn test_health_status_with_no_services_is_unhealthy() {
		let scheduler = scheduler();
		let status = scheduler.health_status();
		assert_eq!(status.status, HealthState::Unhealthy);
		assert!(status.services.is_empty());
	}

	proptest! {
		#[test]
		fn backoff_is_monotonic_and_capped(attempt in 1u32..200) {
			let delay = calculate_backoff_delay(attempt);
			let next = calculate_backoff_delay(attempt + 1);
			prop_assert!(delay <= next);
			prop_assert!(next <= Duration::from_millis(MAX_RETRY_DELAY_MS));
			prop_assert!(delay >= Duration::from_millis(BASE_RETRY_DELAY_MS));
		}
	}
}
