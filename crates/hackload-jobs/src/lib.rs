// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheduled, resilient execution of HackLoad criteria checks.
//!
//! A [`JobScheduler`] fires each registered [`Job`] on its cron schedule and
//! runs it through the executor, which races every attempt against a timeout
//! and retries failures with exponential backoff. [`CriteriaJob`] adapts a
//! per-team [`CriteriaCheck`] into a job that fans out over the team roster and
//! pushes one bulk update per run. Outcomes land in the [`MetricsCollector`];
//! per-service health lives in each job's [`HealthTracker`].

pub mod check;
pub mod error;
pub mod health;
pub mod job;
pub mod metrics;
pub mod schedule;
pub mod scheduler;
pub mod types;

pub use check::{CriteriaCheck, CriteriaJob};
pub use error::{CheckError, JobError, MetricsError, Result};
pub use health::{
	aggregate_health, classify_health, HealthState, HealthSummary, HealthTracker, JobsHealthStatus,
	ServiceHealth, ServiceHealthState,
};
pub use job::Job;
pub use metrics::{
	DurationStats, ExecutionCounts, MetricsCollector, MetricsSnapshot, ServiceHealthGauge,
	PROMETHEUS_CONTENT_TYPE,
};
pub use schedule::{parse_timezone, validate_cron_expression, CronSchedule};
pub use scheduler::{
	calculate_backoff_delay, execute_job, JobScheduler, RunGate, RunGuard, RunState,
	SchedulerOptions,
};
pub use types::{RunSummary, ServiceConfig};
