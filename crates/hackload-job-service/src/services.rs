// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds the registry client and scheduler from resolved configuration.

use std::sync::Arc;
use std::time::Duration;

use hackload_common_http::RetryConfig;
use hackload_config::{JobServiceConfig, ServiceSettings};
use hackload_jobs::{
	parse_timezone, CriteriaCheck, CriteriaJob, JobError, JobScheduler, MetricsCollector,
	SchedulerOptions, ServiceConfig,
};
use hackload_probes::{BudgetTracking, DeploymentMonitor, DeploymentMonitorConfig, JudgeScore};
use hackload_registry::{HubApiClient, RegistryClient, RegistryError};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
	#[error("failed to build registry client: {0}")]
	Registry(#[from] RegistryError),

	#[error("failed to build HTTP client: {0}")]
	Http(#[from] reqwest::Error),

	#[error(transparent)]
	Scheduler(#[from] JobError),
}

pub fn build_registry_client(
	config: &JobServiceConfig,
) -> Result<Arc<dyn RegistryClient>, StartupError> {
	let client = HubApiClient::builder()
		.base_url(&config.api.base_url)
		.api_key(&config.api.api_key)
		.request_timeout(Duration::from_millis(config.api.timeout_ms))
		.retry_config(RetryConfig::with_retries(config.api.retries))
		.build()?;
	Ok(Arc::new(client))
}

fn service_config(service_name: &str, settings: &ServiceSettings) -> ServiceConfig {
	ServiceConfig::new(service_name, settings.interval.clone())
		.with_timeout_ms(settings.timeout_ms)
		.with_max_retries(settings.retries)
		.with_enabled(settings.enabled)
}

fn register<C>(
	scheduler: &mut JobScheduler,
	check: C,
	settings: &ServiceSettings,
	registry: &Arc<dyn RegistryClient>,
	team_concurrency: usize,
) where
	C: CriteriaCheck + 'static,
{
	let config = service_config(check.service_name(), settings);
	let job = CriteriaJob::new(check, Arc::clone(registry)).with_team_concurrency(team_concurrency);
	scheduler.register_service(Arc::new(job), config);
}

/// Registers every known check, enabled or not, so disabled ones still
/// report health.
pub fn build_scheduler(
	config: &JobServiceConfig,
	registry: Arc<dyn RegistryClient>,
	metrics: Arc<MetricsCollector>,
) -> Result<JobScheduler, StartupError> {
	let options = SchedulerOptions {
		timezone: parse_timezone(&config.scheduler.timezone)?,
		shutdown_grace: Duration::from_millis(config.scheduler.shutdown_grace_ms),
	};
	let mut scheduler = JobScheduler::with_options(metrics, options);
	let team_concurrency = config.scheduler.team_concurrency;

	let monitor = DeploymentMonitor::new(DeploymentMonitorConfig {
		http_timeout: Duration::from_millis(config.deployment.http_timeout_ms),
		user_agent: config.deployment.user_agent.clone(),
	})?;
	register(
		&mut scheduler,
		monitor,
		&config.services.deployment_monitor,
		&registry,
		team_concurrency,
	);
	register(
		&mut scheduler,
		BudgetTracking::new(),
		&config.services.budget_tracking,
		&registry,
		team_concurrency,
	);
	register(
		&mut scheduler,
		JudgeScore::new(),
		&config.services.judge_score,
		&registry,
		team_concurrency,
	);

	info!(
		services = ?scheduler.service_names(),
		timezone = %config.scheduler.timezone,
		team_concurrency,
		"job services registered"
	);
	Ok(scheduler)
}
