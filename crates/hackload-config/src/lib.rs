// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the HackLoad job service.
//!
//! Configuration is layered from multiple sources, lowest precedence first:
//! built-in defaults, a TOML file (`/etc/hackload/job-service.toml` unless
//! another path is given) and `HACKLOAD_*` environment variables.
//!
//! # Usage
//!
//! ```ignore
//! use hackload_config::load_config;
//!
//! let config = load_config()?;
//! println!("Monitoring on {}", config.monitoring.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::JobServiceConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved job service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct JobServiceConfig {
	pub api: ApiConfig,
	pub services: ServicesConfig,
	pub deployment: DeploymentConfig,
	pub monitoring: MonitoringConfig,
	pub scheduler: SchedulerConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`HACKLOAD_*`)
/// 2. Config file (`/etc/hackload/job-service.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<JobServiceConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::process()),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<PathBuf>,
) -> Result<JobServiceConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::process()),
	])
}

/// Merge the given sources in precedence order, then finalize and validate.
pub fn load_config_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<JobServiceConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = JobServiceConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: JobServiceConfigLayer) -> Result<JobServiceConfig, ConfigError> {
	let config = JobServiceConfig {
		api: layer.api.unwrap_or_default().finalize(),
		services: layer.services.unwrap_or_default().finalize(),
		deployment: layer.deployment.unwrap_or_default().finalize(),
		monitoring: layer.monitoring.unwrap_or_default().finalize(),
		scheduler: layer.scheduler.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		api_base_url = %config.api.base_url,
		monitoring = %config.monitoring.socket_addr(),
		timezone = %config.scheduler.timezone,
		deployment_monitor_enabled = config.services.deployment_monitor.enabled,
		budget_tracking_enabled = config.services.budget_tracking.enabled,
		judge_score_enabled = config.services.judge_score.enabled,
		"Job service configuration loaded"
	);

	Ok(config)
}

/// Validate required and cross-field configuration rules.
///
/// Cron expressions are checked by the scheduler, which disables only the
/// affected service.
fn validate_config(config: &JobServiceConfig) -> Result<(), ConfigError> {
	if config.api.base_url.is_empty() {
		return Err(ConfigError::MissingRequired(
			"HACKLOAD_API_BASE_URL (api.base_url)".to_string(),
		));
	}
	if config.api.api_key.is_empty() {
		return Err(ConfigError::MissingRequired(
			"HACKLOAD_API_KEY (api.api_key)".to_string(),
		));
	}
	if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://")
	{
		return Err(ConfigError::InvalidValue {
			key: "api.base_url".to_string(),
			message: format!("'{}' is not an http(s) URL", config.api.base_url),
		});
	}
	if config.api.timeout_ms == 0 {
		return Err(ConfigError::Validation(
			"api.timeout_ms must be greater than zero".to_string(),
		));
	}
	if config.scheduler.timezone.parse::<chrono_tz::Tz>().is_err() {
		return Err(ConfigError::InvalidValue {
			key: "scheduler.timezone".to_string(),
			message: format!("'{}' is not an IANA timezone", config.scheduler.timezone),
		});
	}
	if config.scheduler.team_concurrency == 0 {
		return Err(ConfigError::Validation(
			"scheduler.team_concurrency must be at least 1".to_string(),
		));
	}
	for (name, service) in [
		("deployment_monitor", &config.services.deployment_monitor),
		("budget_tracking", &config.services.budget_tracking),
		("judge_score", &config.services.judge_score),
	] {
		if service.timeout_ms == 0 {
			return Err(ConfigError::Validation(format!(
				"services.{name}.timeout_ms must be greater than zero"
			)));
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn required_env() -> EnvSource {
		EnvSource::from_vars([
			("HACKLOAD_API_BASE_URL", "https://hub.hackload.kz"),
			("HACKLOAD_API_KEY", "hl-key"),
		])
	}

	#[test]
	fn test_defaults_with_required_values() {
		let config = load_config_from_sources(vec![Box::new(DefaultsSource), Box::new(required_env())])
			.unwrap();

		assert_eq!(config.api.timeout_ms, 30_000);
		assert_eq!(config.api.retries, 3);
		assert_eq!(config.services, ServicesConfig::default());
		assert_eq!(config.deployment, DeploymentConfig::default());
		assert_eq!(config.monitoring.socket_addr(), "0.0.0.0:8080");
		assert_eq!(config.scheduler, SchedulerConfig::default());
		assert_eq!(config.logging.level, "info");
	}

	#[test]
	fn test_missing_api_key_is_rejected() {
		let env = EnvSource::from_vars([("HACKLOAD_API_BASE_URL", "https://hub.hackload.kz")]);
		let err = load_config_from_sources(vec![Box::new(env)]).unwrap_err();
		assert!(matches!(err, ConfigError::MissingRequired(ref key) if key.contains("HACKLOAD_API_KEY")));
	}

	#[test]
	fn test_missing_base_url_is_rejected() {
		let err = load_config_from_sources(vec![Box::new(DefaultsSource)]).unwrap_err();
		assert!(matches!(err, ConfigError::MissingRequired(_)));
	}

	#[test]
	fn test_non_http_base_url_is_rejected() {
		let env = EnvSource::from_vars([
			("HACKLOAD_API_BASE_URL", "hub.hackload.kz"),
			("HACKLOAD_API_KEY", "hl-key"),
		]);
		let err = load_config_from_sources(vec![Box::new(env)]).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
	}

	#[test]
	fn test_zero_team_concurrency_is_rejected() {
		let env = EnvSource::from_vars([
			("HACKLOAD_API_BASE_URL", "https://hub.hackload.kz"),
			("HACKLOAD_API_KEY", "hl-key"),
			("HACKLOAD_TEAM_CONCURRENCY", "0"),
		]);
		let err = load_config_from_sources(vec![Box::new(env)]).unwrap_err();
		assert!(err.to_string().contains("team_concurrency"));
	}

	#[test]
	fn test_unknown_timezone_is_rejected() {
		let env = EnvSource::from_vars([
			("HACKLOAD_API_BASE_URL", "https://hub.hackload.kz"),
			("HACKLOAD_API_KEY", "hl-key"),
			("HACKLOAD_SCHEDULER_TIMEZONE", "Mars/Olympus_Mons"),
		]);
		let err = load_config_from_sources(vec![Box::new(DefaultsSource), Box::new(env)]).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "scheduler.timezone"));
	}

	#[test]
	fn test_named_timezone_is_accepted() {
		let env = EnvSource::from_vars([
			("HACKLOAD_API_BASE_URL", "https://hub.hackload.kz"),
			("HACKLOAD_API_KEY", "hl-key"),
			("HACKLOAD_SCHEDULER_TIMEZONE", "Asia/Almaty"),
		]);
		let config = load_config_from_sources(vec![Box::new(DefaultsSource), Box::new(env)]).unwrap();
		assert_eq!(config.scheduler.timezone, "Asia/Almaty");
	}

	#[test]
	fn test_environment_overrides_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[api]
base_url = "https://file.example"
api_key = "from-file"
retries = 1

[services.judge_score]
interval = "*/30 * * * *"
retries = 7

[monitoring]
port = 9000
"#
		)
		.unwrap();

		let env = EnvSource::from_vars([
			("HACKLOAD_API_BASE_URL", "https://env.example/"),
			("HACKLOAD_JUDGE_SCORE_RETRIES", "2"),
		]);
		// Out of order on purpose; sources are sorted by precedence.
		let config = load_config_from_sources(vec![
			Box::new(env),
			Box::new(TomlSource::new(file.path())),
			Box::new(DefaultsSource),
		])
		.unwrap();

		assert_eq!(config.api.base_url, "https://env.example");
		assert_eq!(config.api.api_key, "from-file");
		assert_eq!(config.api.retries, 1);
		assert_eq!(config.services.judge_score.interval, "*/30 * * * *");
		assert_eq!(config.services.judge_score.retries, 2);
		assert_eq!(config.services.deployment_monitor.retries, 2);
		assert_eq!(config.monitoring.port, 9000);
	}
}
