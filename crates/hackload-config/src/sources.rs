// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files and environment variables.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::JobServiceConfigLayer;
use crate::sections::{
	ApiConfigLayer, DeploymentConfigLayer, LoggingConfigLayer, MonitoringConfigLayer,
	SchedulerConfigLayer, ServiceSettingsLayer, ServicesConfigLayer,
};

pub const SYSTEM_CONFIG_PATH: &str = "/etc/hackload/job-service.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<JobServiceConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<JobServiceConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(JobServiceConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<JobServiceConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(JobServiceConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: JobServiceConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variable source.
///
/// Convention: HACKLOAD_<SECTION>_<FIELD>
pub struct EnvSource {
	lookup: Lookup,
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::process()
	}
}

impl EnvSource {
	/// Reads the process environment.
	pub fn process() -> Self {
		Self {
			lookup: Box::new(|name| std::env::var(name).ok()),
		}
	}

	/// Reads from a fixed set of variables instead of the process environment.
	pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		let vars: HashMap<String, String> = vars
			.into_iter()
			.map(|(k, v)| (k.into(), v.into()))
			.collect();
		Self {
			lookup: Box::new(move |name| vars.get(name).cloned()),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self
			.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parsed<T: std::str::FromStr>(&self, name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {kind} value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn u16(&self, name: &str) -> Result<Option<u16>, ConfigError> {
		self.parsed(name, "u16")
	}

	fn u32(&self, name: &str) -> Result<Option<u32>, ConfigError> {
		self.parsed(name, "u32")
	}

	fn u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
		self.parsed(name, "u64")
	}

	fn usize(&self, name: &str) -> Result<Option<usize>, ConfigError> {
		self.parsed(name, "usize")
	}

	fn load_api(&self) -> Result<ApiConfigLayer, ConfigError> {
		Ok(ApiConfigLayer {
			base_url: self.var("HACKLOAD_API_BASE_URL"),
			api_key: self.var("HACKLOAD_API_KEY"),
			timeout_ms: self.u64("HACKLOAD_API_TIMEOUT_MS")?,
			retries: self.u32("HACKLOAD_API_RETRIES")?,
		})
	}

	fn load_service(&self, prefix: &str) -> Result<ServiceSettingsLayer, ConfigError> {
		Ok(ServiceSettingsLayer {
			enabled: self.bool(&format!("{prefix}_ENABLED")),
			interval: self.var(&format!("{prefix}_INTERVAL")),
			timeout_ms: self.u64(&format!("{prefix}_TIMEOUT_MS"))?,
			retries: self.u32(&format!("{prefix}_RETRIES"))?,
		})
	}

	fn load_services(&self) -> Result<ServicesConfigLayer, ConfigError> {
		Ok(ServicesConfigLayer {
			deployment_monitor: Some(self.load_service("HACKLOAD_DEPLOYMENT_MONITOR")?),
			budget_tracking: Some(self.load_service("HACKLOAD_BUDGET_TRACKING")?),
			judge_score: Some(self.load_service("HACKLOAD_JUDGE_SCORE")?),
		})
	}

	fn load_deployment(&self) -> Result<DeploymentConfigLayer, ConfigError> {
		Ok(DeploymentConfigLayer {
			http_timeout_ms: self.u64("HACKLOAD_DEPLOYMENT_HTTP_TIMEOUT_MS")?,
			user_agent: self.var("HACKLOAD_DEPLOYMENT_USER_AGENT"),
		})
	}

	fn load_monitoring(&self) -> Result<MonitoringConfigLayer, ConfigError> {
		Ok(MonitoringConfigLayer {
			host: self.var("HACKLOAD_MONITORING_HOST"),
			port: self.u16("HACKLOAD_MONITORING_PORT")?,
		})
	}

	fn load_scheduler(&self) -> Result<SchedulerConfigLayer, ConfigError> {
		Ok(SchedulerConfigLayer {
			timezone: self.var("HACKLOAD_SCHEDULER_TIMEZONE"),
			shutdown_grace_ms: self.u64("HACKLOAD_SCHEDULER_SHUTDOWN_GRACE_MS")?,
			team_concurrency: self.usize("HACKLOAD_TEAM_CONCURRENCY")?,
		})
	}

	fn load_logging(&self) -> LoggingConfigLayer {
		LoggingConfigLayer {
			level: self.var("HACKLOAD_LOG_LEVEL"),
			json: self.bool("HACKLOAD_LOG_JSON"),
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<JobServiceConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(JobServiceConfigLayer {
			api: Some(self.load_api()?),
			services: Some(self.load_services()?),
			deployment: Some(self.load_deployment()?),
			monitoring: Some(self.load_monitoring()?),
			scheduler: Some(self.load_scheduler()?),
			logging: Some(self.load_logging()),
		})
	}
}
