// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deployment probe settings.

use serde::Deserialize;

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_USER_AGENT: &str = "HackLoad-Monitor/1.0";

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentConfig {
	pub http_timeout_ms: u64,
	pub user_agent: String,
}

impl Default for DeploymentConfig {
	fn default() -> Self {
		DeploymentConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentConfigLayer {
	#[serde(default)]
	pub http_timeout_ms: Option<u64>,
	#[serde(default)]
	pub user_agent: Option<String>,
}

impl DeploymentConfigLayer {
	pub fn merge(&mut self, other: DeploymentConfigLayer) {
		if other.http_timeout_ms.is_some() {
			self.http_timeout_ms = other.http_timeout_ms;
		}
		if other.user_agent.is_some() {
			self.user_agent = other.user_agent;
		}
	}

	pub fn finalize(self) -> DeploymentConfig {
		DeploymentConfig {
			http_timeout_ms: self.http_timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS),
			user_agent: self
				.user_agent
				.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = DeploymentConfig::default();
		assert_eq!(config.http_timeout_ms, 10_000);
		assert_eq!(config.user_agent, "HackLoad-Monitor/1.0");
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = DeploymentConfigLayer {
			http_timeout_ms: Some(5_000),
			user_agent: Some("old".to_string()),
		};
		base.merge(DeploymentConfigLayer {
			http_timeout_ms: None,
			user_agent: Some("new".to_string()),
		});
		assert_eq!(base.http_timeout_ms, Some(5_000));
		assert_eq!(base.user_agent.as_deref(), Some("new"));
	}
}
