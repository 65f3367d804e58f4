// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-check scheduling settings.

use serde::Deserialize;

/// Schedule and resilience settings for one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
	pub enabled: bool,
	/// Cron expression, five or six fields.
	pub interval: String,
	pub timeout_ms: u64,
	pub retries: u32,
}

impl ServiceSettings {
	pub fn deployment_monitor() -> Self {
		Self {
			enabled: true,
			interval: "*/15 * * * *".to_string(),
			timeout_ms: 30_000,
			retries: 2,
		}
	}

	pub fn budget_tracking() -> Self {
		Self {
			enabled: true,
			interval: "*/15 * * * *".to_string(),
			timeout_ms: 120_000,
			retries: 3,
		}
	}

	pub fn judge_score() -> Self {
		Self {
			enabled: true,
			interval: "*/10 * * * *".to_string(),
			timeout_ms: 60_000,
			retries: 3,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceSettingsLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub interval: Option<String>,
	#[serde(default)]
	pub timeout_ms: Option<u64>,
	#[serde(default)]
	pub retries: Option<u32>,
}

impl ServiceSettingsLayer {
	pub fn merge(&mut self, other: ServiceSettingsLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.interval.is_some() {
			self.interval = other.interval;
		}
		if other.timeout_ms.is_some() {
			self.timeout_ms = other.timeout_ms;
		}
		if other.retries.is_some() {
			self.retries = other.retries;
		}
	}

	pub fn finalize(self, defaults: ServiceSettings) -> ServiceSettings {
		ServiceSettings {
			enabled: self.enabled.unwrap_or(defaults.enabled),
			interval: self.interval.unwrap_or(defaults.interval),
			timeout_ms: self.timeout_ms.unwrap_or(defaults.timeout_ms),
			retries: self.retries.unwrap_or(defaults.retries),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicesConfig {
	pub deployment_monitor: ServiceSettings,
	pub budget_tracking: ServiceSettings,
	pub judge_score: ServiceSettings,
}

impl Default for ServicesConfig {
	fn default() -> Self {
		Self {
			deployment_monitor: ServiceSettings::deployment_monitor(),
			budget_tracking: ServiceSettings::budget_tracking(),
			judge_score: ServiceSettings::judge_score(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicesConfigLayer {
	#[serde(default)]
	pub deployment_monitor: Option<ServiceSettingsLayer>,
	#[serde(default)]
	pub budget_tracking: Option<ServiceSettingsLayer>,
	#[serde(default)]
	pub judge_score: Option<ServiceSettingsLayer>,
}

impl ServicesConfigLayer {
	pub fn merge(&mut self, other: ServicesConfigLayer) {
		for (base, incoming) in [
			(&mut self.deployment_monitor, other.deployment_monitor),
			(&mut self.budget_tracking, other.budget_tracking),
			(&mut self.judge_score, other.judge_score),
		] {
			match (base.as_mut(), incoming) {
				(Some(existing), Some(incoming)) => existing.merge(incoming),
				(None, Some(incoming)) => *base = Some(incoming),
				(_, None) => {}
			}
		}
	}

	pub fn finalize(self) -> ServicesConfig {
		ServicesConfig {
			deployment_monitor: self
				.deployment_monitor
				.unwrap_or_default()
				.finalize(ServiceSettings::deployment_monitor()),
			budget_tracking: self
				.budget_tracking
				.unwrap_or_default()
				.finalize(ServiceSettings::budget_tracking()),
			judge_score: self
				.judge_score
				.unwrap_or_default()
				.finalize(ServiceSettings::judge_score()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_defaults_per_service() {
		let config = ServicesConfigLayer::default().finalize();
		assert_eq!(config.deployment_monitor.interval, "*/15 * * * *");
		assert_eq!(config.deployment_monitor.timeout_ms, 30_000);
		assert_eq!(config.deployment_monitor.retries, 2);
		assert_eq!(config.budget_tracking.interval, "*/15 * * * *");
		assert_eq!(config.budget_tracking.timeout_ms, 120_000);
		assert_eq!(config.budget_tracking.retries, 3);
		assert_eq!(config.judge_score.interval, "*/10 * * * *");
		assert_eq!(config.judge_score.timeout_ms, 60_000);
		assert_eq!(config.judge_score.retries, 3);
		assert!(config.judge_score.enabled);
	}

	#[test]
	fn test_deserialize_nested_tables() {
		let layer: ServicesConfigLayer = toml::from_str(
			r#"
[judge_score]
enabled = false
interval = "0 */5 * * * *"
"#,
		)
		.unwrap();
		let config = layer.finalize();
		assert!(!config.judge_score.enabled);
		assert_eq!(config.judge_score.interval, "0 */5 * * * *");
		assert_eq!(config.judge_score.retries, 3);
		assert!(config.deployment_monitor.enabled);
	}

	fn layer_strategy() -> impl Strategy<Value = ServiceSettingsLayer> {
		(
			proptest::option::of(any::<bool>()),
			proptest::option::of("[*/0-9 ]{1,16}"),
			proptest::option::of(1u64..120_000),
			proptest::option::of(0u32..10),
		)
			.prop_map(|(enabled, interval, timeout_ms, retries)| ServiceSettingsLayer {
				enabled,
				interval,
				timeout_ms,
				retries,
			})
	}

	proptest! {
		#[test]
		fn merge_prefers_overlay_fields_that_are_set(
			base in layer_strategy(),
			overlay in layer_strategy(),
		) {
			let mut merged = base.clone();
			merged.merge(overlay.clone());

			prop_assert_eq!(merged.enabled, overlay.enabled.or(base.enabled));
			prop_assert_eq!(merged.interval, overlay.interval.or(base.interval));
			prop_assert_eq!(merged.timeout_ms, overlay.timeout_ms.or(base.timeout_ms));
			prop_assert_eq!(merged.retries, overlay.retries.or(base.retries));
		}
	}
}
