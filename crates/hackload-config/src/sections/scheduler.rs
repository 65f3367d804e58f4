// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheduler configuration section.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
	/// IANA timezone name cron expressions are evaluated in.
	pub timezone: String,
	pub shutdown_grace_ms: u64,
	/// Teams checked concurrently within one run.
	pub team_concurrency: usize,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			timezone: "UTC".to_string(),
			shutdown_grace_ms: 1_000,
			team_concurrency: 1,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerConfigLayer {
	#[serde(default)]
	pub timezone: Option<String>,
	#[serde(default)]
	pub shutdown_grace_ms: Option<u64>,
	#[serde(default)]
	pub team_concurrency: Option<usize>,
}

impl SchedulerConfigLayer {
	pub fn merge(&mut self, other: SchedulerConfigLayer) {
		if other.timezone.is_some() {
			self.timezone = other.timezone;
		}
		if other.shutdown_grace_ms.is_some() {
			self.shutdown_grace_ms = other.shutdown_grace_ms;
		}
		if other.team_concurrency.is_some() {
			self.team_concurrency = other.team_concurrency;
		}
	}

	pub fn finalize(self) -> SchedulerConfig {
		let defaults = SchedulerConfig::default();
		SchedulerConfig {
			timezone: self.timezone.unwrap_or(defaults.timezone),
			shutdown_grace_ms: self.shutdown_grace_ms.unwrap_or(defaults.shutdown_grace_ms),
			team_concurrency: self.team_concurrency.unwrap_or(defaults.team_concurrency),
		}
	}
}
