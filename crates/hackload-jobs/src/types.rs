// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// How and when a registered service runs. Fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
	pub service_name: String,
	pub cron_expression: String,
	pub timeout_ms: u64,
	pub max_retries: u32,
	pub enabled: bool,
}

impl ServiceConfig {
	pub fn new(service_name: impl Into<String>, cron_expression: impl Into<String>) -> Self {
		Self {
			service_name: service_name.into(),
			cron_expression: cron_expression.into(),
			timeout_ms: DEFAULT_TIMEOUT_MS,
			max_retries: DEFAULT_MAX_RETRIES,
			enabled: true,
		}
	}

	pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}

	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;
		self
	}

	pub fn with_enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;
		self
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

/// What a successful run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
	pub teams_total: usize,
	pub teams_processed: usize,
	pub teams_failed: usize,
	pub updates_sent: usize,
}
