// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hub API connection settings.

use serde::Deserialize;

const REDACTED: &str = "[REDACTED]";

pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_API_RETRIES: u32 = 3;

/// Hub API configuration (runtime, fully resolved).
///
/// `base_url` and `api_key` have no defaults; an empty value is rejected
/// during validation.
#[derive(Clone, PartialEq)]
pub struct ApiConfig {
	pub base_url: String,
	pub api_key: String,
	pub timeout_ms: u64,
	pub retries: u32,
}

impl std::fmt::Debug for ApiConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ApiConfig")
			.field("base_url", &self.base_url)
			.field("api_key", &REDACTED)
			.field("timeout_ms", &self.timeout_ms)
			.field("retries", &self.retries)
			.finish()
	}
}

/// Hub API configuration layer (partial, for merging).
#[derive(Clone, Default, Deserialize)]
pub struct ApiConfigLayer {
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub api_key: Option<String>,
	#[serde(default)]
	pub timeout_ms: Option<u64>,
	#[serde(default)]
	pub retries: Option<u32>,
}

impl std::fmt::Debug for ApiConfigLayer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ApiConfigLayer")
			.field("base_url", &self.base_url)
			.field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
			.field("timeout_ms", &self.timeout_ms)
			.field("retries", &self.retries)
			.finish()
	}
}

impl ApiConfigLayer {
	pub fn merge(&mut self, other: ApiConfigLayer) {
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.api_key.is_some() {
			self.api_key = other.api_key;
		}
		if other.timeout_ms.is_some() {
			self.timeout_ms = other.timeout_ms;
		}
		if other.retries.is_some() {
			self.retries = other.retries;
		}
	}

	pub fn finalize(self) -> ApiConfig {
		ApiConfig {
			base_url: self
				.base_url
				.map(|url| url.trim_end_matches('/').to_string())
				.unwrap_or_default(),
			api_key: self.api_key.unwrap_or_default(),
			timeout_ms: self.timeout_ms.unwrap_or(DEFAULT_API_TIMEOUT_MS),
			retries: self.retries.unwrap_or(DEFAULT_API_RETRIES),
		}
	}
}
