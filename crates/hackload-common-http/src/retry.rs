// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff for transient HTTP failures.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Classifies an error as transient (worth retrying) or permanent.
pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() || self.is_request() {
			return true;
		}
		self.status().is_some_and(|status| status.is_server_error())
	}
}

/// Backoff policy for [`retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
	/// Total number of attempts, including the first one.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	/// Scale each delay by a random factor in `[0.5, 1.0)`.
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(10),
			backoff_factor: 2.0,
			jitter: false,
		}
	}
}

impl RetryConfig {
	/// Policy allowing `retries` retries after the first attempt.
	pub fn with_retries(retries: u32) -> Self {
		Self {
			max_attempts: retries.saturating_add(1),
			..Default::default()
		}
	}
}

/// Delay before retry number `retry_index` (0 for the first retry).
pub fn backoff_delay(config: &RetryConfig, retry_index: u32) -> Duration {
	let exponent = retry_index.min(i32::MAX as u32) as i32;
	let base_ms = config.base_delay.as_millis() as f64;
	let raw_ms = base_ms * config.backoff_factor.powi(exponent);
	let capped_ms = raw_ms.min(config.max_delay.as_millis() as f64);

	let delay_ms = if config.jitter {
		capped_ms * (0.5 + fastrand::f64() * 0.5)
	} else {
		capped_ms
	};

	Duration::from_millis(delay_ms as u64)
}

/// Runs `operation` until it succeeds, returns a non-retryable error, or the
/// attempt budget in `config` is spent.
pub async fn retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + Display,
{
	let max_attempts = config.max_attempts.max(1);
	let mut attempt = 0u32;

	loop {
		attempt += 1;
		match operation().await {
			Ok(value) => {
				if attempt > 1 {
					debug!(attempt, "request succeeded after retry");
				}
				return Ok(value);
			}
			Err(e) => {
				if !e.is_retryable() {
					debug!(attempt, error = %e, "non-retryable error");
					return Err(e);
				}
				if attempt >= max_attempts {
					warn!(attempt, max_attempts, error = %e, "retry budget exhausted");
					return Err(e);
				}

				let delay = backoff_delay(config, attempt - 1);
				warn!(
					attempt,
					max_attempts,
					delay_ms = delay.as_millis() as u64,
					error = %e,
					"request failed, retrying"
				);
				tokio::time::sleep(delay).await;
			}
		}
	}
}
