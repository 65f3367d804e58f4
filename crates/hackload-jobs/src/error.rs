// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use hackload_registry::RegistryError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JobError>;

/// Failure of a whole job run, or of a scheduler operation.
#[derive(Debug, Error)]
pub enum JobError {
	#[error("registry error: {0}")]
	Registry(#[from] RegistryError),

	#[error("job timed out after {timeout_ms}ms")]
	Timeout { timeout_ms: u64 },

	#[error("bulk update rejected: {failed} of {total} updates failed")]
	BulkUpdateRejected { failed: usize, total: usize },

	#[error("invalid cron expression '{expression}': {message}")]
	InvalidCronExpression { expression: String, message: String },

	#[error("invalid timezone: {0}")]
	InvalidTimezone(String),

	#[error("service not found: {0}")]
	NotFound(String),

	#[error("service already running: {0}")]
	AlreadyRunning(String),

	#[error("job failed: {0}")]
	Failed(String),
}

/// Failure to collect metrics for a single team. Never escapes a run.
#[derive(Debug, Error)]
pub enum CheckError {
	#[error("registry error: {0}")]
	Registry(#[from] RegistryError),

	#[error("probe failed: {0}")]
	Probe(String),
}

#[derive(Debug, Error)]
pub enum MetricsError {
	#[error("prometheus error: {0}")]
	Prometheus(#[from] prometheus::Error),

	#[error("exposition is not valid UTF-8: {0}")]
	Encoding(#[from] std::string::FromUtf8Error),
}
