// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::{JobError, Result};
use crate::health::ServiceHealth;
use crate::types::RunSummary;

/// A unit of scheduled work.
#[async_trait]
pub trait Job: Send + Sync {
	fn service_name(&self) -> &str;

	/// One complete run. Called once per attempt by the executor.
	async fn run(&self) -> Result<RunSummary>;

	fn health(&self) -> ServiceHealth;

	/// Called when the executor abandons a run (e.g. on timeout) so the job can
	/// account for it; the dropped future never gets the chance to.
	fn record_abandoned_run(&self, _error: &JobError) {}
}
