// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{BulkUpdateResult, CriteriaUpdate, Team};

/// Operations the job engine needs from the team registry.
///
/// Implementations are shared between every registered job, so they must be
/// safe to call concurrently and must not rely on caller-side mutable state.
#[async_trait]
pub trait RegistryClient: Send + Sync {
	/// Fetch the roster of approved teams.
	async fn get_teams(&self) -> Result<Vec<Team>>;

	/// Fetch the key/value environment a team registered (repository URL,
	/// application URL, judge score, ...).
	async fn get_team_environment_data(&self, team: &Team) -> Result<HashMap<String, String>>;

	/// Push a batch of criteria updates.
	///
	/// An empty batch must return immediately without contacting the registry.
	async fn bulk_update_criteria(&self, updates: &[CriteriaUpdate]) -> Result<BulkUpdateResult>;
}
