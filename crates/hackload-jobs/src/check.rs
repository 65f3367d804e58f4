// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-team criteria checks and the shared run that fans them out over the
//! team roster.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use hackload_registry::{
	CriteriaStatus, CriteriaType, CriteriaUpdate, MetricsData, RegistryClient, Team,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{CheckError, JobError, Result};
use crate::health::{HealthTracker, ServiceHealth, ServiceHealthState};
use crate::job::Job;
use crate::types::RunSummary;

/// Scores one criteria for one team at a time.
///
/// Only `service_name`, `criteria_type` and `collect_metrics` are required.
#[async_trait]
pub trait CriteriaCheck: Send + Sync {
	fn service_name(&self) -> &str;

	fn criteria_type(&self) -> CriteriaType;

	/// Gather metrics for `team`. An error skips the team for this run only.
	async fn collect_metrics(
		&self,
		team: &Team,
		registry: &dyn RegistryClient,
	) -> std::result::Result<MetricsData, CheckError>;

	fn evaluate_status(&self, _metrics: &MetricsData) -> CriteriaStatus {
		CriteriaStatus::NoData
	}

	fn calculate_score(&self, status: CriteriaStatus, _metrics: &MetricsData) -> f64 {
		match status {
			CriteriaStatus::Passed => 100.0,
			CriteriaStatus::Failed | CriteriaStatus::NoData => 0.0,
		}
	}

	/// Sees every collected team's metrics once per run, before any is scored.
	/// Checks that score teams relative to each other annotate them here.
	fn prepare_round(&self, _round: &mut [&mut MetricsData]) {}

	/// Hook for a failed run.
	fn handle_error(&self, error: &JobError) {
		error!(service = %self.service_name(), error = %error, "service run failed");
	}
}

/// Adapts a [`CriteriaCheck`] into a schedulable [`Job`].
pub struct CriteriaJob<C> {
	check: C,
	registry: Arc<dyn RegistryClient>,
	health: HealthTracker,
	team_concurrency: usize,
}

impl<C: CriteriaCheck> CriteriaJob<C> {
	pub fn new(check: C, registry: Arc<dyn RegistryClient>) -> Self {
		let health = HealthTracker::new(check.service_name());
		Self {
			check,
			registry,
			health,
			team_concurrency: 1,
		}
	}

	/// Collect metrics for up to `limit` teams at once. Results keep roster order.
	pub fn with_team_concurrency(mut self, limit: usize) -> Self {
		self.team_concurrency = limit.max(1);
		self
	}

	pub fn check(&self) -> &C {
		&self.check
	}

	pub fn health_state(&self) -> ServiceHealthState {
		self.health.snapshot()
	}

	#[instrument(skip(self), fields(service = %self.check.service_name()))]
	pub async fn run_once(&self) -> Result<RunSummary> {
		self.health.record_run_started(Utc::now());

		let teams = match self.registry.get_teams().await {
			Ok(teams) => teams,
			Err(e) => return Err(self.fail(e.into())),
		};
		info!(teams = teams.len(), "processing teams");

		let (updates, teams_failed) = self.collect_updates(&teams).await;
		let updates_sent = updates.len();

		if updates.is_empty() {
			debug!("no criteria updates produced");
		} else {
			let result = match self.registry.bulk_update_criteria(&updates).await {
				Ok(result) => result,
				Err(e) => return Err(self.fail(e.into())),
			};
			if result.processed == 0 && result.failed > 0 {
				return Err(self.fail(JobError::BulkUpdateRejected {
					failed: result.failed,
					total: updates_sent,
				}));
			}
			if result.failed > 0 {
				warn!(
					processed = result.processed,
					failed = result.failed,
					errors = ?result.errors,
					"some criteria updates were rejected"
				);
			}
		}

		self.health.record_success(Utc::now());

		let summary = RunSummary {
			teams_total: teams.len(),
			teams_processed: updates_sent,
			teams_failed,
			updates_sent,
		};
		info!(
			teams_processed = summary.teams_processed,
			teams_failed = summary.teams_failed,
			"run completed"
		);
		Ok(summary)
	}

	async fn collect_updates(&self, teams: &[Team]) -> (Vec<CriteriaUpdate>, usize) {
		let check = &self.check;
		let registry = self.registry.as_ref();
		let results: Vec<(Team, _)> = stream::iter(teams.iter().cloned())
			.map(|team| async move {
				let result = check.collect_metrics(&team, registry).await;
				(team, result)
			})
			.buffered(self.team_concurrency)
			.collect()
			.await;

		let mut collected = Vec::with_capacity(results.len());
		let mut failed = 0;
		for (team, result) in results {
			match result {
				Ok(metrics) => collected.push((team, metrics)),
				Err(e) => {
					failed += 1;
					warn!(team = %team.nickname, error = %e, "failed to collect metrics for team");
				}
			}
		}

		let mut round: Vec<&mut MetricsData> = collected.iter_mut().map(|(_, m)| m).collect();
		self.check.prepare_round(&mut round);

		let updates = collected
			.into_iter()
			.map(|(team, metrics)| self.to_update(&team, metrics))
			.collect();
		(updates, failed)
	}

	fn to_update(&self, team: &Team, metrics: MetricsData) -> CriteriaUpdate {
		let status = self.check.evaluate_status(&metrics);
		let score = self.check.calculate_score(status, &metrics);
		CriteriaUpdate {
			team_slug: team.nickname.clone(),
			hackathon_id: team.hackathon_id.clone(),
			criteria_type: self.check.criteria_type(),
			status,
			score,
			metrics,
			updated_by: self.check.service_name().to_string(),
		}
	}

	fn fail(&self, error: JobError) -> JobError {
		self.health.record_failure();
		self.check.handle_error(&error);
		error
	}
}

#[async_trait]
impl<C: CriteriaCheck + 'static> Job for CriteriaJob<C> {
	fn service_name(&self) -> &str {
		self.check.service_name()
	}

	async fn run(&self) -> Result<RunSummary> {
		self.run_once().await
	}

	fn health(&self) -> ServiceHealth {
		self.health.health()
	}

	fn record_abandoned_run(&self, error: &JobError) {
		self.health.record_failure();
		self.check.handle_error(error);
	}
}
