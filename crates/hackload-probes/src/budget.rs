// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scores teams on infrastructure spend relative to the rest of the roster.
//!
//! The cheapest team of a run earns [`MAX_BUDGET_SCORE`], the most expensive
//! [`MIN_BUDGET_SCORE`], everyone else is interpolated linearly between them.

use async_trait::async_trait;
use hackload_jobs::{CheckError, CriteriaCheck};
use hackload_registry::{CriteriaStatus, CriteriaType, MetricsData, RegistryClient, Team};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::judge_score::parse_loose_number;

pub const SERVICE_NAME: &str = "budget-tracking-service";

pub const MONEY_SPEND_KEY: &str = "MONEY_SPEND";

pub const CURRENCY: &str = "KZT";

pub const MAX_BUDGET_SCORE: f64 = 30.0;
pub const MIN_BUDGET_SCORE: f64 = 5.0;
/// Score when a team has spending data but the run's range is unknown.
const UNRANKED_BUDGET_SCORE: f64 = 15.0;

/// Parses a raw spend. Currency symbols and separators are dropped;
/// unparseable values count as zero spend.
pub fn parse_money_spend(raw: &str) -> f64 {
	parse_loose_number(raw).unwrap_or(0.0)
}

/// Scores `spent` within the run's `[min, max]` spend range.
pub fn budget_score(spent: f64, min: f64, max: f64) -> f64 {
	if min == max {
		return MAX_BUDGET_SCORE;
	}
	let position = (spent - min) / (max - min);
	let score = MAX_BUDGET_SCORE - position * (MAX_BUDGET_SCORE - MIN_BUDGET_SCORE);
	score.clamp(MIN_BUDGET_SCORE, MAX_BUDGET_SCORE).round()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BudgetTracking;

impl BudgetTracking {
	pub fn new() -> Self {
		Self
	}
}

fn has_spending_data(metrics: &MetricsData) -> bool {
	metrics
		.get("hasSpendingData")
		.and_then(Value::as_bool)
		.unwrap_or(false)
}

fn total_spent(metrics: &MetricsData) -> f64 {
	metrics
		.get("totalSpent")
		.and_then(Value::as_f64)
		.unwrap_or(0.0)
}

#[async_trait]
impl CriteriaCheck for BudgetTracking {
	fn service_name(&self) -> &str {
		SERVICE_NAME
	}

	fn criteria_type(&self) -> CriteriaType {
		CriteriaType::BudgetTracking
	}

	async fn collect_metrics(
		&self,
		team: &Team,
		registry: &dyn RegistryClient,
	) -> Result<MetricsData, CheckError> {
		let env = registry.get_team_environment_data(team).await?;

		let mut metrics = MetricsData::new();
		metrics.insert("currency".to_string(), json!(CURRENCY));
		match env.get(MONEY_SPEND_KEY).filter(|v| !v.is_empty()) {
			Some(raw) => {
				let spent = parse_loose_number(raw).unwrap_or_else(|| {
					warn!(team = %team.nickname, raw = %raw, "unparseable spend, counting as zero");
					0.0
				});
				info!(team = %team.nickname, spent, currency = CURRENCY, "team spend");
				metrics.insert("totalSpent".to_string(), json!(spent));
				metrics.insert("hasSpendingData".to_string(), json!(true));
				metrics.insert("rawValue".to_string(), json!(raw));
			}
			None => {
				debug!(team = %team.nickname, "no spend reported");
				metrics.insert("totalSpent".to_string(), json!(0.0));
				metrics.insert("hasSpendingData".to_string(), json!(false));
			}
		}
		Ok(metrics)
	}

	/// Records the run's spend range on every team that reported spend.
	fn prepare_round(&self, round: &mut [&mut MetricsData]) {
		let spends = round
			.iter()
			.filter(|m| has_spending_data(m))
			.map(|m| total_spent(m));
		let Some((min, max)) = spends.fold(None, |range: Option<(f64, f64)>, spent| {
			Some(match range {
				Some((min, max)) => (min.min(spent), max.max(spent)),
				None => (spent, spent),
			})
		}) else {
			return;
		};

		debug!(min, max, "spend range for run");
		for metrics in round.iter_mut().filter(|m| has_spending_data(m)) {
			metrics.insert("minSpent".to_string(), json!(min));
			metrics.insert("maxSpent".to_string(), json!(max));
		}
	}

	fn evaluate_status(&self, metrics: &MetricsData) -> CriteriaStatus {
		if has_spending_data(metrics) {
			CriteriaStatus::Passed
		} else {
			CriteriaStatus::NoData
		}
	}

	fn calculate_score(&self, status: CriteriaStatus, metrics: &MetricsData) -> f64 {
		if status == CriteriaStatus::NoData {
			return 0.0;
		}
		let range = metrics
			.get("minSpent")
			.and_then(Value::as_f64)
			.zip(metrics.get("maxSpent").and_then(Value::as_f64));
		match range {
			Some((min, max)) => budget_score(total_spent(metrics), min, max),
			None => UNRANKED_BUDGET_SCORE,
		}
	}
}
