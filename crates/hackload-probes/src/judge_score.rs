// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Imports the jury score teams publish through their registry environment.

use async_trait::async_trait;
use hackload_jobs::{CheckError, CriteriaCheck};
use hackload_registry::{CriteriaStatus, CriteriaType, MetricsData, RegistryClient, Team};
use serde_json::{json, Value};
use tracing::{debug, info};

pub const SERVICE_NAME: &str = "judge-score-service";

/// Environment key holding the score. The misspelling is what the registry uses.
pub const JUDGE_SCORE_KEY: &str = "JUDJE_SCORE";

const MAX_JUDGE_SCORE: f64 = 10.0;

/// Reads the longest numeric prefix of `raw` once everything but digits, `.`
/// and `-` is discarded.
pub(crate) fn parse_loose_number(raw: &str) -> Option<f64> {
	let cleaned: String = raw
		.chars()
		.filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
		.collect();

	(1..=cleaned.len())
		.rev()
		.find_map(|end| cleaned[..end].parse::<f64>().ok())
		.filter(|v| v.is_finite())
}

/// Parses a raw judge score.
///
/// Everything but digits, `.` and `-` is discarded and the longest numeric
/// prefix of the rest is read. Missing, unparseable and zero values yield
/// `None`; anything else is clamped to `0..=10` and rounded.
pub fn parse_judge_score(raw: &str) -> Option<u8> {
	let value = parse_loose_number(raw).unwrap_or(0.0);
	if value == 0.0 {
		return None;
	}
	Some(value.clamp(0.0, MAX_JUDGE_SCORE).round() as u8)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JudgeScore;

impl JudgeScore {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl CriteriaCheck for JudgeScore {
	fn service_name(&self) -> &str {
		SERVICE_NAME
	}

	fn criteria_type(&self) -> CriteriaType {
		CriteriaType::JudgeScore
	}

	async fn collect_metrics(
		&self,
		team: &Team,
		registry: &dyn RegistryClient,
	) -> Result<MetricsData, CheckError> {
		let env = registry.get_team_environment_data(team).await?;

		let mut metrics = MetricsData::new();
		let raw = env.get(JUDGE_SCORE_KEY).filter(|v| !v.is_empty());
		match raw.and_then(|r| parse_judge_score(r)) {
			Some(score) => {
				info!(team = %team.nickname, score, "judge score");
				metrics.insert("judgeScore".to_string(), json!(score));
				metrics.insert("hasJudgeScore".to_string(), json!(true));
				metrics.insert("rawValue".to_string(), json!(raw));
			}
			None => {
				debug!(team = %team.nickname, raw = ?raw, "no judge score");
				metrics.insert("judgeScore".to_string(), Value::Null);
				metrics.insert("hasJudgeScore".to_string(), json!(false));
			}
		}
		Ok(metrics)
	}

	fn evaluate_status(&self, metrics: &MetricsData) -> CriteriaStatus {
		match metrics.get("hasJudgeScore").and_then(Value::as_bool) {
			Some(true) => CriteriaStatus::Passed,
			_ => CriteriaStatus::NoData,
		}
	}

	fn calculate_score(&self, status: CriteriaStatus, metrics: &MetricsData) -> f64 {
		if status == CriteriaStatus::NoData {
			return 0.0;
		}
		metrics
			.get("judgeScore")
			.and_then(Value::as_f64)
			.unwrap_or(0.0)
	}
}
