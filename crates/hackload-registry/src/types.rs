// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque per-team metrics attached to a criteria update.
pub type MetricsData = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
	pub id: String,
	pub nickname: String,
	pub hackathon_id: String,
	pub name: String,
}

/// The scored dimension a job evaluates for a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriteriaType {
	CodeRepo,
	DeployedSolution,
	EventSearch,
	ArchiveSearch,
	AuthPerformance,
	TicketBooking,
	BudgetTracking,
	JudgeScore,
}

impl CriteriaType {
	pub fn as_str(&self) -> &'static str {
		match self {
			CriteriaType::CodeRepo => "CODE_REPO",
			CriteriaType::DeployedSolution => "DEPLOYED_SOLUTION",
			CriteriaType::EventSearch => "EVENT_SEARCH",
			CriteriaType::ArchiveSearch => "ARCHIVE_SEARCH",
			CriteriaType::AuthPerformance => "AUTH_PERFORMANCE",
			CriteriaType::TicketBooking => "TICKET_BOOKING",
			CriteriaType::BudgetTracking => "BUDGET_TRACKING",
			CriteriaType::JudgeScore => "JUDGE_SCORE",
		}
	}
}

impl fmt::Display for CriteriaType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriteriaStatus {
	Passed,
	Failed,
	NoData,
}

impl CriteriaStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			CriteriaStatus::Passed => "PASSED",
			CriteriaStatus::Failed => "FAILED",
			CriteriaStatus::NoData => "NO_DATA",
		}
	}
}

impl fmt::Display for CriteriaStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One scored criteria for one team, produced during a job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaUpdate {
	pub team_slug: String,
	pub hackathon_id: String,
	pub criteria_type: CriteriaType,
	pub status: CriteriaStatus,
	pub score: f64,
	pub metrics: MetricsData,
	pub updated_by: String,
}

/// Outcome of pushing a batch of criteria updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUpdateResult {
	pub processed: usize,
	pub failed: usize,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub errors: Option<Vec<String>>,
}

impl BulkUpdateResult {
	pub fn is_success(&self) -> bool {
		self.failed == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_criteria_type_wire_format() {
		let value = serde_json::to_value(CriteriaType::DeployedSolution).unwrap();
		assert_eq!(value, json!("DEPLOYED_SOLUTION"));

		let parsed: CriteriaType = serde_json::from_value(json!("JUDGE_SCORE")).unwrap();
		assert_eq!(parsed, CriteriaType::JudgeScore);
	}

	#[test]
	fn test_criteria_type_as_str_matches_serde() {
		for criteria in [
			CriteriaType::CodeRepo,
			CriteriaType::DeployedSolution,
			CriteriaType::EventSearch,
			CriteriaType::ArchiveSearch,
			CriteriaType::AuthPerformance,
			CriteriaType::TicketBooking,
			CriteriaType::BudgetTracking,
			CriteriaType::JudgeScore,
		] {
			assert_eq!(serde_json::to_value(criteria).unwrap(), json!(criteria.as_str()));
		}
	}

	#[test]
	fn test_criteria_status_wire_format() {
		assert_eq!(serde_json::to_value(CriteriaStatus::NoData).unwrap(), json!("NO_DATA"));
		assert_eq!(CriteriaStatus::Passed.to_string(), "PASSED");
	}

	#[test]
	fn test_team_deserializes_camel_case() {
		let team: Team = serde_json::from_value(json!({
			"id": "t-1",
			"nickname": "rustaceans",
			"hackathonId": "h-1",
			"name": "Rustaceans"
		}))
		.unwrap();
		assert_eq!(team.hackathon_id, "h-1");
		assert_eq!(team.nickname, "rustaceans");
	}

	#[test]
	fn test_criteria_update_serializes_camel_case() {
		let update = CriteriaUpdate {
			team_slug: "rustaceans".to_string(),
			hackathon_id: "h-1".to_string(),
			criteria_type: CriteriaType::CodeRepo,
			status: CriteriaStatus::Passed,
			score: 100.0,
			metrics: MetricsData::new(),
			updated_by: "git-monitor-service".to_string(),
		};
		let value = serde_json::to_value(&update).unwrap();
		assert_eq!(value["teamSlug"], json!("rustaceans"));
		assert_eq!(value["criteriaType"], json!("CODE_REPO"));
		assert_eq!(value["updatedBy"], json!("git-monitor-service"));
	}

	#[test]
	fn test_bulk_update_result_success() {
		let ok = BulkUpdateResult {
			processed: 3,
			failed: 0,
			errors: None,
		};
		assert!(ok.is_success());

		let partial = BulkUpdateResult {
			processed: 2,
			failed: 1,
			errors: Some(vec!["team/CODE_REPO: boom".to_string()]),
		};
		assert!(!partial.is_success());
	}
}
