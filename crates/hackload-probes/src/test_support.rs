// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use hackload_registry::{BulkUpdateResult, CriteriaUpdate, RegistryClient, RegistryError, Team};
use std::collections::HashMap;

/// Registry serving canned environment data keyed by team nickname.
#[derive(Default)]
pub struct EnvRegistry {
	env: HashMap<String, HashMap<String, String>>,
	failing: Option<String>,
}

impl EnvRegistry {
	pub fn with(mut self, team: &str, key: &str, value: &str) -> Self {
		self
			.env
			.entry(team.to_string())
			.or_default()
			.insert(key.to_string(), value.to_string());
		self
	}

	pub fn failing_for(mut self, team: &str) -> Self {
		self.failing = Some(team.to_string());
		self
	}
}

#[async_trait]
impl RegistryClient for EnvRegistry {
	async fn get_teams(&self) -> hackload_registry::Result<Vec<Team>> {
		Ok(Vec::new())
	}

	async fn get_team_environment_data(
		&self,
		team: &Team,
	) -> hackload_registry::Result<HashMap<String, String>> {
		if self.failing.as_deref() == Some(team.nickname.as_str()) {
			return Err(RegistryError::InvalidResponse("environment unavailable".to_string()));
		}
		Ok(self.env.get(&team.nickname).cloned().unwrap_or_default())
	}

	async fn bulk_update_criteria(
		&self,
		_updates: &[CriteriaUpdate],
	) -> hackload_registry::Result<BulkUpdateResult> {
		Ok(BulkUpdateResult::default())
	}
}

pub fn team(nickname: &str) -> Team {
	Team {
		id: format!("id-{nickname}"),
		nickname: nickname.to_string(),
		hackathon_id: "hack-1".to_string(),
		name: nickname.to_string(),
	}
}
