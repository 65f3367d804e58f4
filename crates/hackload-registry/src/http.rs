// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! reqwest implementation of [`RegistryClient`] against the Hub service API.

use async_trait::async_trait;
use hackload_common_http::RetryConfig;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::client::RegistryClient;
use crate::error::{RegistryError, Result};
use crate::types::{BulkUpdateResult, CriteriaStatus, CriteriaUpdate, MetricsData, Team};

const API_KEY_HEADER: &str = "X-API-Key";
const APPROVED_STATUS: &str = "APPROVED";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteTeam {
	id: String,
	nickname: String,
	hackathon_id: String,
	name: String,
	#[serde(default)]
	status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamsResponse {
	#[serde(default)]
	teams: Vec<RemoteTeam>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentEntry {
	key: String,
	value: String,
}

#[derive(Debug, Default, Deserialize)]
struct TeamEnvironment {
	#[serde(default)]
	environment: Vec<EnvironmentEntry>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentResponse {
	#[serde(default)]
	team: Option<TeamEnvironment>,
	#[serde(default)]
	teams: Vec<TeamEnvironment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CriteriaUpdateBody<'a> {
	status: CriteriaStatus,
	score: f64,
	metrics: &'a MetricsData,
	updated_by: &'a str,
}

#[derive(Debug, Deserialize)]
struct CriteriaUpdateResponse {
	#[serde(default)]
	action: Option<String>,
}

struct HubApiClientInner {
	base_url: String,
	api_key: String,
	http: Client,
	retry_config: RetryConfig,
}

/// HTTP client for the Hub team registry.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct HubApiClient {
	inner: Arc<HubApiClientInner>,
}

impl std::fmt::Debug for HubApiClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HubApiClient")
			.field("base_url", &self.inner.base_url)
			.field("api_key", &"[REDACTED]")
			.field("retry_config", &self.inner.retry_config)
			.finish()
	}
}

impl HubApiClient {
	pub fn builder() -> HubApiClientBuilder {
		HubApiClientBuilder::default()
	}

	pub fn base_url(&self) -> &str {
		&self.inner.base_url
	}

	fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
		self
			.inner
			.http
			.request(method, format!("{}{}", self.inner.base_url, path))
			.header(API_KEY_HEADER, &self.inner.api_key)
	}

	/// Sends the request built by `build`, retrying transient failures, and
	/// returns the first successful response.
	async fn send<F>(&self, build: F) -> Result<reqwest::Response>
	where
		F: Fn() -> RequestBuilder,
	{
		let build = &build;
		hackload_common_http::retry(&self.inner.retry_config, || async move {
			let response = build().send().await.map_err(RegistryError::Network)?;
			let status = response.status();
			if status.is_success() {
				return Ok(response);
			}
			let message = response.text().await.unwrap_or_default();
			Err(RegistryError::Status { status, message })
		})
		.await
	}

	async fn execute<T, F>(&self, build: F) -> Result<T>
	where
		T: DeserializeOwned,
		F: Fn() -> RequestBuilder,
	{
		self
			.send(build)
			.await?
			.json::<T>()
			.await
			.map_err(|e| RegistryError::InvalidResponse(e.to_string()))
	}

	async fn fetch_teams(&self, path: &str) -> Result<Vec<Team>> {
		let body: TeamsResponse = self
			.execute(|| self.request(reqwest::Method::GET, path))
			.await?;

		let total = body.teams.len();
		let teams: Vec<Team> = body
			.teams
			.into_iter()
			.filter(|t| t.status.as_deref() == Some(APPROVED_STATUS))
			.map(|t| Team {
				id: t.id,
				nickname: t.nickname,
				hackathon_id: t.hackathon_id,
				name: t.name,
			})
			.collect();

		debug!(path, total, approved = teams.len(), "fetched teams");
		Ok(teams)
	}

	async fn update_one(&self, update: &CriteriaUpdate) -> Result<Option<String>> {
		let path = format!(
			"/api/service/team-criteria/{}/{}",
			update.team_slug,
			update.criteria_type.as_str()
		);
		let body = CriteriaUpdateBody {
			status: update.status,
			score: update.score,
			metrics: &update.metrics,
			updated_by: &update.updated_by,
		};

		let response = self
			.send(|| self.request(reqwest::Method::PUT, &path).json(&body))
			.await?;

		// The body is informational only; an empty acknowledgement still counts.
		let action = response
			.json::<CriteriaUpdateResponse>()
			.await
			.ok()
			.and_then(|r| r.action);
		Ok(action)
	}
}

#[async_trait]
impl RegistryClient for HubApiClient {
	#[instrument(skip(self))]
	async fn get_teams(&self) -> Result<Vec<Team>> {
		match self.fetch_teams("/api/service/teams").await {
			Err(RegistryError::Status { status, .. }) if status == StatusCode::NOT_FOUND => {
				warn!("service teams endpoint not found, falling back to public teams endpoint");
				self.fetch_teams("/api/teams").await
			}
			other => other,
		}
	}

	#[instrument(skip(self, team), fields(team = %team.nickname))]
	async fn get_team_environment_data(&self, team: &Team) -> Result<HashMap<String, String>> {
		let nickname = team.nickname.as_str();
		let body: EnvironmentResponse = self
			.execute(|| {
				self
					.request(reqwest::Method::GET, "/api/service/teams/environment")
					.query(&[("team", nickname)])
			})
			.await?;

		let environment = body
			.team
			.or_else(|| body.teams.into_iter().next())
			.unwrap_or_default()
			.environment;

		Ok(environment.into_iter().map(|e| (e.key, e.value)).collect())
	}

	#[instrument(skip(self, updates), fields(count = updates.len()))]
	async fn bulk_update_criteria(&self, updates: &[CriteriaUpdate]) -> Result<BulkUpdateResult> {
		if updates.is_empty() {
			debug!("no criteria updates to send");
			return Ok(BulkUpdateResult::default());
		}

		let mut result = BulkUpdateResult::default();
		let mut errors = Vec::new();

		for update in updates {
			match self.update_one(update).await {
				Ok(action) => {
					result.processed += 1;
					debug!(
						team = %update.team_slug,
						criteria = %update.criteria_type,
						action = action.as_deref().unwrap_or("updated"),
						"criteria updated"
					);
				}
				Err(e) => {
					result.failed += 1;
					warn!(
						team = %update.team_slug,
						criteria = %update.criteria_type,
						error = %e,
						"criteria update failed"
					);
					errors.push(format!("{}/{}: {}", update.team_slug, update.criteria_type, e));
				}
			}
		}

		if !errors.is_empty() {
			result.errors = Some(errors);
		}

		info!(
			processed = result.processed,
			failed = result.failed,
			"bulk criteria update finished"
		);
		Ok(result)
	}
}

/// Builder for [`HubApiClient`].
#[derive(Debug, Default)]
pub struct HubApiClientBuilder {
	base_url: Option<String>,
	api_key: Option<String>,
	request_timeout: Option<Duration>,
	retry_config: Option<RetryConfig>,
}

impl HubApiClientBuilder {
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());
		self
	}

	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.api_key = Some(key.into());
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);
		self
	}

	pub fn retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = Some(config);
		self
	}

	pub fn build(self) -> Result<HubApiClient> {
		let raw_url = self
			.base_url
			.ok_or_else(|| RegistryError::InvalidBaseUrl("base URL is required".to_string()))?;
		let base_url = raw_url.trim_end_matches('/').to_string();
		Url::parse(&base_url).map_err(|e| RegistryError::InvalidBaseUrl(format!("{base_url}: {e}")))?;

		let api_key = self
			.api_key
			.filter(|k| !k.trim().is_empty())
			.ok_or(RegistryError::MissingApiKey)?;

		let request_timeout = self.request_timeout.unwrap_or(DEFAULT_TIMEOUT);
		let http = hackload_common_http::builder()
			.timeout(request_timeout)
			.build()?;

		let retry_config = self.retry_config.unwrap_or_default();

		info!(
			base_url = %base_url,
			timeout_ms = request_timeout.as_millis() as u64,
			max_attempts = retry_config.max_attempts,
			"registry client initialized"
		);

		Ok(HubApiClient {
			inner: Arc::new(HubApiClientInner {
				base_url,
				api_key,
				http,
				retry_config,
			}),
		})
	}
}
