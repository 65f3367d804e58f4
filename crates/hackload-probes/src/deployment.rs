// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Checks whether each team's deployed application answers over HTTP.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hackload_jobs::{CheckError, CriteriaCheck};
use hackload_registry::{CriteriaStatus, CriteriaType, MetricsData, RegistryClient, Team};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const SERVICE_NAME: &str = "deployment-monitor-service";
pub const APPLICATION_URL_KEY: &str = "APPLICATION_URL";

const MAX_REDIRECTS: u32 = 5;
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const CONFIRMATION_TITLE: &str = "Демо";
const CONFIRMATION_DESCRIPTION: &str = "Развернутое решение команды";
const CONFIRMATION_DESCRIPTION_UNREACHABLE: &str = "Развернутое решение команды (недоступно)";
const MAX_FAILED_SCORE: f64 = 80.0;
const SLOW_RESPONSE_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct DeploymentMonitorConfig {
	pub http_timeout: Duration,
	pub user_agent: String,
}

impl Default for DeploymentMonitorConfig {
	fn default() -> Self {
		Self {
			http_timeout: Duration::from_secs(10),
			user_agent: "HackLoad-Monitor/1.0".to_string(),
		}
	}
}

/// What a deployment probe observed. Stored as the criteria's metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentMetrics {
	pub is_deployed: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub endpoint_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub response_time: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status_code: Option<u16>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status_text: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_checked: Option<DateTime<Utc>>,
	#[serde(default)]
	pub is_accessible: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub redirect_count: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub has_title: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub has_body: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content_length: Option<usize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub confirmation_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub confirmation_title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub confirmation_description: Option<String>,
}

impl DeploymentMetrics {
	fn not_deployed() -> Self {
		Self {
			is_deployed: false,
			confirmation_title: Some(CONFIRMATION_TITLE.to_string()),
			confirmation_description: Some(CONFIRMATION_DESCRIPTION.to_string()),
			..Default::default()
		}
	}

	pub fn from_metrics(metrics: &MetricsData) -> Self {
		serde_json::from_value(serde_json::Value::Object(metrics.clone())).unwrap_or_default()
	}

	pub fn into_metrics(self) -> MetricsData {
		match serde_json::to_value(self) {
			Ok(serde_json::Value::Object(map)) => map,
			_ => MetricsData::new(),
		}
	}
}

/// Probes `APPLICATION_URL` from each team's environment.
#[derive(Debug, Clone)]
pub struct DeploymentMonitor {
	http: Client,
	config: DeploymentMonitorConfig,
}

impl DeploymentMonitor {
	pub fn new(config: DeploymentMonitorConfig) -> reqwest::Result<Self> {
		// Redirects are followed by hand so they can be counted and capped.
		let http = hackload_common_http::builder_with_user_agent(config.user_agent.clone())
			.timeout(config.http_timeout)
			.redirect(Policy::none())
			.build()?;
		Ok(Self { http, config })
	}

	pub fn config(&self) -> &DeploymentMonitorConfig {
		&self.config
	}

	async fn get(&self, url: &Url) -> reqwest::Result<Response> {
		self
			.http
			.get(url.clone())
			.header(ACCEPT, ACCEPT_HTML)
			.header(CACHE_CONTROL, "no-cache")
			.send()
			.await
	}

	/// Fetches `url`, following up to [`MAX_REDIRECTS`] redirects.
	async fn fetch(&self, url: &Url) -> reqwest::Result<(Response, u32)> {
		let mut response = self.get(url).await?;
		let mut current = url.clone();
		let mut redirects = 0;

		while is_followed_redirect(response.status()) && redirects < MAX_REDIRECTS {
			let Some(next) = response
				.headers()
				.get(LOCATION)
				.and_then(|v| v.to_str().ok())
				.and_then(|location| current.join(location).ok())
			else {
				break;
			};
			redirects += 1;
			debug!(redirect = redirects, location = %next, "following redirect");
			response = self.get(&next).await?;
			current = next;
		}

		Ok((response, redirects))
	}

	pub async fn probe(&self, endpoint_url: &str) -> DeploymentMetrics {
		let started = Instant::now();
		let mut metrics = DeploymentMetrics {
			is_deployed: true,
			endpoint_url: Some(endpoint_url.to_string()),
			confirmation_url: Some(endpoint_url.to_string()),
			confirmation_title: Some(CONFIRMATION_TITLE.to_string()),
			..Default::default()
		};

		let outcome = match Url::parse(endpoint_url) {
			Ok(url) => self.fetch(&url).await.map_err(describe_error),
			Err(e) => Err(format!("invalid URL: {e}")),
		};
		metrics.response_time = Some(started.elapsed().as_millis() as u64);
		metrics.last_checked = Some(Utc::now());

		let (response, redirects) = match outcome {
			Ok(ok) => ok,
			Err(message) => {
				warn!(endpoint = %endpoint_url, error = %message, "deployment probe failed");
				metrics.status_code = Some(0);
				metrics.is_accessible = false;
				metrics.error = Some(message);
				metrics.confirmation_description =
					Some(CONFIRMATION_DESCRIPTION_UNREACHABLE.to_string());
				return metrics;
			}
		};

		let status = response.status();
		metrics.status_code = Some(status.as_u16());
		metrics.status_text = status.canonical_reason().map(str::to_string);
		metrics.redirect_count = Some(redirects);
		metrics.is_accessible = status.is_success() || status.is_redirection();
		metrics.confirmation_description = Some(CONFIRMATION_DESCRIPTION.to_string());

		if metrics.is_accessible {
			let content_type = response
				.headers()
				.get(CONTENT_TYPE)
				.and_then(|v| v.to_str().ok())
				.map(str::to_string);
			if content_type.as_deref().is_some_and(|ct| ct.contains("text/html")) {
				match response.text().await {
					Ok(body) => {
						metrics.has_title = Some(body.contains("<title>"));
						metrics.has_body = Some(body.contains("<body>") || body.contains("<body "));
						metrics.content_length = Some(body.len());
					}
					Err(e) => {
						debug!(endpoint = %endpoint_url, error = %e, "could not read response body");
					}
				}
			}
			metrics.content_type = content_type;
		}

		debug!(
			endpoint = %endpoint_url,
			status = status.as_u16(),
			response_time_ms = metrics.response_time,
			accessible = metrics.is_accessible,
			redirects,
			"deployment probe completed"
		);
		metrics
	}
}

fn is_followed_redirect(status: StatusCode) -> bool {
	matches!(
		status,
		StatusCode::MOVED_PERMANENTLY
			| StatusCode::FOUND
			| StatusCode::TEMPORARY_REDIRECT
			| StatusCode::PERMANENT_REDIRECT
	)
}

fn describe_error(error: reqwest::Error) -> String {
	if error.is_timeout() {
		"Request timeout".to_string()
	} else if error.is_connect() {
		"Network error".to_string()
	} else {
		error.to_string()
	}
}

#[async_trait]
impl CriteriaCheck for DeploymentMonitor {
	fn service_name(&self) -> &str {
		SERVICE_NAME
	}

	fn criteria_type(&self) -> CriteriaType {
		CriteriaType::DeployedSolution
	}

	async fn collect_metrics(
		&self,
		team: &Team,
		registry: &dyn RegistryClient,
	) -> Result<MetricsData, CheckError> {
		let env = registry.get_team_environment_data(team).await?;

		let metrics = match env.get(APPLICATION_URL_KEY).filter(|url| !url.trim().is_empty()) {
			Some(url) => {
				debug!(team = %team.nickname, endpoint = %url, "checking deployment");
				self.probe(url.trim()).await
			}
			None => {
				debug!(team = %team.nickname, "no application URL registered");
				DeploymentMetrics::not_deployed()
			}
		};
		Ok(metrics.into_metrics())
	}

	fn evaluate_status(&self, metrics: &MetricsData) -> CriteriaStatus {
		let metrics = DeploymentMetrics::from_metrics(metrics);
		if !metrics.is_deployed {
			return CriteriaStatus::NoData;
		}
		if metrics.is_accessible {
			return CriteriaStatus::Passed;
		}
		if metrics.endpoint_url.is_some() || metrics.error.is_some() {
			return CriteriaStatus::Failed;
		}
		CriteriaStatus::NoData
	}

	/// Accessible deployments score 100. Unreachable ones earn partial credit
	/// for whatever was observed, capped below a pass.
	fn calculate_score(&self, status: CriteriaStatus, metrics: &MetricsData) -> f64 {
		match status {
			CriteriaStatus::NoData => 0.0,
			CriteriaStatus::Passed => 100.0,
			CriteriaStatus::Failed => {
				let metrics = DeploymentMetrics::from_metrics(metrics);
				let status_code = metrics.status_code.unwrap_or(0);
				let mut score = 0.0;
				if metrics.endpoint_url.is_some() {
					score += 30.0;
				}
				if status_code > 0 {
					score += 20.0;
				}
				if metrics
					.response_time
					.is_some_and(|ms| ms > 0 && ms < SLOW_RESPONSE_MS)
				{
					score += 10.0;
				}
				if (400..600).contains(&status_code) {
					score += 20.0;
				}
				f64::min(score, MAX_FAILED_SCORE)
			}
		}
	}
}
