// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health and metrics HTTP handlers.

use std::sync::Arc;

use axum::{
	extract::State,
	http::{header, StatusCode},
	response::{IntoResponse, Response},
	routing::get,
	Json, Router,
};
use chrono::Utc;
use hackload_jobs::{
	HealthState, HealthSummary, JobScheduler, MetricsCollector, MetricsSnapshot, ServiceHealth,
	PROMETHEUS_CONTENT_TYPE,
};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthServerState {
	pub scheduler: Arc<JobScheduler>,
	pub metrics: Arc<MetricsCollector>,
}

impl HealthServerState {
	pub fn new(scheduler: Arc<JobScheduler>) -> Self {
		let metrics = Arc::clone(scheduler.metrics());
		Self { scheduler, metrics }
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
	pub status: HealthState,
	pub timestamp: String,
	pub uptime_ms: u64,
	pub services: Vec<ServiceHealth>,
	pub summary: HealthSummary,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
	pub ready: bool,
	pub status: HealthState,
	pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
	pub alive: bool,
	pub timestamp: String,
}

fn status_code(status: HealthState) -> StatusCode {
	match status {
		HealthState::Healthy | HealthState::Degraded => StatusCode::OK,
		HealthState::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
	}
}

pub fn create_router(state: HealthServerState) -> Router {
	Router::new()
		.route("/", get(health_check))
		.route("/health", get(health_check))
		.route("/health/ready", get(readiness))
		.route("/health/live", get(liveness))
		.route("/metrics", get(prometheus_metrics))
		.route("/metrics/json", get(json_metrics))
		.with_state(state)
}

/// GET /health - Aggregated service health. Also refreshes the health gauges.
pub async fn health_check(State(state): State<HealthServerState>) -> impl IntoResponse {
	let health = state.scheduler.health_status();
	for service in &health.services {
		state.metrics.update_service_health(service);
	}
	state
		.metrics
		.update_system_metrics(state.scheduler.service_names().len());

	let summary = health.summary();
	let response = HealthResponse {
		status: health.status,
		timestamp: Utc::now().to_rfc3339(),
		uptime_ms: state.metrics.get_metrics().system_metrics.uptime_ms,
		services: health.services,
		summary,
	};

	(status_code(response.status), Json(response))
}

/// GET /health/ready
pub async fn readiness(State(state): State<HealthServerState>) -> impl IntoResponse {
	let status = state.scheduler.health_status().status;
	let response = ReadinessResponse {
		ready: status != HealthState::Unhealthy,
		status,
		timestamp: Utc::now().to_rfc3339(),
	};
	(status_code(status), Json(response))
}

/// GET /health/live
pub async fn liveness() -> impl IntoResponse {
	Json(LivenessResponse {
		alive: true,
		timestamp: Utc::now().to_rfc3339(),
	})
}

/// GET /metrics - Prometheus text exposition.
pub async fn prometheus_metrics(State(state): State<HealthServerState>) -> Response {
	match state.metrics.render_prometheus() {
		Ok(body) => (
			StatusCode::OK,
			[(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
			body,
		)
			.into_response(),
		Err(e) => {
			tracing::error!(error = %e, "prometheus_metrics: failed to render metrics");
			(
				StatusCode::INTERNAL_SERVER_ERROR,
				format!("Failed to render metrics: {e}"),
			)
				.into_response()
		}
	}
}

/// GET /metrics/json
pub async fn json_metrics(State(state): State<HealthServerState>) -> Json<MetricsSnapshot> {
	Json(state.metrics.get_metrics())
}
