// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HackLoad job service binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hackload_job_service::{
	build_registry_client, build_scheduler, create_router, version, HealthServerState,
};
use hackload_jobs::MetricsCollector;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// HackLoad job service - scheduled criteria checks for hackathon teams.
#[derive(Parser, Debug)]
#[command(
	name = "hackload-job-service",
	about = "Scheduled HackLoad criteria checks",
	version
)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/hackload/job-service.toml)
	#[arg(long, env = "HACKLOAD_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
}

fn init_tracing(logging: &hackload_config::LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| logging.level.clone().into());

	tracing_subscriber::registry()
		.with(filter)
		.with(logging.json.then(|| tracing_subscriber::fmt::layer().json()))
		.with((!logging.json).then(|| tracing_subscriber::fmt::layer()))
		.init();
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for ctrl-c");
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!(error = %e, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
	tracing::info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match args.config {
		Some(path) => hackload_config::load_config_with_file(path),
		None => hackload_config::load_config(),
	}
	.context("failed to load configuration")?;

	init_tracing(&config.logging);

	tracing::info!(
		version = version::VERSION,
		api_base_url = %config.api.base_url,
		monitoring = %config.monitoring.socket_addr(),
		"starting hackload-job-service"
	);

	let registry = build_registry_client(&config)?;
	let metrics = Arc::new(MetricsCollector::new());
	let scheduler = Arc::new(build_scheduler(&config, registry, Arc::clone(&metrics))?);

	let app = create_router(HealthServerState::new(Arc::clone(&scheduler)))
		.layer(TraceLayer::new_for_http());

	let addr = config.monitoring.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;
	tracing::info!("listening on {}", addr);

	scheduler.start();

	let shutdown_scheduler = Arc::clone(&scheduler);
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			shutdown_signal().await;
			tracing::info!("Shutting down job scheduler...");
			shutdown_scheduler.stop().await;
		})
		.await
		.context("health server failed")?;

	tracing::info!("Job service shutdown complete");
	Ok(())
}
