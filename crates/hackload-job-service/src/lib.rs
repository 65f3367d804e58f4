// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wiring for the HackLoad job service binary: check registration from
//! configuration and the health/metrics HTTP server.

pub mod health_server;
pub mod services;
pub mod version;

pub use health_server::{create_router, HealthServerState};
pub use services::{build_registry_client, build_scheduler, StartupError};
