// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client for the HackLoad Hub team registry.
//!
//! The registry is the system of record for teams and their criteria scores.
//! Jobs read the team roster and per-team environment data from it and push
//! scored criteria back in bulk.

pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::RegistryClient;
pub use error::{RegistryError, Result};
pub use http::{HubApiClient, HubApiClientBuilder};
pub use types::{BulkUpdateResult, CriteriaStatus, CriteriaType, CriteriaUpdate, MetricsData, Team};
