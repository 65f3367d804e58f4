// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod api;
mod deployment;
mod logging;
mod monitoring;
mod scheduler;
mod services;

pub use api::{ApiConfig, ApiConfigLayer};
pub use deployment::{DeploymentConfig, DeploymentConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use monitoring::{MonitoringConfig, MonitoringConfigLayer};
pub use scheduler::{SchedulerConfig, SchedulerConfigLayer};
pub use services::{ServiceSettings, ServiceSettingsLayer, ServicesConfig, ServicesConfigLayer};
