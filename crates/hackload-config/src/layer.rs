// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{
	ApiConfigLayer, DeploymentConfigLayer, LoggingConfigLayer, MonitoringConfigLayer,
	SchedulerConfigLayer, ServicesConfigLayer,
};

/// Partial configuration as produced by a single source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobServiceConfigLayer {
	pub api: Option<ApiConfigLayer>,
	pub services: Option<ServicesConfigLayer>,
	pub deployment: Option<DeploymentConfigLayer>,
	pub monitoring: Option<MonitoringConfigLayer>,
	pub scheduler: Option<SchedulerConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(existing), Some(incoming)) => merge(existing, incoming),
		(None, Some(incoming)) => *base = Some(incoming),
		(_, None) => {}
	}
}

impl JobServiceConfigLayer {
	/// Overlays `other` on top of `self`; set fields in `other` win.
	pub fn merge(&mut self, other: JobServiceConfigLayer) {
		merge_section(&mut self.api, other.api, ApiConfigLayer::merge);
		merge_section(&mut self.services, other.services, ServicesConfigLayer::merge);
		merge_section(&mut self.deployment, other.deployment, DeploymentConfigLayer::merge);
		merge_section(&mut self.monitoring, other.monitoring, MonitoringConfigLayer::merge);
		merge_section(&mut self.scheduler, other.scheduler, SchedulerConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}
