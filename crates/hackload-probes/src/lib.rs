// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Criteria checks run by the job service.

pub mod budget;
pub mod deployment;
pub mod judge_score;

#[cfg(test)]
mod test_support;

pub use budget::{budget_score, parse_money_spend, BudgetTracking};
pub use deployment::{DeploymentMetrics, DeploymentMonitor, DeploymentMonitorConfig};
pub use judge_score::{parse_judge_score, JudgeScore};
