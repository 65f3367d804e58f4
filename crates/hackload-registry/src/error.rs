// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for registry operations.

use hackload_common_http::RetryableError;
use reqwest::StatusCode;
use thiserror::Error;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("registry returned {status}: {message}")]
	Status { status: StatusCode, message: String },

	#[error("invalid response: {0}")]
	InvalidResponse(String),

	#[error("invalid base URL: {0}")]
	InvalidBaseUrl(String),

	#[error("missing API key")]
	MissingApiKey,
}

impl RegistryError {
	/// HTTP status of the failed response, if the registry answered at all.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			RegistryError::Status { status, .. } => Some(*status),
			RegistryError::Network(e) => e.status(),
			_ => None,
		}
	}
}

/// Client errors (4xx) are never retried; server errors and transport
/// failures are.
impl RetryableError for RegistryError {
	fn is_retryable(&self) -> bool {
		match self {
			RegistryError::Network(e) => match e.status() {
				Some(status) => status.is_server_error(),
				None => e.is_timeout() || e.is_connect() || e.is_request(),
			},
			RegistryError::Status { status, .. } => status.is_server_error(),
			RegistryError::InvalidResponse(_) => false,
			RegistryError::InvalidBaseUrl(_) => false,
			RegistryError::MissingApiKey => false,
		}
	}
}
