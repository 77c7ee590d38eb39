// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the tracking SDK.

use std::path::PathBuf;
use std::time::Duration;

use loom_tracking_core::TrackingError;
use thiserror::Error;

use crate::retry::RetryableError;

/// Errors loading a [`TrackerConfig`](crate::TrackerConfig) from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("required environment variable {var} is not set")]
	Missing { var: &'static str },

	#[error("invalid value for {var}: {value}")]
	Invalid { var: &'static str, value: String },

	#[error("failed to read secret file at {path}: {source}")]
	SecretFile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptySecretPath { var: String },
}

/// Tracking SDK errors.
#[derive(Debug, Error)]
pub enum TrackerError {
	/// The event or batch could not be validated or serialized.
	#[error(transparent)]
	Tracking(#[from] TrackingError),

	/// The collector endpoint is missing or not a valid URL.
	#[error("invalid API endpoint: {0}")]
	InvalidEndpoint(String),

	#[error("invalid configuration: {0}")]
	Config(#[from] ConfigError),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Collector returned a non-success status.
	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },

	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },

	/// Tracker has been shut down.
	#[error("tracker has been shut down")]
	ClientShutdown,
}

impl RetryableError for TrackerError {
	fn is_retryable(&self) -> bool {
		match self {
			TrackerError::RequestFailed(e) => e.is_retryable(),
			TrackerError::ServerError { status, .. } => {
				matches!(*status, 408 | 429 | 500 | 502 | 503 | 504)
			}
			TrackerError::RateLimited { .. } => true,
			_ => false,
		}
	}

	fn retry_after(&self) -> Option<Duration> {
		match self {
			TrackerError::RateLimited {
				retry_after_secs: Some(secs),
			} => Some(Duration::from_secs(*secs)),
			_ => None,
		}
	}
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
