// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for building and serializing tracking requests.

use thiserror::Error;

/// A cross-field rule that a tracking event breaks.
///
/// Reported before any query bytes are produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("Site ID must not be negative")]
	NegativeSiteId,

	#[error("Goal ID must be set if ecommerce parameters are used")]
	EcommerceWithoutGoal,

	#[error("Search query must be set if search results count is set")]
	SearchResultsWithoutQuery,

	#[error("Auth token must be present if longitude, latitude, region, city or country are set")]
	LocationWithoutAuthToken,

	#[error("Auth token must be present if request timestamp is more than four hours ago")]
	BackdatedWithoutAuthToken,

	#[error("Auth token must be exactly 32 characters long")]
	AuthTokenLength,
}

/// The constraint a single parameter value failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
	#[error("value does not match pattern {pattern}")]
	PatternMismatch { pattern: String },

	#[error("value is {length} characters long (max {max_length})")]
	TooLong { length: usize, max_length: usize },
}

/// Misconfiguration of the tracker or of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
	#[error("auth token must be exactly 32 characters long")]
	AuthTokenLength,

	#[error("auth token must contain only lowercase letters and digits")]
	AuthTokenFormat,

	#[error("bulk request requires at least one event")]
	EmptyBatch,

	#[error("no site ID set on the event and no default site ID configured")]
	MissingSiteId,
}

/// Errors raised while validating or serializing tracking events.
#[derive(Debug, Error)]
pub enum TrackingError {
	#[error("invalid tracking request: {0}")]
	Validation(#[from] ValidationError),

	#[error("invalid value for parameter {key}: {violation}")]
	ParameterConstraint {
		key: &'static str,
		violation: ConstraintViolation,
	},

	#[error("invalid tracker configuration: {0}")]
	Configuration(#[from] ConfigurationError),

	#[error("invalid {kind}: {value}")]
	InvalidValue { kind: &'static str, value: String },

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl TrackingError {
	pub(crate) fn invalid_value(kind: &'static str, value: impl Into<String>) -> Self {
		TrackingError::InvalidValue {
			kind,
			value: value.into(),
		}
	}
}

/// A specialized `Result` type for tracking operations.
pub type Result<T> = std::result::Result<T, TrackingError>;
