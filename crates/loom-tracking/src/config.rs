// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracker configuration.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `LOOM_TRACKING_API_ENDPOINT` | yes | |
//! | `LOOM_TRACKING_DEFAULT_SITE_ID` | no | none |
//! | `LOOM_TRACKING_DEFAULT_AUTH_TOKEN` (or `_FILE`) | no | none |
//! | `LOOM_TRACKING_ENABLED` | no | `true` |
//! | `LOOM_TRACKING_REQUEST_TIMEOUT_SECS` | no | `10` |
//! | `LOOM_TRACKING_USER_AGENT` | no | `loom-tracking/<version>` |

use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

use loom_tracking_core::{AuthToken, RequestDefaults};
use reqwest::Url;

use crate::batch::BatchConfig;
use crate::error::ConfigError;
use crate::retry::RetryConfig;

pub const ENV_API_ENDPOINT: &str = "LOOM_TRACKING_API_ENDPOINT";
pub const ENV_DEFAULT_SITE_ID: &str = "LOOM_TRACKING_DEFAULT_SITE_ID";
pub const ENV_DEFAULT_AUTH_TOKEN: &str = "LOOM_TRACKING_DEFAULT_AUTH_TOKEN";
pub const ENV_ENABLED: &str = "LOOM_TRACKING_ENABLED";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "LOOM_TRACKING_REQUEST_TIMEOUT_SECS";
pub const ENV_USER_AGENT: &str = "LOOM_TRACKING_USER_AGENT";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default `User-Agent` header for collector requests.
pub fn default_user_agent() -> String {
	format!("loom-tracking/{}", env!("CARGO_PKG_VERSION"))
}

/// Everything a [`Tracker`](crate::Tracker) needs to talk to a collector.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
	/// Collector endpoint, e.g. `https://analytics.example.com/matomo.php`.
	///
	/// Must not carry a query string; the tracking query is sent in its place.
	pub api_endpoint: Url,
	/// Site ID for events that do not set one.
	pub default_site_id: Option<i32>,
	/// Auth token used when neither the call nor the events carry one.
	pub default_auth_token: Option<AuthToken>,
	/// When false, sends are accepted and dropped without any I/O.
	pub enabled: bool,
	pub request_timeout: Duration,
	pub user_agent: String,
	/// Log send failures at error level in addition to returning them.
	pub log_failed_tracking: bool,
	pub retry_config: RetryConfig,
	pub batch_config: BatchConfig,
}

impl TrackerConfig {
	pub fn new(api_endpoint: Url) -> Self {
		Self {
			api_endpoint,
			default_site_id: None,
			default_auth_token: None,
			enabled: true,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			user_agent: default_user_agent(),
			log_failed_tracking: false,
			retry_config: RetryConfig::default(),
			batch_config: BatchConfig::default(),
		}
	}

	/// Loads configuration from `LOOM_TRACKING_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|var| env::var(var).ok())
	}

	pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let endpoint = lookup(ENV_API_ENDPOINT).ok_or(ConfigError::Missing {
			var: ENV_API_ENDPOINT,
		})?;
		let api_endpoint = Url::parse(&endpoint)
			.ok()
			.filter(|url| url.query().is_none())
			.ok_or_else(|| ConfigError::Invalid {
				var: ENV_API_ENDPOINT,
				value: endpoint.clone(),
			})?;

		let mut config = Self::new(api_endpoint);

		if let Some(value) = lookup(ENV_DEFAULT_SITE_ID) {
			config.default_site_id = Some(parse_var(ENV_DEFAULT_SITE_ID, &value)?);
		}

		config.default_auth_token = load_secret(ENV_DEFAULT_AUTH_TOKEN, &lookup)?.map(AuthToken::new);

		if let Some(value) = lookup(ENV_ENABLED) {
			config.enabled = parse_bool(ENV_ENABLED, &value)?;
		}

		if let Some(value) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
			config.request_timeout = Duration::from_secs(parse_var(ENV_REQUEST_TIMEOUT_SECS, &value)?);
		}

		if let Some(value) = lookup(ENV_USER_AGENT) {
			config.user_agent = value;
		}

		Ok(config)
	}

	pub(crate) fn request_defaults(&self) -> RequestDefaults {
		RequestDefaults {
			site_id: self.default_site_id,
			auth_token: self.default_auth_token.clone(),
		}
	}
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
	value.trim().parse().map_err(|_| ConfigError::Invalid {
		var,
		value: value.to_string(),
	})
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::Invalid {
			var,
			value: value.to_string(),
		}),
	}
}

/// Reads `{var}_FILE` if set, otherwise `{var}`.
///
/// One trailing newline is stripped from file contents.
fn load_secret<F>(var: &str, lookup: &F) -> Result<Option<String>, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let file_var = format!("{var}_FILE");

	if let Some(path) = lookup(&file_var) {
		if path.is_empty() {
			return Err(ConfigError::EmptySecretPath { var: file_var });
		}
		let path = PathBuf::from(path);
		let content = fs::read_to_string(&path).map_err(|source| ConfigError::SecretFile {
			path: path.clone(),
			source,
		})?;
		let secret = content.strip_suffix('\n').unwrap_or(&content);
		return Ok(Some(secret.to_string()));
	}

	Ok(lookup(var))
}
