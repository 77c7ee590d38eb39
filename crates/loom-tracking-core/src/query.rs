// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Query-string serialization of a single tracking event.
//!
//! Output order is fixed:
//!
//! 1. `idsite` from the defaults, only when the event has no site ID
//! 2. `token_auth`, when a token was resolved
//! 3. every set registry parameter, in registry order
//! 4. extension parameters, in insertion order
//! 5. `dimension1`, `dimension2`, ... in list order
//!
//! Dimension values are written as given. Everything else is
//! percent-encoded.

use crate::auth::{resolve_auth_token, AuthToken};
use crate::error::{ConfigurationError, Result};
use crate::event::TrackingEvent;
use crate::registry;
use crate::validate::validate;

/// Tracker-wide fallbacks applied when an event leaves a value unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDefaults {
	pub site_id: Option<i32>,
	pub auth_token: Option<AuthToken>,
}

impl RequestDefaults {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_site_id(mut self, site_id: i32) -> Self {
		self.site_id = Some(site_id);
		self
	}

	pub fn with_auth_token(mut self, token: impl Into<AuthToken>) -> Self {
		self.auth_token = Some(token.into());
		self
	}
}

#[derive(Default)]
struct QueryBuilder {
	query: String,
}

impl QueryBuilder {
	fn push_raw(&mut self, key: &str, value: &str) {
		if !self.query.is_empty() {
			self.query.push('&');
		}
		self.query.push_str(key);
		self.query.push('=');
		self.query.push_str(value);
	}

	fn push(&mut self, key: &str, value: &str) {
		self.push_raw(key, &urlencoding::encode(value));
	}

	fn finish(self) -> String {
		self.query
	}
}

/// Serializes `event` into a query string, without a leading `?`.
///
/// `auth_token` is the effective token, already resolved; the event's own
/// token field is ignored. Fails if a value breaks its parameter
/// constraint, or if neither the event nor `default_site_id` provides a
/// site ID.
pub fn serialize_query(
	event: &TrackingEvent,
	auth_token: Option<&AuthToken>,
	default_site_id: Option<i32>,
) -> Result<String> {
	let mut query = QueryBuilder::default();

	if event.site_id.is_none() {
		let site_id = default_site_id.ok_or(ConfigurationError::MissingSiteId)?;
		query.push("idsite", &site_id.to_string());
	}

	if let Some(token) = auth_token {
		query.push("token_auth", token.expose());
	}

	for descriptor in registry::parameters() {
		let Some(value) = descriptor.value(event) else {
			continue;
		};
		let Some(rendered) = value.render() else {
			continue;
		};
		descriptor.check(&rendered)?;
		if rendered.trim().is_empty() {
			continue;
		}
		query.push(descriptor.key, &rendered);
	}

	for (key, values) in event.extension_parameters.iter() {
		for value in values.iter().filter(|v| !v.trim().is_empty()) {
			query.push(key, value);
		}
	}

	for (position, value) in event.dimensions.iter().enumerate() {
		query.push_raw(&format!("dimension{}", position + 1), value);
	}

	Ok(query.finish())
}

/// Resolves the token, validates, then serializes a single event.
///
/// This is the full pipeline for a one-event GET request.
pub fn prepare_query(
	event: &TrackingEvent,
	override_token: Option<&AuthToken>,
	defaults: &RequestDefaults,
) -> Result<String> {
	let token = resolve_auth_token(
		override_token,
		std::iter::once(event),
		defaults.auth_token.as_ref(),
	)?;
	validate(event, token.as_ref())?;
	serialize_query(event, token.as_ref(), defaults.site_id)
}
