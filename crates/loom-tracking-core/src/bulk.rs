// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bulk payloads: many events in one POST body.
//!
//! ```text
//! {"requests":["?idsite=1&rec=1...","?idsite=1&rec=1..."],"token_auth":"..."}
//! ```
//!
//! One token is resolved for the whole batch and sent once in the envelope;
//! the individual queries never carry `token_auth`.

use serde::Serialize;

use crate::auth::{resolve_auth_token, AuthToken};
use crate::error::{ConfigurationError, Result};
use crate::event::TrackingEvent;
use crate::query::{serialize_query, RequestDefaults};
use crate::validate::validate;

#[derive(Debug, Serialize)]
struct BulkEnvelope<'a> {
	requests: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	token_auth: Option<&'a str>,
}

/// Builds the JSON body for a bulk request.
///
/// Every event is validated against the batch token before anything is
/// serialized, so a failing event fails the whole batch.
pub fn build_bulk_payload(
	events: &[TrackingEvent],
	override_token: Option<&AuthToken>,
	defaults: &RequestDefaults,
) -> Result<Vec<u8>> {
	if events.is_empty() {
		return Err(ConfigurationError::EmptyBatch.into());
	}

	let token = resolve_auth_token(override_token, events, defaults.auth_token.as_ref())?;

	for event in events {
		validate(event, token.as_ref())?;
	}

	let requests = events
		.iter()
		.map(|event| serialize_query(event, None, defaults.site_id).map(|q| format!("?{q}")))
		.collect::<Result<Vec<_>>>()?;

	let envelope = BulkEnvelope {
		requests,
		token_auth: token.as_ref().map(AuthToken::expose),
	};
	Ok(serde_json::to_vec(&envelope)?)
}
