// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cross-field rules checked before an event is serialized.

use chrono::{DateTime, Duration, Utc};

use crate::auth::{AuthToken, AUTH_TOKEN_LENGTH};
use crate::error::{Result, ValidationError};
use crate::event::TrackingEvent;

/// How far back `cdt` may lie before the collector demands an auth token.
pub const UNAUTHENTICATED_BACKDATE_HOURS: i64 = 4;

/// Checks `event` against the cross-field rules, using the current time.
///
/// `auth_token` is the effective token for the request, already resolved;
/// the event's own token field is not consulted here.
pub fn validate(event: &TrackingEvent, auth_token: Option<&AuthToken>) -> Result<()> {
	validate_at(event, auth_token, Utc::now())
}

/// Same as [`validate`] with an explicit clock.
///
/// Rules are checked in a fixed order and the first failure is returned.
pub fn validate_at(
	event: &TrackingEvent,
	auth_token: Option<&AuthToken>,
	now: DateTime<Utc>,
) -> Result<()> {
	if event.site_id.is_some_and(|id| id < 0) {
		return Err(ValidationError::NegativeSiteId.into());
	}

	if event.goal_id.is_none() && event.has_ecommerce_fields() {
		return Err(ValidationError::EcommerceWithoutGoal.into());
	}

	if event.search_results_count.is_some() && event.search_query.is_none() {
		return Err(ValidationError::SearchResultsWithoutQuery.into());
	}

	match auth_token {
		None => {
			if event.has_location_fields() {
				return Err(ValidationError::LocationWithoutAuthToken.into());
			}
			if let Some(at) = event.request_timestamp {
				if at < now - Duration::hours(UNAUTHENTICATED_BACKDATE_HOURS) {
					return Err(ValidationError::BackdatedWithoutAuthToken.into());
				}
			}
		}
		Some(token) => {
			if token.expose().chars().count() != AUTH_TOKEN_LENGTH {
				return Err(ValidationError::AuthTokenLength.into());
			}
		}
	}

	Ok(())
}
