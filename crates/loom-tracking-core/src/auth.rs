// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Auth tokens and the precedence rule that picks one per request.
//!
//! A token is needed for parameters the collector only trusts from
//! authenticated callers (visitor location and backdated timestamps).
//! The effective token is chosen in this order, first non-blank wins:
//!
//! 1. an explicit override passed to the send call
//! 2. the first token set on one of the events being sent
//! 3. the default token from the tracker configuration

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ConfigurationError, Result};
use crate::event::TrackingEvent;

/// Required length of an auth token.
pub const AUTH_TOKEN_LENGTH: usize = 32;

const REDACTED: &str = "[REDACTED]";

/// A collector auth token.
///
/// Debug and Display never print the token and the memory is zeroed on
/// drop. Call [`AuthToken::expose`] to read the raw value.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct AuthToken {
	inner: String,
}

impl AuthToken {
	/// Wraps a token without checking its format.
	///
	/// The format is checked when the token is resolved for a request.
	pub fn new(token: impl Into<String>) -> Self {
		Self {
			inner: token.into(),
		}
	}

	/// Returns the raw token.
	pub fn expose(&self) -> &str {
		&self.inner
	}

	/// Returns true if the token is empty or whitespace only.
	pub fn is_blank(&self) -> bool {
		self.inner.trim().is_empty()
	}

	/// Checks the token is 32 lowercase letters or digits.
	pub fn validate(&self) -> Result<()> {
		if self.inner.chars().count() != AUTH_TOKEN_LENGTH {
			return Err(ConfigurationError::AuthTokenLength.into());
		}
		if !self
			.inner
			.chars()
			.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
		{
			return Err(ConfigurationError::AuthTokenFormat.into());
		}
		Ok(())
	}
}

impl Clone for AuthToken {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl PartialEq for AuthToken {
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl Eq for AuthToken {}

impl fmt::Debug for AuthToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("AuthToken").field(&REDACTED).finish()
	}
}

impl fmt::Display for AuthToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<&str> for AuthToken {
	fn from(token: &str) -> Self {
		Self::new(token)
	}
}

impl From<String> for AuthToken {
	fn from(token: String) -> Self {
		Self::new(token)
	}
}

/// Picks the auth token for a request or batch and checks its format.
///
/// Returns `Ok(None)` when no non-blank token is available anywhere.
pub fn resolve_auth_token<'a, I>(
	override_token: Option<&AuthToken>,
	events: I,
	default_token: Option<&AuthToken>,
) -> Result<Option<AuthToken>>
where
	I: IntoIterator<Item = &'a TrackingEvent>,
{
	let resolved = override_token
		.filter(|token| !token.is_blank())
		.or_else(|| {
			events
				.into_iter()
				.filter_map(|event| event.auth_token.as_ref())
				.find(|token| !token.is_blank())
		})
		.or_else(|| default_token.filter(|token| !token.is_blank()));

	match resolved {
		Some(token) => {
			token.validate()?;
			Ok(Some(token.clone()))
		}
		None => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::TrackingError;
	use proptest::prelude::*;

	const TOKEN_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
	const TOKEN_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
	const TOKEN_C: &str = "0123456789abcdef0123456789abcdef";

	fn event_with_token(token: Option<&str>) -> TrackingEvent {
		TrackingEvent {
			auth_token: token.map(AuthToken::from),
			..TrackingEvent::new()
		}
	}

	#[test]
	fn override_wins() {
		let events = [event_with_token(Some(TOKEN_B))];
		let resolved = resolve_auth_token(
			Some(&AuthToken::from(TOKEN_A)),
			&events,
			Some(&AuthToken::from(TOKEN_C)),
		)
		.unwrap();
		assert_eq!(resolved.unwrap().expose(), TOKEN_A);
	}

	#[test]
	fn first_event_token_wins_over_default() {
		let events = [
			event_with_token(None),
			event_with_token(Some("   ")),
			event_with_token(Some(TOKEN_B)),
			event_with_token(Some(TOKEN_A)),
		];
		let resolved =
			resolve_auth_token(None, &events, Some(&AuthToken::from(TOKEN_C))).unwrap();
		assert_eq!(resolved.unwrap().expose(), TOKEN_B);
	}

	#[test]
	fn blank_override_falls_through() {
		let resolved = resolve_auth_token(
			Some(&AuthToken::from("")),
			std::iter::empty(),
			Some(&AuthToken::from(TOKEN_C)),
		)
		.unwrap();
		assert_eq!(resolved.unwrap().expose(), TOKEN_C);
	}

	#[test]
	fn absent_everywhere_is_none() {
		let events = [event_with_token(None)];
		assert!(resolve_auth_token(None, &events, None).unwrap().is_none());
	}

	#[test]
	fn wrong_length_is_configuration_error() {
		let result = resolve_auth_token(Some(&AuthToken::from("abc123")), std::iter::empty(), None);
		assert!(matches!(
			result,
			Err(TrackingError::Configuration(
				ConfigurationError::AuthTokenLength
			))
		));
	}

	#[test]
	fn uppercase_is_configuration_error() {
		let token = "ABCDEFGHIJKLMNOPQRSTUVWXYZ012345";
		let result = resolve_auth_token(Some(&AuthToken::from(token)), std::iter::empty(), None);
		assert!(matches!(
			result,
			Err(TrackingError::Configuration(
				ConfigurationError::AuthTokenFormat
			))
		));
	}

	#[test]
	fn debug_and_display_are_redacted() {
		let token = AuthToken::from(TOKEN_A);
		assert_eq!(format!("{token}"), "[REDACTED]");
		assert_eq!(format!("{token:?}"), "AuthToken(\"[REDACTED]\")");
		assert!(!format!("{token:?}").contains(TOKEN_A));
	}

	proptest! {
		#[test]
		fn lowercase_alphanumeric_tokens_resolve(token in "[a-z0-9]{32}") {
			let default = AuthToken::from(token.as_str());
			let resolved = resolve_auth_token(None, std::iter::empty(), Some(&default)).unwrap().unwrap();
			prop_assert_eq!(resolved.expose(), token.as_str());
		}

		#[test]
		fn other_lengths_are_rejected(token in "[a-z0-9]{1,31}|[a-z0-9]{33,40}") {
			let resolved = resolve_auth_token(Some(&AuthToken::from(token.as_str())), std::iter::empty(), None);
			prop_assert!(resolved.is_err());
		}
	}
}
