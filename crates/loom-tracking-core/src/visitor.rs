// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Visitor and page view identifiers.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Result, TrackingError};

const VISITOR_ID_BYTES: usize = 8;
const PAGE_VIEW_ID_LENGTH: usize = 6;

/// An 8-byte visitor identifier, rendered as 16 lowercase hex digits.
///
/// # Example
///
/// ```
/// use loom_tracking_core::VisitorId;
///
/// let id = VisitorId::from_hash(0x00bb_ccdd_eeff_1122);
/// assert_eq!(id.to_string(), "00bbccddeeff1122");
/// assert_eq!("BBCCDDEEFF1122".parse::<VisitorId>().unwrap(), id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisitorId([u8; VISITOR_ID_BYTES]);

impl VisitorId {
	/// Creates a random visitor ID.
	pub fn random() -> Self {
		Self::from_hash(fastrand::u64(..))
	}

	/// Creates a visitor ID from the big-endian bytes of a 64-bit hash.
	pub fn from_hash(hash: u64) -> Self {
		Self(hash.to_be_bytes())
	}

	/// Creates a visitor ID from the most significant half of a UUID.
	pub fn from_uuid(uuid: Uuid) -> Self {
		Self::from_hash((uuid.as_u128() >> 64) as u64)
	}

	/// Derives a stable visitor ID from an arbitrary name, such as a user
	/// name or session key.
	pub fn from_name(name: &str) -> Self {
		let digest = Sha256::digest(name.as_bytes());
		let mut bytes = [0u8; VISITOR_ID_BYTES];
		bytes.copy_from_slice(&digest[..VISITOR_ID_BYTES]);
		Self(bytes)
	}

	/// Parses 1 to 16 hex digits, left-padding with zeros.
	pub fn from_hex(input: &str) -> Result<Self> {
		let trimmed = input.trim();
		if trimmed.is_empty()
			|| trimmed.len() > VISITOR_ID_BYTES * 2
			|| !trimmed.chars().all(|c| c.is_ascii_hexdigit())
		{
			return Err(TrackingError::invalid_value("visitor ID", input));
		}

		let padded = format!("{:0>16}", trimmed.to_ascii_lowercase());
		let mut bytes = [0u8; VISITOR_ID_BYTES];
		hex::decode_to_slice(&padded, &mut bytes)
			.map_err(|_| TrackingError::invalid_value("visitor ID", input))?;
		Ok(Self(bytes))
	}
}

impl fmt::Display for VisitorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&hex::encode(self.0))
	}
}

impl FromStr for VisitorId {
	type Err = TrackingError;

	fn from_str(s: &str) -> Result<Self> {
		Self::from_hex(s)
	}
}

/// A page view ID (`pv_id`) that ties actions to one page view.
///
/// The collector expects six alphanumeric characters; the value is checked
/// when the request is serialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageViewId(String);

impl PageViewId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Generates a random six-character alphanumeric ID.
	pub fn random() -> Self {
		Self(
			std::iter::repeat_with(fastrand::alphanumeric)
				.take(PAGE_VIEW_ID_LENGTH)
				.collect(),
		)
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for PageViewId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
