// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Device characteristics reported with a tracking request.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TrackingError};

/// Screen resolution, sent as `res=<width>x<height>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceResolution {
	pub width: u32,
	pub height: u32,
}

impl DeviceResolution {
	pub fn new(width: u32, height: u32) -> Self {
		Self { width, height }
	}
}

impl fmt::Display for DeviceResolution {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}x{}", self.width, self.height)
	}
}

impl FromStr for DeviceResolution {
	type Err = TrackingError;

	fn from_str(s: &str) -> Result<Self> {
		let (width, height) = s
			.trim()
			.split_once(['x', 'X'])
			.ok_or_else(|| TrackingError::invalid_value("device resolution", s))?;
		let width = width
			.trim()
			.parse()
			.map_err(|_| TrackingError::invalid_value("device resolution", s))?;
		let height = height
			.trim()
			.parse()
			.map_err(|_| TrackingError::invalid_value("device resolution", s))?;
		Ok(Self { width, height })
	}
}

/// Character set of the tracked page (`cs`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Charset {
	Utf8,
	Utf16,
	Iso8859_1,
	UsAscii,
	Windows1252,
	Other(String),
}

impl Charset {
	/// Returns the canonical name sent on the wire.
	pub fn canonical_name(&self) -> &str {
		match self {
			Charset::Utf8 => "UTF-8",
			Charset::Utf16 => "UTF-16",
			Charset::Iso8859_1 => "ISO-8859-1",
			Charset::UsAscii => "US-ASCII",
			Charset::Windows1252 => "windows-1252",
			Charset::Other(name) => name.as_str(),
		}
	}
}

impl fmt::Display for Charset {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.canonical_name())
	}
}

impl FromStr for Charset {
	type Err = TrackingError;

	fn from_str(s: &str) -> Result<Self> {
		let name = s.trim();
		if name.is_empty() {
			return Err(TrackingError::invalid_value("charset", s));
		}
		let charset = match name.to_ascii_lowercase().as_str() {
			"utf-8" | "utf8" => Charset::Utf8,
			"utf-16" | "utf16" => Charset::Utf16,
			"iso-8859-1" | "iso8859-1" | "iso_8859_1" | "latin1" => Charset::Iso8859_1,
			"us-ascii" | "ascii" => Charset::UsAscii,
			"windows-1252" | "cp1252" => Charset::Windows1252,
			_ => Charset::Other(name.to_string()),
		};
		Ok(charset)
	}
}
