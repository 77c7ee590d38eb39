// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Visitor country and language preferences.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TrackingError};

/// An ISO 3166-1 alpha-2 country code, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Country(String);

impl Country {
	pub fn new(code: &str) -> Result<Self> {
		let code = code.trim();
		if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
			return Err(TrackingError::invalid_value("country code", code));
		}
		Ok(Self(code.to_ascii_lowercase()))
	}

	pub fn code(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Country {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for Country {
	type Err = TrackingError;

	fn from_str(s: &str) -> Result<Self> {
		Self::new(s)
	}
}

/// One entry of an `Accept-Language` header.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageRange {
	pub tag: String,
	/// Quality weight between 0.0 and 1.0.
	pub weight: f64,
}

impl LanguageRange {
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			weight: 1.0,
		}
	}

	pub fn with_weight(mut self, weight: f64) -> Self {
		self.weight = weight;
		self
	}
}

/// Ordered language preferences, sent as the `lang` parameter.
///
/// # Example
///
/// ```
/// use loom_tracking_core::AcceptLanguage;
///
/// let lang: AcceptLanguage = "en-US, en;q=0.9 ,de;q=0.5".parse().unwrap();
/// assert_eq!(lang.to_string(), "en-US,en;q=0.9,de;q=0.5");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptLanguage {
	ranges: Vec<LanguageRange>,
}

impl AcceptLanguage {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_range(mut self, range: LanguageRange) -> Self {
		self.ranges.push(range);
		self
	}

	pub fn ranges(&self) -> &[LanguageRange] {
		&self.ranges
	}

	pub fn is_empty(&self) -> bool {
		self.ranges.is_empty()
	}

	/// Parses an `Accept-Language` header value.
	pub fn parse(header: &str) -> Result<Self> {
		let mut ranges = Vec::new();
		for part in header.split(',').map(str::trim).filter(|p| !p.is_empty()) {
			let mut pieces = part.split(';').map(str::trim);
			let tag = pieces.next().unwrap_or_default();
			if tag.is_empty() {
				return Err(TrackingError::invalid_value("language range", part));
			}

			let mut range = LanguageRange::new(tag);
			for param in pieces {
				if let Some(q) = param.strip_prefix("q=") {
					let weight: f64 = q
						.parse()
						.map_err(|_| TrackingError::invalid_value("language weight", q))?;
					if !(0.0..=1.0).contains(&weight) {
						return Err(TrackingError::invalid_value("language weight", q));
					}
					range.weight = weight;
				}
			}
			ranges.push(range);
		}
		Ok(Self { ranges })
	}
}

impl fmt::Display for AcceptLanguage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, range) in self.ranges.iter().enumerate() {
			if i > 0 {
				f.write_str(",")?;
			}
			f.write_str(&range.tag)?;
			if range.weight < 1.0 {
				write!(f, ";q={}", range.weight)?;
			}
		}
		Ok(())
	}
}

impl FromStr for AcceptLanguage {
	type Err = TrackingError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn country_is_lowercased() {
		assert_eq!(Country::new("DE").unwrap().code(), "de");
		assert_eq!(" us ".parse::<Country>().unwrap().to_string(), "us");
	}

	#[test]
	fn country_rejects_bad_codes() {
		assert!(Country::new("deu").is_err());
		assert!(Country::new("d1").is_err());
		assert!(Country::new("").is_err());
	}

	#[test]
	fn accept_language_roundtrip() {
		let lang = AcceptLanguage::parse("fr-CH, fr;q=0.9, en;q=0.8, *;q=0.5").unwrap();
		assert_eq!(lang.ranges().len(), 4);
		assert_eq!(lang.ranges()[0].weight, 1.0);
		assert_eq!(lang.to_string(), "fr-CH,fr;q=0.9,en;q=0.8,*;q=0.5");
	}

	#[test]
	fn accept_language_builder() {
		let lang = AcceptLanguage::new()
			.with_range(LanguageRange::new("de"))
			.with_range(LanguageRange::new("en").with_weight(0.7));
		assert_eq!(lang.to_string(), "de,en;q=0.7");
	}

	#[test]
	fn accept_language_rejects_bad_weight() {
		assert!(AcceptLanguage::parse("en;q=abc").is_err());
		assert!(AcceptLanguage::parse("en;q=1.5").is_err());
		assert!(AcceptLanguage::parse(";q=0.5").is_err());
	}

	#[test]
	fn empty_header_is_empty() {
		assert!(AcceptLanguage::parse("").unwrap().is_empty());
	}
}
