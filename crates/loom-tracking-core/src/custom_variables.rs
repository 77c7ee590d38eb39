// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Custom variables: numbered key/value slots scoped to a page or a visit.
//!
//! Slots are 1-based. On the wire a set renders as a JSON object keyed by
//! slot index, in the order the slots were first written:
//!
//! ```text
//! {"1":["plan","pro"],"3":["ab_test","variant_b"]}
//! ```

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Result, TrackingError};

/// A single custom variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomVariable {
	pub key: String,
	pub value: String,
}

impl CustomVariable {
	pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			value: value.into(),
		}
	}
}

/// An ordered set of custom variable slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomVariables {
	// (index, variable) in first-write order
	slots: Vec<(u32, CustomVariable)>,
}

impl CustomVariables {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a variable, reusing the slot of any variable with the same key.
	///
	/// Every slot holding the key gets the new value and keeps its index. If
	/// the key is new, the variable takes the lowest free index.
	pub fn add(&mut self, variable: CustomVariable) -> &mut Self {
		let mut replaced = false;
		for (_, slot) in self.slots.iter_mut() {
			if slot.key == variable.key {
				slot.value.clone_from(&variable.value);
				replaced = true;
			}
		}
		if !replaced {
			let index = self.lowest_free_index();
			self.slots.push((index, variable));
		}
		self
	}

	/// Writes a variable at exactly `index`, replacing whatever was there.
	pub fn add_at(&mut self, variable: CustomVariable, index: u32) -> Result<&mut Self> {
		check_index(index)?;
		match self.slots.iter_mut().find(|(i, _)| *i == index) {
			Some((_, slot)) => *slot = variable,
			None => self.slots.push((index, variable)),
		}
		Ok(self)
	}

	/// Removes the slot at `index`, if present.
	pub fn remove(&mut self, index: u32) -> Result<()> {
		check_index(index)?;
		self.slots.retain(|(i, _)| *i != index);
		Ok(())
	}

	/// Removes every slot whose variable has the given key.
	pub fn remove_key(&mut self, key: &str) {
		self.slots.retain(|(_, variable)| variable.key != key);
	}

	/// Returns the variable at `index`.
	pub fn get(&self, index: u32) -> Result<Option<&CustomVariable>> {
		check_index(index)?;
		Ok(self
			.slots
			.iter()
			.find(|(i, _)| *i == index)
			.map(|(_, variable)| variable))
	}

	/// Returns the value stored under `key` in the lowest-numbered slot.
	pub fn get_value(&self, key: &str) -> Option<&str> {
		self.slots
			.iter()
			.filter(|(_, variable)| variable.key == key)
			.min_by_key(|(i, _)| *i)
			.map(|(_, variable)| variable.value.as_str())
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	/// Iterates `(index, variable)` pairs in first-write order.
	pub fn iter(&self) -> impl Iterator<Item = (u32, &CustomVariable)> {
		self.slots.iter().map(|(i, variable)| (*i, variable))
	}

	fn lowest_free_index(&self) -> u32 {
		let mut index = 1;
		while self.slots.iter().any(|(i, _)| *i == index) {
			index += 1;
		}
		index
	}
}

fn check_index(index: u32) -> Result<()> {
	if index == 0 {
		return Err(TrackingError::invalid_value(
			"custom variable index",
			"0 (indexes start at 1)",
		));
	}
	Ok(())
}

impl FromIterator<CustomVariable> for CustomVariables {
	fn from_iter<T: IntoIterator<Item = CustomVariable>>(iter: T) -> Self {
		let mut variables = Self::new();
		for variable in iter {
			variables.add(variable);
		}
		variables
	}
}

impl Serialize for CustomVariables {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut map = serializer.serialize_map(Some(self.slots.len()))?;
		for (index, variable) in &self.slots {
			map.serialize_entry(
				&index.to_string(),
				&(variable.key.as_str(), variable.value.as_str()),
			)?;
		}
		map.end()
	}
}

impl fmt::Display for CustomVariables {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
		f.write_str(&json)
	}
}
