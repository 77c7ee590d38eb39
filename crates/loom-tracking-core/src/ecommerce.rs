// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ecommerce line items.
//!
//! Items travel as a JSON array of `[sku, name, category, price, quantity]`
//! arrays. Missing text fields are sent as `""`, missing numbers as zero.

use std::fmt;

use serde::ser::{Serialize, SerializeTuple, Serializer};

/// One line item of a cart or order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EcommerceItem {
	pub sku: Option<String>,
	pub name: Option<String>,
	pub category: Option<String>,
	pub price: Option<f64>,
	pub quantity: Option<u64>,
}

impl EcommerceItem {
	/// Creates an item with just a SKU.
	pub fn new(sku: impl Into<String>) -> Self {
		Self {
			sku: Some(sku.into()),
			..Default::default()
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());
		self
	}

	pub fn with_price(mut self, price: f64) -> Self {
		self.price = Some(price);
		self
	}

	pub fn with_quantity(mut self, quantity: u64) -> Self {
		self.quantity = Some(quantity);
		self
	}
}

impl Serialize for EcommerceItem {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut tuple = serializer.serialize_tuple(5)?;
		tuple.serialize_element(self.sku.as_deref().unwrap_or(""))?;
		tuple.serialize_element(self.name.as_deref().unwrap_or(""))?;
		tuple.serialize_element(self.category.as_deref().unwrap_or(""))?;
		tuple.serialize_element(&self.price.filter(|p| p.is_finite()).unwrap_or(0.0))?;
		tuple.serialize_element(&self.quantity.unwrap_or(0))?;
		tuple.end()
	}
}

/// The ordered line items of one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EcommerceItems {
	items: Vec<EcommerceItem>,
}

impl EcommerceItems {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, item: EcommerceItem) {
		self.items.push(item);
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, EcommerceItem> {
		self.items.iter()
	}
}

impl From<Vec<EcommerceItem>> for EcommerceItems {
	fn from(items: Vec<EcommerceItem>) -> Self {
		Self { items }
	}
}

impl FromIterator<EcommerceItem> for EcommerceItems {
	fn from_iter<T: IntoIterator<Item = EcommerceItem>>(iter: T) -> Self {
		Self {
			items: iter.into_iter().collect(),
		}
	}
}

impl Serialize for EcommerceItems {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		self.items.serialize(serializer)
	}
}

impl fmt::Display for EcommerceItems {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
		f.write_str(&json)
	}
}
