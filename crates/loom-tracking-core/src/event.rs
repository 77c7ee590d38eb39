// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The tracking event: one page view, download, goal conversion, order, etc.
//!
//! Every named attribute maps to one wire parameter (see [`crate::registry`]).
//! Unset attributes are simply not sent. Events are built with struct-update
//! syntax on top of [`TrackingEvent::new`], which fills in the parameters
//! every request carries:
//!
//! ```
//! use loom_tracking_core::TrackingEvent;
//!
//! let event = TrackingEvent {
//!     site_id: Some(1),
//!     action_name: Some("Home".to_string()),
//!     action_url: Some("https://example.com/".to_string()),
//!     ..TrackingEvent::new()
//! };
//! assert_eq!(event.required, Some(true));
//! ```

use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::auth::AuthToken;
use crate::custom_variables::{CustomVariable, CustomVariables};
use crate::device::{Charset, DeviceResolution};
use crate::ecommerce::{EcommerceItem, EcommerceItems};
use crate::locale::{AcceptLanguage, Country};
use crate::visitor::{PageViewId, VisitorId};

/// Version of the collector HTTP API these requests speak.
pub const API_VERSION: &str = "1";

const RANDOM_VALUE_LENGTH: usize = 20;

/// A single analytics event ready to be validated and serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingEvent {
	/// Site the event belongs to (`idsite`). Falls back to the tracker default.
	pub site_id: Option<i32>,
	/// Must be `true` for the collector to record the request (`rec`).
	pub required: Option<bool>,
	pub action_name: Option<String>,
	pub action_url: Option<String>,
	pub api_version: Option<String>,
	pub visitor_id: Option<VisitorId>,
	pub referrer_url: Option<String>,
	pub visit_custom_variables: CustomVariables,
	pub visitor_visit_count: Option<u32>,
	pub visitor_previous_visit_timestamp: Option<DateTime<Utc>>,
	pub visitor_first_visit_timestamp: Option<DateTime<Utc>>,
	pub campaign_name: Option<String>,
	pub campaign_keyword: Option<String>,
	pub device_resolution: Option<DeviceResolution>,

	// Visitor-local time of the event.
	pub current_hour: Option<u8>,
	pub current_minute: Option<u8>,
	pub current_second: Option<u8>,

	pub plugin_flash: Option<bool>,
	pub plugin_java: Option<bool>,
	pub plugin_director: Option<bool>,
	pub plugin_quicktime: Option<bool>,
	pub plugin_pdf: Option<bool>,
	pub plugin_windows_media: Option<bool>,
	pub plugin_gears: Option<bool>,
	pub plugin_silverlight: Option<bool>,
	pub supports_cookies: Option<bool>,

	pub header_user_agent: Option<String>,
	pub header_accept_language: Option<AcceptLanguage>,
	pub user_id: Option<String>,
	/// Overrides the visitor ID the collector assigns (`cid`).
	pub forced_visitor_id: Option<VisitorId>,
	pub new_visit: Option<bool>,
	pub page_custom_variables: CustomVariables,
	pub outlink_url: Option<String>,
	pub download_url: Option<String>,

	pub search_query: Option<String>,
	pub search_category: Option<String>,
	pub search_results_count: Option<u64>,

	pub page_view_id: Option<PageViewId>,
	pub goal_id: Option<i32>,
	pub ecommerce_revenue: Option<f64>,
	pub character_set: Option<Charset>,
	pub custom_action: Option<bool>,

	// Page performance timings, in milliseconds.
	pub network_time: Option<u64>,
	pub server_time: Option<u64>,
	pub transfer_time: Option<u64>,
	pub dom_processing_time: Option<u64>,
	pub dom_completion_time: Option<u64>,
	pub onload_time: Option<u64>,

	pub event_category: Option<String>,
	pub event_action: Option<String>,
	pub event_name: Option<String>,
	pub event_value: Option<f64>,

	pub content_name: Option<String>,
	pub content_piece: Option<String>,
	pub content_target: Option<String>,
	pub content_interaction: Option<String>,

	/// Order ID. Requires a goal ID, as do all ecommerce fields below.
	pub ecommerce_id: Option<String>,
	pub ecommerce_items: EcommerceItems,
	pub ecommerce_subtotal: Option<f64>,
	pub ecommerce_tax: Option<f64>,
	pub ecommerce_shipping_cost: Option<f64>,
	pub ecommerce_discount: Option<f64>,
	pub ecommerce_last_order_timestamp: Option<DateTime<Utc>>,

	/// Visitor IP override (`cip`).
	pub visitor_ip: Option<IpAddr>,
	/// Backdates the request (`cdt`). More than four hours back needs an
	/// auth token.
	pub request_timestamp: Option<DateTime<Utc>>,
	// Location overrides; all of these need an auth token.
	pub visitor_country: Option<Country>,
	pub visitor_region: Option<String>,
	pub visitor_city: Option<String>,
	pub visitor_latitude: Option<f64>,
	pub visitor_longitude: Option<f64>,

	pub crash_message: Option<String>,
	pub crash_type: Option<String>,
	pub crash_category: Option<String>,
	pub crash_stack_trace: Option<String>,
	pub crash_location: Option<String>,
	pub crash_line: Option<u32>,
	pub crash_column: Option<u32>,

	/// Ask the collector for a GIF response instead of `204 No Content`.
	pub response_as_image: Option<bool>,
	pub ping: Option<bool>,
	pub track_bot_requests: Option<bool>,
	/// Cache buster (`rand`).
	pub random_value: Option<String>,

	/// Per-event auth token. Not serialized with the event; it takes part in
	/// token resolution instead.
	pub auth_token: Option<AuthToken>,

	/// Parameters without a named attribute, sent after the named ones.
	pub extension_parameters: ExtensionParameters,

	/// Custom dimension values, sent as `dimension1`, `dimension2`, ... in
	/// list order. Values go on the wire as given, without percent-encoding.
	pub dimensions: Vec<String>,
}

impl TrackingEvent {
	/// Creates an event with the parameters every request carries: `rec=1`,
	/// `apiv=1`, a random visitor ID, `send_image=0` and a random cache
	/// buster.
	pub fn new() -> Self {
		Self {
			required: Some(true),
			api_version: Some(API_VERSION.to_string()),
			visitor_id: Some(VisitorId::random()),
			response_as_image: Some(false),
			random_value: Some(random_value()),
			..Self::empty()
		}
	}

	/// Creates an event with nothing set at all.
	pub fn empty() -> Self {
		Self {
			site_id: None,
			required: None,
			action_name: None,
			action_url: None,
			api_version: None,
			visitor_id: None,
			referrer_url: None,
			visit_custom_variables: CustomVariables::new(),
			visitor_visit_count: None,
			visitor_previous_visit_timestamp: None,
			visitor_first_visit_timestamp: None,
			campaign_name: None,
			campaign_keyword: None,
			device_resolution: None,
			current_hour: None,
			current_minute: None,
			current_second: None,
			plugin_flash: None,
			plugin_java: None,
			plugin_director: None,
			plugin_quicktime: None,
			plugin_pdf: None,
			plugin_windows_media: None,
			plugin_gears: None,
			plugin_silverlight: None,
			supports_cookies: None,
			header_user_agent: None,
			header_accept_language: None,
			user_id: None,
			forced_visitor_id: None,
			new_visit: None,
			page_custom_variables: CustomVariables::new(),
			outlink_url: None,
			download_url: None,
			search_query: None,
			search_category: None,
			search_results_count: None,
			page_view_id: None,
			goal_id: None,
			ecommerce_revenue: None,
			character_set: None,
			custom_action: None,
			network_time: None,
			server_time: None,
			transfer_time: None,
			dom_processing_time: None,
			dom_completion_time: None,
			onload_time: None,
			event_category: None,
			event_action: None,
			event_name: None,
			event_value: None,
			content_name: None,
			content_piece: None,
			content_target: None,
			content_interaction: None,
			ecommerce_id: None,
			ecommerce_items: EcommerceItems::new(),
			ecommerce_subtotal: None,
			ecommerce_tax: None,
			ecommerce_shipping_cost: None,
			ecommerce_discount: None,
			ecommerce_last_order_timestamp: None,
			visitor_ip: None,
			request_timestamp: None,
			visitor_country: None,
			visitor_region: None,
			visitor_city: None,
			visitor_latitude: None,
			visitor_longitude: None,
			crash_message: None,
			crash_type: None,
			crash_category: None,
			crash_stack_trace: None,
			crash_location: None,
			crash_line: None,
			crash_column: None,
			response_as_image: None,
			ping: None,
			track_bot_requests: None,
			random_value: None,
			auth_token: None,
			extension_parameters: ExtensionParameters::new(),
			dimensions: Vec::new(),
		}
	}

	/// Adds a page-scoped custom variable (builder pattern).
	pub fn with_page_custom_variable(mut self, variable: CustomVariable) -> Self {
		self.page_custom_variables.add(variable);
		self
	}

	/// Adds a visit-scoped custom variable (builder pattern).
	pub fn with_visit_custom_variable(mut self, variable: CustomVariable) -> Self {
		self.visit_custom_variables.add(variable);
		self
	}

	/// Appends an ecommerce line item (builder pattern).
	pub fn with_ecommerce_item(mut self, item: EcommerceItem) -> Self {
		self.ecommerce_items.push(item);
		self
	}

	/// Appends a value to an extension parameter (builder pattern).
	pub fn with_extension_parameter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.extension_parameters.add(key, value);
		self
	}

	/// Appends a custom dimension value (builder pattern).
	pub fn with_dimension(mut self, value: impl Into<String>) -> Self {
		self.dimensions.push(value.into());
		self
	}

	/// Sets the per-event auth token (builder pattern).
	pub fn with_auth_token(mut self, token: impl Into<AuthToken>) -> Self {
		self.auth_token = Some(token.into());
		self
	}

	/// Returns true if any ecommerce-only field is set.
	pub fn has_ecommerce_fields(&self) -> bool {
		self.ecommerce_id.is_some()
			|| self.ecommerce_revenue.is_some()
			|| self.ecommerce_discount.is_some()
			|| !self.ecommerce_items.is_empty()
			|| self.ecommerce_last_order_timestamp.is_some()
			|| self.ecommerce_shipping_cost.is_some()
			|| self.ecommerce_subtotal.is_some()
			|| self.ecommerce_tax.is_some()
	}

	/// Returns true if any visitor location override is set.
	pub fn has_location_fields(&self) -> bool {
		self.visitor_longitude.is_some()
			|| self.visitor_latitude.is_some()
			|| self.visitor_region.is_some()
			|| self.visitor_city.is_some()
			|| self.visitor_country.is_some()
	}
}

impl Default for TrackingEvent {
	fn default() -> Self {
		Self::new()
	}
}

fn random_value() -> String {
	std::iter::repeat_with(fastrand::alphanumeric)
		.take(RANDOM_VALUE_LENGTH)
		.collect()
}

/// Free-form parameters keyed by wire name, each with an ordered list of
/// values.
///
/// These are independent of the named attributes: an extension parameter
/// named like a registry key is sent in addition to it, never instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionParameters {
	entries: Vec<(String, Vec<String>)>,
}

impl ExtensionParameters {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a value under `key`, keeping keys in first-insertion order.
	pub fn add(&mut self, key: impl Into<String>, value: impl ToString) {
		let key = key.into();
		let value = value.to_string();
		match self.entries.iter_mut().find(|(k, _)| *k == key) {
			Some((_, values)) => values.push(value),
			None => self.entries.push((key, vec![value])),
		}
	}

	/// Replaces all values under `key`.
	pub fn set<I, V>(&mut self, key: impl Into<String>, values: I)
	where
		I: IntoIterator<Item = V>,
		V: ToString,
	{
		let key = key.into();
		let values: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
		match self.entries.iter_mut().find(|(k, _)| *k == key) {
			Some((_, existing)) => *existing = values,
			None => self.entries.push((key, values)),
		}
	}

	pub fn remove(&mut self, key: &str) {
		self.entries.retain(|(k, _)| k != key);
	}

	pub fn get(&self, key: &str) -> Option<&[String]> {
		self.entries
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, values)| values.as_slice())
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterates `(key, values)` in first-insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
		self.entries
			.iter()
			.map(|(k, values)| (k.as_str(), values.as_slice()))
	}
}
