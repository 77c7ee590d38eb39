// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The parameter registry: every named attribute of a [`TrackingEvent`] with
//! its wire key and value constraints.
//!
//! The table is built once on first use and never changes afterwards, so it
//! can be read from any thread without locking. Declaration order is wire
//! order: the query serializer walks this table front to back, and the
//! collector-facing query string depends on it.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::custom_variables::CustomVariables;
use crate::device::Charset;
use crate::ecommerce::EcommerceItems;
use crate::error::{ConstraintViolation, Result, TrackingError};
use crate::event::TrackingEvent;

/// Reads one attribute off an event.
pub type Accessor = for<'a> fn(&'a TrackingEvent) -> Option<ParameterValue<'a>>;

/// A typed attribute value, before wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue<'a> {
	Bool(bool),
	Integer(i64),
	Unsigned(u64),
	Float(f64),
	Text(Cow<'a, str>),
	Charset(&'a Charset),
	Timestamp(DateTime<Utc>),
	CustomVariables(&'a CustomVariables),
	EcommerceItems(&'a EcommerceItems),
}

impl ParameterValue<'_> {
	/// Renders the value as it goes on the wire, before percent-encoding.
	///
	/// Returns `None` for values that are never sent: non-finite floats and
	/// empty collections.
	pub fn render(&self) -> Option<String> {
		match self {
			ParameterValue::Bool(true) => Some("1".to_string()),
			ParameterValue::Bool(false) => Some("0".to_string()),
			ParameterValue::Integer(n) => Some(n.to_string()),
			ParameterValue::Unsigned(n) => Some(n.to_string()),
			ParameterValue::Float(f) => render_float(*f),
			ParameterValue::Text(text) => Some(text.to_string()),
			ParameterValue::Charset(charset) => Some(charset.canonical_name().to_string()),
			ParameterValue::Timestamp(at) => Some(at.timestamp().to_string()),
			ParameterValue::CustomVariables(vars) if vars.is_empty() => None,
			ParameterValue::CustomVariables(vars) => Some(vars.to_string()),
			ParameterValue::EcommerceItems(items) if items.is_empty() => None,
			ParameterValue::EcommerceItems(items) => Some(items.to_string()),
		}
	}
}

// Shortest round-trip form that always keeps a fractional part: 1.0, 10.5.
fn render_float(value: f64) -> Option<String> {
	if !value.is_finite() {
		return None;
	}
	serde_json::to_string(&value).ok()
}

/// Static description of one wire parameter.
pub struct ParameterDescriptor {
	/// Attribute name on [`TrackingEvent`].
	pub name: &'static str,
	/// Wire key, e.g. `idsite` or `_id`.
	pub key: &'static str,
	pattern: Option<(&'static str, Regex)>,
	max_length: Option<usize>,
	accessor: Accessor,
}

impl ParameterDescriptor {
	fn new(name: &'static str, key: &'static str, accessor: Accessor) -> Self {
		Self {
			name,
			key,
			pattern: None,
			max_length: None,
			accessor,
		}
	}

	fn with_pattern(mut self, pattern: &'static str) -> Self {
		let anchored = Regex::new(&format!("^(?:{pattern})$")).unwrap();
		self.pattern = Some((pattern, anchored));
		self
	}

	fn with_max_length(mut self, max_length: usize) -> Self {
		self.max_length = Some(max_length);
		self
	}

	/// The pattern the rendered value must fully match, if any.
	pub fn pattern(&self) -> Option<&'static str> {
		self.pattern.as_ref().map(|(source, _)| *source)
	}

	/// The maximum rendered length in characters, if any.
	pub fn max_length(&self) -> Option<usize> {
		self.max_length
	}

	/// Reads this attribute off an event. `None` means unset.
	pub fn value<'a>(&self, event: &'a TrackingEvent) -> Option<ParameterValue<'a>> {
		(self.accessor)(event)
	}

	/// Checks a rendered value against this parameter's constraints.
	pub fn check(&self, rendered: &str) -> Result<()> {
		if let Some((source, regex)) = &self.pattern {
			if !regex.is_match(rendered) {
				return Err(TrackingError::ParameterConstraint {
					key: self.key,
					violation: ConstraintViolation::PatternMismatch {
						pattern: (*source).to_string(),
					},
				});
			}
		}
		if let Some(max_length) = self.max_length {
			let length = rendered.chars().count();
			if length > max_length {
				return Err(TrackingError::ParameterConstraint {
					key: self.key,
					violation: ConstraintViolation::TooLong { length, max_length },
				});
			}
		}
		Ok(())
	}
}

impl std::fmt::Debug for ParameterDescriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ParameterDescriptor")
			.field("name", &self.name)
			.field("key", &self.key)
			.field("pattern", &self.pattern())
			.field("max_length", &self.max_length)
			.finish()
	}
}

static REGISTRY: LazyLock<Vec<ParameterDescriptor>> = LazyLock::new(build_registry);

/// All registered parameters in wire order.
pub fn parameters() -> &'static [ParameterDescriptor] {
	&REGISTRY
}

/// Looks up a parameter by wire key.
pub fn parameter(key: &str) -> Option<&'static ParameterDescriptor> {
	REGISTRY.iter().find(|descriptor| descriptor.key == key)
}

fn text(value: &Option<String>) -> Option<ParameterValue<'_>> {
	value
		.as_deref()
		.map(|s| ParameterValue::Text(Cow::Borrowed(s)))
}

fn display<T: ToString>(value: &Option<T>) -> Option<ParameterValue<'static>> {
	value
		.as_ref()
		.map(|v| ParameterValue::Text(Cow::Owned(v.to_string())))
}

fn flag(value: Option<bool>) -> Option<ParameterValue<'static>> {
	value.map(ParameterValue::Bool)
}

fn int<T: Into<i64>>(value: Option<T>) -> Option<ParameterValue<'static>> {
	value.map(|v| ParameterValue::Integer(v.into()))
}

fn unsigned(value: Option<u64>) -> Option<ParameterValue<'static>> {
	value.map(ParameterValue::Unsigned)
}

fn float(value: Option<f64>) -> Option<ParameterValue<'static>> {
	value.map(ParameterValue::Float)
}

fn timestamp(value: Option<DateTime<Utc>>) -> Option<ParameterValue<'static>> {
	value.map(ParameterValue::Timestamp)
}

fn build_registry() -> Vec<ParameterDescriptor> {
	use self::ParameterDescriptor as P;

	vec![
		P::new("site_id", "idsite", |e| int(e.site_id)),
		P::new("required", "rec", |e| flag(e.required)),
		P::new("action_name", "action_name", |e| text(&e.action_name)),
		P::new("action_url", "url", |e| text(&e.action_url)),
		P::new("api_version", "apiv", |e| text(&e.api_version)),
		P::new("visitor_id", "_id", |e| display(&e.visitor_id)),
		P::new("referrer_url", "urlref", |e| text(&e.referrer_url)),
		P::new("visit_custom_variables", "_cvar", |e| {
			Some(ParameterValue::CustomVariables(&e.visit_custom_variables))
		}),
		P::new("visitor_visit_count", "_idvc", |e| int(e.visitor_visit_count)),
		P::new("visitor_previous_visit_timestamp", "_viewts", |e| {
			timestamp(e.visitor_previous_visit_timestamp)
		}),
		P::new("visitor_first_visit_timestamp", "_idts", |e| {
			timestamp(e.visitor_first_visit_timestamp)
		}),
		P::new("campaign_name", "_rcn", |e| text(&e.campaign_name)),
		P::new("campaign_keyword", "_rck", |e| text(&e.campaign_keyword)),
		P::new("device_resolution", "res", |e| display(&e.device_resolution)),
		P::new("current_hour", "h", |e| int(e.current_hour)).with_pattern(r"[01]?[0-9]|2[0-3]"),
		P::new("current_minute", "m", |e| int(e.current_minute)).with_pattern(r"[0-5]?[0-9]"),
		P::new("current_second", "s", |e| int(e.current_second)).with_pattern(r"[0-5]?[0-9]"),
		P::new("plugin_flash", "fla", |e| flag(e.plugin_flash)),
		P::new("plugin_java", "java", |e| flag(e.plugin_java)),
		P::new("plugin_director", "dir", |e| flag(e.plugin_director)),
		P::new("plugin_quicktime", "qt", |e| flag(e.plugin_quicktime)),
		P::new("plugin_pdf", "pdf", |e| flag(e.plugin_pdf)),
		P::new("plugin_windows_media", "wma", |e| flag(e.plugin_windows_media)),
		P::new("plugin_gears", "gears", |e| flag(e.plugin_gears)),
		P::new("plugin_silverlight", "ag", |e| flag(e.plugin_silverlight)),
		P::new("supports_cookies", "cookie", |e| flag(e.supports_cookies)),
		P::new("header_user_agent", "ua", |e| text(&e.header_user_agent)).with_max_length(1024),
		P::new("header_accept_language", "lang", |e| {
			display(&e.header_accept_language)
		}),
		P::new("user_id", "uid", |e| text(&e.user_id)),
		P::new("forced_visitor_id", "cid", |e| display(&e.forced_visitor_id)),
		P::new("new_visit", "new_visit", |e| flag(e.new_visit)),
		P::new("page_custom_variables", "cvar", |e| {
			Some(ParameterValue::CustomVariables(&e.page_custom_variables))
		}),
		P::new("outlink_url", "link", |e| text(&e.outlink_url)),
		P::new("download_url", "download", |e| text(&e.download_url)),
		P::new("search_query", "search", |e| text(&e.search_query)),
		P::new("search_category", "search_cat", |e| text(&e.search_category)),
		P::new("search_results_count", "search_count", |e| {
			unsigned(e.search_results_count)
		}),
		P::new("page_view_id", "pv_id", |e| display(&e.page_view_id)).with_pattern(r"[0-9a-zA-Z]{6}"),
		P::new("goal_id", "idgoal", |e| int(e.goal_id)),
		P::new("ecommerce_revenue", "revenue", |e| float(e.ecommerce_revenue)),
		P::new("character_set", "cs", |e| {
			e.character_set.as_ref().map(ParameterValue::Charset)
		}),
		P::new("custom_action", "ca", |e| flag(e.custom_action)),
		P::new("network_time", "pf_net", |e| unsigned(e.network_time)),
		P::new("server_time", "pf_srv", |e| unsigned(e.server_time)),
		P::new("transfer_time", "pf_tfr", |e| unsigned(e.transfer_time)),
		P::new("dom_processing_time", "pf_dm1", |e| unsigned(e.dom_processing_time)),
		P::new("dom_completion_time", "pf_dm2", |e| unsigned(e.dom_completion_time)),
		P::new("onload_time", "pf_onl", |e| unsigned(e.onload_time)),
		P::new("event_category", "e_c", |e| text(&e.event_category)),
		P::new("event_action", "e_a", |e| text(&e.event_action)),
		P::new("event_name", "e_n", |e| text(&e.event_name)),
		P::new("event_value", "e_v", |e| float(e.event_value)),
		P::new("content_name", "c_n", |e| text(&e.content_name)),
		P::new("content_piece", "c_p", |e| text(&e.content_piece)),
		P::new("content_target", "c_t", |e| text(&e.content_target)),
		P::new("content_interaction", "c_i", |e| text(&e.content_interaction)),
		P::new("ecommerce_id", "ec_id", |e| text(&e.ecommerce_id)),
		P::new("ecommerce_items", "ec_items", |e| {
			Some(ParameterValue::EcommerceItems(&e.ecommerce_items))
		}),
		P::new("ecommerce_subtotal", "ec_st", |e| float(e.ecommerce_subtotal)),
		P::new("ecommerce_tax", "ec_tx", |e| float(e.ecommerce_tax)),
		P::new("ecommerce_shipping_cost", "ec_sh", |e| {
			float(e.ecommerce_shipping_cost)
		}),
		P::new("ecommerce_discount", "ec_dt", |e| float(e.ecommerce_discount)),
		P::new("ecommerce_last_order_timestamp", "_ects", |e| {
			timestamp(e.ecommerce_last_order_timestamp)
		}),
		P::new("visitor_ip", "cip", |e| display(&e.visitor_ip)),
		P::new("request_timestamp", "cdt", |e| timestamp(e.request_timestamp)),
		P::new("visitor_country", "country", |e| display(&e.visitor_country)).with_max_length(2),
		P::new("visitor_region", "region", |e| text(&e.visitor_region)).with_max_length(2),
		P::new("visitor_city", "city", |e| text(&e.visitor_city)),
		P::new("visitor_latitude", "lat", |e| float(e.visitor_latitude)),
		P::new("visitor_longitude", "long", |e| float(e.visitor_longitude)),
		P::new("crash_message", "cra", |e| text(&e.crash_message)),
		P::new("crash_type", "cra_tp", |e| text(&e.crash_type)),
		P::new("crash_category", "cra_ct", |e| text(&e.crash_category)),
		P::new("crash_stack_trace", "cra_st", |e| text(&e.crash_stack_trace)),
		P::new("crash_location", "cra_ru", |e| text(&e.crash_location)),
		P::new("crash_line", "cra_rl", |e| int(e.crash_line)),
		P::new("crash_column", "cra_rc", |e| int(e.crash_column)),
		P::new("response_as_image", "send_image", |e| flag(e.response_as_image)),
		P::new("ping", "ping", |e| flag(e.ping)),
		P::new("track_bot_requests", "bots", |e| flag(e.track_bot_requests)),
		P::new("random_value", "rand", |e| text(&e.random_value)),
	]
}
