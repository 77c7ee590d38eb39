// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Constructors for the common kinds of hits.
//!
//! Each one starts from [`TrackingEvent::new`] and fills in the fields that
//! kind of hit needs. Anything else can still be set with struct-update
//! syntax on the result.

use crate::event::TrackingEvent;

impl TrackingEvent {
	/// A page view of `url` titled `title`.
	pub fn page_view(url: impl Into<String>, title: impl Into<String>) -> Self {
		Self {
			action_url: Some(url.into()),
			action_name: Some(title.into()),
			..Self::new()
		}
	}

	/// A file download.
	pub fn download(url: impl Into<String>) -> Self {
		let url = url.into();
		Self {
			action_url: Some(url.clone()),
			download_url: Some(url),
			..Self::new()
		}
	}

	/// A click on a link leaving the site.
	pub fn outlink(url: impl Into<String>) -> Self {
		let url = url.into();
		Self {
			action_url: Some(url.clone()),
			outlink_url: Some(url),
			..Self::new()
		}
	}

	/// An internal site search.
	pub fn site_search(
		query: impl Into<String>,
		category: Option<String>,
		results_count: Option<u64>,
	) -> Self {
		Self {
			search_query: Some(query.into()),
			search_category: category,
			search_results_count: results_count,
			..Self::new()
		}
	}

	/// A custom event. Category and action are required by the collector.
	pub fn event(
		category: impl Into<String>,
		action: impl Into<String>,
		name: Option<String>,
		value: Option<f64>,
	) -> Self {
		Self {
			event_category: Some(category.into()),
			event_action: Some(action.into()),
			event_name: name,
			event_value: value,
			..Self::new()
		}
	}

	/// A manual goal conversion.
	pub fn goal(goal_id: i32, revenue: Option<f64>) -> Self {
		Self {
			goal_id: Some(goal_id),
			ecommerce_revenue: revenue,
			..Self::new()
		}
	}

	/// A cart update; add items with [`TrackingEvent::with_ecommerce_item`].
	pub fn ecommerce_cart_update(revenue: f64) -> Self {
		Self {
			goal_id: Some(0),
			ecommerce_revenue: Some(revenue),
			..Self::new()
		}
	}

	/// A completed order.
	pub fn ecommerce_order(order_id: impl Into<String>, revenue: f64) -> Self {
		Self {
			goal_id: Some(0),
			ecommerce_id: Some(order_id.into()),
			ecommerce_revenue: Some(revenue),
			..Self::new()
		}
	}

	pub fn content_impression(
		name: impl Into<String>,
		piece: Option<String>,
		target: Option<String>,
	) -> Self {
		Self {
			content_name: Some(name.into()),
			content_piece: piece,
			content_target: target,
			..Self::new()
		}
	}

	pub fn content_interaction(
		interaction: impl Into<String>,
		name: impl Into<String>,
		piece: Option<String>,
		target: Option<String>,
	) -> Self {
		Self {
			content_interaction: Some(interaction.into()),
			..Self::content_impression(name, piece, target)
		}
	}

	/// A client-side crash report.
	pub fn crash(
		message: impl Into<String>,
		crash_type: Option<String>,
		category: Option<String>,
	) -> Self {
		Self {
			crash_message: Some(message.into()),
			crash_type,
			crash_category: category,
			..Self::new()
		}
	}

	/// A heartbeat that extends the current visit without counting a hit.
	pub fn ping() -> Self {
		Self {
			ping: Some(true),
			..Self::new()
		}
	}
}
