// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sends a page view and a queued event using `LOOM_TRACKING_*` settings.
//!
//! ```text
//! LOOM_TRACKING_API_ENDPOINT=https://analytics.example.com/matomo.php \
//! LOOM_TRACKING_DEFAULT_SITE_ID=1 \
//! RUST_LOG=loom_tracking=debug \
//! cargo run -p loom-tracking --example send_pageview
//! ```

use loom_tracking::{Tracker, TrackingEvent};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let tracker = Tracker::from_env()?;

	let page_view = TrackingEvent {
		header_user_agent: Some("loom-tracking-example".to_string()),
		..TrackingEvent::page_view("https://example.com/docs", "Docs")
	};
	tracker.send_request(&page_view).await?;

	tracker
		.enqueue(TrackingEvent::event("example", "run", Some("send_pageview".to_string()), Some(1.0)))
		.await?;

	tracker.shutdown().await?;
	Ok(())
}
