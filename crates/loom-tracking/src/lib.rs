// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rust SDK for Loom web analytics tracking.
//!
//! Sends [`TrackingEvent`]s to a Matomo-compatible collector, either one at a
//! time as GET requests or many at once as a JSON bulk POST.
//!
//! # Quick Start
//!
//! ```ignore
//! use loom_tracking::{Tracker, TrackingEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracker = Tracker::builder()
//!         .api_endpoint("https://analytics.example.com/matomo.php")
//!         .default_site_id(1)
//!         .build()?;
//!
//!     tracker
//!         .send_request(&TrackingEvent::page_view("https://example.com/", "Home"))
//!         .await?;
//!
//!     tracker.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Queued Sending
//!
//! [`Tracker::enqueue`] validates the event and puts it on an in-memory
//! queue. A background task sends the queue as bulk requests every
//! `flush_interval`, or as soon as `max_batch_size` events are waiting. Call
//! [`Tracker::shutdown`] before exiting so nothing is left behind.
//!
//! # Errors
//!
//! Timeouts, connection failures and 408/429/5xx responses are retried with
//! exponential backoff. Validation and serialization errors are returned
//! immediately and never reach the network.

pub mod batch;
pub mod config;
pub mod error;
pub mod retry;
pub mod tracker;

pub use batch::{BatchConfig, BatchProcessor, BatchSender};
pub use config::TrackerConfig;
pub use error::{ConfigError, Result, TrackerError};
pub use retry::{RetryConfig, RetryableError};
pub use tracker::{Tracker, TrackerBuilder};

// Re-export the request model so callers need only this crate.
pub use loom_tracking_core::{
	AcceptLanguage, AuthToken, Charset, Country, CustomVariable, CustomVariables, DeviceResolution,
	EcommerceItem, EcommerceItems, PageViewId, TrackingError, TrackingEvent, VisitorId,
};
