// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The tracker: sends tracking events to a collector over HTTP.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use loom_tracking_core::{
	build_bulk_payload, prepare_query, AuthToken, RequestDefaults, TrackingEvent,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode, Url};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::batch::{BatchProcessor, BatchSender};
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::retry::{retry, RetryConfig};

/// Builder for constructing a [`Tracker`].
pub struct TrackerBuilder {
	api_endpoint: Option<String>,
	default_site_id: Option<i32>,
	default_auth_token: Option<AuthToken>,
	enabled: bool,
	request_timeout: Option<Duration>,
	user_agent: Option<String>,
	log_failed_tracking: bool,
	retry_config: Option<RetryConfig>,
	flush_interval: Option<Duration>,
	max_batch_size: Option<usize>,
	max_queue_size: Option<usize>,
}

impl TrackerBuilder {
	pub fn new() -> Self {
		Self {
			api_endpoint: None,
			default_site_id: None,
			default_auth_token: None,
			enabled: true,
			request_timeout: None,
			user_agent: None,
			log_failed_tracking: false,
			retry_config: None,
			flush_interval: None,
			max_batch_size: None,
			max_queue_size: None,
		}
	}

	/// Sets the collector endpoint.
	///
	/// Example: `https://analytics.example.com/matomo.php`
	pub fn api_endpoint(mut self, url: impl Into<String>) -> Self {
		self.api_endpoint = Some(url.into());
		self
	}

	pub fn default_site_id(mut self, site_id: i32) -> Self {
		self.default_site_id = Some(site_id);
		self
	}

	pub fn default_auth_token(mut self, token: impl Into<AuthToken>) -> Self {
		self.default_auth_token = Some(token.into());
		self
	}

	/// Disabled trackers accept every call and send nothing.
	pub fn enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);
		self
	}

	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());
		self
	}

	/// Also log failed sends at error level.
	pub fn log_failed_tracking(mut self, enabled: bool) -> Self {
		self.log_failed_tracking = enabled;
		self
	}

	pub fn retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = Some(config);
		self
	}

	pub fn flush_interval(mut self, interval: Duration) -> Self {
		self.flush_interval = Some(interval);
		self
	}

	pub fn max_batch_size(mut self, size: usize) -> Self {
		self.max_batch_size = Some(size);
		self
	}

	pub fn max_queue_size(mut self, size: usize) -> Self {
		self.max_queue_size = Some(size);
		self
	}

	/// Builds the tracker and starts the background flush task.
	///
	/// Must be called inside a Tokio runtime.
	pub fn build(self) -> Result<Tracker> {
		let endpoint = self
			.api_endpoint
			.ok_or_else(|| TrackerError::InvalidEndpoint("no endpoint configured".to_string()))?;
		let api_endpoint =
			Url::parse(&endpoint).map_err(|e| TrackerError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

		let mut config = TrackerConfig::new(api_endpoint);
		config.default_site_id = self.default_site_id;
		config.default_auth_token = self.default_auth_token;
		config.enabled = self.enabled;
		config.log_failed_tracking = self.log_failed_tracking;
		if let Some(timeout) = self.request_timeout {
			config.request_timeout = timeout;
		}
		if let Some(user_agent) = self.user_agent {
			config.user_agent = user_agent;
		}
		if let Some(retry_config) = self.retry_config {
			config.retry_config = retry_config;
		}
		if let Some(interval) = self.flush_interval {
			config.batch_config.flush_interval = interval;
		}
		if let Some(size) = self.max_batch_size {
			config.batch_config.max_batch_size = size;
		}
		if let Some(size) = self.max_queue_size {
			config.batch_config.max_queue_size = size;
		}

		Tracker::from_config(config)
	}
}

impl Default for TrackerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// HTTP side of the tracker, shared with the flush task.
struct HttpTransport {
	http_client: Client,
	config: TrackerConfig,
	defaults: RequestDefaults,
}

impl HttpTransport {
	async fn send_query(&self, query: &str) -> Result<()> {
		let mut url = self.config.api_endpoint.clone();
		url.set_query(Some(query));

		debug!(endpoint = %self.config.api_endpoint, "Sending tracking request");

		retry(&self.config.retry_config, || async {
			let response = self.http_client.get(url.clone()).send().await?;
			check_response(response).await
		})
		.await
	}

	async fn send_bulk(&self, events: &[TrackingEvent], override_token: Option<&AuthToken>) -> Result<()> {
		let body = build_bulk_payload(events, override_token, &self.defaults)?;
		let url = &self.config.api_endpoint;

		debug!(endpoint = %url, count = events.len(), "Sending bulk tracking request");

		retry(&self.config.retry_config, || async {
			let response = self
				.http_client
				.post(url.clone())
				.header(CONTENT_TYPE, "application/json")
				.body(body.clone())
				.send()
				.await?;
			check_response(response).await
		})
		.await
	}

	fn report<T>(&self, result: Result<T>) -> Result<T> {
		if let Err(e) = &result {
			if self.config.log_failed_tracking {
				error!(error = %e, "Could not send tracking request");
			}
		}
		result
	}
}

#[async_trait::async_trait]
impl BatchSender for HttpTransport {
	async fn send_batch(&self, events: Vec<TrackingEvent>) -> Result<()> {
		let result = self.send_bulk(&events, None).await;
		self.report(result)
	}
}

async fn check_response(response: Response) -> Result<()> {
	let status = response.status();

	if status == StatusCode::TOO_MANY_REQUESTS {
		let retry_after = response
			.headers()
			.get("Retry-After")
			.and_then(|v| v.to_str().ok())
			.and_then(|s| s.trim().parse().ok());
		return Err(TrackerError::RateLimited {
			retry_after_secs: retry_after,
		});
	}

	if !status.is_success() {
		return Err(TrackerError::ServerError {
			status: status.as_u16(),
			message: response.text().await.unwrap_or_default(),
		});
	}

	Ok(())
}

/// Sends tracking events to a collector.
///
/// # Example
///
/// ```ignore
/// use loom_tracking::{Tracker, TrackingEvent};
///
/// let tracker = Tracker::builder()
///     .api_endpoint("https://analytics.example.com/matomo.php")
///     .default_site_id(1)
///     .build()?;
///
/// tracker.send_request(&TrackingEvent::page_view("https://example.com/", "Home")).await?;
///
/// tracker.enqueue(TrackingEvent::event("video", "play", None, None)).await?;
/// tracker.shutdown().await?;
/// ```
pub struct Tracker {
	transport: Arc<HttpTransport>,
	processor: Arc<BatchProcessor>,
	flush_handle: Mutex<Option<JoinHandle<()>>>,
	closed: AtomicBool,
}

impl Tracker {
	pub fn builder() -> TrackerBuilder {
		TrackerBuilder::new()
	}

	/// Creates a tracker from a complete configuration.
	///
	/// Must be called inside a Tokio runtime. Endpoints with a query string
	/// are rejected.
	pub fn from_config(config: TrackerConfig) -> Result<Self> {
		if config.api_endpoint.query().is_some() {
			return Err(TrackerError::InvalidEndpoint(format!(
				"{}: endpoint must not have a query string",
				config.api_endpoint
			)));
		}

		let http_client = Client::builder()
			.user_agent(config.user_agent.clone())
			.timeout(config.request_timeout)
			.build()
			.map_err(TrackerError::RequestFailed)?;

		let transport = Arc::new(HttpTransport {
			http_client,
			defaults: config.request_defaults(),
			config,
		});

		let processor = Arc::new(BatchProcessor::new(
			transport.config.batch_config.clone(),
			transport.clone(),
		));

		let runner = Arc::clone(&processor);
		let flush_handle = tokio::spawn(async move {
			runner.run().await;
		});

		info!(
			endpoint = %transport.config.api_endpoint,
			enabled = transport.config.enabled,
			"Tracker initialized"
		);

		Ok(Self {
			transport,
			processor,
			flush_handle: Mutex::new(Some(flush_handle)),
			closed: AtomicBool::new(false),
		})
	}

	/// Loads the configuration from `LOOM_TRACKING_*` environment variables.
	pub fn from_env() -> Result<Self> {
		Self::from_config(TrackerConfig::from_env()?)
	}

	pub fn config(&self) -> &TrackerConfig {
		&self.transport.config
	}

	/// Validates, serializes and sends one event as a GET request.
	///
	/// The event's own token is used if set, else the default token.
	pub async fn send_request(&self, event: &TrackingEvent) -> Result<()> {
		self.check_closed()?;

		if !self.transport.config.enabled {
			debug!("Tracking disabled, not sending request");
			return Ok(());
		}

		let result = match prepare_query(event, None, &self.transport.defaults) {
			Ok(query) => self.transport.send_query(&query).await,
			Err(e) => Err(e.into()),
		};
		self.transport.report(result)
	}

	/// Sends several events in one POST request.
	///
	/// `override_token` beats any token on the events and the default token.
	pub async fn send_bulk_request(
		&self,
		events: &[TrackingEvent],
		override_token: Option<&AuthToken>,
	) -> Result<()> {
		self.check_closed()?;

		if !self.transport.config.enabled {
			debug!(count = events.len(), "Tracking disabled, not sending bulk request");
			return Ok(());
		}

		let result = self.transport.send_bulk(events, override_token).await;
		self.transport.report(result)
	}

	/// Queues an event for a later bulk request.
	///
	/// The event is validated now, so a bad event never poisons a batch.
	pub async fn enqueue(&self, event: TrackingEvent) -> Result<()> {
		self.check_closed()?;

		if !self.transport.config.enabled {
			debug!("Tracking disabled, not queueing event");
			return Ok(());
		}

		prepare_query(&event, None, &self.transport.defaults)?;
		self.processor.enqueue(event).await
	}

	/// Sends all queued events now.
	pub async fn flush(&self) -> Result<()> {
		self.check_closed()?;
		self.processor.flush().await
	}

	/// Stops the background task, then sends whatever is still queued.
	///
	/// Returns the result of that final flush. Later calls on this tracker
	/// fail with [`TrackerError::ClientShutdown`]; a second `shutdown` is a
	/// no-op returning `Ok(())`.
	pub async fn shutdown(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}

		info!("Shutting down tracker");

		self.processor.shutdown().await;

		if let Some(handle) = self.flush_handle.lock().await.take() {
			if let Err(e) = handle.await {
				error!(error = %e, "Error waiting for tracking flush task");
			}
		}

		let result = self.processor.flush().await;
		info!(success = result.is_ok(), "Tracker shutdown complete");
		result
	}

	pub async fn queue_len(&self) -> usize {
		self.processor.queue_len().await
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	fn check_closed(&self) -> Result<()> {
		if self.is_closed() {
			return Err(TrackerError::ClientShutdown);
		}
		Ok(())
	}
}
