// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Queued tracking with a background flush task.
//!
//! Events wait in a bounded queue until `max_batch_size` of them have
//! accumulated or `flush_interval` elapses, then go out as bulk requests of at
//! most `max_batch_size` events each. When the queue is full the oldest event
//! is dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use loom_tracking_core::TrackingEvent;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

use crate::error::{Result, TrackerError};

#[derive(Debug, Clone)]
pub struct BatchConfig {
	/// Events per bulk request, and the queue length that triggers a flush.
	pub max_batch_size: usize,
	/// Interval between automatic flushes.
	pub flush_interval: Duration,
	/// Queue capacity; the oldest event is dropped beyond this.
	pub max_queue_size: usize,
}

impl Default for BatchConfig {
	fn default() -> Self {
		Self {
			max_batch_size: 20,
			flush_interval: Duration::from_secs(10),
			max_queue_size: 1000,
		}
	}
}

/// Sends one batch of events as a single bulk request.
#[async_trait::async_trait]
pub trait BatchSender: Send + Sync {
	async fn send_batch(&self, events: Vec<TrackingEvent>) -> Result<()>;
}

pub struct BatchProcessor {
	config: BatchConfig,
	sender: Arc<dyn BatchSender>,
	queue: Mutex<VecDeque<TrackingEvent>>,
	shutdown: AtomicBool,
	flush_notify: Notify,
}

impl BatchProcessor {
	pub fn new(config: BatchConfig, sender: Arc<dyn BatchSender>) -> Self {
		Self {
			config,
			sender,
			queue: Mutex::new(VecDeque::new()),
			shutdown: AtomicBool::new(false),
			flush_notify: Notify::new(),
		}
	}

	/// Adds an event to the queue, waking the flush task once a full batch
	/// is waiting.
	pub async fn enqueue(&self, event: TrackingEvent) -> Result<()> {
		let mut queue = self.queue.lock().await;

		// checked under the lock so nothing lands after the final flush
		if self.shutdown.load(Ordering::SeqCst) {
			return Err(TrackerError::ClientShutdown);
		}

		while queue.len() >= self.config.max_queue_size.max(1) {
			if let Some(dropped) = queue.pop_front() {
				warn!(
					action_name = dropped.action_name.as_deref().unwrap_or(""),
					"Dropped tracking event due to queue overflow"
				);
			}
		}

		queue.push_back(event);

		if queue.len() >= self.config.max_batch_size {
			drop(queue);
			self.flush_notify.notify_one();
		}

		Ok(())
	}

	/// Sends everything queued right now.
	///
	/// All chunks are attempted; the first failure is returned.
	pub async fn flush(&self) -> Result<()> {
		let events: Vec<TrackingEvent> = {
			let mut queue = self.queue.lock().await;
			queue.drain(..).collect()
		};

		if events.is_empty() {
			return Ok(());
		}

		debug!(count = events.len(), "Flushing tracking queue");

		let mut first_error = None;
		for chunk in events.chunks(self.config.max_batch_size.max(1)) {
			if let Err(e) = self.sender.send_batch(chunk.to_vec()).await {
				error!(error = %e, count = chunk.len(), "Failed to send tracking batch");
				first_error.get_or_insert(e);
			}
		}

		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}

	pub async fn queue_len(&self) -> usize {
		self.queue.lock().await.len()
	}

	/// Stops accepting events and wakes the flush task so it can exit.
	///
	/// Events still queued stay there; the caller drains them with a last
	/// [`BatchProcessor::flush`] once [`BatchProcessor::run`] has returned.
	pub async fn shutdown(&self) {
		let _queue = self.queue.lock().await;
		self.shutdown.store(true, Ordering::SeqCst);
		self.flush_notify.notify_one();
	}

	pub fn is_shutdown(&self) -> bool {
		self.shutdown.load(Ordering::SeqCst)
	}

	/// Runs the flush loop until [`BatchProcessor::shutdown`] is called.
	pub async fn run(&self) {
		info!(
			flush_interval_secs = self.config.flush_interval.as_secs(),
			max_batch_size = self.config.max_batch_size,
			"Starting tracking batch processor"
		);

		loop {
			tokio::select! {
				_ = tokio::time::sleep(self.config.flush_interval) => {}
				_ = self.flush_notify.notified() => {}
			}

			if self.is_shutdown() {
				break;
			}

			if let Err(e) = self.flush().await {
				debug!(error = %e, "Background tracking flush failed");
			}
		}

		info!("Tracking batch processor stopped");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::sync::atomic::AtomicUsize;

	#[derive(Default)]
	struct RecordingSender {
		batches: Mutex<Vec<Vec<TrackingEvent>>>,
		fail: AtomicBool,
		calls: AtomicUsize,
	}

	#[async_trait::async_trait]
	impl BatchSender for RecordingSender {
		async fn send_batch(&self, events: Vec<TrackingEvent>) -> Result<()> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if self.fail.load(Ordering::SeqCst) {
				return Err(TrackerError::ServerError {
					status: 500,
					message: "unavailable".to_string(),
				});
			}
			self.batches.lock().await.push(events);
			Ok(())
		}
	}

	fn page(name: &str) -> TrackingEvent {
		TrackingEvent::page_view("https://example.com/", name)
	}

	fn names(batch: &[TrackingEvent]) -> Vec<&str> {
		batch
			.iter()
			.filter_map(|e| e.action_name.as_deref())
			.collect()
	}

	fn quiet_config(max_batch_size: usize, max_queue_size: usize) -> BatchConfig {
		BatchConfig {
			max_batch_size,
			flush_interval: Duration::from_secs(3600),
			max_queue_size,
		}
	}

	#[tokio::test]
	async fn enqueue_holds_events_until_flush() {
		let sender = Arc::new(RecordingSender::default());
		let processor = BatchProcessor::new(quiet_config(10, 100), sender.clone());

		processor.enqueue(page("a")).await.unwrap();
		processor.enqueue(page("b")).await.unwrap();
		assert_eq!(processor.queue_len().await, 2);
		assert!(sender.batches.lock().await.is_empty());

		processor.flush().await.unwrap();
		let batches = sender.batches.lock().await;
		assert_eq!(batches.len(), 1);
		assert_eq!(names(&batches[0]), ["a", "b"]);
		drop(batches);
		assert_eq!(processor.queue_len().await, 0);
	}

	#[tokio::test]
	async fn flush_splits_into_batches() {
		let sender = Arc::new(RecordingSender::default());
		let processor = BatchProcessor::new(quiet_config(2, 100), sender.clone());

		for name in ["a", "b", "c", "d", "e"] {
			processor.enqueue(page(name)).await.unwrap();
		}
		processor.flush().await.unwrap();

		let batches = sender.batches.lock().await;
		let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
		assert_eq!(sizes, [2, 2, 1]);
	}

	#[tokio::test]
	async fn empty_flush_sends_nothing() {
		let sender = Arc::new(RecordingSender::default());
		let processor = BatchProcessor::new(quiet_config(10, 100), sender.clone());

		processor.flush().await.unwrap();
		assert_eq!(sender.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn overflow_drops_oldest() {
		let sender = Arc::new(RecordingSender::default());
		let processor = BatchProcessor::new(quiet_config(100, 3), sender.clone());

		for i in 0..5 {
			processor.enqueue(page(&format!("e{i}"))).await.unwrap();
		}
		assert_eq!(processor.queue_len().await, 3);

		processor.flush().await.unwrap();
		let batches = sender.batches.lock().await;
		assert_eq!(names(&batches[0]), ["e2", "e3", "e4"]);
	}

	#[tokio::test]
	async fn enqueue_after_shutdown_fails() {
		let sender = Arc::new(RecordingSender::default());
		let processor = BatchProcessor::new(BatchConfig::default(), sender);

		processor.shutdown().await;
		let result = processor.enqueue(page("late")).await;
		assert!(matches!(result, Err(TrackerError::ClientShutdown)));
	}

	#[tokio::test]
	async fn failed_send_is_reported_and_queue_is_cleared() {
		let sender = Arc::new(RecordingSender::default());
		sender.fail.store(true, Ordering::SeqCst);
		let processor = BatchProcessor::new(quiet_config(1, 100), sender.clone());

		processor.enqueue(page("a")).await.unwrap();
		processor.enqueue(page("b")).await.unwrap();

		let result = processor.flush().await;
		assert!(matches!(result, Err(TrackerError::ServerError { status: 500, .. })));
		assert_eq!(sender.calls.load(Ordering::SeqCst), 2);
		assert_eq!(processor.queue_len().await, 0);
	}

	#[tokio::test]
	async fn full_batch_wakes_background_task() {
		let sender = Arc::new(RecordingSender::default());
		let processor = Arc::new(BatchProcessor::new(quiet_config(2, 100), sender.clone()));

		let runner = Arc::clone(&processor);
		let handle = tokio::spawn(async move { runner.run().await });

		processor.enqueue(page("a")).await.unwrap();
		processor.enqueue(page("b")).await.unwrap();

		for _ in 0..100 {
			if !sender.batches.lock().await.is_empty() {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		assert_eq!(sender.batches.lock().await.len(), 1);

		processor.shutdown().await;
		handle.await.unwrap();
	}

	#[tokio::test]
	async fn shutdown_leaves_pending_events_for_final_flush() {
		let sender = Arc::new(RecordingSender::default());
		let processor = Arc::new(BatchProcessor::new(quiet_config(10, 100), sender.clone()));

		let runner = Arc::clone(&processor);
		let handle = tokio::spawn(async move { runner.run().await });

		processor.enqueue(page("pending")).await.unwrap();
		processor.shutdown().await;
		handle.await.unwrap();

		assert_eq!(processor.queue_len().await, 1);
		assert_eq!(sender.calls.load(Ordering::SeqCst), 0);

		processor.flush().await.unwrap();
		let batches = sender.batches.lock().await;
		assert_eq!(batches.len(), 1);
		assert_eq!(names(&batches[0]), ["pending"]);
	}

	#[tokio::test]
	async fn final_flush_after_shutdown_reports_failure() {
		let sender = Arc::new(RecordingSender::default());
		sender.fail.store(true, Ordering::SeqCst);
		let processor = Arc::new(BatchProcessor::new(quiet_config(10, 100), sender.clone()));

		let runner = Arc::clone(&processor);
		let handle = tokio::spawn(async move { runner.run().await });

		processor.enqueue(page("pending")).await.unwrap();
		processor.shutdown().await;
		handle.await.unwrap();

		let result = processor.flush().await;
		assert!(matches!(result, Err(TrackerError::ServerError { status: 500, .. })));
		assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
	}

	proptest! {
		#[test]
		fn queue_never_exceeds_capacity(capacity in 1usize..20, count in 0usize..60) {
			let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
			rt.block_on(async {
				let sender = Arc::new(RecordingSender::default());
				let processor = BatchProcessor::new(quiet_config(1000, capacity), sender);
				for i in 0..count {
					processor.enqueue(page(&i.to_string())).await.unwrap();
				}
				assert_eq!(processor.queue_len().await, count.min(capacity));
			});
		}
	}
}
