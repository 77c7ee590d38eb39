// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exponential backoff for collector requests.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::warn;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Total attempts, including the first one.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	/// Scale each delay by a random factor in `[0.5, 1.5)`.
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

impl RetryConfig {
	/// A single attempt, no retries.
	pub fn disabled() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}
}

/// Classifies errors into transient and permanent.
pub trait RetryableError {
	fn is_retryable(&self) -> bool;

	/// Minimum wait the server asked for, if any.
	fn retry_after(&self) -> Option<Duration> {
		None
	}
}

const RETRYABLE_STATUSES: [StatusCode; 6] = [
	StatusCode::REQUEST_TIMEOUT,
	StatusCode::TOO_MANY_REQUESTS,
	StatusCode::INTERNAL_SERVER_ERROR,
	StatusCode::BAD_GATEWAY,
	StatusCode::SERVICE_UNAVAILABLE,
	StatusCode::GATEWAY_TIMEOUT,
];

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}
		self
			.status()
			.is_some_and(|status| RETRYABLE_STATUSES.contains(&status))
	}
}

fn backoff_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
	let exponential = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
	let capped = exponential.min(cfg.max_delay.as_secs_f64());

	let delay = if cfg.jitter {
		capped * (0.5 + fastrand::f64())
	} else {
		capped
	};

	Duration::from_secs_f64(delay)
}

/// Runs `f` until it succeeds, fails permanently, or attempts run out.
///
/// The last error is returned unchanged.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Display,
{
	let mut attempt = 0;

	loop {
		let err = match f().await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};
		attempt += 1;

		if !err.is_retryable() {
			return Err(err);
		}

		if attempt >= cfg.max_attempts {
			warn!(
				error = %err,
				attempt,
				max_attempts = cfg.max_attempts,
				"Giving up on tracking request"
			);
			return Err(err);
		}

		let mut delay = backoff_delay(cfg, attempt - 1);
		if let Some(requested) = err.retry_after() {
			delay = delay.max(requested.min(cfg.max_delay));
		}

		warn!(
			error = %err,
			attempt,
			max_attempts = cfg.max_attempts,
			delay_ms = delay.as_millis() as u64,
			"Retrying tracking request"
		);

		tokio::time::sleep(delay).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	#[derive(Debug)]
	struct FakeError {
		retryable: bool,
		retry_after: Option<Duration>,
	}

	impl FakeError {
		fn transient() -> Self {
			Self {
				retryable: true,
				retry_after: None,
			}
		}

		fn permanent() -> Self {
			Self {
				retryable: false,
				retry_after: None,
			}
		}
	}

	impl std::fmt::Display for FakeError {
		fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
			write!(f, "fake error (retryable: {})", self.retryable)
		}
	}

	impl RetryableError for FakeError {
		fn is_retryable(&self) -> bool {
			self.retryable
		}

		fn retry_after(&self) -> Option<Duration> {
			self.retry_after
		}
	}

	fn fast_config(max_attempts: u32) -> RetryConfig {
		RetryConfig {
			max_attempts,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(10),
			backoff_factor: 2.0,
			jitter: false,
		}
	}

	#[tokio::test]
	async fn permanent_error_is_not_retried() {
		let calls = Arc::new(AtomicU32::new(0));

		let result: Result<(), FakeError> = retry(&fast_config(5), || {
			let calls = Arc::clone(&calls);
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				Err(FakeError::permanent())
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn transient_error_uses_every_attempt() {
		let calls = Arc::new(AtomicU32::new(0));

		let result: Result<(), FakeError> = retry(&fast_config(3), || {
			let calls = Arc::clone(&calls);
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				Err(FakeError::transient())
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn recovers_after_transient_errors() {
		let calls = Arc::new(AtomicU32::new(0));

		let result: Result<u32, FakeError> = retry(&fast_config(5), || {
			let calls = Arc::clone(&calls);
			async move {
				let n = calls.fetch_add(1, Ordering::SeqCst);
				if n < 2 {
					Err(FakeError::transient())
				} else {
					Ok(n)
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), 2);
	}

	#[tokio::test]
	async fn disabled_config_makes_one_attempt() {
		let calls = Arc::new(AtomicU32::new(0));

		let _: Result<(), FakeError> = retry(&RetryConfig::disabled(), || {
			let calls = Arc::clone(&calls);
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				Err(FakeError::transient())
			}
		})
		.await;

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn retry_after_is_capped_by_max_delay() {
		let cfg = fast_config(2);
		let started = std::time::Instant::now();

		let _: Result<(), FakeError> = retry(&cfg, || async {
			Err(FakeError {
				retryable: true,
				retry_after: Some(Duration::from_secs(3600)),
			})
		})
		.await;

		assert!(started.elapsed() < Duration::from_secs(5));
	}

	#[test]
	fn jitter_varies_delay() {
		let cfg = RetryConfig {
			base_delay: Duration::from_millis(100),
			..RetryConfig::default()
		};
		let fixed = RetryConfig {
			jitter: false,
			..cfg.clone()
		};

		let jittered: Vec<Duration> = (0..10).map(|_| backoff_delay(&cfg, 1)).collect();
		let steady: Vec<Duration> = (0..10).map(|_| backoff_delay(&fixed, 1)).collect();

		assert!(steady.windows(2).all(|w| w[0] == w[1]));
		assert!(!jittered.windows(2).all(|w| w[0] == w[1]));
	}

	#[test]
	fn delay_is_capped() {
		let cfg = RetryConfig {
			max_attempts: 10,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(5),
			backoff_factor: 10.0,
			jitter: false,
		};

		for attempt in 0..10 {
			assert!(backoff_delay(&cfg, attempt) <= Duration::from_secs(5));
		}
	}
}
