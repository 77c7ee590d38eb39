// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use loom_tracking::{
	AuthToken, EcommerceItem, RetryConfig, Tracker, TrackerError, TrackingEvent, VisitorId,
};
use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "0123456789abcdef0123456789abcdef";

fn fixed_event() -> TrackingEvent {
	TrackingEvent {
		visitor_id: Some(VisitorId::from_hex("00bbccddeeff1122").unwrap()),
		random_value: Some("someRandom".to_string()),
		..TrackingEvent::new()
	}
}

fn fast_retries() -> RetryConfig {
	RetryConfig {
		max_attempts: 3,
		base_delay: Duration::from_millis(1),
		max_delay: Duration::from_millis(5),
		backoff_factor: 2.0,
		jitter: false,
	}
}

fn tracker_for(server: &MockServer) -> Tracker {
	Tracker::builder()
		.api_endpoint(format!("{}/matomo.php", server.uri()))
		.default_site_id(42)
		.retry_config(fast_retries())
		.flush_interval(Duration::from_secs(3600))
		.build()
		.unwrap()
}

#[tokio::test]
async fn send_request_issues_get_with_serialized_query() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/matomo.php"))
		.respond_with(ResponseTemplate::new(204))
		.expect(1)
		.mount(&server)
		.await;

	let tracker = tracker_for(&server);
	tracker.send_request(&fixed_event()).await.unwrap();

	let requests = server.received_requests().await.unwrap();
	assert_eq!(
		requests[0].url.query(),
		Some("idsite=42&rec=1&apiv=1&_id=00bbccddeeff1122&send_image=0&rand=someRandom")
	);
	tracker.shutdown().await.unwrap();
}

#[tokio::test]
async fn send_request_uses_event_token() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(200))
		.mount(&server)
		.await;

	let tracker = tracker_for(&server);
	let event = TrackingEvent {
		visitor_city: Some("Berlin".to_string()),
		..fixed_event()
	}
	.with_auth_token(TOKEN);
	tracker.send_request(&event).await.unwrap();

	let requests = server.received_requests().await.unwrap();
	let query = requests[0].url.query().unwrap();
	assert!(query.starts_with(&format!("idsite=42&token_auth={TOKEN}&rec=1")));
	assert!(query.contains("city=Berlin"));
	tracker.shutdown().await.unwrap();
}

#[tokio::test]
async fn send_bulk_request_posts_json_envelope() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/matomo.php"))
		.and(header("content-type", "application/json"))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let tracker = tracker_for(&server);
	let order = TrackingEvent {
		site_id: Some(3),
		..TrackingEvent::ecommerce_order("A-1", 25.0)
	}
	.with_ecommerce_item(EcommerceItem::new("SKU-1").with_price(12.5).with_quantity(2));
	let events = [fixed_event(), order];
	let token = AuthToken::new(TOKEN);

	tracker.send_bulk_request(&events, Some(&token)).await.unwrap();

	let requests = server.received_requests().await.unwrap();
	let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
	assert_eq!(body["token_auth"], TOKEN);
	assert_eq!(
		body["requests"][0],
		"?idsite=42&rec=1&apiv=1&_id=00bbccddeeff1122&send_image=0&rand=someRandom"
	);
	let second = body["requests"][1].as_str().unwrap();
	assert!(second.starts_with("?idsite=3&"));
	assert!(second.contains("idgoal=0"));
	assert!(second.contains("ec_id=A-1"));
	assert!(!second.contains("token_auth"));
	tracker.shutdown().await.unwrap();
}

#[tokio::test]
async fn disabled_tracker_sends_nothing() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(200))
		.expect(0)
		.mount(&server)
		.await;

	let tracker = Tracker::builder()
		.api_endpoint(format!("{}/matomo.php", server.uri()))
		.enabled(false)
		.build()
		.unwrap();

	// would fail validation and site lookup if it were sent
	let event = TrackingEvent {
		site_id: Some(-1),
		..TrackingEvent::new()
	};
	tracker.send_request(&event).await.unwrap();
	tracker.send_bulk_request(&[], None).await.unwrap();
	tracker.enqueue(event).await.unwrap();
	tracker.shutdown().await.unwrap();
}

#[tokio::test]
async fn rate_limit_reports_retry_after() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
		.mount(&server)
		.await;

	let tracker = Tracker::builder()
		.api_endpoint(format!("{}/matomo.php", server.uri()))
		.default_site_id(1)
		.retry_config(RetryConfig::disabled())
		.build()
		.unwrap();

	let result = tracker.send_request(&fixed_event()).await;
	assert!(matches!(
		result,
		Err(TrackerError::RateLimited {
			retry_after_secs: Some(7)
		})
	));
	tracker.shutdown().await.unwrap();
}

#[tokio::test]
async fn server_errors_are_retried() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(503))
		.up_to_n_times(2)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(204))
		.mount(&server)
		.await;

	let tracker = tracker_for(&server);
	tracker.send_request(&fixed_event()).await.unwrap();

	assert_eq!(server.received_requests().await.unwrap().len(), 3);
	tracker.shutdown().await.unwrap();
}

#[tokio::test]
async fn client_errors_are_not_retried() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
		.expect(1)
		.mount(&server)
		.await;

	let tracker = tracker_for(&server);
	let result = tracker.send_request(&fixed_event()).await;
	match result {
		Err(TrackerError::ServerError { status, message }) => {
			assert_eq!(status, 400);
			assert_eq!(message, "bad request");
		}
		other => panic!("expected server error, got {other:?}"),
	}
	tracker.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_event_never_reaches_the_network() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(200))
		.expect(0)
		.mount(&server)
		.await;

	let tracker = tracker_for(&server);
	let event = TrackingEvent {
		ecommerce_revenue: Some(9.99),
		..fixed_event()
	};
	let result = tracker.send_request(&event).await;
	assert!(matches!(result, Err(TrackerError::Tracking(_))));
	tracker.shutdown().await.unwrap();
}

#[tokio::test]
async fn queued_events_go_out_as_one_bulk_request() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let tracker = tracker_for(&server);
	tracker.enqueue(TrackingEvent::page_view("https://example.com/a", "A")).await.unwrap();
	tracker.enqueue(TrackingEvent::page_view("https://example.com/b", "B")).await.unwrap();
	assert_eq!(tracker.queue_len().await, 2);

	tracker.flush().await.unwrap();
	assert_eq!(tracker.queue_len().await, 0);

	let requests = server.received_requests().await.unwrap();
	let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
	assert_eq!(body["requests"].as_array().unwrap().len(), 2);
	assert!(body.get("token_auth").is_none());
	tracker.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_flushes_queue() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let tracker = tracker_for(&server);
	tracker.enqueue(TrackingEvent::ping()).await.unwrap();
	tracker.shutdown().await.unwrap();

	assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn shutdown_reports_failed_final_flush() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(500).set_body_string("down"))
		.expect(1)
		.mount(&server)
		.await;

	let tracker = Tracker::builder()
		.api_endpoint(format!("{}/matomo.php", server.uri()))
		.default_site_id(1)
		.retry_config(RetryConfig::disabled())
		.flush_interval(Duration::from_secs(3600))
		.build()
		.unwrap();

	tracker.enqueue(TrackingEvent::ping()).await.unwrap();
	let result = tracker.shutdown().await;
	assert!(matches!(result, Err(TrackerError::ServerError { status: 500, .. })));
	assert_eq!(tracker.queue_len().await, 0);

	tracker.shutdown().await.unwrap();
}
