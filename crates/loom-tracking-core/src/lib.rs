// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Loom web analytics tracking requests.
//!
//! This crate models a single tracking hit and turns it into what the
//! collector's HTTP API expects. It does no I/O; the `loom-tracking` SDK
//! sends the results.
//!
//! # Overview
//!
//! - [`TrackingEvent`] holds every attribute of a hit; unset attributes are
//!   not sent
//! - [`registry`] maps each attribute to its wire key and constraints, in
//!   wire order
//! - [`validate()`] checks cross-field rules before serialization
//! - [`serialize_query`] renders one event as a query string
//! - [`build_bulk_payload`] renders many events as one JSON body
//! - [`resolve_auth_token`] picks the token for a request or batch
//!
//! ```
//! use loom_tracking_core::{prepare_query, RequestDefaults, TrackingEvent};
//!
//! let event = TrackingEvent::page_view("https://example.com/", "Home");
//! let defaults = RequestDefaults::new().with_site_id(1);
//! let query = prepare_query(&event, None, &defaults).unwrap();
//! assert!(query.starts_with("idsite=1&rec=1&action_name=Home"));
//! ```

pub mod auth;
pub mod bulk;
pub mod custom_variables;
pub mod device;
pub mod ecommerce;
pub mod error;
pub mod event;
pub mod locale;
mod presets;
pub mod query;
pub mod registry;
pub mod validate;
pub mod visitor;

pub use auth::{resolve_auth_token, AuthToken, AUTH_TOKEN_LENGTH};
pub use bulk::build_bulk_payload;
pub use custom_variables::{CustomVariable, CustomVariables};
pub use device::{Charset, DeviceResolution};
pub use ecommerce::{EcommerceItem, EcommerceItems};
pub use error::{ConfigurationError, ConstraintViolation, Result, TrackingError, ValidationError};
pub use event::{ExtensionParameters, TrackingEvent, API_VERSION};
pub use locale::{AcceptLanguage, Country, LanguageRange};
pub use query::{prepare_query, serialize_query, RequestDefaults};
pub use registry::{ParameterDescriptor, ParameterValue};
pub use validate::{validate, validate_at};
pub use visitor::{PageViewId, VisitorId};
