/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Canned HTTP responses for testing code that talks to the network.
//!
//! Register a [`MockResponse`] for a URL and every request for exactly that URL loaded through
//! the [`ProtocolChain`] is answered by a [`MockUrlProtocol`] instead of a server. A response can
//! carry a status, HTTP version, headers, a body, a simulated [delay](ResponseDelay), and a
//! simulated error that fails the load after the head and body were delivered.
//!
//! # Examples
//!
//! ```rust
//! use bytes::Bytes;
//! use mock_networking::{MockNetworking, MockResponse, ProtocolChain, ResponseDelay};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn docs() {
//! let chain = Arc::new(ProtocolChain::new());
//! let mocks = MockNetworking::new(chain.clone());
//!
//! let url: http::Uri = "https://example.com/users/7".parse().unwrap();
//! mocks.register(
//!     MockResponse::builder()
//!         .status(200)
//!         .header("Content-Type", "application/json")
//!         .body(r#"{"name": "Ada"}"#)
//!         .delay(ResponseDelay::between(
//!             Duration::from_millis(5),
//!             Duration::from_millis(15),
//!         ))
//!         .build(),
//!     url.clone(),
//! );
//!
//! let request = http::Request::get(url).body(Bytes::new()).unwrap();
//! let response = chain.load(request).await.unwrap();
//! assert_eq!(200, response.status().as_u16());
//! assert_eq!("application/json", response.headers()["content-type"]);
//! # }
//! ```
//!
//! Tests that cannot pass a chain around can use [`MockNetworking::shared`], which installs
//! into [`ProtocolChain::global`].

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */
#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

pub mod chain;
mod delay;
pub mod error;
mod interceptor;
pub mod networking;
pub mod protocol;
mod registry;
mod response;

pub use chain::{ProtocolChain, Transcript};
pub use delay::ResponseDelay;
pub use error::{ErrorKind, LoadError, MockNetworkingError};
pub use interceptor::{MockUrlProtocol, MOCK_URL_PROTOCOL};
pub use networking::MockNetworking;
pub use registry::ResponseRegistry;
pub use response::{MockResponse, MockResponseBuilder, HTTP_1_1};
