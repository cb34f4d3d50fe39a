/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Registration of mock responses and installation of the mock protocol.

use crate::chain::ProtocolChain;
use crate::delay::ResponseDelay;
use crate::interceptor::{MockUrlProtocol, MOCK_URL_PROTOCOL};
use crate::protocol::{SharedUrlProtocol, UrlProtocol};
use crate::registry::ResponseRegistry;
use crate::response::MockResponse;
use aws_smithy_async::rt::sleep::{AsyncSleep, SharedAsyncSleep, TokioSleep};
use http::Uri;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, PoisonError};

static SHARED_MOCK_NETWORKING: Lazy<MockNetworking> = Lazy::new(|| {
    MockNetworking::builder()
        .protocol_chain(ProtocolChain::global())
        .build()
});

/// Registers mock responses and installs a [`MockUrlProtocol`] into a [`ProtocolChain`].
///
/// The protocol is added to the chain the first time a response is registered and stays
/// there until [`unregister`](Self::unregister) is called. Clearing responses does not remove it.
///
/// # Examples
///
/// ```rust
/// use mock_networking::{MockNetworking, MockResponse, ProtocolChain};
/// use bytes::Bytes;
/// use std::sync::Arc;
///
/// # async fn docs() {
/// let chain = Arc::new(ProtocolChain::new());
/// let mocks = MockNetworking::new(chain.clone());
/// let url: http::Uri = "https://example.com/greeting".parse().unwrap();
/// mocks.register(MockResponse::builder().body("Hello World").build(), url.clone());
///
/// let request = http::Request::builder().uri(url).body(Bytes::new()).unwrap();
/// let response = chain.load(request).await.unwrap();
/// assert_eq!(&b"Hello World"[..], &response.body()[..]);
/// # }
/// ```
#[derive(Debug)]
pub struct MockNetworking {
    registry: Arc<ResponseRegistry>,
    protocol: Arc<MockUrlProtocol>,
    chain: Arc<ProtocolChain>,
    registered: Mutex<bool>,
}

impl MockNetworking {
    /// Creates an instance that installs its protocol into `chain`.
    pub fn new(chain: Arc<ProtocolChain>) -> Self {
        Self::builder().protocol_chain(chain).build()
    }

    /// Returns a builder for `MockNetworking`.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The process-wide instance, bound to [`ProtocolChain::global`].
    pub fn shared() -> &'static MockNetworking {
        &SHARED_MOCK_NETWORKING
    }

    /// Adds the protocol to the chain if it is not there yet.
    ///
    /// Returns true if this call added it.
    pub fn register_protocol(&self) -> bool {
        let mut registered = self.registered.lock().unwrap_or_else(PoisonError::into_inner);
        if *registered {
            return false;
        }
        let protocol = SharedUrlProtocol::new(self.protocol.clone());
        if self.chain.register(protocol) {
            *registered = true;
            true
        } else {
            tracing::warn!(
                protocol = self.protocol_name(),
                "another protocol with the same name is already registered"
            );
            false
        }
    }

    /// Removes the protocol from the chain. Registered responses are kept.
    ///
    /// Returns true if the protocol was registered.
    pub fn unregister(&self) -> bool {
        let mut registered = self.registered.lock().unwrap_or_else(PoisonError::into_inner);
        if !*registered {
            return false;
        }
        self.chain.unregister(self.protocol_name());
        *registered = false;
        true
    }

    /// Returns true if the protocol is currently installed in the chain.
    pub fn is_registered(&self) -> bool {
        *self.registered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answers requests for `url` with `response`, replacing any previous response.
    pub fn register(&self, response: MockResponse, url: Uri) {
        self.register_protocol();
        tracing::debug!(url = %url, status = response.status(), "registered mock response");
        self.registry.put(url, response);
    }

    /// Answers requests for `url` with the status and headers of `response`.
    ///
    /// No body is delivered and the HTTP version is always `HTTP/1.1`. Repeated headers are
    /// folded into one comma-separated value. Header values that are not valid UTF-8 are skipped.
    pub fn register_response<B>(
        &self,
        response: &http::Response<B>,
        url: Uri,
        delay: Option<ResponseDelay>,
    ) {
        let headers = response.headers().keys().filter_map(|name| {
            let values: Vec<&str> = response
                .headers()
                .get_all(name)
                .iter()
                .filter_map(|value| match value.to_str() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(
                            header = %name,
                            "skipping header value that is not valid UTF-8"
                        );
                        None
                    }
                })
                .collect();
            (!values.is_empty()).then(|| (name.as_str().to_owned(), values.join(", ")))
        });
        let mut builder = MockResponse::builder()
            .status(response.status().as_u16())
            .headers(headers);
        builder.set_delay(delay);
        self.register(builder.build(), url);
    }

    /// Removes every registered response.
    pub fn clear_all_responses(&self) {
        tracing::debug!("cleared all mock responses");
        self.registry.clear();
    }

    /// Removes the response registered for `url`. Returns true if there was one.
    pub fn clear_response(&self, url: &Uri) -> bool {
        let removed = self.registry.remove(url);
        tracing::debug!(url = %url, removed, "cleared mock response");
        removed
    }

    /// The registry responses are stored in.
    pub fn registry(&self) -> &Arc<ResponseRegistry> {
        &self.registry
    }

    /// The protocol installed into the chain.
    pub fn protocol(&self) -> &Arc<MockUrlProtocol> {
        &self.protocol
    }

    /// The chain the protocol is installed into.
    pub fn protocol_chain(&self) -> &Arc<ProtocolChain> {
        &self.chain
    }

    fn protocol_name(&self) -> &'static str {
        self.protocol.name()
    }
}

/// Builder for [`MockNetworking`].
#[derive(Debug, Default)]
pub struct Builder {
    chain: Option<Arc<ProtocolChain>>,
    sleep_impl: Option<SharedAsyncSleep>,
    protocol_name: Option<&'static str>,
}

impl Builder {
    /// Sets the chain to install the protocol into. Defaults to a new, private chain.
    pub fn protocol_chain(mut self, chain: Arc<ProtocolChain>) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Sets the sleep implementation used for delays. Defaults to Tokio.
    pub fn sleep_impl(mut self, sleep_impl: impl AsyncSleep + 'static) -> Self {
        self.sleep_impl = Some(SharedAsyncSleep::new(sleep_impl));
        self
    }

    /// Sets the name the protocol is registered under.
    ///
    /// Two instances sharing a chain need different names. Defaults to [`MOCK_URL_PROTOCOL`].
    pub fn protocol_name(mut self, name: &'static str) -> Self {
        self.protocol_name = Some(name);
        self
    }

    /// Builds the instance. Nothing is installed into the chain yet.
    pub fn build(self) -> MockNetworking {
        let registry = Arc::new(ResponseRegistry::new());
        let protocol = MockUrlProtocol::new(registry.clone())
            .with_name(self.protocol_name.unwrap_or(MOCK_URL_PROTOCOL))
            .with_sleep_impl(
                self.sleep_impl
                    .unwrap_or_else(|| SharedAsyncSleep::new(TokioSleep::new())),
            );
        MockNetworking {
            registry,
            protocol: Arc::new(protocol),
            chain: self.chain.unwrap_or_default(),
            registered: Mutex::new(false),
        }
    }
}
