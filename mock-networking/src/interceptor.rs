/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::error::MockNetworkingError;
use crate::protocol::{
    request_url, CacheStoragePolicy, HttpRequest, ProtocolClient, StartFuture, UrlProtocol,
};
use crate::registry::ResponseRegistry;
use aws_smithy_async::rt::sleep::{AsyncSleep, SharedAsyncSleep, TokioSleep};
use std::sync::Arc;

/// Default name of the [`MockUrlProtocol`] within a [`ProtocolChain`](crate::ProtocolChain).
pub const MOCK_URL_PROTOCOL: &str = "MockUrlProtocol";

/// A [`UrlProtocol`] that answers requests from a [`ResponseRegistry`].
///
/// It claims a request only while a response is registered for the request's exact URL.
/// The response is looked up again when the load starts, so a response removed in between
/// fails the load with [`ErrorKind::NoRegisteredResponse`](crate::ErrorKind::NoRegisteredResponse).
#[derive(Debug)]
pub struct MockUrlProtocol {
    name: &'static str,
    registry: Arc<ResponseRegistry>,
    sleep_impl: SharedAsyncSleep,
}

impl MockUrlProtocol {
    /// Creates a protocol backed by `registry` that sleeps with Tokio.
    pub fn new(registry: Arc<ResponseRegistry>) -> Self {
        Self {
            name: MOCK_URL_PROTOCOL,
            registry,
            sleep_impl: SharedAsyncSleep::new(TokioSleep::new()),
        }
    }

    /// Uses `sleep_impl` to wait out response delays.
    pub fn with_sleep_impl(mut self, sleep_impl: SharedAsyncSleep) -> Self {
        self.sleep_impl = sleep_impl;
        self
    }

    /// Registers this protocol under `name` instead of [`MOCK_URL_PROTOCOL`].
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// The registry responses are read from.
    pub fn registry(&self) -> &Arc<ResponseRegistry> {
        &self.registry
    }

    async fn deliver(&self, request: &HttpRequest, client: &dyn ProtocolClient) {
        let Some(url) = request_url(request) else {
            tracing::debug!(uri = %request.uri(), "request has no absolute URL");
            client.did_fail(MockNetworkingError::missing_request_url().into());
            return;
        };
        let Some(response) = self.registry.get(url) else {
            tracing::debug!(url = %url, "mock response was removed before the load started");
            client.did_fail(MockNetworkingError::no_registered_response(url.clone()).into());
            return;
        };
        let head = match response.to_head() {
            Ok(head) => head,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "cannot construct the mock response");
                client.did_fail(
                    MockNetworkingError::response_construction_failed(url.clone(), err).into(),
                );
                return;
            }
        };

        if let Some(delay) = response.delay() {
            let duration = delay.sample();
            tracing::trace!(url = %url, delay = ?duration, "delaying mock response");
            self.sleep_impl.sleep(duration).await;
        }

        tracing::debug!(url = %url, status = response.status(), "delivering mock response");
        client.did_receive_response(head, CacheStoragePolicy::NotAllowed);
        if let Some(body) = response.body() {
            client.did_load(body.clone());
        }
        match response.error() {
            Some(err) => {
                tracing::debug!(url = %url, error = %err, "failing with the registered error");
                client.did_fail(err.clone());
            }
            None => client.did_finish_loading(),
        }
    }
}

impl UrlProtocol for MockUrlProtocol {
    fn name(&self) -> &'static str {
        self.name
    }

    fn can_handle(&self, request: &HttpRequest) -> bool {
        let handles = request_url(request).is_some_and(|url| self.registry.contains(url));
        tracing::trace!(uri = %request.uri(), handles, "ownership check");
        handles
    }

    fn start<'a>(
        &'a self,
        request: &'a HttpRequest,
        client: &'a dyn ProtocolClient,
    ) -> StartFuture<'a> {
        StartFuture::new(self.deliver(request, client))
    }

    fn stop(&self, request: &HttpRequest) {
        tracing::trace!(uri = %request.uri(), "stopped mock load");
    }
}
