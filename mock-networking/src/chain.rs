/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A minimal in-process URL-loading host.
//!
//! [`ProtocolChain`] plays the part of the platform's loading system: it keeps the list of
//! registered [`UrlProtocol`]s, hands each request to the first protocol that claims it, and
//! records the callbacks it receives. It never touches the network.

use crate::error::{LoadError, MockNetworkingError};
use crate::protocol::{
    CacheStoragePolicy, HttpRequest, ProtocolClient, SharedUrlProtocol, UrlProtocol,
};
use bytes::{Bytes, BytesMut};
use http::Uri;
use once_cell::sync::Lazy;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

static GLOBAL_PROTOCOL_CHAIN: Lazy<Arc<ProtocolChain>> = Lazy::new(Default::default);

/// One callback received from a protocol.
#[derive(Debug)]
pub enum LoadEvent {
    /// [`ProtocolClient::did_receive_response`]
    ReceivedResponse {
        /// The response head.
        response: http::Response<()>,
        /// Whether the response may be cached.
        policy: CacheStoragePolicy,
    },
    /// [`ProtocolClient::did_load`]
    LoadedData(Bytes),
    /// [`ProtocolClient::did_finish_loading`]
    FinishedLoading,
    /// [`ProtocolClient::did_fail`]
    Failed(LoadError),
}

/// A [`ProtocolClient`] that records every callback in order.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<LoadEvent>>,
}

impl EventRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: LoadEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Returns the number of callbacks recorded so far.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes every callback recorded so far.
    pub fn take(&self) -> Vec<LoadEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ProtocolClient for EventRecorder {
    fn did_receive_response(&self, response: http::Response<()>, policy: CacheStoragePolicy) {
        self.push(LoadEvent::ReceivedResponse { response, policy });
    }

    fn did_load(&self, data: Bytes) {
        self.push(LoadEvent::LoadedData(data));
    }

    fn did_finish_loading(&self) {
        self.push(LoadEvent::FinishedLoading);
    }

    fn did_fail(&self, error: LoadError) {
        self.push(LoadEvent::Failed(error));
    }
}

/// Everything that happened while loading one request.
#[derive(Debug)]
pub struct Transcript {
    url: Uri,
    protocol: Option<&'static str>,
    events: Vec<LoadEvent>,
    cancelled: bool,
}

impl Transcript {
    /// The URL of the loaded request.
    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// The name of the protocol that handled the request, if any did.
    pub fn protocol(&self) -> Option<&'static str> {
        self.protocol
    }

    /// The callbacks received, in order.
    pub fn events(&self) -> &[LoadEvent] {
        &self.events
    }

    /// Returns true if the load was cancelled before the protocol returned.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// The first response head received.
    pub fn response(&self) -> Option<&http::Response<()>> {
        self.events.iter().find_map(|event| match event {
            LoadEvent::ReceivedResponse { response, .. } => Some(response),
            _ => None,
        })
    }

    /// Every body chunk received, concatenated. `None` if no chunk was received.
    pub fn body(&self) -> Option<Bytes> {
        let mut chunks = self.events.iter().filter_map(|event| match event {
            LoadEvent::LoadedData(data) => Some(data),
            _ => None,
        });
        let mut body = BytesMut::from(&chunks.next()?[..]);
        for chunk in chunks {
            body.extend_from_slice(chunk);
        }
        Some(body.freeze())
    }

    /// The error the load failed with, if it failed.
    pub fn error(&self) -> Option<&LoadError> {
        self.events.iter().find_map(|event| match event {
            LoadEvent::Failed(err) => Some(err),
            _ => None,
        })
    }

    /// Returns true if the load finished and never failed.
    pub fn is_success(&self) -> bool {
        self.error().is_none()
            && self
                .events
                .iter()
                .any(|event| matches!(event, LoadEvent::FinishedLoading))
    }

    /// Assembles the received response head and body, or returns the error the load ended with.
    pub fn into_result(self) -> Result<http::Response<Bytes>, LoadError> {
        if self.protocol.is_none() {
            return Err(MockNetworkingError::not_intercepted(self.url).into());
        }
        if self.cancelled {
            return Err(MockNetworkingError::cancelled(self.url).into());
        }
        let mut head = None;
        let mut body = BytesMut::new();
        for event in self.events {
            match event {
                LoadEvent::ReceivedResponse { response, .. } => head = Some(response),
                LoadEvent::LoadedData(data) => body.extend_from_slice(&data),
                LoadEvent::Failed(err) => return Err(err),
                LoadEvent::FinishedLoading => {
                    return match head {
                        Some(head) => {
                            let (parts, ()) = head.into_parts();
                            Ok(http::Response::from_parts(parts, body.freeze()))
                        }
                        None => Err(MockNetworkingError::incomplete_load(self.url).into()),
                    };
                }
            }
        }
        Err(MockNetworkingError::incomplete_load(self.url).into())
    }
}

/// The ordered list of protocols a request is offered to.
///
/// The most recently registered protocol is asked first.
#[derive(Debug, Default)]
pub struct ProtocolChain {
    protocols: RwLock<Vec<SharedUrlProtocol>>,
}

impl ProtocolChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide chain.
    pub fn global() -> Arc<ProtocolChain> {
        GLOBAL_PROTOCOL_CHAIN.clone()
    }

    /// Adds `protocol` to the front of the chain.
    ///
    /// Returns false, leaving the chain unchanged, if a protocol with the same name is registered.
    pub fn register(&self, protocol: SharedUrlProtocol) -> bool {
        let mut protocols = self.protocols.write().unwrap_or_else(PoisonError::into_inner);
        if protocols.iter().any(|p| p.name() == protocol.name()) {
            return false;
        }
        tracing::debug!(protocol = protocol.name(), "registered protocol");
        protocols.insert(0, protocol);
        true
    }

    /// Removes the protocol registered under `name`. Returns true if there was one.
    pub fn unregister(&self, name: &str) -> bool {
        let mut protocols = self.protocols.write().unwrap_or_else(PoisonError::into_inner);
        let before = protocols.len();
        protocols.retain(|p| p.name() != name);
        let removed = protocols.len() != before;
        if removed {
            tracing::debug!(protocol = name, "unregistered protocol");
        }
        removed
    }

    /// Returns true if a protocol is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.protocols
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|p| p.name() == name)
    }

    /// Returns the number of registered protocols.
    pub fn len(&self) -> usize {
        self.protocols.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if no protocol is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the first protocol that can handle `request`.
    pub fn protocol_for(&self, request: &HttpRequest) -> Option<SharedUrlProtocol> {
        self.protocols
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.can_handle(request))
            .cloned()
    }

    /// Loads `request` through the first protocol that claims it and records what happened.
    pub async fn record(&self, request: HttpRequest) -> Transcript {
        self.record_until(request, std::future::pending::<()>()).await
    }

    /// Like [`record`](Self::record), but abandons the load once `cancel` completes.
    ///
    /// Events emitted before cancellation are kept; nothing is recorded afterwards.
    pub async fn record_until(
        &self,
        request: HttpRequest,
        cancel: impl Future<Output = ()>,
    ) -> Transcript {
        let url = request.uri().clone();
        let Some(protocol) = self.protocol_for(&request) else {
            tracing::debug!(url = %url, "no protocol claimed the request");
            return Transcript {
                url,
                protocol: None,
                events: Vec::new(),
                cancelled: false,
            };
        };

        let recorder = EventRecorder::new();
        let cancelled = tokio::select! {
            biased;
            _ = protocol.start(&request, &recorder) => false,
            _ = cancel => true,
        };
        protocol.stop(&request);
        if cancelled {
            tracing::debug!(url = %url, protocol = protocol.name(), "load cancelled");
        }

        Transcript {
            url,
            protocol: Some(protocol.name()),
            events: recorder.take(),
            cancelled,
        }
    }

    /// Loads `request` and assembles the response, or returns the error the load failed with.
    pub async fn load(&self, request: HttpRequest) -> Result<http::Response<Bytes>, LoadError> {
        self.record(request).await.into_result()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::protocol::StartFuture;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct StaticProtocol {
        name: &'static str,
        host: &'static str,
        finish: bool,
    }

    impl UrlProtocol for StaticProtocol {
        fn name(&self) -> &'static str {
            self.name
        }

        fn can_handle(&self, request: &HttpRequest) -> bool {
            request.uri().host() == Some(self.host)
        }

        fn start<'a>(
            &'a self,
            _request: &'a HttpRequest,
            client: &'a dyn ProtocolClient,
        ) -> StartFuture<'a> {
            StartFuture::new(async move {
                let head = http::Response::builder()
                    .header("x-protocol", self.name)
                    .body(())
                    .unwrap();
                client.did_receive_response(head, CacheStoragePolicy::Allowed);
                client.did_load(Bytes::from_static(b"one "));
                client.did_load(Bytes::from_static(b"two"));
                if self.finish {
                    client.did_finish_loading();
                }
            })
        }

        fn stop(&self, _request: &HttpRequest) {}
    }

    fn protocol(name: &'static str, host: &'static str) -> SharedUrlProtocol {
        SharedUrlProtocol::new(StaticProtocol {
            name,
            host,
            finish: true,
        })
    }

    fn request(uri: &str) -> HttpRequest {
        http::Request::builder().uri(uri).body(Bytes::new()).unwrap()
    }

    #[test]
    fn registration_is_unique_by_name() {
        let chain = ProtocolChain::new();
        assert!(chain.register(protocol("a", "a.example.com")));
        assert!(!chain.register(protocol("a", "b.example.com")));
        assert_eq!(1, chain.len());
        assert!(chain.unregister("a"));
        assert!(!chain.unregister("a"));
        assert!(chain.is_empty());
    }

    #[test]
    fn newest_protocol_is_asked_first() {
        let chain = ProtocolChain::new();
        chain.register(protocol("old", "example.com"));
        chain.register(protocol("new", "example.com"));
        chain.register(protocol("other", "other.com"));

        let chosen = chain.protocol_for(&request("https://example.com/")).unwrap();
        assert_eq!("new", chosen.name());
        assert!(chain.protocol_for(&request("https://nowhere.com/")).is_none());
    }

    #[tokio::test]
    async fn load_assembles_head_and_body() {
        let chain = ProtocolChain::new();
        chain.register(protocol("static", "example.com"));

        let response = chain.load(request("https://example.com/x")).await.unwrap();
        assert_eq!("static", response.headers()["x-protocol"]);
        assert_eq!(Bytes::from_static(b"one two"), response.into_body());
    }

    #[tokio::test]
    async fn unclaimed_requests_are_not_intercepted() {
        let chain = ProtocolChain::new();
        let transcript = chain.record(request("https://example.com/")).await;
        assert_eq!(None, transcript.protocol());
        assert_eq!("https://example.com/", transcript.url().to_string());
        let err = transcript.into_result().unwrap_err();
        assert_eq!(Some(ErrorKind::NotIntercepted), err.kind());
    }

    #[tokio::test]
    async fn loads_without_a_terminal_event_are_incomplete() {
        let chain = ProtocolChain::new();
        chain.register(SharedUrlProtocol::new(StaticProtocol {
            name: "stalls",
            host: "example.com",
            finish: false,
        }));
        let transcript = chain.record(request("https://example.com/")).await;
        assert_eq!(Some("stalls"), transcript.protocol());
        assert!(!transcript.is_success());
        assert_eq!(Some(Bytes::from_static(b"one two")), transcript.body());
        let err = transcript.into_result().unwrap_err();
        assert_eq!(Some(ErrorKind::IncompleteLoad), err.kind());
    }

    #[tokio::test]
    async fn shared_protocols_can_wrap_an_existing_arc() {
        let inner: Arc<dyn UrlProtocol> = Arc::new(StaticProtocol {
            name: "arc",
            host: "example.com",
            finish: true,
        });
        let chain = ProtocolChain::new();
        assert!(chain.register(SharedUrlProtocol::from(inner.clone())));
        assert!(chain.contains("arc"));

        let transcript = chain.record(request("https://example.com/arc")).await;
        assert_eq!(Some("arc"), transcript.protocol());
        assert_eq!("/arc", transcript.url().path());
        assert!(transcript.is_success());
        assert_eq!(2, Arc::strong_count(&inner));
    }

    #[test]
    fn global_chain_is_shared() {
        assert!(Arc::ptr_eq(&ProtocolChain::global(), &ProtocolChain::global()));
    }
}
