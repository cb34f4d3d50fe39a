/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The interface between a URL-loading host and a pluggable protocol.
//!
//! # How a load works
//!
//! The host asks each registered [`UrlProtocol`] in turn whether it [can handle](UrlProtocol::can_handle)
//! a request. The first one that says yes is [started](UrlProtocol::start) with a [`ProtocolClient`]
//! and reports the whole lifecycle through it:
//!
//! 1. [`did_receive_response`](ProtocolClient::did_receive_response) with the response head,
//! 2. zero or more [`did_load`](ProtocolClient::did_load) calls with body data,
//! 3. exactly one of [`did_finish_loading`](ProtocolClient::did_finish_loading) or
//!    [`did_fail`](ProtocolClient::did_fail).
//!
//! A protocol may also fail before delivering a head. It never both finishes and fails.
//!
//! The host cancels a load by dropping the [`StartFuture`], after which nothing more is
//! emitted, and then calls [`stop`](UrlProtocol::stop).

use crate::error::LoadError;
use bytes::Bytes;
use http::Uri;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A request handed to a protocol.
pub type HttpRequest = http::Request<Bytes>;

/// Returns the request's URL if it is absolute, i.e. has both a scheme and an authority.
pub fn request_url(request: &HttpRequest) -> Option<&Uri> {
    let uri = request.uri();
    (uri.scheme().is_some() && uri.authority().is_some()).then_some(uri)
}

/// Whether the host may cache a delivered response.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CacheStoragePolicy {
    /// The response may be stored in any cache.
    Allowed,
    /// The response may only be stored in memory.
    AllowedInMemoryOnly,
    /// The response must not be cached.
    NotAllowed,
}

/// Callbacks a protocol uses to report the lifecycle of a load back to the host.
pub trait ProtocolClient: Send + Sync {
    /// The response head was received.
    fn did_receive_response(&self, response: http::Response<()>, policy: CacheStoragePolicy);

    /// A chunk of the body was received.
    fn did_load(&self, data: Bytes);

    /// The load completed successfully.
    fn did_finish_loading(&self);

    /// The load failed.
    fn did_fail(&self, error: LoadError);
}

/// Future returned by [`UrlProtocol::start`].
#[must_use]
pub struct StartFuture<'a>(Pin<Box<dyn Future<Output = ()> + Send + 'a>>);

impl<'a> StartFuture<'a> {
    /// Create a new [`StartFuture`]
    ///
    /// The provided future will be Boxed.
    pub fn new(future: impl Future<Output = ()> + Send + 'a) -> Self {
        StartFuture(Box::pin(future))
    }
}

impl Debug for StartFuture<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "StartFuture")
    }
}

impl Future for StartFuture<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

/// A pluggable strategy that can take over loading a request.
pub trait UrlProtocol: Send + Sync + Debug {
    /// The name this protocol is registered under. Unique within a chain.
    fn name(&self) -> &'static str;

    /// Returns true if this protocol will handle `request`.
    ///
    /// This may be called any number of times and must not have side effects.
    fn can_handle(&self, request: &HttpRequest) -> bool;

    /// Loads `request`, reporting progress to `client`.
    fn start<'a>(&'a self, request: &'a HttpRequest, client: &'a dyn ProtocolClient)
        -> StartFuture<'a>;

    /// Called by the host once it no longer wants events for `request`.
    fn stop(&self, request: &HttpRequest);
}

impl<T> UrlProtocol for Arc<T>
where
    T: UrlProtocol + ?Sized,
{
    fn name(&self) -> &'static str {
        T::name(self)
    }

    fn can_handle(&self, request: &HttpRequest) -> bool {
        T::can_handle(self, request)
    }

    fn start<'a>(
        &'a self,
        request: &'a HttpRequest,
        client: &'a dyn ProtocolClient,
    ) -> StartFuture<'a> {
        T::start(self, request, client)
    }

    fn stop(&self, request: &HttpRequest) {
        T::stop(self, request)
    }
}

/// Wrapper type for sharable `UrlProtocol`
#[derive(Clone, Debug)]
pub struct SharedUrlProtocol(Arc<dyn UrlProtocol>);

impl SharedUrlProtocol {
    /// Create a new `SharedUrlProtocol` from `UrlProtocol`
    pub fn new(protocol: impl UrlProtocol + 'static) -> Self {
        Self(Arc::new(protocol))
    }
}

impl From<Arc<dyn UrlProtocol>> for SharedUrlProtocol {
    fn from(protocol: Arc<dyn UrlProtocol>) -> Self {
        SharedUrlProtocol(protocol)
    }
}

impl UrlProtocol for SharedUrlProtocol {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn can_handle(&self, request: &HttpRequest) -> bool {
        self.0.can_handle(request)
    }

    fn start<'a>(
        &'a self,
        request: &'a HttpRequest,
        client: &'a dyn ProtocolClient,
    ) -> StartFuture<'a> {
        self.0.start(request, client)
    }

    fn stop(&self, request: &HttpRequest) {
        self.0.stop(request)
    }
}
