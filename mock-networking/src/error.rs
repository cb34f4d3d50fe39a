/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Errors delivered through the failure callback of a mocked load.

use http::Uri;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// The category of a [`MockNetworkingError`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The request did not carry an absolute URL.
    MissingRequestUrl,
    /// The request was claimed, but its response was removed before it could be delivered.
    NoRegisteredResponse,
    /// The registered status, HTTP version, and headers do not form a valid response.
    ResponseConstructionFailed,
    /// No protocol in the chain claimed the request.
    NotIntercepted,
    /// The protocol stopped emitting events without finishing or failing.
    IncompleteLoad,
    /// The load was cancelled before a terminal event was delivered.
    Cancelled,
}

/// An error raised by this crate while resolving or delivering a mocked response.
#[derive(Debug)]
pub struct MockNetworkingError {
    kind: ErrorKind,
    url: Option<Uri>,
    source: Option<BoxError>,
}

impl MockNetworkingError {
    fn new(kind: ErrorKind, url: Option<Uri>) -> Self {
        Self {
            kind,
            url,
            source: None,
        }
    }

    pub(crate) fn missing_request_url() -> Self {
        Self::new(ErrorKind::MissingRequestUrl, None)
    }

    pub(crate) fn no_registered_response(url: Uri) -> Self {
        Self::new(ErrorKind::NoRegisteredResponse, Some(url))
    }

    pub(crate) fn response_construction_failed(url: Uri, source: impl Into<BoxError>) -> Self {
        Self {
            kind: ErrorKind::ResponseConstructionFailed,
            url: Some(url),
            source: Some(source.into()),
        }
    }

    pub(crate) fn not_intercepted(url: Uri) -> Self {
        Self::new(ErrorKind::NotIntercepted, Some(url))
    }

    pub(crate) fn incomplete_load(url: Uri) -> Self {
        Self::new(ErrorKind::IncompleteLoad, Some(url))
    }

    pub(crate) fn cancelled(url: Uri) -> Self {
        Self::new(ErrorKind::Cancelled, Some(url))
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the URL of the request that failed, if it had one.
    pub fn url(&self) -> Option<&Uri> {
        self.url.as_ref()
    }
}

impl Display for MockNetworkingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use ErrorKind::*;
        match (&self.kind, &self.url) {
            (MissingRequestUrl, _) => write!(f, "the request does not have an absolute URL"),
            (NoRegisteredResponse, Some(url)) => {
                write!(f, "no mock response is registered for `{url}`")
            }
            (ResponseConstructionFailed, Some(url)) => {
                write!(f, "the mock response registered for `{url}` is not a valid HTTP response")
            }
            (NotIntercepted, Some(url)) => write!(f, "no protocol handles requests to `{url}`"),
            (IncompleteLoad, Some(url)) => {
                write!(f, "the load of `{url}` ended without finishing or failing")
            }
            (Cancelled, Some(url)) => write!(f, "the load of `{url}` was cancelled"),
            (kind, None) => write!(f, "{kind:?}"),
        }
    }
}

impl Error for MockNetworkingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}

/// The error handed to [`ProtocolClient::did_fail`](crate::protocol::ProtocolClient::did_fail).
///
/// This is either a [`MockNetworkingError`] or the simulated error a [`MockResponse`](crate::MockResponse)
/// was registered with. It is cheap to clone, so one registered error can fail any number of loads.
#[derive(Clone)]
pub struct LoadError(Arc<dyn Error + Send + Sync + 'static>);

impl LoadError {
    /// Wraps an arbitrary error.
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self(Arc::from(error.into()))
    }

    /// Attempts to downcast the wrapped error to `E`.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// Returns the wrapped error if it was raised by this crate.
    pub fn as_mock_error(&self) -> Option<&MockNetworkingError> {
        self.downcast_ref::<MockNetworkingError>()
    }

    /// Returns the [`ErrorKind`] if the wrapped error was raised by this crate.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.as_mock_error().map(MockNetworkingError::kind)
    }
}

impl Debug for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

impl From<MockNetworkingError> for LoadError {
    fn from(err: MockNetworkingError) -> Self {
        Self::new(err)
    }
}
