/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The canned answer registered for a URL.

use crate::delay::ResponseDelay;
use crate::error::{BoxError, LoadError};
use bytes::Bytes;
use http::{StatusCode, Version};
use std::collections::HashMap;
use std::error::Error;

/// The HTTP version string used when none is given.
pub const HTTP_1_1: &str = "HTTP/1.1";

/// Everything needed to answer a request for one registered URL.
///
/// A `MockResponse` cannot be changed once built. To answer differently, register a new one
/// under the same URL.
///
/// # Examples
///
/// ```rust
/// use mock_networking::{MockResponse, ResponseDelay};
/// use std::time::Duration;
///
/// let response = MockResponse::builder()
///     .status(201)
///     .header("Content-Type", "application/json")
///     .body(r#"{"id": 7}"#)
///     .delay(ResponseDelay::fixed(Duration::from_millis(20)))
///     .build();
/// assert_eq!(201, response.status());
/// ```
#[derive(Clone, Debug)]
pub struct MockResponse {
    status: u16,
    http_version: String,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
    error: Option<LoadError>,
    delay: Option<ResponseDelay>,
}

impl MockResponse {
    /// Returns a builder for a `200 HTTP/1.1` response with no headers and no body.
    pub fn builder() -> MockResponseBuilder {
        MockResponseBuilder::default()
    }

    /// The status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The HTTP version string, e.g. `"HTTP/1.1"`.
    pub fn http_version(&self) -> &str {
        &self.http_version
    }

    /// The headers, exactly as they were given.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// The body, if one is delivered.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// The simulated error the load ends with, if any.
    pub fn error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    /// The simulated latency, if any.
    pub fn delay(&self) -> Option<&ResponseDelay> {
        self.delay.as_ref()
    }

    /// Builds the response head delivered to the host.
    ///
    /// Header names are case-normalized here and nowhere else.
    pub(crate) fn to_head(&self) -> Result<http::Response<()>, BoxError> {
        let version = parse_version(&self.http_version)
            .ok_or_else(|| format!("unsupported HTTP version `{}`", self.http_version))?;
        let status = StatusCode::from_u16(self.status)?;
        let mut builder = http::Response::builder().status(status).version(version);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        Ok(builder.body(())?)
    }
}

fn parse_version(version: &str) -> Option<Version> {
    match version {
        "HTTP/0.9" => Some(Version::HTTP_09),
        "HTTP/1.0" => Some(Version::HTTP_10),
        "HTTP/1.1" => Some(Version::HTTP_11),
        "HTTP/2" | "HTTP/2.0" => Some(Version::HTTP_2),
        "HTTP/3" | "HTTP/3.0" => Some(Version::HTTP_3),
        _ => None,
    }
}

/// Builder for [`MockResponse`].
#[derive(Clone, Debug)]
pub struct MockResponseBuilder {
    status: u16,
    http_version: String,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
    error: Option<LoadError>,
    delay: Option<ResponseDelay>,
}

impl Default for MockResponseBuilder {
    fn default() -> Self {
        Self {
            status: 200,
            http_version: HTTP_1_1.to_owned(),
            headers: HashMap::new(),
            body: None,
            error: None,
            delay: None,
        }
    }
}

impl MockResponseBuilder {
    /// Sets the status code.
    ///
    /// Codes outside `100..=999` are accepted here but fail the load when delivered.
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the HTTP version string.
    pub fn http_version(mut self, version: impl Into<String>) -> Self {
        self.http_version = version.into();
        self
    }

    /// Adds a header, replacing any previous value stored under exactly the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds every header in `headers`.
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the body, delivered as a single chunk.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Makes every load of this response fail with `error` after headers and body are delivered.
    pub fn error(mut self, error: impl Error + Send + Sync + 'static) -> Self {
        self.error = Some(LoadError::new(error));
        self
    }

    /// Sets the simulated latency.
    pub fn delay(mut self, delay: impl Into<ResponseDelay>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    /// Sets or clears the simulated latency.
    pub fn set_delay(&mut self, delay: Option<ResponseDelay>) -> &mut Self {
        self.delay = delay;
        self
    }

    /// Builds the response.
    pub fn build(self) -> MockResponse {
        MockResponse {
            status: self.status,
            http_version: self.http_version,
            headers: self.headers,
            body: self.body,
            error: self.error,
            delay: self.delay,
        }
    }
}
