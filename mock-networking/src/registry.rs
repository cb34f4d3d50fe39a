/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::response::MockResponse;
use http::Uri;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// URL-keyed store of [`MockResponse`]s.
///
/// Every operation takes the lock for the map operation alone, so a lookup racing a
/// registration or removal of the same URL sees either the old or the new entry.
#[derive(Debug, Default)]
pub struct ResponseRegistry {
    responses: Mutex<HashMap<Uri, Arc<MockResponse>>>,
}

impl ResponseRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // No operation can panic halfway through a map update, so a poisoned map is still consistent.
    fn responses(&self) -> MutexGuard<'_, HashMap<Uri, Arc<MockResponse>>> {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `response` for `url`, replacing any previous response.
    pub fn put(&self, url: Uri, response: impl Into<Arc<MockResponse>>) {
        self.responses().insert(url, response.into());
    }

    /// Returns the response registered for `url`.
    pub fn get(&self, url: &Uri) -> Option<Arc<MockResponse>> {
        self.responses().get(url).cloned()
    }

    /// Returns true if a response is registered for `url`.
    pub fn contains(&self, url: &Uri) -> bool {
        self.responses().contains_key(url)
    }

    /// Removes the response registered for `url`. Returns true if there was one.
    pub fn remove(&self, url: &Uri) -> bool {
        self.responses().remove(url).is_some()
    }

    /// Removes every registered response.
    pub fn clear(&self) {
        self.responses().clear();
    }

    /// Returns the number of registered responses.
    pub fn len(&self) -> usize {
        self.responses().len()
    }

    /// Returns true if no response is registered.
    pub fn is_empty(&self) -> bool {
        self.responses().is_empty()
    }

    /// Returns a snapshot of every registered URL, in no particular order.
    pub fn urls(&self) -> Vec<Uri> {
        self.responses().keys().cloned().collect()
    }
}
