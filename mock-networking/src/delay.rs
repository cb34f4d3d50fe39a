/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::ops::RangeInclusive;
use std::time::Duration;

/// Simulated latency applied before a mock response is delivered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResponseDelay {
    /// Always wait for exactly this long.
    Fixed(Duration),
    /// Wait for a duration sampled uniformly from `low..=high`, once per delivery.
    Range {
        /// Shortest possible delay.
        low: Duration,
        /// Longest possible delay.
        high: Duration,
    },
}

impl ResponseDelay {
    /// A delay of exactly `duration`.
    pub fn fixed(duration: Duration) -> Self {
        ResponseDelay::Fixed(duration)
    }

    /// A delay sampled from the closed interval between `a` and `b`, in either order.
    pub fn between(a: Duration, b: Duration) -> Self {
        ResponseDelay::Range {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// Returns the duration to wait for one delivery.
    ///
    /// Ranged delays are sampled with nanosecond granularity, so two calls may differ.
    pub fn sample(&self) -> Duration {
        match self {
            ResponseDelay::Fixed(duration) => *duration,
            ResponseDelay::Range { low, high } => {
                let (low, high) = (nanos(*low.min(high)), nanos(*low.max(high)));
                Duration::from_nanos(fastrand::u64(low..=high))
            }
        }
    }
}

impl From<Duration> for ResponseDelay {
    fn from(duration: Duration) -> Self {
        ResponseDelay::fixed(duration)
    }
}

impl From<RangeInclusive<Duration>> for ResponseDelay {
    fn from(range: RangeInclusive<Duration>) -> Self {
        let (low, high) = range.into_inner();
        ResponseDelay::between(low, high)
    }
}

// u64 nanoseconds covers ~584 years
fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
