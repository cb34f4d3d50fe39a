/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use bytes::Bytes;
use http::Uri;
use mock_networking::chain::{EventRecorder, LoadEvent};
use mock_networking::protocol::{CacheStoragePolicy, HttpRequest, ProtocolClient, UrlProtocol};
use mock_networking::{
    ErrorKind, LoadError, MockNetworking, MockResponse, ProtocolChain, ResponseDelay,
};
use pretty_assertions::assert_eq;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, PartialEq)]
struct NetworkConnectionLost {
    code: i32,
}

impl fmt::Display for NetworkConnectionLost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the network connection was lost ({})", self.code)
    }
}

impl Error for NetworkConnectionLost {}

fn setup() -> (Arc<ProtocolChain>, MockNetworking) {
    let chain = Arc::new(ProtocolChain::new());
    let mocks = MockNetworking::new(chain.clone());
    (chain, mocks)
}

fn url(s: &str) -> Uri {
    s.parse().unwrap()
}

fn get(url: &Uri) -> HttpRequest {
    http::Request::get(url.clone()).body(Bytes::new()).unwrap()
}

/// Records when the first callback arrived.
#[derive(Default)]
struct FirstEventClock {
    first: Mutex<Option<Instant>>,
    events: EventRecorder,
}

impl FirstEventClock {
    fn mark(&self) {
        self.first.lock().unwrap().get_or_insert_with(Instant::now);
    }

    fn first(&self) -> Instant {
        self.first.lock().unwrap().expect("no event was emitted")
    }
}

impl ProtocolClient for FirstEventClock {
    fn did_receive_response(&self, response: http::Response<()>, policy: CacheStoragePolicy) {
        self.mark();
        self.events.did_receive_response(response, policy);
    }

    fn did_load(&self, data: Bytes) {
        self.mark();
        self.events.did_load(data);
    }

    fn did_finish_loading(&self) {
        self.mark();
        self.events.did_finish_loading();
    }

    fn did_fail(&self, error: LoadError) {
        self.mark();
        self.events.did_fail(error);
    }
}

#[tokio::test]
async fn headers_only_scenario() {
    let (chain, mocks) = setup();
    let a = url("https://www.example.com/a");
    mocks.register(
        MockResponse::builder()
            .status(200)
            .header("Thing1", "Thing2")
            .build(),
        a.clone(),
    );
    assert!(mocks.protocol().can_handle(&get(&a)));

    let transcript = chain.record(get(&a)).await;
    assert_eq!(Some(mock_networking::MOCK_URL_PROTOCOL), transcript.protocol());
    assert!(transcript.is_success());
    assert_eq!(None, transcript.body());

    let head = transcript.response().expect("headers were delivered");
    assert_eq!(200, head.status().as_u16());
    assert_eq!("Thing2", head.headers()["Thing1"]);
    assert!(matches!(
        transcript.events(),
        [
            LoadEvent::ReceivedResponse {
                policy: CacheStoragePolicy::NotAllowed,
                ..
            },
            LoadEvent::FinishedLoading
        ]
    ));
}

#[tokio::test]
async fn body_scenario() {
    let (chain, mocks) = setup();
    let b = url("https://www.example.com/b");
    mocks.register(
        MockResponse::builder()
            .status(200)
            .body("Hello World".as_bytes().to_vec())
            .build(),
        b.clone(),
    );

    let transcript = chain.record(get(&b)).await;
    let chunks: Vec<&Bytes> = transcript
        .events()
        .iter()
        .filter_map(|event| match event {
            LoadEvent::LoadedData(data) => Some(data),
            _ => None,
        })
        .collect();
    assert_eq!(vec![&Bytes::from_static("Hello World".as_bytes())], chunks);
    assert!(transcript.is_success());

    let response = chain.load(get(&b)).await.unwrap();
    assert_eq!(&b"Hello World"[..], &response.body()[..]);
}

#[tokio::test]
async fn error_only_response_fails_with_the_registered_error() {
    let (chain, mocks) = setup();
    let failing = url("https://www.example.com/offline");
    mocks.register(
        MockResponse::builder()
            .status(200)
            .error(NetworkConnectionLost { code: -1005 })
            .build(),
        failing.clone(),
    );

    let transcript = chain.record(get(&failing)).await;
    assert!(!transcript.is_success());
    assert!(!transcript
        .events()
        .iter()
        .any(|event| matches!(event, LoadEvent::FinishedLoading)));

    let err = chain.load(get(&failing)).await.unwrap_err();
    assert_eq!(
        Some(&NetworkConnectionLost { code: -1005 }),
        err.downcast_ref::<NetworkConnectionLost>()
    );
    assert_eq!("the network connection was lost (-1005)", err.to_string());
}

#[tokio::test]
async fn fixed_delay_precedes_the_first_event() {
    let (_, mocks) = setup();
    let slow = url("https://www.example.com/slow");
    let delay = Duration::from_millis(40);
    mocks.register(
        MockResponse::builder().delay(ResponseDelay::fixed(delay)).build(),
        slow.clone(),
    );

    let request = get(&slow);
    for _ in 0..5 {
        let clock = FirstEventClock::default();
        let started = Instant::now();
        mocks.protocol().start(&request, &clock).await;
        assert!(clock.first().duration_since(started) >= delay);
        assert_eq!(2, clock.events.len());
    }
}

#[tokio::test]
async fn ranged_delay_waits_at_least_the_lower_bound() {
    let (_, mocks) = setup();
    let ranged = url("https://www.example.com/ranged");
    let (low, high) = (Duration::from_millis(10), Duration::from_millis(30));
    mocks.register(
        MockResponse::builder()
            .delay(ResponseDelay::between(low, high))
            .build(),
        ranged.clone(),
    );

    let request = get(&ranged);
    let mut waited = Vec::new();
    for _ in 0..8 {
        let clock = FirstEventClock::default();
        let started = Instant::now();
        mocks.protocol().start(&request, &clock).await;
        let elapsed = clock.first().duration_since(started);
        assert!(elapsed >= low, "waited {elapsed:?}");
        waited.push(elapsed);
    }
    assert!(waited.iter().any(|d| *d != waited[0]));
}

#[tokio::test]
async fn clearing_one_response_leaves_the_others() {
    let (chain, mocks) = setup();
    let one = url("https://www.example.com/one");
    let two = url("https://www.example.com/two");
    mocks.register(MockResponse::builder().build(), one.clone());
    mocks.register(MockResponse::builder().status(202).build(), two.clone());

    assert!(mocks.clear_response(&one));
    assert!(!mocks.protocol().can_handle(&get(&one)));
    assert!(mocks.protocol().can_handle(&get(&two)));

    let err = chain.load(get(&one)).await.unwrap_err();
    assert_eq!(Some(ErrorKind::NotIntercepted), err.kind());
    let response = chain.load(get(&two)).await.unwrap();
    assert_eq!(202, response.status().as_u16());
}

#[tokio::test]
async fn clearing_all_responses() {
    let (chain, mocks) = setup();
    let urls: Vec<Uri> = (0..5)
        .map(|i| url(&format!("https://www.example.com/{i}")))
        .collect();
    for u in &urls {
        mocks.register(MockResponse::builder().build(), u.clone());
    }

    mocks.clear_all_responses();
    for u in &urls {
        assert!(!mocks.protocol().can_handle(&get(u)));
        assert!(chain.protocol_for(&get(u)).is_none());
    }
    assert!(mocks.registry().is_empty());
    assert!(mocks.is_registered());
}

#[tokio::test]
async fn re_registration_replaces_the_response() {
    let (chain, mocks) = setup();
    let u = url("https://www.example.com/profile");
    mocks.register(
        MockResponse::builder()
            .status(200)
            .header("ETag", "v1")
            .body("first")
            .build(),
        u.clone(),
    );
    mocks.register(
        MockResponse::builder()
            .status(201)
            .header("Location", "/profile/2")
            .build(),
        u.clone(),
    );

    let response = chain.load(get(&u)).await.unwrap();
    assert_eq!(201, response.status().as_u16());
    assert_eq!("/profile/2", response.headers()["location"]);
    assert!(response.headers().get("etag").is_none());
    assert!(response.body().is_empty());
}

#[tokio::test]
async fn unregistered_protocol_no_longer_intercepts() {
    let (chain, mocks) = setup();
    let u = url("https://www.example.com/a");
    mocks.register(MockResponse::builder().build(), u.clone());
    mocks.unregister();

    let err = chain.load(get(&u)).await.unwrap_err();
    assert_eq!(Some(ErrorKind::NotIntercepted), err.kind());

    mocks.register_protocol();
    assert!(chain.load(get(&u)).await.is_ok());
}

#[tokio::test]
async fn invalid_response_fails_the_load() {
    let (chain, mocks) = setup();
    let u = url("https://www.example.com/weird");
    mocks.register(
        MockResponse::builder().http_version("HTTP/9").build(),
        u.clone(),
    );

    let transcript = chain.record(get(&u)).await;
    assert!(transcript.response().is_none());
    let err = transcript.error().expect("load failed");
    assert_eq!(Some(ErrorKind::ResponseConstructionFailed), err.kind());
    assert!(err.as_mock_error().unwrap().source().is_some());
}

#[tokio::test]
async fn response_only_registration_round_trips_through_a_load() {
    let (chain, mocks) = setup();
    let u = url("https://www.example.com/head");
    let head = http::Response::builder()
        .status(304)
        .header("Cache-Control", "max-age=60")
        .body(())
        .unwrap();
    mocks.register_response(&head, u.clone(), None);

    let response = chain.load(get(&u)).await.unwrap();
    assert_eq!(304, response.status().as_u16());
    assert_eq!(http::Version::HTTP_11, response.version());
    assert_eq!("max-age=60", response.headers()["cache-control"]);
    assert!(response.body().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelled_loads_emit_nothing_further() {
    let (chain, mocks) = setup();
    let u = url("https://www.example.com/forever");
    mocks.register(
        MockResponse::builder()
            .body("too late")
            .delay(Duration::from_secs(60))
            .build(),
        u.clone(),
    );

    let transcript = chain
        .record_until(get(&u), tokio::time::sleep(Duration::from_millis(50)))
        .await;
    assert!(transcript.was_cancelled());
    assert!(transcript.events().is_empty());
    let err = transcript.into_result().unwrap_err();
    assert_eq!(Some(ErrorKind::Cancelled), err.kind());

    // the protocol holds no state for the abandoned load
    assert!(mocks.protocol().can_handle(&get(&u)));
}

#[test]
fn stop_is_always_accepted() {
    let (_, mocks) = setup();
    let u = url("https://www.example.com/never-started");
    mocks.protocol().stop(&get(&u));
    mocks.register(MockResponse::builder().build(), u.clone());
    mocks.protocol().stop(&get(&u));
    assert!(mocks.registry().contains(&u));
}
