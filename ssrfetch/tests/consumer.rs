mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use common::{MockClient, Route, client_session, server_session};
use pretty_assertions::assert_eq;
use serde_json::json;
use ssrfetch::{
    ApiResponse, CacheEntry, Consumer, ConsumerOptions, CustomSettings, RequestConfig,
    RequestDescriptor, RequestState, ResponseEnvelope, Session,
};
use tokio::sync::watch;

#[tokio::test]
async fn test_second_consumer_is_fed_from_cache() {
    let client = MockClient::new().ok("/a", json!({"foo": 1}));
    let session = client_session(&client);

    let mut first = Consumer::default();
    let declaration = first.declare(&session, "/a").unwrap().unwrap();
    assert!(declaration.should_fetch);
    assert!(declaration.data.is_none());
    first.request(&session, false).await.unwrap();
    assert_eq!(first.data(), Some(json!({"foo": 1})));
    assert!(!first.state().from_cache);

    let mut second = Consumer::default();
    let declaration = second.declare(&session, "/a").unwrap().unwrap();
    assert_eq!(declaration.data, Some(json!({"foo": 1})));
    assert!(declaration.state.from_cache);
    assert!(!declaration.should_fetch);
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_switching_dependency_drops_history() {
    let client = MockClient::new().ok("/a", json!("a")).ok("/b", json!("b"));
    let session = client_session(&client);
    let mut consumer = Consumer::default();

    consumer.declare(&session, "/a").unwrap();
    consumer.request(&session, false).await.unwrap();
    assert_eq!(consumer.data(), Some(json!("a")));

    let declaration = consumer.declare(&session, "/b").unwrap().unwrap();
    assert!(declaration.should_fetch);
    consumer.request(&session, false).await.unwrap();

    let state = consumer.state();
    assert_eq!(state.data, Some(json!("b")));
    assert!(state.prev_state.is_none());
    assert!(state.prev_data.is_none());
    assert_eq!(state.key, RequestDescriptor::from("/b").key().unwrap());
}

#[tokio::test]
async fn test_cached_switch_after_redeclare_drops_history() {
    let client = MockClient::new().ok("/a", json!("a"));
    let session = client_session(&client);
    let key_b = RequestDescriptor::from("/b").key().unwrap();
    let mut consumer = Consumer::default();

    consumer.declare(&session, "/a").unwrap();
    consumer.request(&session, false).await.unwrap();
    session.cache().set(
        &key_b,
        CacheEntry::success(ApiResponse::Single(ResponseEnvelope::ok(json!("b")))),
    );

    consumer.declare(&session, "/b").unwrap();
    consumer.declare(&session, "/b").unwrap();
    consumer.request(&session, false).await.unwrap();

    let state = consumer.state();
    assert_eq!(state.key, key_b);
    assert_eq!(state.data, Some(json!("b")));
    assert!(state.from_cache);
    assert!(state.prev_data.is_none());
    assert!(state.prev_state.is_none());
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_next_page_lands_in_the_same_state() {
    let client = MockClient::new()
        .ok("/list/1", json!([1, 2]))
        .ok("/list/2", json!([3, 4]));
    let session = client_session(&client);
    let key_1 = RequestDescriptor::from("/list/1").key().unwrap();
    let key_2 = RequestDescriptor::from("/list/2").key().unwrap();
    let mut consumer = Consumer::default();

    consumer.declare(&session, "/list/1").unwrap();
    consumer.request(&session, false).await.unwrap();
    consumer
        .request_with(&session, "/list/2", true, true)
        .await
        .unwrap();

    let state = consumer.state();
    assert_eq!(state.key, key_1);
    assert_eq!(consumer.key(), &key_1);
    assert_eq!(state.data, Some(json!([3, 4])));
    assert_eq!(state.prev_data, Some(json!([1, 2])));
    assert_eq!(client.calls(), vec!["/list/1".to_string(), "/list/2".to_string()]);

    assert_eq!(
        session.cache().get(&key_1).unwrap().response.unwrap().data(),
        json!([1, 2])
    );
    assert_eq!(
        session.cache().get(&key_2).unwrap().response.unwrap().data(),
        json!([3, 4])
    );
    assert!(!consumer.declare(&session, "/list/1").unwrap().unwrap().should_fetch);
}

#[tokio::test]
async fn test_watched_values_make_a_fetch_due() {
    let client = MockClient::new().ok("/a", json!(1));
    let session = client_session(&client);
    let mut consumer = Consumer::new(
        ConsumerOptions::default()
            .use_cache(false)
            .watch(json!(["ada"])),
    );

    assert!(consumer.declare(&session, "/a").unwrap().unwrap().should_fetch);
    consumer.request(&session, false).await.unwrap();
    assert!(!consumer.declare(&session, "/a").unwrap().unwrap().should_fetch);

    consumer.watch(json!(["grace"]));
    assert!(consumer.declare(&session, "/a").unwrap().unwrap().should_fetch);
    consumer.request(&session, false).await.unwrap();
    assert!(!consumer.declare(&session, "/a").unwrap().unwrap().should_fetch);
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn test_projection_may_read_the_current_state() {
    let client = MockClient::new().ok("/a", json!(1)).ok("/b", json!(2));
    let session = client_session(&client);
    let updates: Arc<OnceLock<watch::Receiver<Arc<RequestState>>>> = Arc::default();
    let seen = updates.clone();
    let mut consumer = Consumer::new(ConsumerOptions::default().projection(move |data, _| {
        let before = seen.get().and_then(|updates| updates.borrow().data.clone());
        json!({"now": data, "before": before})
    }));
    updates.set(consumer.subscribe()).unwrap();

    consumer.declare(&session, "/a").unwrap();
    tokio::time::timeout(Duration::from_secs(5), consumer.request(&session, false))
        .await
        .expect("settled without blocking")
        .unwrap();
    assert_eq!(consumer.data(), Some(json!({"now": 1, "before": null})));

    tokio::time::timeout(
        Duration::from_secs(5),
        consumer.request_with(&session, "/b", true, false),
    )
    .await
    .expect("settled without blocking")
    .unwrap();
    assert_eq!(
        consumer.data(),
        Some(json!({"now": 2, "before": {"now": 1, "before": null}}))
    );
}

#[tokio::test]
async fn test_refresh_keeps_previous_page() {
    let client = MockClient::new().ok("/list", json!([1, 2]));
    let session = client_session(&client);
    let mut consumer = Consumer::new(ConsumerOptions::default().dependencies(json!({"page": 1})));

    consumer.declare(&session, "/list").unwrap();
    consumer.request(&session, false).await.unwrap();
    consumer.declare(&session, "/list").unwrap();
    consumer.refresh(&session).await.unwrap();

    let state = consumer.state();
    assert_eq!(client.call_count(), 2);
    assert_eq!(state.prev_data, Some(json!([1, 2])));
    assert_eq!(state.dependencies, Some(json!({"page": 1})));
    assert!(!state.from_cache);
}

#[tokio::test]
async fn test_clear_last_cache_when_config_changes() {
    let client = MockClient::new().ok("/a", json!(1)).ok("/b", json!(2));
    let session = Session::builder()
        .settings(CustomSettings {
            clear_last_cache_when_config_changes: Some(true),
            ..CustomSettings::default().client(client.clone())
        })
        .ssr(false)
        .build();
    let key_a = RequestDescriptor::from("/a").key().unwrap();

    let mut consumer = Consumer::default();
    consumer.declare(&session, "/a").unwrap();
    consumer.request(&session, false).await.unwrap();
    assert!(session.cache().has(&key_a));

    consumer.declare(&session, "/b").unwrap();
    assert!(!session.cache().has(&key_a));
}

#[tokio::test]
async fn test_projection_and_failure() {
    let client = MockClient::new()
        .ok("/user", json!({"name": "ada"}))
        .route("/fail", Route::Status(500, json!({"msg": "x"})));
    let session = client_session(&client);

    let mut user = Consumer::new(
        ConsumerOptions::default().projection(|data, _| data["name"].clone()),
    );
    user.declare(&session, "/user").unwrap();
    user.request(&session, false).await.unwrap();
    assert_eq!(user.data(), Some(json!("ada")));

    let mut failing = Consumer::default();
    failing.declare(&session, "/fail").unwrap();
    failing.request(&session, false).await.unwrap();
    let state = failing.state();
    assert!(!state.loading);
    assert!(state.data.is_none());
    assert_eq!(state.error.as_ref().unwrap().response.as_ref().unwrap().data["msg"], "x");
}

#[tokio::test]
async fn test_skip_and_invalid_descriptors() {
    let client = MockClient::new().ok("/a", json!(1));
    let session = client_session(&client);

    let mut skipped = Consumer::new(ConsumerOptions::default().skip(true));
    let declaration = skipped.declare(&session, "/a").unwrap().unwrap();
    assert!(!declaration.should_fetch);
    skipped.request(&session, false).await.unwrap();

    let mut invalid = Consumer::default();
    assert!(invalid.declare(&session, RequestConfig::default()).unwrap().is_none());
    invalid.request(&session, false).await.unwrap();

    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_should_request_refetches_on_rerender() {
    let client = MockClient::new().ok("/a", json!(1));
    let session = client_session(&client);
    let again = Arc::new(AtomicBool::new(false));
    let flag = again.clone();
    let mut consumer = Consumer::new(
        ConsumerOptions::default().should_request(move || flag.load(Ordering::SeqCst)),
    );

    assert!(consumer.declare(&session, "/a").unwrap().unwrap().should_fetch);
    consumer.request(&session, false).await.unwrap();
    assert!(!consumer.declare(&session, "/a").unwrap().unwrap().should_fetch);

    again.store(true, Ordering::SeqCst);
    assert!(consumer.declare(&session, "/a").unwrap().unwrap().should_fetch);
}

#[tokio::test]
async fn test_server_declaration_collects_or_feeds() {
    let client = MockClient::new().ok("/a", json!(1));
    let session = server_session(&client, CustomSettings::default());
    let key = RequestDescriptor::from("/a").key().unwrap();

    let mut consumer = Consumer::default();
    let declaration = consumer.declare(&session, "/a").unwrap().unwrap();
    assert!(!declaration.should_fetch);
    assert!(declaration.data.is_none());
    assert_eq!(session.pending(), vec![key.clone()]);

    session.take_pending();
    session.cache().set(
        &key,
        CacheEntry::success(ApiResponse::Single(ResponseEnvelope::ok(json!(1)))),
    );
    let mut rerendered = Consumer::default();
    let declaration = rerendered.declare(&session, "/a").unwrap().unwrap();
    assert_eq!(declaration.data, Some(json!(1)));
    assert!(!declaration.state.from_cache);
    assert!(session.pending().is_empty());
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_subscribers_observe_settlement() {
    let client = MockClient::new().ok("/a", json!(1));
    let session = client_session(&client);
    let mut consumer = Consumer::default();
    let mut updates = consumer.subscribe();

    consumer.declare(&session, "/a").unwrap();
    consumer.request(&session, false).await.unwrap();

    assert!(updates.has_changed().unwrap());
    let state = updates.borrow_and_update().clone();
    assert_eq!(state.data, Some(json!(1)));
    assert!(!state.loading);
}
