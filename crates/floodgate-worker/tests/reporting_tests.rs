//! Worker-side reporting and token consumption against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use floodgate_store::MemoryStore;
use floodgate_types::schema::{
    self, member_outcome, ERROR_COUNT, FAILED, HALTED, KNOWN_TLDS, LAST_50_REQUESTS,
    STATUS_12HR, STATUS_1HR, STATUS_60S, SUCCEEDED, SUCCESS_COUNT, TEMP_HALTED,
};
use floodgate_types::{unix_time_secs, ErrorCode, MonotonicClock, SharedStore, StoreBatch, Tld};
use floodgate_worker::{Acquire, StatsManager, TokenConsumer, TokenConsumerConfig};

fn example_tld() -> Tld {
    Tld::from_url("https://images.example.com/photo.jpg")
}

fn manager(store: Arc<MemoryStore>) -> StatsManager {
    StatsManager::new(store, MonotonicClock::new())
}

#[tokio::test]
async fn success_updates_counters_windows_and_recent_list() {
    let store = Arc::new(MemoryStore::new());
    let stats = manager(store.clone());

    stats.record_success(&example_tld()).await.unwrap();
    stats.record_success(&example_tld()).await.unwrap();

    assert_eq!(store.get_i64(SUCCESS_COUNT).await.unwrap(), Some(2));
    assert_eq!(
        store.get_i64("num_resized:example.com").await.unwrap(),
        Some(2)
    );
    for prefix in [STATUS_60S, STATUS_1HR, STATUS_12HR] {
        let members = store
            .window_range(
                &schema::prefixed(prefix, "example.com"),
                f64::NEG_INFINITY,
                f64::INFINITY,
            )
            .await
            .unwrap();
        assert_eq!(members.len(), 2, "window {prefix} should hold both samples");
        assert!(members
            .iter()
            .all(|m| member_outcome(m) == Some(SUCCEEDED)));
    }
    let recent = store
        .list_range(&schema::prefixed(LAST_50_REQUESTS, "example.com"), 0, -1)
        .await
        .unwrap();
    assert_eq!(recent, vec!["200".to_string(), "200".to_string()]);
}

#[tokio::test]
async fn rate_affecting_error_lands_in_windows() {
    let store = Arc::new(MemoryStore::new());
    let stats = manager(store.clone());

    stats
        .record_error(&example_tld(), Some(ErrorCode::Http(500)))
        .await
        .unwrap();

    assert_eq!(store.get_i64(ERROR_COUNT).await.unwrap(), Some(1));
    assert_eq!(
        store.get_i64("resize_errors:example.com").await.unwrap(),
        Some(1)
    );
    assert_eq!(
        store
            .get_i64("resize_errors:example.com:500")
            .await
            .unwrap(),
        Some(1)
    );
    let members = store
        .window_range("status60s:example.com", f64::NEG_INFINITY, f64::INFINITY)
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(member_outcome(&members[0]), Some(FAILED));
}

#[tokio::test]
async fn benign_errors_count_but_do_not_feed_the_windows() {
    let store = Arc::new(MemoryStore::new());
    let stats = manager(store.clone());
    let tld = example_tld();

    for _ in 0..10 {
        stats
            .record_error(&tld, Some(ErrorCode::Http(404)))
            .await
            .unwrap();
    }

    assert_eq!(store.get_i64(ERROR_COUNT).await.unwrap(), Some(10));
    assert_eq!(
        store.get_i64("resize_errors:example.com").await.unwrap(),
        Some(10)
    );
    assert_eq!(
        store
            .get_i64("resize_errors:example.com:404")
            .await
            .unwrap(),
        Some(10)
    );
    for prefix in [STATUS_60S, STATUS_1HR, STATUS_12HR] {
        let members = store
            .window_range(
                &schema::prefixed(prefix, "example.com"),
                f64::NEG_INFINITY,
                f64::INFINITY,
            )
            .await
            .unwrap();
        assert!(members.is_empty(), "benign errors must not touch {prefix}");
    }
    // the recent-request list still sees them
    assert_eq!(
        store
            .list_len("statuslast50req:example.com")
            .await
            .unwrap(),
        10
    );
}

#[tokio::test]
async fn unidentified_image_marker_is_benign() {
    let store = Arc::new(MemoryStore::new());
    let stats = manager(store.clone());

    stats
        .record_error(&example_tld(), Some(ErrorCode::UnidentifiedImage))
        .await
        .unwrap();

    assert_eq!(
        store
            .get_i64("resize_errors:example.com:UnidentifiedImageError")
            .await
            .unwrap(),
        Some(1)
    );
    let members = store
        .window_range("status60s:example.com", f64::NEG_INFINITY, f64::INFINITY)
        .await
        .unwrap();
    assert!(members.is_empty());
    let recent = store
        .list_range("statuslast50req:example.com", 0, -1)
        .await
        .unwrap();
    assert_eq!(recent, vec!["UnidentifiedImageError".to_string()]);
}

#[tokio::test]
async fn codeless_errors_only_move_counters_and_windows() {
    let store = Arc::new(MemoryStore::new());
    let stats = manager(store.clone());

    stats.record_error(&example_tld(), None).await.unwrap();

    assert_eq!(store.get_i64(ERROR_COUNT).await.unwrap(), Some(1));
    let members = store
        .window_range("status60s:example.com", f64::NEG_INFINITY, f64::INFINITY)
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(
        store
            .list_len("statuslast50req:example.com")
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn recent_request_list_never_exceeds_fifty() {
    let store = Arc::new(MemoryStore::new());
    let stats = manager(store.clone());
    let tld = example_tld();

    for _ in 0..60 {
        stats
            .record_error(&tld, Some(ErrorCode::Http(500)))
            .await
            .unwrap();
    }
    for _ in 0..5 {
        stats.record_success(&tld).await.unwrap();
    }

    let recent = store
        .list_range("statuslast50req:example.com", 0, -1)
        .await
        .unwrap();
    assert_eq!(recent.len(), 50);
    // newest entries survive at the tail
    assert_eq!(recent.last().unwrap(), "200");
}

#[tokio::test]
async fn windows_are_trimmed_to_their_interval() {
    let store = Arc::new(MemoryStore::new());
    let clock = MonotonicClock::new();
    let stats = StatsManager::new(store.clone(), clock);
    let now = clock.now_secs();

    // seed a stale sample far outside the 60s window
    let mut batch = StoreBatch::new();
    batch.zadd("status60s:example.com", "0:stale:0", now - 3600.0);
    store.commit(batch).await.unwrap();

    stats.record_success(&example_tld()).await.unwrap();

    let members = store
        .window_range("status60s:example.com", f64::NEG_INFINITY, f64::INFINITY)
        .await
        .unwrap();
    assert_eq!(members.len(), 1, "stale sample should be trimmed away");
    assert_eq!(member_outcome(&members[0]), Some(SUCCEEDED));
    // every surviving member sits inside the window
    let fresh = store
        .window_range("status60s:example.com", now - 60.0, f64::INFINITY)
        .await
        .unwrap();
    assert_eq!(fresh.len(), 1);
}

#[tokio::test]
async fn update_tlds_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let stats = manager(store.clone());
    let tld = example_tld();

    for _ in 0..5 {
        stats.update_tlds(&tld).await.unwrap();
    }

    let known = store.set_members(KNOWN_TLDS).await.unwrap();
    assert_eq!(known, vec!["example.com".to_string()]);
}

#[tokio::test]
async fn distinct_errors_produce_distinct_window_members() {
    let store = Arc::new(MemoryStore::new());
    let stats = manager(store.clone());
    let tld = example_tld();

    for _ in 0..3 {
        stats
            .record_error(&tld, Some(ErrorCode::Http(500)))
            .await
            .unwrap();
    }

    let members = store
        .window_range("status60s:example.com", f64::NEG_INFINITY, f64::INFINITY)
        .await
        .unwrap();
    assert_eq!(members.len(), 3, "each sample must be a unique member");
}

#[tokio::test]
async fn acquire_consumes_one_token_per_call() {
    let store = Arc::new(MemoryStore::new());
    store.set_i64("currtokens:example.com", 3).await.unwrap();
    let consumer = TokenConsumer::new(store.clone());

    for _ in 0..3 {
        assert_eq!(
            consumer.acquire("example.com").await.unwrap(),
            Acquire::Token
        );
    }
    assert_eq!(
        store.get_i64("currtokens:example.com").await.unwrap(),
        Some(0)
    );
}

#[tokio::test]
async fn acquire_skips_halted_domains_without_touching_the_bucket() {
    let store = Arc::new(MemoryStore::new());
    store.set_i64("currtokens:example.com", 5).await.unwrap();
    store.set_add(HALTED, "example.com").await.unwrap();
    let consumer = TokenConsumer::new(store.clone());

    assert_eq!(
        consumer.acquire("example.com").await.unwrap(),
        Acquire::Halted
    );
    assert_eq!(
        store.get_i64("currtokens:example.com").await.unwrap(),
        Some(5)
    );
}

#[tokio::test]
async fn acquire_respects_temporary_halts() {
    let store = Arc::new(MemoryStore::new());
    store.set_i64("currtokens:example.com", 5).await.unwrap();
    let mut batch = StoreBatch::new();
    batch.zadd(TEMP_HALTED, "example.com", unix_time_secs() + 300.0);
    store.commit(batch).await.unwrap();
    let consumer = TokenConsumer::new(store.clone());

    assert_eq!(
        consumer.acquire("example.com").await.unwrap(),
        Acquire::Halted
    );
    assert_eq!(
        store.get_i64("currtokens:example.com").await.unwrap(),
        Some(5)
    );
}

#[tokio::test]
async fn a_lapsed_temporary_halt_no_longer_excludes_the_domain() {
    let store = Arc::new(MemoryStore::new());
    store.set_i64("currtokens:example.com", 5).await.unwrap();
    // deadline in the past: the halt is over even before the regulator
    // prunes the entry
    let mut batch = StoreBatch::new();
    batch.zadd(TEMP_HALTED, "example.com", unix_time_secs() - 5.0);
    store.commit(batch).await.unwrap();
    let consumer = TokenConsumer::new(store.clone());

    assert_eq!(
        consumer.acquire("example.com").await.unwrap(),
        Acquire::Token
    );
}

#[tokio::test]
async fn temporary_halts_are_scoped_to_their_own_domain() {
    let store = Arc::new(MemoryStore::new());
    store.set_i64("currtokens:example.com", 5).await.unwrap();
    store.set_i64("currtokens:flaky.net", 5).await.unwrap();
    let mut batch = StoreBatch::new();
    batch.zadd(TEMP_HALTED, "flaky.net", unix_time_secs() + 300.0);
    store.commit(batch).await.unwrap();
    let consumer = TokenConsumer::new(store.clone());

    assert_eq!(
        consumer.acquire("flaky.net").await.unwrap(),
        Acquire::Halted
    );
    assert_eq!(
        consumer.acquire("example.com").await.unwrap(),
        Acquire::Token
    );
}

#[tokio::test]
async fn empty_bucket_blocks_until_the_next_refill() {
    let store = Arc::new(MemoryStore::new());
    store.set_i64("currtokens:example.com", 0).await.unwrap();
    let consumer = TokenConsumer::with_config(
        store.clone(),
        TokenConsumerConfig {
            empty_backoff: Duration::from_millis(20),
        },
    );

    let refill_store = store.clone();
    let refill = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        refill_store
            .set_i64("currtokens:example.com", 2)
            .await
            .unwrap();
    });

    let acquired = consumer.acquire("example.com").await.unwrap();
    assert_eq!(acquired, Acquire::Token);
    refill.await.unwrap();

    // the compensated waits never drove the bucket negative
    let remaining = store
        .get_i64("currtokens:example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(remaining >= 0);
}

#[tokio::test]
async fn empty_bucket_becomes_halted_mid_wait() {
    let store = Arc::new(MemoryStore::new());
    store.set_i64("currtokens:example.com", 0).await.unwrap();
    let consumer = TokenConsumer::with_config(
        store.clone(),
        TokenConsumerConfig {
            empty_backoff: Duration::from_millis(20),
        },
    );

    let halt_store = store.clone();
    let halt = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        halt_store.set_add(HALTED, "example.com").await.unwrap();
    });

    assert_eq!(
        consumer.acquire("example.com").await.unwrap(),
        Acquire::Halted
    );
    halt.await.unwrap();

    assert_eq!(
        store.get_i64("currtokens:example.com").await.unwrap(),
        Some(0)
    );
}

#[tokio::test]
async fn concurrent_consumers_never_oversubscribe() {
    let store = Arc::new(MemoryStore::new());
    store.set_i64("currtokens:example.com", 10).await.unwrap();
    let consumer = Arc::new(TokenConsumer::new(store.clone()));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let consumer = consumer.clone();
        handles.push(tokio::spawn(async move {
            consumer.acquire("example.com").await.unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Acquire::Token);
    }
    assert_eq!(
        store.get_i64("currtokens:example.com").await.unwrap(),
        Some(0)
    );
}
