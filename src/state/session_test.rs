use super::*;
use crate::test_support::{FakeAuthApi, jeremie, run_until};
use tokio::sync::Semaphore;

fn cache_for(api: &Arc<FakeAuthApi>) -> SessionCache {
    SessionCache::new(Arc::clone(api) as Arc<dyn AuthApi>)
}

// =============================================================
// get / resolve
// =============================================================

#[tokio::test]
async fn first_get_is_pending_without_identity() {
    let api = FakeAuthApi::signed_in(jeremie());
    let cache = cache_for(&api);

    let state = cache.get();
    assert_eq!(state.fetch_status, FetchStatus::Pending);
    assert!(state.identity.is_none());
}

#[tokio::test]
async fn peek_does_not_start_a_fetch() {
    let api = FakeAuthApi::signed_in(jeremie());
    let cache = cache_for(&api);

    assert_eq!(cache.peek().fetch_status, FetchStatus::Pending);
    tokio::task::yield_now().await;
    assert_eq!(api.me_calls(), 0);
}

#[tokio::test]
async fn resolve_returns_fetched_identity() {
    let api = FakeAuthApi::signed_in(jeremie());
    let cache = cache_for(&api);

    let state = cache.resolve().await;
    assert_eq!(state.fetch_status, FetchStatus::Settled);
    assert_eq!(state.identity.as_deref(), Some(&jeremie()));
    assert!(state.is_authenticated());
}

#[tokio::test]
async fn get_settles_in_background() {
    let api = FakeAuthApi::signed_in(jeremie());
    let cache = cache_for(&api);

    cache.get();
    run_until(|| cache.peek().fetch_status == FetchStatus::Settled).await;
    assert!(cache.get().is_authenticated());
}

#[tokio::test]
async fn concurrent_readers_share_one_request() {
    let api = FakeAuthApi::new();
    let gate = Arc::new(Semaphore::new(0));
    api.push_me(Ok(jeremie()), Some(Arc::clone(&gate)));
    let cache = cache_for(&api);

    for _ in 0..5 {
        assert_eq!(cache.get().fetch_status, FetchStatus::Pending);
    }
    let waiters = futures::future::join3(cache.resolve(), cache.resolve(), async {
        run_until(|| api.me_calls() == 1).await;
        gate.add_permits(1);
    });
    let (a, b, ()) = waiters.await;

    assert_eq!(api.me_calls(), 1);
    assert_eq!(a, b);
    assert!(a.is_authenticated());
}

#[tokio::test]
async fn settled_state_is_memoized() {
    let api = FakeAuthApi::signed_in(jeremie());
    let cache = cache_for(&api);

    cache.resolve().await;
    cache.get();
    cache.resolve().await;
    assert_eq!(api.me_calls(), 1);
}

// =============================================================
// failure folding
// =============================================================

#[tokio::test]
async fn unauthenticated_settles_as_absent_identity() {
    let api = FakeAuthApi::new();
    let cache = cache_for(&api);

    let state = cache.resolve().await;
    assert_eq!(state.fetch_status, FetchStatus::Settled);
    assert!(state.identity.is_none());
}

#[tokio::test]
async fn transport_failure_settles_as_absent_identity() {
    let api = FakeAuthApi::new();
    api.push_me(Err(FetchError::Transport("connection refused".to_owned())), None);
    let cache = cache_for(&api);

    let state = cache.resolve().await;
    assert_eq!(state, SessionState::settled(0, None));
}

#[tokio::test]
async fn decode_failure_settles_as_absent_identity() {
    let api = FakeAuthApi::new();
    api.push_me(Err(FetchError::Decode("expected value".to_owned())), None);
    let cache = cache_for(&api);

    assert!(!cache.resolve().await.is_authenticated());
}

// =============================================================
// invalidate
// =============================================================

#[tokio::test]
async fn invalidate_bumps_generation_and_refetches() {
    let api = FakeAuthApi::new();
    let cache = cache_for(&api);
    assert!(!cache.resolve().await.is_authenticated());

    api.push_me(Ok(jeremie()), None);
    cache.invalidate();
    let pending = cache.peek();
    assert_eq!(pending, SessionState::pending(1));

    let state = cache.resolve().await;
    assert_eq!(state.generation, 1);
    assert_eq!(state.identity.as_deref(), Some(&jeremie()));
    assert_eq!(api.me_calls(), 2);
}

#[tokio::test]
async fn stale_generation_result_is_discarded() {
    let api = FakeAuthApi::new();
    let slow = Arc::new(Semaphore::new(0));
    api.push_me(Ok(jeremie()), Some(Arc::clone(&slow)));
    api.push_me(Err(FetchError::Unauthenticated { status: 401 }), None);
    let cache = cache_for(&api);

    cache.get();
    run_until(|| api.me_calls() == 1).await;

    cache.invalidate();
    let state = cache.resolve().await;
    assert_eq!(state, SessionState::settled(1, None));

    slow.add_permits(1);
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(cache.peek(), SessionState::settled(1, None));
}

#[tokio::test]
async fn resolve_follows_invalidation_while_waiting() {
    let api = FakeAuthApi::new();
    let slow = Arc::new(Semaphore::new(0));
    api.push_me(Err(FetchError::Unauthenticated { status: 401 }), Some(Arc::clone(&slow)));
    api.push_me(Ok(jeremie()), None);
    let cache = cache_for(&api);

    let (state, ()) = futures::future::join(cache.resolve(), async {
        run_until(|| api.me_calls() == 1).await;
        cache.invalidate();
        slow.add_permits(1);
    })
    .await;

    assert_eq!(state.generation, 1);
    assert!(state.is_authenticated());
}

#[tokio::test]
async fn subscribers_see_invalidation_then_settle() {
    let api = FakeAuthApi::signed_in(jeremie());
    let cache = cache_for(&api);
    let mut changes = cache.subscribe();
    cache.resolve().await;
    assert!(changes.borrow_and_update().is_authenticated());

    cache.invalidate();
    assert!(changes.has_changed().unwrap());
    assert_eq!(*changes.borrow_and_update(), SessionState::pending(1));

    changes.changed().await.unwrap();
    assert_eq!(changes.borrow().generation, 1);
    assert!(changes.borrow().is_authenticated());
}

// =============================================================
// revalidate
// =============================================================

#[tokio::test]
async fn revalidate_keeps_identity_visible_until_refetch_lands() {
    let api = FakeAuthApi::signed_in(jeremie());
    let cache = cache_for(&api);
    cache.resolve().await;

    let gate = Arc::new(Semaphore::new(0));
    let renamed = Identity { id: 1, name: "Jérémie".to_owned() };
    api.push_me(Ok(renamed.clone()), Some(Arc::clone(&gate)));
    cache.revalidate();

    let during = cache.get();
    assert_eq!(during.fetch_status, FetchStatus::Settled);
    assert_eq!(during.identity.as_deref(), Some(&jeremie()));

    gate.add_permits(1);
    let after = cache.resolve().await;
    assert_eq!(after.identity.as_deref(), Some(&renamed));
    assert_eq!(api.me_calls(), 2);
}

#[tokio::test]
async fn revalidate_that_finds_no_session_clears_identity() {
    let api = FakeAuthApi::signed_in(jeremie());
    let cache = cache_for(&api);
    cache.resolve().await;

    api.push_me(Err(FetchError::Unauthenticated { status: 401 }), None);
    cache.revalidate();
    assert!(!cache.resolve().await.is_authenticated());
}

#[tokio::test]
async fn revalidate_while_pending_does_not_duplicate() {
    let api = FakeAuthApi::signed_in(jeremie());
    let cache = cache_for(&api);

    cache.get();
    cache.revalidate();
    cache.revalidate();
    cache.resolve().await;
    assert_eq!(api.me_calls(), 1);
}

// =============================================================
// dispose
// =============================================================

#[tokio::test]
async fn result_after_dispose_is_discarded() {
    let api = FakeAuthApi::new();
    let gate = Arc::new(Semaphore::new(0));
    api.push_me(Ok(jeremie()), Some(Arc::clone(&gate)));
    let cache = cache_for(&api);
    let mut changes = cache.subscribe();

    cache.get();
    run_until(|| api.me_calls() == 1).await;
    cache.dispose();
    gate.add_permits(1);
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(cache.peek(), SessionState::pending(0));
    assert!(!changes.has_changed().unwrap());
}

#[tokio::test]
async fn disposed_cache_ignores_invalidate() {
    let api = FakeAuthApi::signed_in(jeremie());
    let cache = cache_for(&api);
    cache.resolve().await;

    cache.dispose();
    cache.invalidate();
    assert_eq!(cache.peek().generation, 0);
    assert_eq!(api.me_calls(), 1);
}

#[test]
fn without_runtime_fetch_waits_for_resolve() {
    let api = FakeAuthApi::signed_in(jeremie());
    let cache = cache_for(&api);

    assert_eq!(cache.get().fetch_status, FetchStatus::Pending);
    assert_eq!(api.me_calls(), 0);

    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let state = runtime.block_on(cache.resolve());
    assert!(state.is_authenticated());
    assert_eq!(api.me_calls(), 1);
}
