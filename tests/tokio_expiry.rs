use std::time::Duration;

use tokio::sync::mpsc;
use tpcache::config::TeleportConfig;
use tpcache::teleport::{
    PlayerId, RequestCache, RequestOutcome, TeleportError, TeleportService, TokioScheduler,
};

fn scheduler() -> TokioScheduler {
    TokioScheduler::try_current().expect("tokio runtime")
}

fn recording_cache() -> (
    RequestCache<TokioScheduler>,
    mpsc::UnboundedReceiver<(PlayerId, PlayerId)>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cache = RequestCache::new(scheduler(), move |requester: PlayerId, target: PlayerId| {
        let _ = tx.send((requester, target));
    });
    (cache, rx)
}

#[tokio::test]
async fn request_expires_after_ttl() {
    let (cache, mut rx) = recording_cache();
    let (a, t) = (PlayerId::random(), PlayerId::random());
    cache.put(a, t, Duration::from_millis(30));

    let expired = tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("timeout waiting for expiry")
        .expect("channel closed");
    assert_eq!(expired, (a, t));
    assert_eq!(cache.requester_for(&t), None);
}

#[tokio::test]
async fn accepted_request_never_expires() {
    let (cache, mut rx) = recording_cache();
    let (a, t) = (PlayerId::random(), PlayerId::random());
    cache.put(a, t, Duration::from_millis(40));
    assert_eq!(cache.accept(&t), Some(a));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(rx.try_recv().is_err(), "accepted request produced an expiry");
    assert_eq!(cache.accept(&t), None);
}

#[tokio::test]
async fn replaced_request_only_expires_the_newest() {
    let (cache, mut rx) = recording_cache();
    let (a, b, t) = (PlayerId::random(), PlayerId::random(), PlayerId::random());
    cache.put(a, t, Duration::from_millis(20));
    cache.put(b, t, Duration::from_millis(60));

    tokio::time::sleep(Duration::from_millis(250)).await;
    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event);
    }
    assert_eq!(seen, vec![(b, t)]);
}

#[tokio::test]
async fn player_leaving_clears_timers() {
    let (cache, mut rx) = recording_cache();
    let (x, y, z) = (PlayerId::random(), PlayerId::random(), PlayerId::random());
    cache.put(x, y, Duration::from_millis(30));
    cache.put(z, x, Duration::from_millis(30));
    assert_eq!(cache.clear_for(&x), 2);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn service_round_trip_on_multi_thread_runtime() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let cfg = TeleportConfig {
        request_timeout_ticks: 2,
        tick_ms: 20,
    };
    let service = TeleportService::new(scheduler(), &cfg, move |r: PlayerId, t: PlayerId| {
        let _ = tx.send((r, t));
    })
    .expect("valid config");
    assert_eq!(service.timeout(), Duration::from_millis(40));

    let (a, b, c) = (PlayerId::random(), PlayerId::random(), PlayerId::random());
    assert_eq!(service.request(a, b), Ok(RequestOutcome::Created));
    assert_eq!(service.request(c, b), Ok(RequestOutcome::Superseded));
    assert_eq!(service.pending_for(b).map(|p| p.requester_id), Some(c));
    assert_eq!(service.accept(b), Ok(c));
    assert_eq!(service.accept(b), Err(TeleportError::NothingPending(b)));

    service.request(a, c).expect("request");
    let expired = tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("timeout waiting for expiry")
        .expect("channel closed");
    assert_eq!(expired, (a, c));
    assert!(rx.try_recv().is_err());
}
