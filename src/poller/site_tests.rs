//! Tests for `SitePoller`.

use super::test_fixtures::{MockClock, MockFetcher, RecordingObserver};
use super::{ManualScheduler, Scheduler, SitePoller, TickOutcome};
use crate::nebula::{AuthError, ClientRecord, FetchError, FetchSnapshot, ObserverId, SiteId};
use crate::presence::Observer;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

const INTERVAL: Duration = Duration::from_secs(30);

fn poller_with(
    fetcher: MockFetcher,
) -> (Arc<SitePoller<MockFetcher>>, Arc<MockFetcher>, Arc<ManualScheduler>) {
    let fetcher = Arc::new(fetcher);
    let scheduler = Arc::new(ManualScheduler::new());
    let poller = Arc::new(SitePoller::new(
        SiteId::from("S1"),
        Arc::clone(&fetcher),
        Arc::clone(&scheduler) as Arc<dyn Scheduler>,
        Arc::new(MockClock::new(1_000)),
        INTERVAL,
    ));
    (poller, fetcher, scheduler)
}

fn add(poller: &SitePoller<MockFetcher>, observer: &Arc<RecordingObserver>) -> usize {
    poller.add_observer(
        observer.key().clone(),
        Arc::clone(observer) as Arc<dyn Observer>,
    )
}

#[tokio::test]
async fn tick_without_observers_does_not_fetch() {
    let (poller, fetcher, _) = poller_with(MockFetcher::returning(vec![]));

    assert_eq!(poller.tick().await, TickOutcome::Idle);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn tick_applies_roster_to_every_observer() {
    let (poller, fetcher, _) = poller_with(MockFetcher::returning(vec![vec![
        ClientRecord::online("A"),
        ClientRecord::new("B", "OFFLINE"),
    ]]));
    let a = RecordingObserver::new("A");
    let b = RecordingObserver::new("B");
    add(&poller, &a);
    add(&poller, &b);

    assert_eq!(poller.tick().await, TickOutcome::Applied(2));

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(fetcher.sites(), vec![SiteId::from("S1")]);
    assert_eq!(a.online_history(), vec![true]);
    assert_eq!(b.online_history(), vec![false]);
}

#[tokio::test]
async fn successful_fetch_is_cached_with_clock_time() {
    let (poller, _, _) = poller_with(MockFetcher::returning(vec![vec![ClientRecord::online(
        "A",
    )]]));
    add(&poller, &RecordingObserver::new("A"));

    poller.tick().await;

    let cached = poller.last_fetch().unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(
        cached.fetched_at(),
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000)
    );
}

#[tokio::test]
async fn failed_fetch_leaves_cache_and_observers_untouched() {
    let (poller, _, _) = poller_with(MockFetcher::new(vec![
        Ok(vec![ClientRecord::online("A")]),
        Err(FetchError::Auth(AuthError::MissingApiKey)),
        Ok(vec![]),
    ]));
    let a = RecordingObserver::new("A");
    add(&poller, &a);

    assert_eq!(poller.tick().await, TickOutcome::Applied(1));
    let before = poller.last_fetch().unwrap();

    assert_eq!(poller.tick().await, TickOutcome::Failed);
    assert_eq!(a.apply_count(), 1);
    assert!(Arc::ptr_eq(&before, &poller.last_fetch().unwrap()));

    // Next cycle proceeds normally.
    assert_eq!(poller.tick().await, TickOutcome::Applied(1));
    assert_eq!(a.online_history(), vec![true, false]);
}

#[tokio::test]
async fn late_observer_gets_cached_roster_immediately() {
    let (poller, fetcher, _) = poller_with(MockFetcher::returning(vec![vec![
        ClientRecord::online("A"),
        ClientRecord::online("B"),
    ]]));
    add(&poller, &RecordingObserver::new("A"));
    poller.tick().await;

    let b = RecordingObserver::new("B");
    add(&poller, &b);

    assert_eq!(b.online_history(), vec![true]);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn observer_added_before_any_fetch_gets_nothing() {
    let (poller, _, _) = poller_with(MockFetcher::returning(vec![]));
    let a = RecordingObserver::new("A");

    add(&poller, &a);

    assert_eq!(a.apply_count(), 0);
}

#[tokio::test]
async fn overlapping_tick_is_skipped() {
    let (poller, fetcher, _) = poller_with(MockFetcher::gated(vec![Ok(vec![
        ClientRecord::online("A"),
    ])]));
    add(&poller, &RecordingObserver::new("A"));

    let first = tokio::spawn({
        let poller = Arc::clone(&poller);
        async move { poller.tick().await }
    });
    fetcher.wait_for_calls(1).await;

    assert_eq!(poller.tick().await, TickOutcome::Busy);
    assert_eq!(fetcher.calls(), 1);

    fetcher.release();
    assert_eq!(first.await.unwrap(), TickOutcome::Applied(1));

    // Busy flag is cleared once the fetch completes.
    fetcher.release();
    assert_eq!(poller.tick().await, TickOutcome::Applied(1));
}

#[tokio::test]
async fn busy_flag_is_cleared_after_failure() {
    let (poller, _, _) = poller_with(MockFetcher::new(vec![Err(FetchError::Auth(
        AuthError::MissingApiKey,
    ))]));
    add(&poller, &RecordingObserver::new("A"));

    assert_eq!(poller.tick().await, TickOutcome::Failed);
    assert_eq!(poller.tick().await, TickOutcome::Applied(1));
}

#[tokio::test]
async fn result_arriving_after_retire_is_discarded() {
    let (poller, fetcher, _) = poller_with(MockFetcher::gated(vec![Ok(vec![
        ClientRecord::online("A"),
    ])]));
    let a = RecordingObserver::new("A");
    add(&poller, &a);

    let pending = tokio::spawn({
        let poller = Arc::clone(&poller);
        async move { poller.tick().await }
    });
    fetcher.wait_for_calls(1).await;

    poller.remove_observer(&ObserverId::from("A"));
    poller.retire();
    fetcher.release();

    assert_eq!(pending.await.unwrap(), TickOutcome::Discarded);
    assert_eq!(a.apply_count(), 0);
    assert!(poller.last_fetch().is_none());
}

/// Observer that signals when a roster arrives, then lingers in the fan-out.
struct LingeringObserver {
    key: ObserverId,
    entered: Mutex<Option<mpsc::Sender<()>>>,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Observer for LingeringObserver {
    fn key(&self) -> &ObserverId {
        &self.key
    }

    fn apply_fetch_result(&self, _snapshot: &FetchSnapshot) {
        if let Some(entered) = self.entered.lock().unwrap().take() {
            entered.send(()).unwrap();
        }
        std::thread::sleep(Duration::from_millis(50));
        self.log.lock().unwrap().push("applied");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn retire_waits_for_fan_out_in_progress() {
    let (poller, _, _) = poller_with(MockFetcher::returning(vec![vec![ClientRecord::online(
        "A",
    )]]));
    let (entered_tx, entered_rx) = mpsc::channel();
    let log = Arc::new(Mutex::new(Vec::new()));
    poller.add_observer(
        ObserverId::from("A"),
        Arc::new(LingeringObserver {
            key: ObserverId::from("A"),
            entered: Mutex::new(Some(entered_tx)),
            log: Arc::clone(&log),
        }),
    );

    let ticking = tokio::spawn({
        let poller = Arc::clone(&poller);
        async move { poller.tick().await }
    });
    let retiring = tokio::task::spawn_blocking({
        let poller = Arc::clone(&poller);
        let log = Arc::clone(&log);
        move || {
            entered_rx.recv().unwrap();
            poller.retire();
            log.lock().unwrap().push("retired");
        }
    });

    retiring.await.unwrap();
    assert_eq!(ticking.await.unwrap(), TickOutcome::Applied(1));
    assert_eq!(*log.lock().unwrap(), vec!["applied", "retired"]);
    assert_eq!(poller.tick().await, TickOutcome::Idle);
}

#[tokio::test]
async fn start_fetches_immediately_and_arms_one_timer() {
    let (poller, fetcher, scheduler) = poller_with(MockFetcher::returning(vec![]));
    add(&poller, &RecordingObserver::new("A"));

    poller.start();
    poller.start();

    assert!(poller.is_polling());
    assert_eq!(scheduler.active_timers(), 1);
    assert_eq!(scheduler.active_intervals(), vec![INTERVAL]);
    assert_eq!(scheduler.run_spawned().await, 1);
    assert_eq!(fetcher.calls(), 1);

    scheduler.fire().await;
    scheduler.fire().await;
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn stop_cancels_timer() {
    let (poller, fetcher, scheduler) = poller_with(MockFetcher::returning(vec![]));
    add(&poller, &RecordingObserver::new("A"));
    poller.start();
    scheduler.run_spawned().await;

    poller.stop();

    assert!(!poller.is_polling());
    assert_eq!(scheduler.active_timers(), 0);
    assert_eq!(scheduler.fire().await, 0);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn retired_poller_cannot_restart() {
    let (poller, _, scheduler) = poller_with(MockFetcher::returning(vec![]));
    add(&poller, &RecordingObserver::new("A"));

    poller.retire();
    poller.start();

    assert!(!poller.is_polling());
    assert_eq!(scheduler.scheduled_timers(), 0);
    assert_eq!(poller.tick().await, TickOutcome::Idle);
}

#[tokio::test]
async fn timer_does_not_keep_poller_alive() {
    let (poller, fetcher, scheduler) = poller_with(MockFetcher::returning(vec![]));
    add(&poller, &RecordingObserver::new("A"));
    poller.start();
    scheduler.run_spawned().await;

    let weak = Arc::downgrade(&poller);
    drop(poller);

    assert!(weak.upgrade().is_none());
    scheduler.fire().await;
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn re_adding_a_key_replaces_the_observer() {
    let (poller, _, _) = poller_with(MockFetcher::returning(vec![]));

    assert_eq!(add(&poller, &RecordingObserver::new("A")), 1);
    assert_eq!(add(&poller, &RecordingObserver::new("A")), 1);
    assert_eq!(poller.remove_observer(&ObserverId::from("missing")), 1);
    assert_eq!(poller.remove_observer(&ObserverId::from("A")), 0);
}

#[test]
fn debug_shows_site_and_observer_count() {
    let (poller, _, _) = poller_with(MockFetcher::returning(vec![]));
    add(&poller, &RecordingObserver::new("A"));

    let rendered = format!("{poller:?}");
    assert!(rendered.contains("S1"));
    assert!(rendered.contains("observers: 1"));
    assert!(rendered.contains("polling: false"));
}
