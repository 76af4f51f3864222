//! Integration tests for a spawned playback session
//!
//! Drives the control task through `SessionHandle` and observes it through
//! `SessionObservers`, with the simulated engine underneath. Covers:
//! - Transport commands and state transitions
//! - Position publication
//! - Rate validation and forwarding
//! - Pre-fetch at the end of the queue
//! - Error reporting and teardown

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chapter_common::config::SessionConfig;
use chapter_common::events::{PlaybackState, SessionEvent, SessionSnapshot};
use chapter_common::PlayableItem;
use chapter_player::catalog::StaticCatalog;
use chapter_player::notification::NotificationSurface;
use chapter_player::playback::{EngineCall, EngineProbe};
use chapter_player::{EngineErrorKind, Error, SessionBuilder, SessionHandle, SessionObservers};

const WAIT: Duration = Duration::from_secs(5);

fn fast_config() -> SessionConfig {
    SessionConfig {
        position_interval_ms: 20,
        ..SessionConfig::default()
    }
}

fn spawn() -> (SessionHandle, SessionObservers, EngineProbe) {
    SessionBuilder::new(fast_config()).spawn_simulated()
}

fn chapters(ids: &[&str]) -> Vec<PlayableItem> {
    let catalog = StaticCatalog::sample_book();
    ids.iter().map(|id| catalog.get(id).unwrap().clone()).collect()
}

#[derive(Clone, Default)]
struct RecordingNotification {
    actions: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingNotification {
    fn last(&self) -> Option<&'static str> {
        self.actions.lock().unwrap().last().copied()
    }
}

impl NotificationSurface for RecordingNotification {
    fn render(&mut self, _snapshot: &SessionSnapshot) {
        self.actions.lock().unwrap().push("render");
    }

    fn hide(&mut self) {
        self.actions.lock().unwrap().push("hide");
    }
}

#[tokio::test]
async fn test_play_pause_round_trip() {
    let (handle, observers, probe) = spawn();
    let mut button = observers.button();

    handle.play_or_toggle().await.unwrap();
    let snapshot = handle.current_snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert_eq!(snapshot.queue_len, 1);
    assert_eq!(snapshot.metadata.unwrap().title, "Chapter One");
    assert!(button.has_changed().unwrap());

    handle.play_or_toggle().await.unwrap();
    let snapshot = handle.current_snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Paused);
    assert_eq!(probe.calls().last(), Some(&EngineCall::Pause));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_toggle_twice_from_paused() {
    let (handle, _observers, probe) = spawn();
    handle.play_or_toggle().await.unwrap();
    handle.play_or_toggle().await.unwrap();
    assert_eq!(
        handle.current_snapshot().await.unwrap().state,
        PlaybackState::Paused
    );
    probe.clear_calls();

    handle.play_or_toggle().await.unwrap();
    handle.play_or_toggle().await.unwrap();
    handle.current_snapshot().await.unwrap();

    assert_eq!(probe.calls(), vec![EngineCall::Play, EngineCall::Pause]);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_position_is_published_while_playing() {
    let (handle, observers, probe) = spawn();
    let mut position = observers.position();

    handle.play_or_toggle().await.unwrap();
    handle.current_snapshot().await.unwrap();
    probe.set_position_ms(30_000);

    tokio::time::timeout(WAIT, position.wait_for(|ms| *ms >= 30_000))
        .await
        .expect("position not published")
        .unwrap();

    let mut snapshot = observers.snapshot();
    tokio::time::timeout(WAIT, snapshot.wait_for(|s| s.position_secs >= 30))
        .await
        .expect("snapshot position not published")
        .unwrap();

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unchanged_position_is_not_republished() {
    let (handle, observers, probe) = spawn();
    let mut position = observers.position();

    handle.play_or_toggle().await.unwrap();
    handle.current_snapshot().await.unwrap();
    probe.set_position_ms(12_000);
    handle.play_or_toggle().await.unwrap();
    handle.current_snapshot().await.unwrap();

    // Let the ticker publish the frozen position, then watch it stay quiet
    tokio::time::sleep(Duration::from_millis(100)).await;
    let _ = position.borrow_and_update();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!position.has_changed().unwrap());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rates_forwarded_and_invalid_rate_rejected() {
    let (handle, _observers, probe) = spawn();

    handle.set_rate(0.5).await.unwrap();
    handle.set_rate(2.0).await.unwrap();
    let result = handle.set_rate(3.0).await;
    assert!(matches!(
        result,
        Err(Error::Common(chapter_common::Error::InvalidRate(_)))
    ));

    let snapshot = handle.current_snapshot().await.unwrap();
    assert_eq!(snapshot.rate, 2.0);
    assert_eq!(
        probe.calls(),
        vec![EngineCall::SetRate(0.5), EngineCall::SetRate(2.0)]
    );
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_seek_while_idle_is_ignored() {
    let (handle, _observers, probe) = spawn();
    handle.seek_to_seconds(42).await.unwrap();

    let snapshot = handle.current_snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert!(probe.calls().is_empty());
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reaching_last_chapter_prefetches_next() {
    let (handle, observers, probe) = spawn();
    let mut events = observers.events();

    handle
        .append_items(chapters(&["18888", "18889", "18890"]))
        .await
        .unwrap();
    handle.play_or_toggle().await.unwrap();
    handle.current_snapshot().await.unwrap();

    probe.cross_to_item(1);
    probe.cross_to_item(2);
    let snapshot = handle.current_snapshot().await.unwrap();

    assert_eq!(snapshot.queue_len, 4);
    assert_eq!(snapshot.current_index, Some(2));
    assert_eq!(probe.source_count(), 4);
    assert!(probe
        .source_uris()
        .last()
        .unwrap()
        .ends_with("04_-_The_Music_In_You.mp3"));

    let mut prefetched = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::QueueAppended { item_ids, trigger, .. } = event {
            if trigger == chapter_common::events::QueueChangeTrigger::Prefetch {
                prefetched.extend(item_ids);
            }
        }
    }
    assert_eq!(prefetched, vec!["18891".to_string()]);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_driver_crosses_boundaries_on_its_own() {
    let catalog = StaticCatalog::new(vec![
        PlayableItem::new("a", "Part A", "Short Book", 1, "mem://a", ""),
        PlayableItem::new("b", "Part B", "Short Book", 1, "mem://b", ""),
        PlayableItem::new("c", "Part C", "Short Book", 1, "mem://c", ""),
    ]);
    let first_two = catalog.chapters()[..2].to_vec();
    let (handle, observers, _probe) = SessionBuilder::new(fast_config())
        .catalog(catalog)
        .spawn_simulated();
    let mut snapshot = observers.snapshot();

    handle.append_items(first_two).await.unwrap();
    handle.set_rate(2.0).await.unwrap();
    handle.play_or_toggle().await.unwrap();

    tokio::time::timeout(WAIT, snapshot.wait_for(|s| s.queue_len == 3))
        .await
        .expect("pre-fetch never happened")
        .unwrap();
    tokio::time::timeout(WAIT, snapshot.wait_for(|s| s.state == PlaybackState::Stopped))
        .await
        .expect("playback never ended")
        .unwrap();
    assert_eq!(snapshot.borrow().current_index, Some(2));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_engine_error_reported_without_retry() {
    let (handle, observers, probe) = spawn();
    let mut events = observers.events();

    handle.play_or_toggle().await.unwrap();
    handle.current_snapshot().await.unwrap();
    probe.clear_calls();

    probe.inject_error(EngineErrorKind::SourceUnavailable, "HTTP 404");
    let snapshot = handle.current_snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Error);
    assert!(snapshot.last_error.is_some());
    assert!(probe.calls().is_empty());

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        saw_error |= matches!(event, SessionEvent::PlaybackError { .. });
    }
    assert!(saw_error);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_notification_follows_state_and_dismissal_stops() {
    let notification = RecordingNotification::default();
    let (handle, _observers, probe) = SessionBuilder::new(fast_config())
        .notification(notification.clone())
        .spawn_simulated();

    handle.play_or_toggle().await.unwrap();
    handle.current_snapshot().await.unwrap();
    assert_eq!(notification.last(), Some("render"));

    handle.notification_dismissed().await.unwrap();
    let snapshot = handle.current_snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Stopped);
    assert_eq!(notification.last(), Some("hide"));
    assert!(probe.calls().contains(&EngineCall::Stop { reset: false }));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_releases_engine_and_closes_observers() {
    let (handle, observers, probe) = spawn();
    let mut events = observers.events();
    let mut snapshot = observers.snapshot();

    handle.play_or_toggle().await.unwrap();
    handle.current_snapshot().await.unwrap();
    handle.shutdown().await.unwrap();

    assert!(probe.is_released());
    assert!(handle.is_closed());
    let calls = probe.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[EngineCall::Stop { reset: true }, EngineCall::Release]
    );

    // Drain to the close event
    let closed = tokio::time::timeout(WAIT, async {
        loop {
            if let SessionEvent::SessionClosed { .. } = events.recv().await.unwrap() {
                break;
            }
        }
    })
    .await;
    assert!(closed.is_ok());

    let _ = snapshot.borrow_and_update();
    assert!(snapshot.changed().await.is_err());
    assert!(matches!(
        handle.play_or_toggle().await,
        Err(Error::SessionClosed)
    ));
    // Second shutdown is a no-op
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dropping_all_handles_tears_session_down() {
    let (handle, _observers, probe) = spawn();
    handle.play_or_toggle().await.unwrap();
    handle.current_snapshot().await.unwrap();
    drop(handle);

    let released = tokio::time::timeout(WAIT, async {
        while !probe.is_released() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(released.is_ok());
}
