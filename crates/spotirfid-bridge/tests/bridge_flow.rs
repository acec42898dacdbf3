//! End-to-end control loop against the mock reader, indicator and service.

use std::time::Duration;

use spotirfid_bridge::{
    Bridge, BridgeConfig, BridgeError, ModeKind, Outcome, PersistenceMode,
};
use spotirfid_core::{MasterMarker, ResourceId, TagUid, TargetId};
use spotirfid_hardware::mock::{
    MockIndicator, MockIndicatorHandle, MockTagReader, MockTagReaderHandle, SimulatedTag,
};
use spotirfid_network::mock::{MockPlaybackHandle, MockPlaybackService};
use spotirfid_network::{NowPlaying, PlaybackTarget, ServiceError};
use spotirfid_rfid::{StartPagePolicy, TagLayout, TagMemoryAccessor, WritePolicy};
use spotirfid_storage::TagMapStore;
use tokio_util::sync::CancellationToken;

const ALBUM: &str = "spotify:album:6jbtHi5R0jMXoliU2OS0lo";
const PLAYLIST: &str = "spotify:playlist:37i9dQZF1DXcBWIGoYBM5M";

type TestBridge = Bridge<MockTagReader, MockIndicator, MockPlaybackService>;

struct Rig {
    bridge: TestBridge,
    tags: MockTagReaderHandle,
    led: MockIndicatorHandle,
    service: MockPlaybackHandle,
}

fn uid(hex: &str) -> TagUid {
    hex.parse().unwrap()
}

fn playing(uri: &str, name: &str) -> NowPlaying {
    NowPlaying {
        resource: ResourceId::new(uri).unwrap(),
        name: name.to_string(),
    }
}

fn config() -> BridgeConfig {
    BridgeConfig::new("Living Room", MasterMarker::new("MASTER_TAG").unwrap())
        .with_poll_interval(Duration::from_millis(50))
        .with_pulse_period(Duration::from_millis(10))
        .with_flash(2, Duration::from_millis(10))
}

async fn rig_with(config: BridgeConfig, store: Option<TagMapStore>) -> Rig {
    rig_with_accessor(config, store, TagMemoryAccessor::default()).await
}

async fn rig_with_accessor(
    config: BridgeConfig,
    store: Option<TagMapStore>,
    accessor: TagMemoryAccessor,
) -> Rig {
    let (reader, tags) = MockTagReader::new();
    let (indicator, led) = MockIndicator::new();
    let (service, handle) = MockPlaybackService::new();
    handle
        .set_targets(vec![PlaybackTarget::new(
            TargetId::new("speaker-1").unwrap(),
            "Living Room",
        )])
        .await;

    let mut bridge = Bridge::new(
        reader,
        indicator,
        service,
        accessor,
        store,
        config,
    )
    .unwrap();
    bridge.start().await.unwrap();
    handle.clear_calls().await;
    led.clear_history().await;

    Rig {
        bridge,
        tags,
        led,
        service: handle,
    }
}

async fn rig() -> Rig {
    rig_with(config(), None).await
}

#[tokio::test(start_paused = true)]
async fn test_scenario_a_master_then_blank_tag_records_and_plays() {
    let mut rig = rig().await;
    rig.tags
        .add_tag(SimulatedTag::ntag213(uid("AA000001")).with_text("MASTER_TAG"))
        .await;
    rig.service
        .set_now_playing(Some(playing(ALBUM, "Discovery")))
        .await;

    rig.tags.present(&uid("AA000001")).await.unwrap();
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert!(matches!(outcome, Outcome::WriteModeEntered { ref name, .. } if name == "Discovery"));
    assert_eq!(rig.bridge.mode().kind(), ModeKind::WriteModePending);
    assert!(rig.led.is_on().await);

    rig.tags.lift().await;
    assert!(rig.bridge.poll_once().await.unwrap().is_none());

    let blank = uid("04A1B2C3");
    rig.tags.tap(&blank).await;
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert_eq!(
        outcome,
        Outcome::TagWritten {
            uid: blank.clone(),
            resource: ResourceId::new(ALBUM).unwrap(),
            start_page: 4,
            attempt: 1,
        }
    );
    assert_eq!(rig.bridge.mode().kind(), ModeKind::Idle);
    assert!(!rig.led.is_on().await);

    // Nine data pages and a terminator page
    let written: Vec<u8> = rig.tags.write_log().await.iter().map(|w| w.page).collect();
    assert_eq!(written, (4..=13).collect::<Vec<u8>>());
    let stored = rig.tags.tag(&blank).await.unwrap();
    assert_eq!(stored.page(4), Some(*b"spot"));
    assert_eq!(stored.page(13), Some([0; 4]));

    rig.tags.lift().await;
    rig.bridge.poll_once().await.unwrap();
    rig.tags.tap(&blank).await;
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert!(matches!(outcome, Outcome::Played { attempts: 1, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_discovered_start_page_plays_on_next_scan() {
    let accessor = TagMemoryAccessor::new(
        TagLayout::ntag213(),
        WritePolicy::default().with_start_page(StartPagePolicy::Discover),
    );
    let mut rig = rig_with_accessor(config(), None, accessor).await;
    rig.tags
        .add_tag(SimulatedTag::ntag213(uid("AA000001")).with_text("MASTER_TAG"))
        .await;
    let card = uid("04A1B2C3");
    rig.tags
        .add_tag(SimulatedTag::ntag213(card.clone()).with_page(8, *b"old!"))
        .await;
    rig.service
        .set_now_playing(Some(playing(ALBUM, "Discovery")))
        .await;

    rig.tags.present(&uid("AA000001")).await.unwrap();
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert!(matches!(outcome, Outcome::WriteModeEntered { .. }));

    rig.tags.present(&card).await.unwrap();
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert!(matches!(outcome, Outcome::TagWritten { start_page: 8, .. }));

    rig.tags.lift().await;
    rig.bridge.poll_once().await.unwrap();
    rig.tags.present(&card).await.unwrap();
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert!(
        matches!(outcome, Outcome::Played { ref resource, .. } if resource.as_str() == ALBUM),
        "{outcome}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_scenario_b_master_with_nothing_playing_stays_idle() {
    let mut rig = rig().await;
    rig.tags
        .add_tag(SimulatedTag::ntag213(uid("AA000001")).with_text("MASTER_TAG"))
        .await;

    rig.tags.present(&uid("AA000001")).await.unwrap();
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();

    assert!(outcome.to_string().starts_with("cannot enter write mode"));
    assert_eq!(rig.bridge.mode().kind(), ModeKind::Idle);
    assert!(!rig.led.is_on().await);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_c_stale_target_is_re_resolved_once() {
    let mut rig = rig().await;
    rig.tags
        .add_tag(SimulatedTag::ntag213(uid("BB000001")).with_text(ALBUM))
        .await;
    rig.service
        .fail_start_playback(
            ServiceError::TargetNotFound {
                target: "speaker-1".into(),
            },
            1,
        )
        .await;
    rig.service
        .set_targets(vec![PlaybackTarget::new(
            TargetId::new("speaker-2").unwrap(),
            "living room",
        )])
        .await;

    rig.tags.present(&uid("BB000001")).await.unwrap();
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();

    assert!(matches!(
        outcome,
        Outcome::Played { ref target, attempts: 2, .. } if target.as_str() == "speaker-2"
    ));
    assert_eq!(rig.service.list_targets_count().await, 1);
    assert_eq!(rig.service.authorize_count().await, 0);
    // Success flashes and ends off
    assert_eq!(rig.led.history().await, vec![true, false, true, false, false]);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_d_unknown_tag() {
    let mut rig = rig().await;
    let stranger = uid("CC000001");

    rig.tags.tap(&stranger).await;
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();

    assert_eq!(
        outcome,
        Outcome::UnknownTag {
            uid: stranger,
            payload: None,
        }
    );
    assert_eq!(outcome.to_string(), "unknown tag CC000001");
    assert_eq!(rig.bridge.mode().kind(), ModeKind::Idle);
    assert_eq!(rig.service.start_playback_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_raw_payload_is_reported_as_unknown() {
    let mut rig = rig().await;
    rig.tags
        .add_tag(SimulatedTag::ntag213(uid("CC000002")).with_text("hello"))
        .await;

    rig.tags.present(&uid("CC000002")).await.unwrap();
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert!(matches!(outcome, Outcome::UnknownTag { payload: Some(ref p), .. } if p == "hello"));
}

#[tokio::test(start_paused = true)]
async fn test_tag_left_in_field_is_handled_once() {
    let mut rig = rig().await;
    rig.tags
        .add_tag(SimulatedTag::ntag213(uid("BB000001")).with_text(ALBUM))
        .await;

    rig.tags.present(&uid("BB000001")).await.unwrap();
    assert!(rig.bridge.poll_once().await.unwrap().is_some());
    assert!(rig.bridge.poll_once().await.unwrap().is_none());
    assert!(rig.bridge.poll_once().await.unwrap().is_none());
    assert_eq!(rig.service.start_playback_count().await, 1);

    // A fresh presentation of the same tag triggers again
    rig.tags.present(&uid("BB000001")).await.unwrap();
    assert!(rig.bridge.poll_once().await.unwrap().is_some());
    assert_eq!(rig.service.start_playback_count().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_write_mode_expires_without_writing() {
    let mut rig = rig_with(config().with_write_mode_timeout(Duration::from_secs(5)), None).await;
    rig.tags
        .add_tag(SimulatedTag::ntag213(uid("AA000001")).with_text("MASTER_TAG"))
        .await;
    rig.service.set_now_playing(Some(playing(ALBUM, "Album"))).await;

    rig.tags.present(&uid("AA000001")).await.unwrap();
    rig.bridge.poll_once().await.unwrap();
    rig.tags.lift().await;

    tokio::time::advance(Duration::from_secs(4)).await;
    assert!(rig.bridge.poll_once().await.unwrap().is_none());
    assert!(rig.led.is_on().await);

    tokio::time::advance(Duration::from_secs(1)).await;
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert_eq!(
        outcome,
        Outcome::WriteModeExpired {
            resource: ResourceId::new(ALBUM).unwrap(),
        }
    );
    assert_eq!(rig.bridge.mode().kind(), ModeKind::Idle);
    assert!(!rig.led.is_on().await);
    assert!(rig.tags.write_log().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_master_while_pending_restarts_or_keeps_pending() {
    let mut rig = rig().await;
    let master = uid("AA000001");
    rig.tags
        .add_tag(SimulatedTag::ntag213(master.clone()).with_text("MASTER_TAG"))
        .await;
    rig.service.set_now_playing(Some(playing(ALBUM, "Album"))).await;

    rig.tags.present(&master).await.unwrap();
    rig.bridge.poll_once().await.unwrap();

    // Nothing playing now: the pending resource is kept
    rig.service.set_now_playing(None).await;
    rig.tags.present(&master).await.unwrap();
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert_eq!(
        outcome,
        Outcome::CannotEnterWriteMode {
            reason: "nothing playing".into(),
            still_pending: Some(ResourceId::new(ALBUM).unwrap()),
        }
    );
    assert_eq!(
        rig.bridge.mode().pending_resource().map(|p| p.resource.as_str()),
        Some(ALBUM)
    );

    // Something else playing: pending restarts with it
    rig.service
        .set_now_playing(Some(playing(PLAYLIST, "Mix")))
        .await;
    rig.tags.present(&master).await.unwrap();
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert!(matches!(outcome, Outcome::WriteModeEntered { .. }));
    assert_eq!(
        rig.bridge.mode().pending_resource().map(|p| p.resource.as_str()),
        Some(PLAYLIST)
    );
    // The master tag itself is never overwritten
    assert!(rig.tags.write_log().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_write_returns_to_idle() {
    let mut rig = rig().await;
    rig.tags
        .add_tag(SimulatedTag::ntag213(uid("AA000001")).with_text("MASTER_TAG"))
        .await;
    rig.service.set_now_playing(Some(playing(ALBUM, "Album"))).await;

    rig.tags.present(&uid("AA000001")).await.unwrap();
    rig.bridge.poll_once().await.unwrap();

    rig.tags.fail_next_writes(100).await;
    rig.tags.tap(&uid("04A1B2C3")).await;
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();

    assert!(matches!(outcome, Outcome::WriteFailed { .. }));
    assert!(outcome.to_string().contains("could not record"));
    assert_eq!(rig.bridge.mode().kind(), ModeKind::Idle);
    assert!(!rig.led.is_on().await);
}

#[tokio::test(start_paused = true)]
async fn test_missing_target_keeps_indicator_on_until_next_success() {
    let mut rig = rig().await;
    rig.tags
        .add_tag(SimulatedTag::ntag213(uid("BB000001")).with_text(ALBUM))
        .await;
    let gone = ServiceError::TargetNotFound {
        target: "speaker-1".into(),
    };
    rig.service.fail_start_playback(gone, 2).await;
    rig.service.set_targets(vec![]).await;

    rig.tags.present(&uid("BB000001")).await.unwrap();
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert!(matches!(outcome, Outcome::PlaybackFailed { .. }));
    assert!(rig.bridge.target_missing());
    assert!(rig.led.is_on().await);

    rig.tags.present(&uid("BB000001")).await.unwrap();
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert!(outcome.is_success());
    assert!(!rig.bridge.target_missing());
    assert!(!rig.led.is_on().await);
}

#[tokio::test(start_paused = true)]
async fn test_tag_map_variant_records_mapping_instead_of_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tag_map.json");
    let store = TagMapStore::load(&path).await;
    let mut rig = rig_with(
        config().with_persistence(PersistenceMode::TagMap),
        Some(store),
    )
    .await;

    rig.tags
        .add_tag(SimulatedTag::ntag213(uid("AA000001")).with_text("MASTER_TAG"))
        .await;
    rig.service.set_now_playing(Some(playing(ALBUM, "Album"))).await;
    rig.tags.present(&uid("AA000001")).await.unwrap();
    rig.bridge.poll_once().await.unwrap();

    let card = uid("04A1B2C3");
    rig.tags.tap(&card).await;
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert_eq!(
        outcome,
        Outcome::TagMapped {
            uid: card.clone(),
            resource: ResourceId::new(ALBUM).unwrap(),
            previous: None,
        }
    );
    assert!(rig.tags.write_log().await.is_empty());

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["04A1B2C3"], ALBUM);

    // The blank tag now plays through the map
    rig.tags.tap(&card).await;
    let outcome = rig.bridge.poll_once().await.unwrap().unwrap();
    assert!(matches!(outcome, Outcome::Played { .. }));
}

#[tokio::test]
async fn test_tag_map_mode_needs_a_store() {
    let (reader, _) = MockTagReader::new();
    let (indicator, _) = MockIndicator::new();
    let (service, _) = MockPlaybackService::new();

    let result = Bridge::new(
        reader,
        indicator,
        service,
        TagMemoryAccessor::default(),
        None,
        config().with_persistence(PersistenceMode::TagMap),
    );
    assert!(matches!(result, Err(BridgeError::Config(_))));
}

#[tokio::test]
async fn test_start_fails_when_target_is_not_advertised() {
    let (reader, _) = MockTagReader::new();
    let (indicator, led) = MockIndicator::new();
    let (service, handle) = MockPlaybackService::new();
    handle
        .set_targets(vec![PlaybackTarget::new(
            TargetId::new("x").unwrap(),
            "Kitchen",
        )])
        .await;

    let mut bridge = Bridge::new(
        reader,
        indicator,
        service,
        TagMemoryAccessor::default(),
        None,
        config(),
    )
    .unwrap();

    let err = bridge.start().await.unwrap_err();
    assert!(matches!(err, BridgeError::TargetNotFound { .. }));
    assert_eq!(led.history().await.first(), Some(&true));

    bridge.shutdown().await.unwrap();
    assert!(led.is_closed().await);
}

#[tokio::test(start_paused = true)]
async fn test_run_reports_outcomes_until_cancelled_then_releases_devices() {
    let Rig {
        mut bridge,
        tags,
        led,
        service,
    } = rig().await;
    tags.add_tag(SimulatedTag::ntag213(uid("BB000001")).with_text(ALBUM))
        .await;

    let shutdown = CancellationToken::new();
    let mut lines = Vec::new();

    let driver = async {
        tags.present(&uid("BB000001")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        tags.tap(&uid("CC000001")).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        shutdown.cancel();
    };
    let (result, ()) = tokio::join!(
        bridge.run(shutdown.clone(), |outcome| lines.push(outcome.to_string())),
        driver
    );
    result.unwrap();

    assert_eq!(lines.len(), 2, "one line per scan event: {lines:?}");
    assert!(lines[0].contains("playing"));
    assert!(lines[1].starts_with("unknown tag"));
    assert_eq!(service.start_playback_count().await, 1);

    bridge.shutdown().await.unwrap();
    assert!(tags.is_closed().await);
    assert!(led.is_closed().await);
    assert!(!led.is_on().await);
}
