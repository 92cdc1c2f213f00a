// SPDX-License-Identifier: MPL-2.0

//! Integration tests for camera exclusivity and scan session lifecycle

mod common;

use common::{BlindDecoder, FixedDecoder, FlakyDecoder, two_cameras, wait_until};
use scan_japan::app::{SessionSlots, Tab, TabController};
use scan_japan::backends::camera::{CameraDevice, order_devices};
use scan_japan::scanner::{
    ScanMode, ScanResult, ScanSession, SessionEventKind, SessionState,
};
use std::time::Duration;
use tokio::sync::mpsc;

#[test]
fn test_rear_camera_listed_first() {
    let (manager, _) = two_cameras();
    let ids: Vec<_> = manager
        .list_cameras()
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec!["back", "front"]);
}

#[test]
fn test_ordering_keeps_relative_order() {
    let devices = vec![
        CameraDevice::new("a", "USB Webcam"),
        CameraDevice::new("b", "REAR wide"),
        CameraDevice::new("c", "Integrated"),
        CameraDevice::new("d", "back telephoto"),
    ];
    let ids: Vec<_> = order_devices(devices).into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["b", "d", "a", "c"]);
}

#[test]
fn test_next_session_stops_previous_stream_first() {
    let (manager, backend) = two_cameras();
    let (tx, _rx) = mpsc::unbounded_channel();

    let mut first = ScanSession::new(Tab::Ingredients, ScanMode::snapshot(), manager.clone(), tx.clone());
    assert_eq!(first.start("back"), SessionState::Active);

    let mut second = ScanSession::new(Tab::Barcode, ScanMode::DecodeWith(std::sync::Arc::new(BlindDecoder)), manager.clone(), tx);
    assert_eq!(second.start("front"), SessionState::Active);

    assert_eq!(backend.streams_opened(), 2);
    assert_eq!(backend.max_concurrent_streams(), 1);
    assert_eq!(backend.live_streams(), 1);
    assert_eq!(manager.active_owner(), Some(Tab::Barcode));

    // The superseded session can no longer see frames
    assert!(first.preview_frame().is_none());
    assert_eq!(first.state(), SessionState::Stopped);
    assert_eq!(first.capture(), Err(scan_japan::scanner::CaptureError::NotActive));

    drop(first);
    drop(second);
    assert_eq!(backend.live_streams(), 0);
    assert_eq!(backend.double_stops(), 0);
}

#[test]
fn test_first_decode_wins() {
    let (manager, backend) = two_cameras();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let decoder = FixedDecoder::new("4901234567894");

    let mut session = ScanSession::new(Tab::Barcode, ScanMode::DecodeWith(decoder.clone()), manager, tx);
    assert_eq!(session.start("back"), SessionState::Active);

    let mut events = Vec::new();
    assert!(wait_until(|| {
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        !events.is_empty()
    }));

    let served = backend.frames_served();
    std::thread::sleep(Duration::from_millis(300));

    assert_eq!(decoder.calls(), 1);
    assert_eq!(backend.frames_served(), served);
    assert_eq!(session.state(), SessionState::Decoded);
    assert_eq!(backend.live_streams(), 0);
    assert!(rx.try_recv().is_err());

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].session_id, session.id());
    assert_eq!(
        events[0].kind,
        SessionEventKind::Decoded(ScanResult::Decoded {
            text: "4901234567894".into()
        })
    );
}

#[test]
fn test_decode_errors_are_skipped() {
    let (manager, backend) = two_cameras();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let decoder = FlakyDecoder::new("4901234567894", 3);

    let mut session = ScanSession::new(Tab::Barcode, ScanMode::DecodeWith(decoder.clone()), manager, tx)
        .with_decode_fps(10);
    assert_eq!(session.start("back"), SessionState::Active);

    let mut events = Vec::new();
    assert!(wait_until(|| {
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        !events.is_empty()
    }));
    std::thread::sleep(Duration::from_millis(300));
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(decoder.calls(), 4);
    assert_eq!(session.state(), SessionState::Decoded);
    assert_eq!(backend.live_streams(), 0);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].kind,
        SessionEventKind::Decoded(ScanResult::Decoded {
            text: "4901234567894".into()
        })
    );
}

#[test]
fn test_superseded_decode_session_reports_it() {
    let (manager, _) = two_cameras();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut scanning = ScanSession::new(
        Tab::Barcode,
        ScanMode::DecodeWith(std::sync::Arc::new(BlindDecoder)),
        manager.clone(),
        tx.clone(),
    )
    .with_decode_fps(10);
    scanning.start("back");

    let mut other = ScanSession::new(Tab::Ingredients, ScanMode::snapshot(), manager, tx);
    other.start("back");

    let mut kinds = Vec::new();
    assert!(wait_until(|| {
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind);
        }
        !kinds.is_empty()
    }));
    assert_eq!(kinds, vec![SessionEventKind::Superseded]);
    assert_eq!(scanning.state(), SessionState::Stopped);
    assert_eq!(other.state(), SessionState::Active);
}

#[test]
fn test_tab_switch_leaves_no_streams_for_previous_tab() {
    let (manager, backend) = two_cameras();
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut tabs = TabController::new(manager.clone());
    let mut sessions = SessionSlots::default();

    let mut session = ScanSession::new(
        Tab::Barcode,
        ScanMode::DecodeWith(std::sync::Arc::new(BlindDecoder)),
        manager.clone(),
        tx,
    );
    session.start("back");
    sessions.replace(Tab::Barcode, session);
    assert_eq!(backend.live_streams(), 1);

    assert!(tabs.select(Tab::Earthquake, &mut sessions));
    assert_eq!(backend.live_streams(), 0);
    assert_eq!(manager.active_owner(), None);
    assert!(sessions.get(Tab::Barcode).is_none());
    assert_eq!(backend.double_stops(), 0);
}

#[test]
fn test_denied_camera_reports_permission_error() {
    use scan_japan::backends::camera::CameraManager;
    use scan_japan::backends::virtual_camera::{VirtualBackend, VirtualDevice};
    use scan_japan::scanner::ScanError;

    let backend = VirtualBackend::new(vec![
        VirtualDevice::solid("locked", "Back Camera", [0, 0, 0]).denied(),
    ]);
    let manager = CameraManager::new(std::sync::Arc::new(backend.clone()));
    let (tx, _rx) = mpsc::unbounded_channel();

    let mut session = ScanSession::new(Tab::Ingredients, ScanMode::snapshot(), manager, tx);
    let state = session.start("locked");
    assert_eq!(state, SessionState::Error(ScanError::PermissionDenied));
    assert_eq!(
        ScanError::PermissionDenied.to_string(),
        "Failed to access camera. Please check permissions."
    );
    assert_eq!(backend.live_streams(), 0);
}
