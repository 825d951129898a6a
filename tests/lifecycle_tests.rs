// Integration tests for the meeting lifecycle state machine: every stop
// trigger funnels into one idempotent stop path, resources are released
// unconditionally, and error transitions land back in IDLE.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::*;
use meetscribe::audio::SimulatedSpec;
use meetscribe::error::{AcquisitionError, SessionError};
use meetscribe::session::MeetingStatus;
use meetscribe::SourceKind;

const LONG_TEXT: &str = "we agreed to ship the beta on friday after the demo";

#[tokio::test]
async fn test_explicit_stop_reaches_reviewing_with_resources_released() {
    let service = FakeStreamingService::with_text(LONG_TEXT);
    let sent = Arc::clone(&service.sent);
    let closed = Arc::clone(&service.closed);
    let generator = FakeMinutesGenerator::new();
    let generator_calls = Arc::clone(&generator.calls);

    let (controller, released) = streaming_controller(fast_spec(), service, generator);

    let status = controller.start(SourceKind::SystemAudio).await.unwrap();
    assert_eq!(status, MeetingStatus::Recording);

    // Let a few frames flow and the scripted segment land
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(sent.load(Ordering::SeqCst) > 0, "no chunks were dispatched");
    assert!(*controller.watch_volume().borrow() > 0.0);

    let status = controller.stop().await.unwrap();
    assert_eq!(status, MeetingStatus::Reviewing);

    // Media resources and the service session were released on the way out
    assert!(released.load(Ordering::SeqCst));
    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(generator_calls.load(Ordering::SeqCst), 1);

    let minutes = controller.minutes().await.expect("minutes stored");
    assert_eq!(minutes.title, "Test meeting");
}

#[tokio::test]
async fn test_stop_is_idempotent_and_processes_once() {
    let service = FakeStreamingService::with_text(LONG_TEXT);
    let generator = FakeMinutesGenerator::new();
    let generator_calls = Arc::clone(&generator.calls);

    let (controller, _released) = streaming_controller(fast_spec(), service, generator);

    controller.start(SourceKind::Microphone).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(controller.stop().await.unwrap(), MeetingStatus::Reviewing);
    // A second stop is a no-op reporting the current state
    assert_eq!(controller.stop().await.unwrap(), MeetingStatus::Reviewing);
    assert_eq!(generator_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stop_from_idle_is_a_noop() {
    let service = FakeStreamingService::with_text(LONG_TEXT);
    let generator = FakeMinutesGenerator::new();
    let (controller, _released) = streaming_controller(fast_spec(), service, generator);

    assert_eq!(controller.stop().await.unwrap(), MeetingStatus::Idle);
}

#[tokio::test]
async fn test_track_ended_stops_implicitly() {
    let spec = SimulatedSpec {
        frame_limit: Some(3),
        realtime: false,
        ..fast_spec()
    };
    let service = FakeStreamingService::with_text(LONG_TEXT);
    let generator = FakeMinutesGenerator::new();
    let generator_calls = Arc::clone(&generator.calls);

    let (controller, released) = streaming_controller(spec, service, generator);

    controller.start(SourceKind::SystemAudio).await.unwrap();

    // The simulated track ends after three frames; the controller must
    // treat that as a stop request and carry the session to review.
    assert!(
        wait_for_status(&controller, MeetingStatus::Reviewing, Duration::from_secs(2)).await,
        "track end never reached REVIEWING"
    );
    assert!(released.load(Ordering::SeqCst));
    assert_eq!(generator_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fatal_session_error_stops_recording() {
    let service = FakeStreamingService::failing();
    let closed = Arc::clone(&service.closed);
    let generator = FakeMinutesGenerator::new();
    let generator_calls = Arc::clone(&generator.calls);

    let (controller, released) = streaming_controller(fast_spec(), service, generator);

    controller.start(SourceKind::SystemAudio).await.unwrap();

    // The first send fails; with no transcript the session is discarded
    assert!(
        wait_for_status(&controller, MeetingStatus::Idle, Duration::from_secs(2)).await,
        "fatal error never unwound to IDLE"
    );
    assert!(released.load(Ordering::SeqCst));
    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(generator_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_zero_audio_tracks_never_reaches_recording() {
    let spec = SimulatedSpec {
        audio_tracks: 0,
        ..fast_spec()
    };
    let service = FakeStreamingService::with_text(LONG_TEXT);
    let generator = FakeMinutesGenerator::new();

    let (controller, released) = streaming_controller(spec, service, generator);

    let err = controller.start(SourceKind::SystemAudio).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Acquisition(AcquisitionError::NoAudioTrack)
    ));
    assert_eq!(controller.status().await, MeetingStatus::Idle);
    // The audioless stream was released immediately
    assert!(released.load(Ordering::SeqCst));

    let snapshot = controller.snapshot().await;
    assert!(snapshot.last_error.unwrap().contains("no audio track"));
}

#[tokio::test]
async fn test_permission_denied_stays_idle() {
    let spec = SimulatedSpec {
        deny_permission: true,
        ..fast_spec()
    };
    let service = FakeStreamingService::with_text(LONG_TEXT);
    let generator = FakeMinutesGenerator::new();

    let (controller, _released) = streaming_controller(spec, service, generator);

    let err = controller.start(SourceKind::Microphone).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Acquisition(AcquisitionError::PermissionDenied)
    ));
    assert_eq!(controller.status().await, MeetingStatus::Idle);
}

#[tokio::test]
async fn test_short_transcript_routes_to_idle_with_validation_error() {
    let service = FakeStreamingService::with_text("hi");
    let generator = FakeMinutesGenerator::new();
    let generator_calls = Arc::clone(&generator.calls);

    let (controller, _released) = streaming_controller(fast_spec(), service, generator);

    controller.start(SourceKind::SystemAudio).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let err = controller.stop().await.unwrap_err();
    match err {
        SessionError::TranscriptTooShort { chars, min } => {
            assert_eq!(chars, 2);
            assert_eq!(min, 10);
        }
        other => panic!("expected TranscriptTooShort, got {other}"),
    }
    assert_eq!(controller.status().await, MeetingStatus::Idle);
    // The summarizer was never consulted and the session was discarded
    assert_eq!(generator_calls.load(Ordering::SeqCst), 0);
    assert!(controller.transcript_text().is_empty());
}

#[tokio::test]
async fn test_generation_failure_routes_to_idle() {
    let service = FakeStreamingService::with_text(LONG_TEXT);
    let generator = FakeMinutesGenerator::failing();
    let generator_calls = Arc::clone(&generator.calls);

    let (controller, _released) = streaming_controller(fast_spec(), service, generator);

    controller.start(SourceKind::SystemAudio).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let err = controller.stop().await.unwrap_err();
    assert!(matches!(err, SessionError::Generation(_)));
    assert_eq!(generator_calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.status().await, MeetingStatus::Idle);

    let snapshot = controller.snapshot().await;
    assert!(snapshot.last_error.unwrap().contains("llm unavailable"));
    assert!(controller.minutes().await.is_none());
}

#[tokio::test]
async fn test_reset_clears_reviewed_session() {
    let service = FakeStreamingService::with_text(LONG_TEXT);
    let generator = FakeMinutesGenerator::new();

    let (controller, _released) = streaming_controller(fast_spec(), service, generator);

    controller.start(SourceKind::SystemAudio).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    controller.stop().await.unwrap();
    assert!(controller.minutes().await.is_some());

    assert_eq!(controller.reset().await.unwrap(), MeetingStatus::Idle);
    assert!(controller.minutes().await.is_none());
    assert!(controller.transcript_text().is_empty());

    let snapshot = controller.snapshot().await;
    assert!(snapshot.session_id.is_none());
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn test_invalid_transitions_are_rejected() {
    let service = FakeStreamingService::with_text(LONG_TEXT);
    let generator = FakeMinutesGenerator::new();

    let (controller, _released) = streaming_controller(fast_spec(), service, generator);

    controller.start(SourceKind::SystemAudio).await.unwrap();

    // Starting again while recording is not allowed
    let err = controller.start(SourceKind::Microphone).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));

    // Neither is resetting mid-recording
    let err = controller.reset().await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));

    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_batch_mode_end_to_end() {
    let service = Arc::new(FakeBatchService::new(LONG_TEXT));
    let calls = Arc::clone(&service.calls);
    let generator = FakeMinutesGenerator::new();
    let generator_calls = Arc::clone(&generator.calls);

    let (controller, released) = batch_controller(fast_spec(), Arc::clone(&service), generator);

    controller.start(SourceKind::SystemAudio).await.unwrap();
    // Longer than the 100ms test window, so at least one window is sent
    tokio::time::sleep(Duration::from_millis(350)).await;

    let status = controller.stop().await.unwrap();
    assert_eq!(status, MeetingStatus::Reviewing);
    assert!(calls.load(Ordering::SeqCst) >= 1);
    assert!(released.load(Ordering::SeqCst));
    assert_eq!(generator_calls.load(Ordering::SeqCst), 1);
    assert!(controller.transcript_text().contains("ship the beta"));
}
