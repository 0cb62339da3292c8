// Wire-format tests for the agent transport messages.

use voxhire::agent::messages::{AgentEvent, MediaMessage, MEDIA_MIME_TYPE};
use voxhire::audio::codec;
use voxhire::transcript::Speaker;
use voxhire::{AudioFrame, FrameSource};

fn frame(samples: Vec<i16>) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate: 16_000,
        channels: 1,
        timestamp_ms: 0,
        source: FrameSource::Local,
    }
}

#[test]
fn test_media_message_round_trip() {
    let original_samples: Vec<i16> = vec![100, -200, 300, -400];
    let message = MediaMessage::from_frame("session-1", 7, &frame(original_samples.clone()));

    assert_eq!(message.session_id, "session-1");
    assert_eq!(message.sequence, 7);
    assert_eq!(message.media.mime_type, MEDIA_MIME_TYPE);
    assert_eq!(message.media.sample_rate, 16_000);

    let json = serde_json::to_string(&message).unwrap();
    let decoded: MediaMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(
        codec::decode_pcm(&decoded.media.data).unwrap(),
        original_samples
    );
}

#[test]
fn test_transcript_event_deserialization() {
    let json = r#"{
        "type": "transcript",
        "speaker": "human",
        "text": "Yes, that works.",
        "final": true
    }"#;

    let event: AgentEvent = serde_json::from_str(json).unwrap();
    match event {
        AgentEvent::Transcript {
            speaker,
            text,
            is_final,
        } => {
            assert_eq!(speaker, Speaker::Human);
            assert_eq!(text, "Yes, that works.");
            assert!(is_final);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_transcript_final_flag_defaults_to_false() {
    let json = r#"{"type": "transcript", "speaker": "agent", "text": "Good mor"}"#;

    let event: AgentEvent = serde_json::from_str(json).unwrap();
    match event {
        AgentEvent::Transcript { is_final, .. } => assert!(!is_final),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_audio_event_carries_base64_pcm() {
    let data = codec::encode_pcm(&[1, 2, 3]);
    let json = format!(r#"{{"type": "audio", "data": "{data}"}}"#);

    let event: AgentEvent = serde_json::from_str(&json).unwrap();
    match event {
        AgentEvent::Audio { data } => {
            assert_eq!(codec::decode_pcm(&data).unwrap(), vec![1, 2, 3]);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_control_events_deserialize() {
    for (json, expected) in [
        (r#"{"type": "turn_complete"}"#, "TurnComplete"),
        (r#"{"type": "interrupted"}"#, "Interrupted"),
        (r#"{"type": "closed"}"#, "Closed"),
    ] {
        let event: AgentEvent = serde_json::from_str(json).unwrap();
        assert_eq!(format!("{event:?}"), expected);
    }

    let event: AgentEvent =
        serde_json::from_str(r#"{"type": "error", "message": "stream reset"}"#).unwrap();
    match event {
        AgentEvent::Error { message } => assert_eq!(message, "stream reset"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_unknown_event_type_is_rejected() {
    let json = r#"{"type": "telemetry", "data": "x"}"#;
    assert!(serde_json::from_str::<AgentEvent>(json).is_err());
}
