// Tests for the streaming protocol messages
//
// Client messages are checked by their JSON shape; server payloads by the
// typed events they translate into.

use frontdesk_voice::audio::pcm::WireFrame;
use frontdesk_voice::transport::messages::{parse_events, RealtimeInputMessage, ServerMessage, SetupMessage};
use frontdesk_voice::transport::{AssistantId, InboundEvent, LiveConfig, SessionTarget};
use frontdesk_voice::{SessionError, Speaker, TranscriptFragment};

#[test]
fn test_assistant_setup_serialization() {
    let setup = SetupMessage::for_target(&SessionTarget::Assistant(AssistantId::new("asst-123")));

    let json = serde_json::to_value(&setup).unwrap();
    assert_eq!(json, serde_json::json!({"setup": {"assistantId": "asst-123"}}));
}

#[test]
fn test_live_setup_serialization() {
    let setup = SetupMessage::for_target(&SessionTarget::Live(LiveConfig {
        model: "models/voice-test".to_string(),
        system_instruction: "Be nice.".to_string(),
        voice_name: "Charon".to_string(),
    }));

    let json = serde_json::to_value(&setup).unwrap();
    let body = &json["setup"];
    assert_eq!(body["model"], "models/voice-test");
    assert_eq!(body["generationConfig"]["responseModalities"][0], "AUDIO");
    assert_eq!(
        body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
        "Charon"
    );
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be nice.");
    assert_eq!(body["inputAudioTranscription"], serde_json::json!({}));
    assert_eq!(body["outputAudioTranscription"], serde_json::json!({}));
}

#[test]
fn test_realtime_input_serialization() {
    let message = RealtimeInputMessage::audio(WireFrame {
        mime_type: "audio/pcm;rate=16000".to_string(),
        data: "AAAA".to_string(),
    });

    let json = serde_json::to_string(&message).unwrap();
    assert_eq!(
        json,
        r#"{"realtimeInput":{"mediaChunks":[{"mimeType":"audio/pcm;rate=16000","data":"AAAA"}]}}"#
    );
}

#[test]
fn test_setup_complete_detection() {
    let message = ServerMessage::parse(br#"{"setupComplete":{}}"#).unwrap();
    assert!(message.is_setup_complete());
    assert!(message.into_events().is_empty());
}

#[test]
fn test_server_content_event_order() {
    let payload = br#"{
        "serverContent": {
            "modelTurn": {"parts": [
                {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AQI="}},
                {"text": "thinking"},
                {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AwQ="}}
            ]},
            "inputTranscription": {"text": "I need an appointment"},
            "outputTranscription": {"text": "Sure"},
            "turnComplete": true,
            "interrupted": true
        }
    }"#;

    let events = parse_events(payload);

    assert_eq!(events.len(), 6);
    assert!(matches!(&events[0], InboundEvent::AudioChunk(f) if f.data == "AQI="));
    assert!(matches!(&events[1], InboundEvent::AudioChunk(f) if f.data == "AwQ="));
    assert_eq!(
        events[2],
        InboundEvent::Transcript(TranscriptFragment::new("I need an appointment", Speaker::User))
    );
    assert_eq!(
        events[3],
        InboundEvent::Transcript(TranscriptFragment::new("Sure", Speaker::Agent))
    );
    assert_eq!(events[4], InboundEvent::TurnComplete);
    assert_eq!(events[5], InboundEvent::Interrupted);
}

#[test]
fn test_empty_transcriptions_and_audio_are_skipped() {
    let payload = br#"{
        "serverContent": {
            "modelTurn": {"parts": [{"inlineData": {"mimeType": "audio/pcm", "data": ""}}]},
            "outputTranscription": {"text": ""}
        }
    }"#;

    assert!(parse_events(payload).is_empty());
}

#[test]
fn test_server_error_is_fatal_connection_error() {
    let events = parse_events(br#"{"error": {"code": 429, "message": "quota exceeded"}}"#);

    match &events[..] {
        [InboundEvent::Error(e)] => {
            assert!(matches!(e, SessionError::Connection(_)));
            assert!(e.is_fatal());
            assert!(e.to_string().contains("quota exceeded"));
        }
        other => panic!("unexpected events: {:?}", other),
    }
}

#[test]
fn test_go_away_closes() {
    let events = parse_events(br#"{"goAway": {"timeLeft": "5s"}}"#);
    assert!(matches!(&events[..], [InboundEvent::Closed { reason: Some(_) }]));
}

#[test]
fn test_malformed_payload_is_transient_error() {
    let events = parse_events(b"{not json");

    match &events[..] {
        [InboundEvent::Error(e)] => {
            assert!(matches!(e, SessionError::TransientStream(_)));
            assert!(!e.is_fatal());
        }
        other => panic!("unexpected events: {:?}", other),
    }
}

#[test]
fn test_unknown_fields_are_ignored() {
    let events = parse_events(br#"{"usageMetadata": {"totalTokenCount": 12}}"#);
    assert!(events.is_empty());
}
