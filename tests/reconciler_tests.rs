// Tests for transcript reconciliation
//
// Fragments fold into utterances purely by speaker and by explicit
// turn/call signals.

use frontdesk_voice::{Speaker, TranscriptFragment, TranscriptReconciler, Utterance};

fn feed(reconciler: &mut TranscriptReconciler, fragments: &[(&str, Speaker)]) {
    for (text, speaker) in fragments {
        reconciler.apply(TranscriptFragment::new(*text, *speaker));
    }
}

#[test]
fn test_uniform_speaker_accumulates_until_turn_complete() {
    let mut reconciler = TranscriptReconciler::new();
    feed(&mut reconciler, &[("Hello", Speaker::Agent), ("there", Speaker::Agent)]);

    assert!(reconciler.history().is_empty());
    assert_eq!(
        reconciler.pending(),
        Some(&Utterance {
            text: "Hello there".to_string(),
            speaker: Speaker::Agent,
        })
    );

    let committed = reconciler.turn_complete();
    assert_eq!(
        committed,
        Some(Utterance {
            text: "Hello there".to_string(),
            speaker: Speaker::Agent,
        })
    );
    assert_eq!(reconciler.history().len(), 1);
    assert!(reconciler.pending().is_none());
}

#[test]
fn test_speaker_switch_commits_previous_utterance() {
    let mut reconciler = TranscriptReconciler::new();

    assert!(reconciler.apply(TranscriptFragment::new("Hi", Speaker::User)).is_none());
    let committed = reconciler.apply(TranscriptFragment::new("Hello, how can I help?", Speaker::Agent));

    assert_eq!(
        committed,
        Some(Utterance {
            text: "Hi".to_string(),
            speaker: Speaker::User,
        })
    );
    assert_eq!(
        reconciler.history(),
        &[Utterance {
            text: "Hi".to_string(),
            speaker: Speaker::User,
        }]
    );
    assert_eq!(
        reconciler.pending().map(|u| u.text.as_str()),
        Some("Hello, how can I help?")
    );
    assert_eq!(reconciler.pending().map(|u| u.speaker), Some(Speaker::Agent));
}

#[test]
fn test_first_fragment_has_no_leading_space() {
    for text in ["a", "Hello", " spaced", "¿Qué?", "123"] {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.apply(TranscriptFragment::new(text, Speaker::User));

        let pending = reconciler.pending().expect("pending utterance");
        assert_eq!(pending.text, text, "first fragment must be taken verbatim");
    }
}

#[test]
fn test_first_fragment_after_commit_has_no_leading_space() {
    let mut reconciler = TranscriptReconciler::new();
    feed(&mut reconciler, &[("one", Speaker::User)]);
    reconciler.turn_complete();
    feed(&mut reconciler, &[("two", Speaker::User)]);

    assert_eq!(reconciler.pending().map(|u| u.text.as_str()), Some("two"));
}

#[test]
fn test_punctuation_never_creates_boundaries() {
    let mut reconciler = TranscriptReconciler::new();
    feed(
        &mut reconciler,
        &[("Sure.", Speaker::Agent), ("Anything else?", Speaker::Agent), ("Bye!", Speaker::Agent)],
    );

    assert!(reconciler.history().is_empty());
    assert_eq!(
        reconciler.pending().map(|u| u.text.as_str()),
        Some("Sure. Anything else? Bye!")
    );
}

#[test]
fn test_end_call_commits_pending_once() {
    let mut reconciler = TranscriptReconciler::new();
    feed(&mut reconciler, &[("Thanks", Speaker::User)]);

    assert!(reconciler.end_call().is_some());
    assert!(reconciler.end_call().is_none());
    assert_eq!(reconciler.history().len(), 1);
}

#[test]
fn test_snapshot_shows_history_and_pending() {
    let mut reconciler = TranscriptReconciler::new();
    feed(
        &mut reconciler,
        &[("Hi", Speaker::User), ("Welcome", Speaker::Agent), ("to", Speaker::Agent)],
    );

    let snapshot = reconciler.snapshot();
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.pending.map(|u| u.text), Some("Welcome to".to_string()));
}
