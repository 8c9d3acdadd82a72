//! Transcript reconciliation
//!
//! Transcript fragments arrive as small deltas tagged with a speaker. The
//! reconciler folds them into committed, speaker-attributed utterances. Turn
//! boundaries come only from speaker changes and explicit turn/call signals,
//! never from the text itself.

use serde::{Deserialize, Serialize};

/// Who produced a piece of speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

/// Incremental piece of transcribed speech
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub text: String,
    pub speaker: Speaker,
}

impl TranscriptFragment {
    pub fn new(text: impl Into<String>, speaker: Speaker) -> Self {
        Self {
            text: text.into(),
            speaker,
        }
    }
}

/// A committed (or in-progress) block of speech from one speaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub speaker: Speaker,
}

/// History plus the live partial line, as rendered by a UI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSnapshot {
    pub history: Vec<Utterance>,
    pub pending: Option<Utterance>,
}

#[derive(Debug, Default)]
pub struct TranscriptReconciler {
    history: Vec<Utterance>,
    pending: Option<Utterance>,
}

impl TranscriptReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a fragment in. Returns the utterance committed by a speaker
    /// change, if any.
    pub fn apply(&mut self, fragment: TranscriptFragment) -> Option<Utterance> {
        if fragment.text.is_empty() {
            return None;
        }

        match &mut self.pending {
            Some(pending) if pending.speaker == fragment.speaker => {
                if !pending.text.is_empty() {
                    pending.text.push(' ');
                }
                pending.text.push_str(&fragment.text);
                None
            }
            _ => {
                let committed = self.commit_pending();
                self.pending = Some(Utterance {
                    text: fragment.text,
                    speaker: fragment.speaker,
                });
                committed
            }
        }
    }

    /// The current speaker finished their turn
    pub fn turn_complete(&mut self) -> Option<Utterance> {
        self.commit_pending()
    }

    /// The call ended; flush whatever is pending
    pub fn end_call(&mut self) -> Option<Utterance> {
        self.commit_pending()
    }

    fn commit_pending(&mut self) -> Option<Utterance> {
        let pending = self.pending.take()?;
        if pending.text.is_empty() {
            return None;
        }

        self.history.push(pending.clone());
        Some(pending)
    }

    pub fn history(&self) -> &[Utterance] {
        &self.history
    }

    pub fn pending(&self) -> Option<&Utterance> {
        self.pending.as_ref()
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        TranscriptSnapshot {
            history: self.history.clone(),
            pending: self.pending.clone(),
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fragment_is_ignored() {
        let mut reconciler = TranscriptReconciler::new();
        assert!(reconciler.apply(TranscriptFragment::new("", Speaker::User)).is_none());
        assert!(reconciler.pending().is_none());
    }

    #[test]
    fn test_turn_complete_without_pending_is_noop() {
        let mut reconciler = TranscriptReconciler::new();
        assert!(reconciler.turn_complete().is_none());
        assert!(reconciler.history().is_empty());
    }

    #[test]
    fn test_reset_clears_history_and_pending() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.apply(TranscriptFragment::new("Hi", Speaker::User));
        reconciler.apply(TranscriptFragment::new("Hello", Speaker::Agent));
        reconciler.reset();

        assert_eq!(reconciler.snapshot(), TranscriptSnapshot::default());
    }
}
