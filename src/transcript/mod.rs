//! Transcript merge engine
//!
//! The agent transport delivers speech-to-text fragments incrementally:
//! partial fragments are deltas that extend the speaker's current turn,
//! final fragments restate the whole turn. `Transcript::apply` folds that
//! stream into the ordered entry list shown to the user and sent to
//! analysis.
//!
//! Only the last entry in the sequence is ever amended in place. When both
//! speakers have pending turns at once, a fragment for the non-tail
//! speaker starts a new entry; this ordering approximation matches the
//! behavior of live turn-taking transcription and is deliberate.

use serde::{Deserialize, Serialize};

/// Which side of the conversation spoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Agent,
    Human,
}

impl Speaker {
    /// Display label used when rendering the transcript as text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Agent => "AGENT",
            Self::Human => "HUMAN",
        }
    }
}

/// One displayed transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// One incremental speech-to-text fragment from the transport
#[derive(Debug, Clone)]
pub struct IncomingFragment {
    pub speaker: Speaker,
    pub text: String,
    pub is_final: bool,
}

/// Ordered transcript built by folding incoming fragments
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment into the transcript.
    ///
    /// Fragments that are empty after trimming are ignored. If the last
    /// entry belongs to the same speaker and is still non-final, it is
    /// amended in place: a final fragment replaces its text, a partial
    /// fragment is appended as a delta. Otherwise a new entry starts.
    pub fn apply(&mut self, fragment: IncomingFragment) {
        if fragment.text.trim().is_empty() {
            return;
        }

        match self.entries.last_mut() {
            Some(last) if last.speaker == fragment.speaker && !last.is_final => {
                if fragment.is_final {
                    last.text = fragment.text;
                } else {
                    last.text.push_str(&fragment.text);
                }
                last.is_final = fragment.is_final;
            }
            _ => self.entries.push(TranscriptEntry {
                speaker: fragment.speaker,
                text: fragment.text,
                is_final: fragment.is_final,
            }),
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark every entry final. Used at session end, before analysis, so a
    /// trailing in-flight turn is not lost.
    pub fn finalize_all(&mut self) {
        for entry in &mut self.entries {
            entry.is_final = true;
        }
    }

    /// Render final entries as `SPEAKER: text` lines for the analysis
    /// request. Non-final entries are excluded.
    pub fn render_final(&self) -> String {
        self.entries
            .iter()
            .filter(|e| e.is_final)
            .map(|e| format!("{}: {}", e.speaker.label(), e.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Assembles raw per-speaker transcription deltas into fragments.
///
/// Some agent protocols tag fragments with a final flag themselves; others
/// send bare text deltas and a separate turn-complete control signal. This
/// accumulator tracks the running text per speaker so a turn-complete can
/// be turned into final fragments, which the merge rule then folds like
/// any other fragment.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    human: String,
    agent: String,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw delta and produce the partial fragment to apply.
    pub fn delta(&mut self, speaker: Speaker, text: &str) -> IncomingFragment {
        self.pending_mut(speaker).push_str(text);
        IncomingFragment {
            speaker,
            text: text.to_string(),
            is_final: false,
        }
    }

    /// Drop the accumulation for a speaker whose turn was closed by a
    /// protocol-level final fragment.
    pub fn clear(&mut self, speaker: Speaker) {
        self.pending_mut(speaker).clear();
    }

    /// Turn-complete control signal: emit final fragments carrying the
    /// accumulated text for each speaker with a pending turn, then reset.
    /// The human's turn closes first.
    pub fn turn_complete(&mut self) -> Vec<IncomingFragment> {
        let mut fragments = Vec::new();
        for speaker in [Speaker::Human, Speaker::Agent] {
            let pending = self.pending_mut(speaker);
            if !pending.is_empty() {
                fragments.push(IncomingFragment {
                    speaker,
                    text: std::mem::take(pending),
                    is_final: true,
                });
            }
        }
        fragments
    }

    fn pending_mut(&mut self, speaker: Speaker) -> &mut String {
        match speaker {
            Speaker::Human => &mut self.human,
            Speaker::Agent => &mut self.agent,
        }
    }
}
