//! Running conversation transcript
//!
//! Fragments are appended in arrival order and never deduplicated; the
//! rendered text is a plain space-joined concatenation. Interleaving between
//! user and model fragments is whatever order the transport delivered them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the conversation a fragment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    Model,
}

/// One transcription fragment as delivered by the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub speaker: Speaker,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// The running transcript of one session
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    fragments: Vec<TranscriptFragment>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment in arrival order
    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.fragments.push(TranscriptFragment {
            speaker,
            text: text.into(),
            received_at: Utc::now(),
        });
    }

    /// Render the transcript as space-joined text
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// All fragments in arrival order
    pub fn fragments(&self) -> &[TranscriptFragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrival_order_concatenation() {
        let mut transcript = Transcript::new();
        transcript.append(Speaker::Model, "Hello");
        transcript.append(Speaker::User, "hi");
        transcript.append(Speaker::Model, "there");

        assert_eq!(transcript.text(), "Hello hi there");
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut transcript = Transcript::new();
        transcript.append(Speaker::Model, "again");
        transcript.append(Speaker::Model, "again");

        assert_eq!(transcript.text(), "again again");
    }

    #[test]
    fn test_empty_transcript() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.text(), "");
    }

    #[test]
    fn test_fragments_tagged_by_speaker() {
        let mut transcript = Transcript::new();
        transcript.append(Speaker::User, "question");
        transcript.append(Speaker::Model, "answer");

        let fragments = transcript.fragments();
        assert_eq!(fragments[0].speaker, Speaker::User);
        assert_eq!(fragments[1].speaker, Speaker::Model);
    }
}
