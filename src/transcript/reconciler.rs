use serde::Serialize;

/// Read-only view of the reconciled transcript
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptSnapshot {
    pub final_text: String,
    pub partial_text: String,
    pub combined_text: String,
}

/// The evolving text of one dictation session.
///
/// `final_text` is append-only: once a fragment commits, no later partial may
/// alter it. `partial_text` is the latest uncommitted fragment, replaced
/// wholesale on each partial and cleared on each commit. Partials only ever
/// describe audio after the last committed boundary; a late partial covering
/// already-committed audio is discarded.
#[derive(Debug, Default)]
pub struct TranscriptState {
    final_text: String,
    partial_text: String,
    /// Audio end (ms) of the latest committed final
    committed_through_ms: u64,
}

impl TranscriptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a partial fragment: wholesale replacement of the uncommitted tail.
    ///
    /// Returns false when the partial was discarded as stale, i.e. its audio
    /// span ends at or before the latest committed boundary.
    pub fn apply_partial(&mut self, text: &str, audio_end_ms: u64) -> bool {
        if self.committed_through_ms > 0 && audio_end_ms <= self.committed_through_ms {
            return false;
        }
        self.partial_text.clear();
        self.partial_text.push_str(text);
        true
    }

    /// Commit a final fragment: append to `final_text`, clear the partial,
    /// and advance the committed boundary.
    pub fn apply_final(&mut self, text: &str, audio_end_ms: u64) {
        if !text.is_empty() {
            if needs_separator(&self.final_text) {
                self.final_text.push(' ');
            }
            self.final_text.push_str(text);
        }
        self.partial_text.clear();
        self.committed_through_ms = self.committed_through_ms.max(audio_end_ms);
    }

    pub fn final_text(&self) -> &str {
        &self.final_text
    }

    pub fn partial_text(&self) -> &str {
        &self.partial_text
    }

    /// Committed text plus the current partial, recomputed on every read.
    pub fn combined_text(&self) -> String {
        if self.partial_text.is_empty() {
            return self.final_text.clone();
        }
        let mut combined =
            String::with_capacity(self.final_text.len() + self.partial_text.len() + 1);
        combined.push_str(&self.final_text);
        if needs_separator(&self.final_text) {
            combined.push(' ');
        }
        combined.push_str(&self.partial_text);
        combined
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        TranscriptSnapshot {
            final_text: self.final_text.clone(),
            partial_text: self.partial_text.clone(),
            combined_text: self.combined_text(),
        }
    }
}

fn needs_separator(final_text: &str) -> bool {
    !final_text.is_empty() && !final_text.ends_with(char::is_whitespace)
}
