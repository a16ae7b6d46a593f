use std::collections::HashMap;

use crate::corpus::NodeId;

/// A studied node older than this is due for review and starts pulsating.
pub const REVIEW_THRESHOLD_MS: u64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningState {
    Unstudied,
    /// Studied recently; gets the quiet shared glow floor.
    Connected,
    /// Past the review threshold; pulses until revisited.
    ReviewDue,
}

/// Membership + last-studied timestamps (milliseconds since the UNIX epoch,
/// always supplied by the caller — the core never reads the clock).
/// Persistence belongs to the viewer's key-value store.
#[derive(Debug, Clone, Default)]
pub struct StudyProgress {
    studied: HashMap<NodeId, u64>,
    has_review_due: bool,
}

impl StudyProgress {
    /// Restore a persisted set. Entries from before timestamps existed carry
    /// `None` and are backfilled just past the review threshold, so they
    /// surface as review-due rather than freshly studied.
    pub fn load(entries: impl IntoIterator<Item = (NodeId, Option<u64>)>, now_ms: u64) -> Self {
        let backfill = now_ms.saturating_sub(REVIEW_THRESHOLD_MS + 1);
        let studied = entries
            .into_iter()
            .map(|(id, ts)| (id, ts.unwrap_or(backfill)))
            .collect();
        let mut progress = Self {
            studied,
            has_review_due: false,
        };
        progress.recompute_pulsation(now_ms);
        progress
    }

    /// Toggle membership; returns true when the node is now studied.
    pub fn toggle(&mut self, id: &NodeId, now_ms: u64) -> bool {
        let now_studied = if self.studied.remove(id).is_none() {
            self.studied.insert(id.clone(), now_ms);
            true
        } else {
            false
        };
        self.recompute_pulsation(now_ms);
        now_studied
    }

    pub fn is_studied(&self, id: &NodeId) -> bool {
        self.studied.contains_key(id)
    }

    pub fn learning_state(&self, id: &NodeId, now_ms: u64) -> LearningState {
        match self.studied.get(id) {
            None => LearningState::Unstudied,
            Some(&ts) => {
                if now_ms.saturating_sub(ts) > REVIEW_THRESHOLD_MS {
                    LearningState::ReviewDue
                } else {
                    LearningState::Connected
                }
            }
        }
    }

    /// True only when at least one node actually needs the pulsation loop —
    /// the scheduler consults this, not plain membership.
    pub fn has_review_due(&self) -> bool {
        self.has_review_due
    }

    pub fn recompute_pulsation(&mut self, now_ms: u64) {
        self.has_review_due = self
            .studied
            .values()
            .any(|&ts| now_ms.saturating_sub(ts) > REVIEW_THRESHOLD_MS);
    }

    pub fn len(&self) -> usize {
        self.studied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.studied.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, u64)> {
        self.studied.iter().map(|(id, &ts)| (id, ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId(s.to_string())
    }

    #[test]
    fn toggle_flips_membership_and_stamps_time() {
        let mut p = StudyProgress::default();
        assert!(p.toggle(&id("a"), 1_000));
        assert!(p.is_studied(&id("a")));
        assert_eq!(p.learning_state(&id("a"), 1_000), LearningState::Connected);
        assert!(!p.toggle(&id("a"), 2_000));
        assert!(!p.is_studied(&id("a")));
        assert_eq!(p.learning_state(&id("a"), 2_000), LearningState::Unstudied);
    }

    #[test]
    fn review_due_after_threshold() {
        let mut p = StudyProgress::default();
        p.toggle(&id("a"), 0);
        assert_eq!(
            p.learning_state(&id("a"), REVIEW_THRESHOLD_MS),
            LearningState::Connected
        );
        assert_eq!(
            p.learning_state(&id("a"), REVIEW_THRESHOLD_MS + 1),
            LearningState::ReviewDue
        );
    }

    #[test]
    fn pulsation_flag_tracks_review_due_only() {
        let now = REVIEW_THRESHOLD_MS * 2;
        let mut p = StudyProgress::default();
        p.toggle(&id("fresh"), now);
        assert!(!p.has_review_due());
        p.recompute_pulsation(now);
        assert!(!p.has_review_due());

        let p = StudyProgress::load([(id("old"), Some(0))], now);
        assert!(p.has_review_due());
    }

    #[test]
    fn load_backfills_missing_timestamps_as_review_due() {
        let now = REVIEW_THRESHOLD_MS * 3;
        let p = StudyProgress::load([(id("legacy"), None), (id("dated"), Some(now))], now);
        assert_eq!(p.learning_state(&id("legacy"), now), LearningState::ReviewDue);
        assert_eq!(p.learning_state(&id("dated"), now), LearningState::Connected);
        assert!(p.has_review_due());
    }
}
