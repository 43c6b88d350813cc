use crate::types::enums::{StageStatus, StageType};

/// Selection state over the fixed stage order. Navigation is never gated: a
/// stored `locked` status is presented as `unlocked` and every stage stays
/// reachable once a project exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageNavigator {
    current: StageType,
}

impl Default for StageNavigator {
    fn default() -> Self {
        Self {
            current: StageType::ORDER[0],
        }
    }
}

impl StageNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> StageType {
        self.current
    }

    pub fn navigate_to(&mut self, stage: StageType) {
        self.current = stage;
    }

    /// Advances one position; no-op at the last stage. Returns whether the
    /// selection moved.
    pub fn next(&mut self) -> bool {
        match self.current.next() {
            Some(stage) => {
                self.current = stage;
                true
            }
            None => false,
        }
    }

    /// Moves back one position; no-op at the first stage.
    pub fn prev(&mut self) -> bool {
        match self.current.prev() {
            Some(stage) => {
                self.current = stage;
                true
            }
            None => false,
        }
    }

    pub fn is_first(&self) -> bool {
        self.current == StageType::ORDER[0]
    }

    pub fn is_last(&self) -> bool {
        self.current == StageType::ORDER[StageType::ORDER.len() - 1]
    }

    /// Status as presented to the user: a missing or `locked` record reads
    /// as `unlocked`.
    pub fn effective_status(stored: Option<StageStatus>) -> StageStatus {
        match stored {
            None | Some(StageStatus::Locked) => StageStatus::Unlocked,
            Some(status) => status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_stage() {
        let nav = StageNavigator::new();
        assert_eq!(nav.current(), StageType::Idea);
        assert!(nav.is_first());
        assert!(!nav.is_last());
    }

    #[test]
    fn navigation_ignores_stored_status() {
        // Every stage is reachable no matter what status the server stored.
        for stage in StageType::ORDER {
            let mut nav = StageNavigator::new();
            nav.navigate_to(stage);
            assert_eq!(nav.current(), stage);
        }
    }

    #[test]
    fn next_walks_forward_and_stops() {
        let mut nav = StageNavigator::new();
        let mut visited = vec![nav.current()];
        while nav.next() {
            visited.push(nav.current());
        }
        assert_eq!(visited, StageType::ORDER.to_vec());
        assert!(nav.is_last());
        assert!(!nav.next());
        assert_eq!(nav.current(), StageType::MotionPrompt);
    }

    #[test]
    fn prev_is_noop_at_first_stage() {
        let mut nav = StageNavigator::new();
        assert!(!nav.prev());
        assert_eq!(nav.current(), StageType::Idea);
        nav.navigate_to(StageType::Script);
        assert!(nav.prev());
        assert_eq!(nav.current(), StageType::Story);
    }

    #[test]
    fn locked_and_absent_statuses_read_as_unlocked() {
        assert_eq!(
            StageNavigator::effective_status(None),
            StageStatus::Unlocked
        );
        assert_eq!(
            StageNavigator::effective_status(Some(StageStatus::Locked)),
            StageStatus::Unlocked
        );
        assert_eq!(
            StageNavigator::effective_status(Some(StageStatus::Completed)),
            StageStatus::Completed
        );
    }
}
