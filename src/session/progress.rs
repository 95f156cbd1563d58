//! Completion tracking for the active session

use std::collections::HashSet;

/// Ids of exercises ticked off in the current session
#[derive(Debug, Clone, Default)]
pub struct SessionProgress {
    completed: HashSet<String>,
}

impl SessionProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip completion for `id`; returns the new state
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.completed.remove(id) {
            false
        } else {
            self.completed.insert(id.to_string());
            true
        }
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    /// Drop `id` from the completed set (exercise left the working set)
    pub fn forget(&mut self, id: &str) -> bool {
        self.completed.remove(id)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn completed(&self) -> &HashSet<String> {
        &self.completed
    }

    /// Fraction of `total` completed, 0 for an empty day
    pub fn completion_ratio(&self, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (self.completed.len() as f64 / total as f64).min(1.0)
    }

    pub fn is_submittable(&self) -> bool {
        !self.completed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_is_symmetric() {
        let mut progress = SessionProgress::new();
        assert!(progress.toggle("a"));
        assert!(progress.is_completed("a"));
        assert!(!progress.toggle("a"));
        assert!(!progress.is_completed("a"));
        assert_eq!(progress.completed_count(), 0);
    }

    #[test]
    fn test_completion_ratio() {
        let mut progress = SessionProgress::new();
        assert_eq!(progress.completion_ratio(0), 0.0);
        assert_eq!(progress.completion_ratio(4), 0.0);

        progress.toggle("a");
        assert_eq!(progress.completion_ratio(4), 0.25);
        progress.toggle("b");
        assert_eq!(progress.completion_ratio(2), 1.0);
    }

    #[test]
    fn test_submittable_needs_one_completion() {
        let mut progress = SessionProgress::new();
        assert!(!progress.is_submittable());
        progress.toggle("a");
        assert!(progress.is_submittable());
        progress.forget("a");
        assert!(!progress.is_submittable());
    }
}
