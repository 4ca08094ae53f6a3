/// One undo/redo step: the whole serialized document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub content: String,
}

/// Linear undo/redo over full-document snapshots.
///
/// `current` always indexes a valid entry once the stack holds anything. Pushing
/// while not at the tip drops the redo branch first.
#[derive(Clone, Debug)]
pub struct ContentHistory {
    entries: Vec<HistoryEntry>,
    current: usize,
    limit: usize,
}

impl ContentHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: vec![],
            current: 0,
            limit: limit.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.current)
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.current + 1 < self.entries.len()
    }

    pub fn push(&mut self, content: String) {
        if !self.entries.is_empty() && self.current + 1 < self.entries.len() {
            self.entries.truncate(self.current + 1);
        }

        self.entries.push(HistoryEntry { content });
        self.current = self.entries.len() - 1;

        if self.entries.len() > self.limit {
            let overflow = self.entries.len() - self.limit;
            self.entries.drain(0..overflow);
            self.current -= overflow;
        }
    }

    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.current -= 1;
        self.entries.get(self.current)
    }

    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.current += 1;
        self.entries.get(self.current)
    }

    /// Overwrite the entry at the tip, used to fold consecutive typing into one step.
    /// Pushes instead when there is nothing to overwrite or a redo branch exists.
    pub fn replace_current(&mut self, content: String) {
        if self.entries.is_empty() || self.can_redo() {
            self.push(content);
            return;
        }
        self.entries[self.current] = HistoryEntry { content };
    }

    /// Forget everything and start over from `content`.
    pub fn reset(&mut self, content: String) {
        self.entries.clear();
        self.current = 0;
        self.push(content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn filled(n: usize, limit: usize) -> ContentHistory {
        let mut h = ContentHistory::new(limit);
        for i in 0..n {
            h.push(format!("s{i}"));
        }
        h
    }

    #[test]
    fn test_undo_at_start_is_noop() {
        let mut h = filled(1, 50);
        assert!(h.undo().is_none());
        assert_eq!(h.current_index(), 0);
    }

    #[test]
    fn test_redo_at_tip_is_noop() {
        let mut h = filled(3, 50);
        assert!(h.redo().is_none());
        assert_eq!(h.current_index(), 2);
    }

    #[rstest]
    #[case(10, 0)]
    #[case(10, 4)]
    #[case(10, 9)]
    #[case(50, 50)]
    fn test_undo_k_times_returns_state_after_n_minus_k(#[case] n: usize, #[case] k: usize) {
        // Entry 0 is the initial state, entries 1..=n follow each operation.
        let mut h = ContentHistory::new(51);
        h.push("s0".to_string());
        for i in 1..=n {
            h.push(format!("s{i}"));
        }
        for _ in 0..k {
            h.undo();
        }
        assert_eq!(
            h.current().map(|e| e.content.as_str()),
            Some(format!("s{}", n - k).as_str())
        );
    }

    #[test]
    fn test_push_after_undo_discards_redo_branch() {
        let mut h = filled(5, 50);
        h.undo();
        h.undo();
        h.push("branch".to_string());
        assert_eq!(h.len(), 4);
        assert!(h.redo().is_none());
        assert_eq!(h.current().map(|e| e.content.as_str()), Some("branch"));
    }

    #[test]
    fn test_limit_evicts_oldest_and_keeps_current_on_new_entry() {
        let mut h = filled(50, 50);
        h.push("s50".to_string());
        assert_eq!(h.len(), 50);
        assert_eq!(h.current_index(), 49);
        assert_eq!(h.current().map(|e| e.content.as_str()), Some("s50"));
        // s0 is gone: undoing all the way stops at s1.
        while h.undo().is_some() {}
        assert_eq!(h.current().map(|e| e.content.as_str()), Some("s1"));
    }

    #[test]
    fn test_replace_current_only_at_tip() {
        let mut h = filled(2, 50);
        h.replace_current("s1'".to_string());
        assert_eq!(h.len(), 2);
        h.undo();
        h.replace_current("fork".to_string());
        assert_eq!(h.len(), 2);
        assert_eq!(h.current().map(|e| e.content.as_str()), Some("fork"));
        assert!(!h.can_redo());
    }

    #[test]
    fn test_reset_keeps_single_entry() {
        let mut h = filled(4, 50);
        h.reset("fresh".to_string());
        assert_eq!(h.len(), 1);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
    }
}
