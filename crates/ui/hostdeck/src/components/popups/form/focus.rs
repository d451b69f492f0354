use super::FormAction;

/// A navigable element of a form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FocusTarget {
    Field(String),
    Action(FormAction),
}

impl FocusTarget {
    pub fn field(&self) -> Option<&str> {
        match self {
            FocusTarget::Field(key) => Some(key),
            FocusTarget::Action(_) => None,
        }
    }
}

/// Cyclic navigation over the visible fields followed by the action buttons.
///
/// `index` is always inside `[0, len)` while the sequence is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusSequencer {
    sequence: Vec<FocusTarget>,
    index: usize,
}

impl FocusSequencer {
    pub fn new(sequence: Vec<FocusTarget>) -> Self {
        Self { sequence, index: 0 }
    }

    pub fn next(&mut self) {
        if self.sequence.len() <= 1 {
            return;
        }
        self.index = (self.index + 1) % self.sequence.len();
    }

    pub fn previous(&mut self) {
        if self.sequence.len() <= 1 {
            return;
        }
        self.index = (self.index + self.sequence.len() - 1) % self.sequence.len();
    }

    pub fn current(&self) -> Option<&FocusTarget> {
        self.sequence.get(self.index)
    }

    /// Swap in a new sequence. Focus follows the previously focused element
    /// when it is still present and falls back to the first element otherwise.
    pub fn recompute(&mut self, sequence: Vec<FocusTarget>) {
        let previous = self.current().cloned();
        self.sequence = sequence;
        self.index = previous
            .and_then(|p| self.sequence.iter().position(|t| *t == p))
            .unwrap_or(0);
    }

    /// Move focus onto `target`; false when it is not navigable right now.
    pub fn focus(&mut self, target: &FocusTarget) -> bool {
        match self.sequence.iter().position(|t| t == target) {
            Some(idx) => {
                self.index = idx;
                true
            }
            None => false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn sequence(&self) -> &[FocusTarget] {
        &self.sequence
    }
}
