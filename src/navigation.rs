/// Position of the displayed question within the active question list.
///
/// Purely positional: it knows the list length and nothing about answers.
/// Invariant: `cursor < len` whenever `len > 0`, and `cursor == 0` otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigator {
    cursor: usize,
    len: usize,
}

impl Navigator {
    pub fn new(len: usize) -> Self {
        Self { cursor: 0, len }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_first(&self) -> bool {
        self.cursor == 0
    }

    pub fn is_last(&self) -> bool {
        self.len == 0 || self.cursor + 1 == self.len
    }

    /// Advance by one. No-op at the last index.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Go back by one. No-op at index 0.
    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Move to `index`; out-of-range targets are ignored.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let moved = index != self.cursor;
        self.cursor = index;
        moved
    }
}
