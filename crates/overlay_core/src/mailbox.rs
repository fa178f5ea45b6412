//! Single-slot mailbox with destructive reads.

/// Holds at most one pending value. Posting overwrites an unread value;
/// taking empties the slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Mailbox<T> {
    slot: Option<T>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, value: T) {
        self.slot = Some(value);
    }

    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_is_destructive() {
        let mut m = Mailbox::new();
        m.post(3);
        assert_eq!(m.take(), Some(3));
        assert_eq!(m.take(), None);
    }

    #[test]
    fn later_posts_overwrite_unread_ones() {
        let mut m = Mailbox::new();
        m.post("first");
        m.post("second");
        assert!(m.is_pending());
        assert_eq!(m.take(), Some("second"));
        assert!(!m.is_pending());
    }
}
