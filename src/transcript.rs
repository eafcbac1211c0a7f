use crate::message::Message;

/// Append-only conversation history for one session.
///
/// Insertion order is conversation order; entries are never reordered,
/// removed, or deduplicated. No size cap is enforced, so a long enough
/// session can exceed the remote service's context window.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transcript with an initial system message.
    pub fn with_system(text: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(text)],
        }
    }

    /// Append a message to the end.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The full ordered sequence, for inclusion in the next request.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn test_with_system_seeds_one_message() {
        let t = Transcript::with_system("You are a helpful assistant.");
        assert_eq!(t.len(), 1);
        assert_eq!(t.last().unwrap().role, Role::System);
    }

    #[test]
    fn test_push_preserves_order() {
        let mut t = Transcript::with_system("sys");
        t.push(Message::user("one"));
        t.push(Message::assistant("two"));
        t.push(Message::user("three"));
        let roles: Vec<Role> = t.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let mut t = Transcript::with_system("sys");
        let snap = t.snapshot();
        t.push(Message::user("later"));
        assert_eq!(snap.len(), 1);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_empty_transcript() {
        let t = Transcript::new();
        assert!(t.is_empty());
        assert!(t.last().is_none());
    }
}
