use std::collections::HashMap;

use teloxide::types::{ChatId, FileId, MessageId, UserId};

/// What the next message from a user should be treated as. One entry per
/// user at most; a new `set` supersedes whatever was pending.
#[derive(Debug, Clone)]
pub enum Pending {
    /// A photo was picked for saving; the next text message names it.
    CoverName {
        photo: FileId,
        chat: ChatId,
        prompt: MessageId,
    },
    /// A video is waiting for a replacement cover; the next photo
    /// completes it.
    NewCover {
        video: FileId,
        caption: Option<String>,
        chat: ChatId,
        prompt: MessageId,
    },
}

/// Process-local flow state. Not persisted: an instance restart drops any
/// half-finished interaction. Callers lock the containing mutex, so each
/// take is an atomic check-and-remove.
pub struct FlowState {
    entries: HashMap<UserId, Pending>,
}

impl FlowState {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn set(&mut self, user: UserId, pending: Pending) {
        self.entries.insert(user, pending);
    }

    /// Removes and returns the entry only when it is a `CoverName`.
    pub fn take_cover_name(&mut self, user: UserId) -> Option<Pending> {
        match self.entries.get(&user) {
            Some(Pending::CoverName { .. }) => self.entries.remove(&user),
            _ => None,
        }
    }

    /// Removes and returns the entry only when it is a `NewCover`.
    pub fn take_new_cover(&mut self, user: UserId) -> Option<Pending> {
        match self.entries.get(&user) {
            Some(Pending::NewCover { .. }) => self.entries.remove(&user),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserId = UserId(7);

    fn new_cover() -> Pending {
        Pending::NewCover {
            video: FileId("vid".to_string()),
            caption: Some("caption".to_string()),
            chat: ChatId(1),
            prompt: MessageId(10),
        }
    }

    fn cover_name() -> Pending {
        Pending::CoverName {
            photo: FileId("pic".to_string()),
            chat: ChatId(1),
            prompt: MessageId(11),
        }
    }

    #[test]
    fn test_take_consumes_entry() {
        let mut flow = FlowState::new();
        flow.set(USER, new_cover());

        assert!(flow.take_new_cover(USER).is_some());
        // Second take finds nothing: the interaction resolved.
        assert!(flow.take_new_cover(USER).is_none());
    }

    #[test]
    fn test_take_respects_variant() {
        let mut flow = FlowState::new();
        flow.set(USER, new_cover());

        // A text message must not consume a pending cover image.
        assert!(flow.take_cover_name(USER).is_none());
        assert!(flow.take_new_cover(USER).is_some());
    }

    #[test]
    fn test_set_supersedes() {
        let mut flow = FlowState::new();
        flow.set(USER, new_cover());
        flow.set(USER, cover_name());

        assert!(flow.take_new_cover(USER).is_none());
        let taken = flow.take_cover_name(USER);
        assert!(matches!(taken, Some(Pending::CoverName { .. })));
    }

    #[test]
    fn test_users_independent() {
        let mut flow = FlowState::new();
        flow.set(USER, new_cover());

        assert!(flow.take_new_cover(UserId(8)).is_none());
        assert!(flow.take_new_cover(USER).is_some());
    }
}
