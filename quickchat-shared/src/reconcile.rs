//! Client-side reconciliation state.
//!
//! Merges server-fetched history with pushed live events: at most one
//! conversation is open at a time, unseen counters are maintained
//! incrementally from pushes and reset when a conversation is opened, and a
//! server-side aggregate snapshot always wins on refresh. Pure local state,
//! no I/O; callers own the transport.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::message::Message;

/// What the caller must do after applying a pushed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The message landed in the open conversation and was appended to the
    /// visible history; acknowledge it with a fire-and-forget mark-seen.
    Ack(Uuid),
    /// The message belongs to another conversation; its counterpart's unseen
    /// counter was incremented and nothing else changed.
    Counted,
}

/// Per-session view state for one authenticated user.
#[derive(Debug, Clone, Default)]
pub struct ChatView {
    selected: Option<Uuid>,
    history: Vec<Message>,
    unseen: HashMap<Uuid, i64>,
}

impl ChatView {
    /// Fresh state with nothing selected and no cached counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The counterpart of the currently open conversation, if any.
    #[must_use]
    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    /// Visible history of the open conversation.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Cached unseen count for a counterpart; absent means zero.
    #[must_use]
    pub fn unseen_count(&self, other: Uuid) -> i64 {
        self.unseen.get(&other).copied().unwrap_or(0)
    }

    /// Opens the conversation with `other`, replacing the visible history
    /// wholesale with the server response and clearing `other`'s counter.
    ///
    /// Replacement (rather than merging) is what makes a push that raced
    /// ahead of the fetch response harmless: the fetch is authoritative.
    pub fn open_conversation(&mut self, other: Uuid, history: Vec<Message>) {
        self.selected = Some(other);
        self.history = history;
        self.unseen.remove(&other);
    }

    /// Deselects the open conversation; counters are untouched.
    pub fn select_none(&mut self) {
        self.selected = None;
        self.history.clear();
    }

    /// Applies a pushed message.
    ///
    /// For the open conversation's counterpart the message is appended with
    /// `seen` already true (the caller acknowledges it server-side); for any
    /// other counterpart only that counterpart's unseen counter changes.
    pub fn apply_push(&mut self, message: Message) -> PushOutcome {
        if self.selected == Some(message.sender_id) {
            let id = message.id;
            self.history.push(Message {
                seen: true,
                ..message
            });
            PushOutcome::Ack(id)
        } else {
            *self.unseen.entry(message.sender_id).or_insert(0) += 1;
            PushOutcome::Counted
        }
    }

    /// Appends the sender's own message after a successful send (optimistic
    /// UI append of the server-returned record).
    pub fn append_own(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Replaces all cached counters with the server aggregate, which is
    /// ground truth on any full refresh.
    pub fn apply_unseen_snapshot(&mut self, snapshot: HashMap<Uuid, i64>) {
        self.unseen = snapshot;
    }
}
