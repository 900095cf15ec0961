use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::domain::{TransactionKind, UserId};

/// Continuation of an add-flow parked on category approval: everything needed
/// to finish the transaction once the user accepts the suggestion.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingAdd {
    pub kind: TransactionKind,
    pub description: String,
    pub amount: f64,
    pub suggested: String,
}

/// Per-user pending interaction. At most one per user; while one is active,
/// every inbound message for that user is interpreted as its answer.
#[derive(Clone, Debug, PartialEq)]
pub enum PendingState {
    AwaitingClarification { description: String, amount: f64 },
    AwaitingDeleteConfirmation,
    AwaitingCategoryApproval { pending: PendingAdd },
}

struct Entry {
    state: PendingState,
    generation: u64,
    cancel: CancellationToken,
}

/// Handle for one armed pending state. The timeout task holds it and must
/// prove it still owns the entry (same generation) before acting.
#[derive(Clone, Debug)]
pub struct Armed {
    pub user: UserId,
    pub generation: u64,
    pub cancel: CancellationToken,
}

/// Pending-interaction registry: one tagged state per user plus the
/// cancellation token of its timeout task.
///
/// Process-lifetime scoped; deliberately not persisted. Reply handlers and
/// timers race for an entry, and whoever removes it under the lock first wins
/// exclusively.
#[derive(Default)]
pub struct Conversations {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<UserId, Entry>,
    next_generation: u64,
}

impl Conversations {
    /// Install a pending state for `user`, displacing (and cancelling the
    /// timer of) any previous one.
    pub fn begin(&self, user: &UserId, state: PendingState) -> Armed {
        let mut inner = self.inner.lock().expect("conversations lock");
        inner.next_generation += 1;
        let generation = inner.next_generation;
        let cancel = CancellationToken::new();

        if let Some(old) = inner.entries.insert(
            user.clone(),
            Entry {
                state,
                generation,
                cancel: cancel.clone(),
            },
        ) {
            old.cancel.cancel();
        }

        Armed {
            user: user.clone(),
            generation,
            cancel,
        }
    }

    /// Current pending state without consuming it. Clarification re-prompts
    /// use this so the entry and its running timer stay untouched.
    pub fn peek(&self, user: &UserId) -> Option<PendingState> {
        let inner = self.inner.lock().expect("conversations lock");
        inner.entries.get(user).map(|e| e.state.clone())
    }

    /// Consume the entry and cancel its timer: the reply handler wins the
    /// race against the timeout task here.
    pub fn take(&self, user: &UserId) -> Option<PendingState> {
        let mut inner = self.inner.lock().expect("conversations lock");
        let entry = inner.entries.remove(user)?;
        entry.cancel.cancel();
        Some(entry.state)
    }

    /// Consume the entry only if it is still the one `armed` was created for.
    /// A stale timer firing after the state moved on is a no-op.
    pub fn take_if_current(&self, armed: &Armed) -> Option<PendingState> {
        let mut inner = self.inner.lock().expect("conversations lock");
        let owns_entry = inner
            .entries
            .get(&armed.user)
            .is_some_and(|e| e.generation == armed.generation);
        if !owns_entry {
            return None;
        }
        inner.entries.remove(&armed.user).map(|e| e.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId("42".to_string())
    }

    #[test]
    fn take_consumes_and_cancels() {
        let conversations = Conversations::default();
        let armed = conversations.begin(&user(), PendingState::AwaitingDeleteConfirmation);

        assert_eq!(
            conversations.take(&user()),
            Some(PendingState::AwaitingDeleteConfirmation)
        );
        assert!(armed.cancel.is_cancelled());
        assert_eq!(conversations.take(&user()), None);
    }

    #[test]
    fn peek_leaves_the_entry_in_place() {
        let conversations = Conversations::default();
        conversations.begin(
            &user(),
            PendingState::AwaitingClarification {
                description: "transferência".to_string(),
                amount: 50.0,
            },
        );

        assert!(conversations.peek(&user()).is_some());
        assert!(conversations.peek(&user()).is_some());
        assert!(conversations.take(&user()).is_some());
    }

    #[test]
    fn begin_displaces_and_cancels_previous_entry() {
        let conversations = Conversations::default();
        let first = conversations.begin(&user(), PendingState::AwaitingDeleteConfirmation);
        let second = conversations.begin(
            &user(),
            PendingState::AwaitingClarification {
                description: "x".to_string(),
                amount: 1.0,
            },
        );

        assert!(first.cancel.is_cancelled());
        assert!(!second.cancel.is_cancelled());
        assert_eq!(conversations.take_if_current(&first), None);
        assert!(conversations.take_if_current(&second).is_some());
    }

    #[test]
    fn stale_timer_handle_is_a_no_op() {
        let conversations = Conversations::default();
        let armed = conversations.begin(&user(), PendingState::AwaitingDeleteConfirmation);

        // Reply handler resolves the state first.
        assert!(conversations.take(&user()).is_some());
        assert_eq!(conversations.take_if_current(&armed), None);
    }
}
