// The user's personal pick queue: an ordered, deduplicated list of players
// to draft, consumed automatically when the user comes on the clock.

use serde::{Deserialize, Serialize};

use super::session::PlayerId;

/// Direction for [`PersonalQueue::reorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward the front of the queue.
    Up,
    /// Toward the back of the queue.
    Down,
}

/// Outcome of an enqueue attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Added,
    /// The player is already queued; the queue is unchanged.
    AlreadyQueued,
    /// The queue is at its configured cap; the queue is unchanged.
    CapReached,
}

/// Client-local ordered list of players the user intends to draft.
///
/// Mutated only by the owning client, but pruned by the store whenever any
/// team drafts a queued player, so it never references an unavailable player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalQueue {
    entries: Vec<PlayerId>,
    cap: usize,
}

impl PersonalQueue {
    pub fn new(cap: usize) -> Self {
        PersonalQueue {
            entries: Vec::new(),
            cap,
        }
    }

    /// Append a player to the back of the queue. No-op (with a reported
    /// reason) when the player is already queued or the cap is reached.
    pub fn enqueue(&mut self, player_id: PlayerId) -> EnqueueOutcome {
        if self.entries.contains(&player_id) {
            return EnqueueOutcome::AlreadyQueued;
        }
        if self.entries.len() >= self.cap {
            return EnqueueOutcome::CapReached;
        }
        self.entries.push(player_id);
        EnqueueOutcome::Added
    }

    /// Remove and return the head of the queue.
    pub fn dequeue_front(&mut self) -> Option<PlayerId> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Remove a specific player. Returns whether the player was present.
    pub fn remove(&mut self, player_id: &PlayerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|p| p != player_id);
        self.entries.len() != before
    }

    /// Swap the entry with its immediate neighbor in the given direction.
    /// No-op at the boundaries or when the player is not queued. Returns
    /// whether anything moved.
    pub fn reorder(&mut self, player_id: &PlayerId, direction: Direction) -> bool {
        let Some(idx) = self.entries.iter().position(|p| p == player_id) else {
            return false;
        };
        match direction {
            Direction::Up if idx > 0 => {
                self.entries.swap(idx, idx - 1);
                true
            }
            Direction::Down if idx + 1 < self.entries.len() => {
                self.entries.swap(idx, idx + 1);
                true
            }
            _ => false,
        }
    }

    /// Drop every entry for which `available` returns false. Called by the
    /// store after a pick lands or a snapshot is applied.
    pub fn retain_available(&mut self, available: impl Fn(&PlayerId) -> bool) {
        self.entries.retain(|p| available(p));
    }

    pub fn front(&self) -> Option<&PlayerId> {
        self.entries.first()
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.entries.iter().any(|p| p == player_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// The queued players in order (front first).
    pub fn entries(&self) -> &[PlayerId] {
        &self.entries
    }

    /// Rebuild the queue from persisted entries, preserving order,
    /// dropping duplicates and anything past the cap.
    pub fn from_entries(entries: Vec<PlayerId>, cap: usize) -> Self {
        let mut queue = PersonalQueue::new(cap);
        for player_id in entries {
            queue.enqueue(player_id);
        }
        queue
    }
}
