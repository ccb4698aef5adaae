use std::{collections::HashMap, time::Duration};

use tokio::time::Instant;

use crate::{event::CorrelationKey, script::BoxedScript};

enum Slot {
    Idle { script: BoxedScript, since: Instant },
    /// Script is checked out by a driver that is resuming it.
    Busy { since: Instant },
}

impl Slot {
    fn idle(script: BoxedScript) -> Self {
        Self::Idle {
            script,
            since: Instant::now(),
        }
    }

    fn since(&self) -> Instant {
        match self {
            Slot::Idle { since, .. } | Slot::Busy { since } => *since,
        }
    }
}

/// Result of taking a script out of the index for resumption.
pub enum Checkout {
    Absent,
    Busy,
    Ready(BoxedScript),
}

/// Reply-pending and menu-pending scripts keyed by the bot message they wait on.
///
/// A key lives in at most one of the two maps. Owning the boxed script is
/// what registration means, so a script can never be bound twice.
#[derive(Default)]
pub struct CorrelationIndex {
    replies: HashMap<CorrelationKey, Slot>,
    menus: HashMap<CorrelationKey, Slot>,
}

impl CorrelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_awaiting_reply(&self, key: &CorrelationKey) -> bool {
        self.replies.contains_key(key)
    }

    pub fn is_awaiting_menu(&self, key: &CorrelationKey) -> bool {
        self.menus.contains_key(key)
    }

    pub fn register_reply(&mut self, key: CorrelationKey, script: BoxedScript) {
        self.menus.remove(&key);
        self.replies.insert(key, Slot::idle(script));
    }

    pub fn register_menu(&mut self, key: CorrelationKey, script: BoxedScript) {
        self.replies.remove(&key);
        self.menus.insert(key, Slot::idle(script));
    }

    /// Drops whatever is bound to `key` in either map.
    pub fn unregister(&mut self, key: &CorrelationKey) -> Option<BoxedScript> {
        let slot = match self.replies.remove(key) {
            Some(slot) => Some(slot),
            None => self.menus.remove(key),
        };

        match slot {
            Some(Slot::Idle { script, .. }) => Some(script),
            _ => None,
        }
    }

    pub fn lookup_reply(&self, key: &CorrelationKey) -> Option<&BoxedScript> {
        match self.replies.get(key) {
            Some(Slot::Idle { script, .. }) => Some(script),
            _ => None,
        }
    }

    pub fn lookup_menu(&self, key: &CorrelationKey) -> Option<&BoxedScript> {
        match self.menus.get(key) {
            Some(Slot::Idle { script, .. }) => Some(script),
            _ => None,
        }
    }

    pub fn checkout_reply(&mut self, key: &CorrelationKey) -> Checkout {
        Self::checkout(&mut self.replies, key)
    }

    pub fn checkout_menu(&mut self, key: &CorrelationKey) -> Checkout {
        Self::checkout(&mut self.menus, key)
    }

    fn checkout(map: &mut HashMap<CorrelationKey, Slot>, key: &CorrelationKey) -> Checkout {
        let slot = match map.get_mut(key) {
            Some(slot) => slot,
            None => return Checkout::Absent,
        };
        if let Slot::Busy { .. } = slot {
            return Checkout::Busy;
        }

        let busy = Slot::Busy {
            since: Instant::now(),
        };
        match std::mem::replace(slot, busy) {
            Slot::Idle { script, .. } => Checkout::Ready(script),
            Slot::Busy { .. } => Checkout::Busy,
        }
    }

    /// Removes entries registered (or checked out) longer than `max_age` ago.
    pub fn expire(&mut self, max_age: Duration) -> usize {
        let now = Instant::now();
        let before = self.len();
        let fresh = |_: &CorrelationKey, slot: &mut Slot| now.duration_since(slot.since()) < max_age;
        self.replies.retain(fresh);
        self.menus.retain(fresh);

        before - self.len()
    }

    pub fn len(&self) -> usize {
        self.replies.len() + self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
