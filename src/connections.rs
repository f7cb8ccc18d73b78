use std::collections::{HashMap, HashSet};

use crate::BrokerId;

/// Multiset of peer connections, keyed by broker id, with a subset marked
/// as child (parent→child bridge) connections.
///
/// Connections are reference-counted rather than a plain set so that
/// duplicate bridge-up announcements and out-of-order teardown/creation
/// don't lose an entry: `add` increments, `remove` decrements, and the
/// entry disappears only once its count reaches zero (Design Notes §9,
/// "Counted connections").
#[derive(Debug, Clone, Default)]
pub(crate) struct Connections {
    counted: HashMap<BrokerId, u32>,
    children: HashSet<BrokerId>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counted connection for `id`. If `is_child`, also
    /// inserts into the child set. Returns whether the *visible* connection
    /// set changed (i.e. this was a brand new entry, or it newly became a
    /// child connection).
    pub fn add(&mut self, id: BrokerId, is_child: bool) -> bool {
        let count = self.counted.entry(id.clone()).or_insert(0);
        let is_new = *count == 0;
        *count += 1;

        let child_changed = is_child && self.children.insert(id);
        is_new || child_changed
    }

    /// Decrements the counted connection for `id`; once the count reaches
    /// zero, removes it from both the counted and child sets.
    pub fn remove(&mut self, id: &BrokerId) -> bool {
        let Some(count) = self.counted.get_mut(id) else {
            return false;
        };
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.counted.remove(id);
            self.children.remove(id);
            true
        } else {
            false
        }
    }

    pub fn has(&self, id: &BrokerId) -> bool {
        self.counted.get(id).is_some_and(|&c| c > 0)
    }

    /// Bulk replace: resets the counted representation to count `1` for
    /// each supplied connection id, and the child set to the supplied
    /// subset. Returns whether the *effective* (visible) sets changed.
    pub fn set_all(&mut self, conn: HashSet<BrokerId>, child: HashSet<BrokerId>) -> bool {
        let changed = self.as_set() != conn || self.children != child;
        self.counted = conn.into_iter().map(|id| (id, 1)).collect();
        self.children = child;
        changed
    }

    pub fn as_set(&self) -> HashSet<BrokerId> {
        self.counted.keys().cloned().collect()
    }

    pub fn children(&self) -> HashSet<BrokerId> {
        self.children.clone()
    }

    pub fn for_each(&self, mut f: impl FnMut(&BrokerId)) {
        self.counted.keys().for_each(&mut f);
    }
}

impl PartialEq for Connections {
    /// Equality compares only the *visible* connection set, not internal
    /// reference counts — two states that reached the same connection set
    /// via different add/remove sequences are equal.
    fn eq(&self, other: &Self) -> bool {
        self.as_set() == other.as_set() && self.children == other.children
    }
}
impl Eq for Connections {}
