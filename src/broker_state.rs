use std::{
    collections::HashSet,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{BrokerDescriptor, BrokerId, connections::Connections, subscriptions::SubscriptionSet};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs()
}

/// Full state the registry keeps for one broker: its descriptor,
/// connections, active and pending subscriptions, and liveness bookkeeping.
///
/// Only [`crate::BrokerRegistry`] may construct or mutate a `BrokerState`
/// — every mutating method here is `pub(crate)`, the sealed "friend class"
/// capability described in the design notes. External callers only ever
/// see `&BrokerState` through the registry's read accessors, which exposes
/// just the `pub` read methods below.
#[derive(Debug, Clone)]
pub struct BrokerState {
    descriptor: BrokerDescriptor,
    connections: Connections,
    subscriptions: SubscriptionSet,
    pending_subscriptions: SubscriptionSet,
    change_count: u64,
    registration_time: u64,
}

impl BrokerState {
    pub(crate) fn new(descriptor: BrokerDescriptor) -> Self {
        Self {
            descriptor,
            connections: Connections::new(),
            subscriptions: SubscriptionSet::new(),
            pending_subscriptions: SubscriptionSet::new(),
            change_count: 0,
            registration_time: now_secs(),
        }
    }

    // ----- descriptor -----

    pub fn descriptor(&self) -> &BrokerDescriptor {
        &self.descriptor
    }

    pub fn id(&self) -> &BrokerId {
        &self.descriptor.id
    }

    /// Installs a new descriptor wholesale. Only the registry calls this,
    /// on receipt of a `BrokerStateEvent` for a peer, or at local startup
    /// from configuration.
    pub(crate) fn set_descriptor(&mut self, descriptor: BrokerDescriptor) {
        self.descriptor = descriptor;
    }

    // ----- connections -----

    pub(crate) fn add_connection(&mut self, id: BrokerId, is_child: bool) -> bool {
        self.connections.add(id, is_child)
    }

    pub(crate) fn remove_connection(&mut self, id: &BrokerId) -> bool {
        self.connections.remove(id)
    }

    pub(crate) fn set_connections(&mut self, conn: HashSet<BrokerId>, child: HashSet<BrokerId>) -> bool {
        self.connections.set_all(conn, child)
    }

    pub fn has_connection(&self, id: &BrokerId) -> bool {
        self.connections.has(id)
    }

    pub fn get_connections(&self) -> HashSet<BrokerId> {
        self.connections.as_set()
    }

    pub fn get_child_connections(&self) -> HashSet<BrokerId> {
        self.connections.children()
    }

    pub fn for_each_connection(&self, f: impl FnMut(&BrokerId)) {
        self.connections.for_each(f);
    }

    // ----- active topics -----

    /// Adds a topic to the active subscription set. Increments the
    /// change-count on success (§4.2: pending-set mutations do not).
    pub(crate) fn add_topic(&mut self, topic: impl Into<String>) -> bool {
        let added = self.subscriptions.add(topic);
        if added {
            self.change_count += 1;
        }
        added
    }

    pub(crate) fn remove_topic(&mut self, topic: &str) -> bool {
        let removed = self.subscriptions.remove(topic);
        if removed {
            self.change_count += 1;
        }
        removed
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.subscriptions.contains(topic)
    }

    pub fn has_topics(&self, topics: &HashSet<String>) -> bool {
        self.subscriptions.has_all(topics)
    }

    pub fn topic_count(&self) -> usize {
        self.subscriptions.size()
    }

    pub fn topic_wildcard_count(&self) -> u32 {
        self.subscriptions.wildcard_count()
    }

    pub fn for_each_topic(&self, f: impl FnMut(&str)) {
        self.subscriptions.for_each(f);
    }

    pub fn batch_topics(&self, char_budget: usize, callback: impl FnMut(&[&str], usize, bool, bool)) {
        self.subscriptions.batch_topics(char_budget, callback);
    }

    /// Clears the active subscription set without touching the pending
    /// one. Used when a peer is newly seen or detected as restarted
    /// (§4.5 reception rule 1): the registry awaits a fresh bulk topic
    /// transfer rather than keeping stale subscriptions around.
    pub(crate) fn clear_active_topics(&mut self) {
        self.subscriptions.clear();
    }

    // ----- pending topics (bulk transfer staging area) -----

    pub(crate) fn clear_pending_topics(&mut self) {
        self.pending_subscriptions.clear();
    }

    pub(crate) fn add_pending_topics(&mut self, topics: HashSet<String>, wildcard_count: u32) {
        // Accumulates across calls within one bulk transfer, so merge
        // rather than replace. The wildcard count is recomputed over the
        // merged set rather than trusting the caller-supplied count for
        // any batch after the first, since duplicate topics across
        // batches would otherwise double-count.
        let _ = wildcard_count;
        let mut merged: HashSet<String> = self.pending_subscriptions.iter().map(String::from).collect();
        merged.extend(topics);
        let merged_wildcards = merged
            .iter()
            .filter(|t| t.contains('+') || t.contains('#'))
            .count() as u32;
        self.pending_subscriptions.replace(merged, merged_wildcards);
    }

    /// Atomically swaps pending topics into the active set, discarding the
    /// old active set, then resets pending. Increments change-count once,
    /// and only if the resulting active set is non-empty or the active set
    /// actually changed (P3: "non-empty swap").
    pub(crate) fn swap_pending_topics(&mut self) {
        let pending_topics: HashSet<String> = self.pending_subscriptions.iter().map(String::from).collect();
        let wildcard_count = self.pending_subscriptions.wildcard_count();
        let changed = !pending_topics.is_empty() || self.subscriptions.size() > 0;

        self.subscriptions.replace(pending_topics, wildcard_count);
        self.pending_subscriptions.clear();

        if changed {
            self.change_count += 1;
        }
    }

    // ----- change tracking & liveness -----

    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    pub(crate) fn set_change_count(&mut self, value: u64) {
        self.change_count = value;
    }

    pub fn registration_time(&self) -> u64 {
        self.registration_time
    }

    pub(crate) fn update_registration_time(&mut self) {
        self.registration_time = now_secs();
    }

    /// Test-only seam: backdates `registration_time` directly rather than
    /// stamping it from the wall clock, so TTL-expiry tests don't need to
    /// sleep past a real TTL window. Gated behind `test-harness` since
    /// `registration_time` is otherwise only ever advanced by
    /// `update_registration_time` (§4.3).
    #[cfg(any(test, feature = "test-harness"))]
    pub fn set_registration_time_for_test(&mut self, registration_time: u64) {
        self.registration_time = registration_time;
    }

    pub fn is_expired(&self) -> bool {
        let ttl_secs = u64::from(self.descriptor.ttl_minutes) * 60;
        now_secs().saturating_sub(self.registration_time) > ttl_secs
    }
}

impl PartialEq for BrokerState {
    /// Descriptors and connections must match; subscriptions are
    /// intentionally excluded since they carry their own change-count
    /// (§4.3 "State equality").
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor && self.connections == other.connections
    }
}
impl Eq for BrokerState {}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(id: &str) -> BrokerState {
        BrokerState::new(BrokerDescriptor::new(BrokerId::from(id), 1000, 15))
    }

    #[test]
    fn connection_invariant_holds_after_random_ops() {
        let mut s = state("b1");
        s.add_connection(BrokerId::from("b2"), true);
        s.add_connection(BrokerId::from("b2"), false);
        assert!(s.has_connection(&BrokerId::from("b2")));
        assert!(s.get_child_connections().is_subset(&s.get_connections()));

        s.remove_connection(&BrokerId::from("b2"));
        assert!(s.has_connection(&BrokerId::from("b2")));
        s.remove_connection(&BrokerId::from("b2"));
        assert!(!s.has_connection(&BrokerId::from("b2")));
    }

    #[test]
    fn topic_add_remove_bumps_change_count_only_on_success() {
        let mut s = state("b1");
        assert_eq!(s.change_count(), 0);
        assert!(s.add_topic("a/b"));
        assert_eq!(s.change_count(), 1);
        assert!(!s.add_topic("a/b"));
        assert_eq!(s.change_count(), 1);
        assert!(s.remove_topic("a/b"));
        assert_eq!(s.change_count(), 2);
    }

    #[test]
    fn pending_mutations_do_not_bump_change_count() {
        let mut s = state("b1");
        s.add_pending_topics(HashSet::from(["a/b".to_string(), "c/+".to_string()]), 1);
        assert_eq!(s.change_count(), 0);
        assert!(!s.has_topic("a/b"));
    }

    #[test]
    fn swap_pending_topics_replaces_active_atomically() {
        let mut s = state("b1");
        s.add_topic("old/topic");
        let before = s.change_count();

        s.add_pending_topics(HashSet::from(["a/b".to_string(), "c/+".to_string()]), 1);
        s.swap_pending_topics();

        assert!(!s.has_topic("old/topic"));
        assert!(s.has_topic("a/b"));
        assert!(s.has_topic("c/+"));
        assert_eq!(s.topic_wildcard_count(), 1);
        assert_eq!(s.change_count(), before + 1);
    }

    #[test]
    fn swap_pending_topics_empty_to_empty_is_not_a_change() {
        let mut s = state("b1");
        let before = s.change_count();
        s.swap_pending_topics();
        assert_eq!(s.change_count(), before);
    }

    #[test]
    fn state_equality_ignores_subscriptions() {
        let mut a = state("b1");
        let mut b = state("b1");
        a.add_topic("x");
        assert_eq!(a, b);
        b.descriptor.hostname = "other".into();
        assert_ne!(a, b);
    }

    #[test]
    fn expiry_respects_ttl() {
        let mut s = state("b1");
        s.set_descriptor(BrokerDescriptor::new(BrokerId::from("b1"), 1000, 0));
        // ttl of 0 minutes means any elapsed time beyond "now" expires it;
        // immediately after registration it should not yet be expired.
        assert!(!s.is_expired());
    }
}
