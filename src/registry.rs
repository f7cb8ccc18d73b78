use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, warn};

use crate::{
    BrokerDescriptor, BrokerId, BrokerState, Config, Error, Result,
    observer::{ChangeKind, Observer},
    protocol::Dispatcher,
    protocol::messages::{BrokerStateEvent, BrokerStateTopicsEvent, TopicEvent, TopicEventKind, topics_state},
};

/// The fabric-wide table of known broker states, keyed by [`BrokerId`].
///
/// Owns exactly one "local" broker state (this process's own) plus zero or
/// more peer states learned from the state-sync protocol. Every mutation
/// goes through `&mut self` methods here — `BrokerState`'s own mutators are
/// `pub(crate)`, so this is the only place in the crate that can reach them
/// (Design Notes §9, "friend-class registry access").
pub struct BrokerRegistry {
    config: Config,
    local_id: Option<BrokerId>,
    states: HashMap<BrokerId, BrokerState>,
    observers: Vec<Box<dyn Observer>>,
    last_local_state_emit: Option<Instant>,
}

impl BrokerRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            local_id: None,
            states: HashMap::new(),
            observers: Vec::new(),
            last_local_state_emit: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    fn notify(&self, kind: ChangeKind, broker_id: &BrokerId) {
        for observer in &self.observers {
            observer.on_change(kind, broker_id);
        }
    }

    /// Establishes this process's own broker identity. May be called
    /// exactly once; a second call is an error (`LocalBrokerAlreadySet`).
    pub fn set_local_broker(&mut self, descriptor: BrokerDescriptor) -> Result<()> {
        if self.local_id.is_some() {
            return Err(Error::LocalBrokerAlreadySet(descriptor.id));
        }
        let id = descriptor.id.clone();
        self.states.insert(id.clone(), BrokerState::new(descriptor));
        self.local_id = Some(id.clone());
        self.notify(ChangeKind::Added, &id);
        Ok(())
    }

    pub fn local_id(&self) -> Option<&BrokerId> {
        self.local_id.as_ref()
    }

    pub fn local_state(&self) -> Option<&BrokerState> {
        self.local_id.as_ref().and_then(|id| self.states.get(id))
    }

    /// Returns the existing state for `id`, or creates one from
    /// `descriptor` if absent.
    fn get_or_create(&mut self, id: &BrokerId, descriptor: impl FnOnce() -> BrokerDescriptor) -> &mut BrokerState {
        self.states.entry(id.clone()).or_insert_with(|| BrokerState::new(descriptor()))
    }

    pub fn get(&self, id: &BrokerId) -> Option<&BrokerState> {
        self.states.get(id)
    }

    /// Returns the existing state for `id`, creating an empty one with a
    /// default descriptor (`Config::default_ttl_minutes`, zero start-time)
    /// if absent (§4.4 `getOrCreate`). A newly-created state is announced
    /// to observers as `Added`, the same as any other first sighting of a
    /// broker id.
    pub fn get_or_create(&mut self, id: BrokerId) -> &BrokerState {
        if !self.states.contains_key(&id) {
            let ttl = self.config.default_ttl_minutes;
            self.states
                .insert(id.clone(), BrokerState::new(BrokerDescriptor::new(id.clone(), 0, ttl)));
            self.notify(ChangeKind::Added, &id);
        }
        self.states.get(&id).expect("just inserted or already present")
    }

    pub fn contains(&self, id: &BrokerId) -> bool {
        self.states.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn for_each(&self, mut f: impl FnMut(&BrokerId, &BrokerState)) {
        for (id, state) in &self.states {
            f(id, state);
        }
    }

    /// Read-only dump of every known broker state, consumed by the
    /// `brokerregistry/query` request handler.
    pub fn snapshot_all(&self) -> Vec<(BrokerId, BrokerState)> {
        self.states.iter().map(|(id, state)| (id.clone(), state.clone())).collect()
    }

    pub fn subscription_count(&self, id: &BrokerId) -> Option<usize> {
        self.states.get(id).map(BrokerState::topic_count)
    }

    pub fn has_topic(&self, id: &BrokerId, topic: &str) -> bool {
        self.states.get(id).is_some_and(|s| s.has_topic(topic))
    }

    /// Removes a peer broker entirely (e.g. on an explicit disconnect
    /// notification). Refuses to remove the local broker.
    pub fn remove(&mut self, id: &BrokerId) -> Result<()> {
        if self.local_id.as_ref() == Some(id) {
            return Err(Error::CannotRemoveLocalBroker(id.clone()));
        }
        if self.states.remove(id).is_some() {
            self.notify(ChangeKind::Removed, id);
        }
        Ok(())
    }

    /// Applies an incoming `BrokerStateEvent` (§4.5): stale or out-of-order
    /// events are dropped silently per the restart/change-count guard. A
    /// message whose source id is our own is dropped before application
    /// (reception rule 4 — a broker never reconciles its own echo).
    pub fn on_state_event(&mut self, event: BrokerStateEvent) {
        let id = event.descriptor.id.clone();
        if self.local_id.as_ref() == Some(&id) {
            return;
        }

        let is_new = !self.states.contains_key(&id);
        let mut restarted = is_new;
        if let Some(existing) = self.states.get(&id) {
            restarted = event.descriptor.start_time != existing.descriptor().start_time;
            let stale = !restarted && event.change_count <= existing.change_count();
            if stale {
                debug!(broker = %id, "dropping stale broker state event");
                return;
            }
        }

        let state = self.get_or_create(&id, || event.descriptor.clone());
        state.set_descriptor(event.descriptor);
        state.set_connections(event.connections.into_iter().collect(), event.bridge_children.into_iter().collect());
        state.set_change_count(event.change_count);
        state.update_registration_time();
        if is_new || restarted {
            // Unknown peer or detected restart: discard any previously
            // known subscriptions and await a fresh bulk topics transfer
            // (§4.5 reception rule 1).
            state.clear_active_topics();
        }

        self.notify(ChangeKind::Updated, &id);
    }

    /// Applies an incoming `BrokerStateTopicsEvent` bulk-transfer fragment
    /// (§4.5/§4.6). Unknown broker ids are refused silently after a WARN
    /// (Design Notes: "refuses to apply ... to unknown broker-id").
    pub fn on_topics_event(&mut self, event: BrokerStateTopicsEvent) {
        if self.local_id.as_ref() == Some(&event.broker_id) {
            return;
        }
        let Some(state) = self.states.get_mut(&event.broker_id) else {
            warn!(broker = %event.broker_id, "refusing topics event for unknown broker");
            return;
        };

        if event.is_start() {
            state.clear_pending_topics();
        }

        let wildcard_count = event
            .topics
            .iter()
            .filter(|t| t.contains('+') || t.contains('#'))
            .count() as u32;
        state.add_pending_topics(event.topics.into_iter().collect(), wildcard_count);

        if event.is_end() {
            state.swap_pending_topics();
            // The peer's reported change-count is authoritative for state
            // learned over the wire; adopt it rather than trust the local
            // increment `swap_pending_topics` just applied.
            state.set_change_count(event.change_count);
            self.notify(ChangeKind::TopicsChanged, &event.broker_id);
        }
    }

    /// Applies a single topic-added delta (§4.6 `TopicAdded`). Unknown
    /// broker ids are refused silently after a WARN.
    pub fn on_topic_added(&mut self, broker_id: &BrokerId, topic: &str) {
        let Some(state) = self.states.get_mut(broker_id) else {
            warn!(broker = %broker_id, "refusing topic-added delta for unknown broker");
            return;
        };
        if state.add_topic(topic) {
            self.notify(ChangeKind::TopicsChanged, broker_id);
        }
    }

    /// Applies a single topic-removed delta (§4.6 `TopicRemoved`).
    pub fn on_topic_removed(&mut self, broker_id: &BrokerId, topic: &str) {
        let Some(state) = self.states.get_mut(broker_id) else {
            warn!(broker = %broker_id, "refusing topic-removed delta for unknown broker");
            return;
        };
        if state.remove_topic(topic) {
            self.notify(ChangeKind::TopicsChanged, broker_id);
        }
    }

    /// Applies an incoming `TopicAdded`/`TopicRemoved` delta (§4.5
    /// reception rule 3), the protocol-level entry point that wraps
    /// [`Self::on_topic_added`]/[`Self::on_topic_removed`] with the
    /// header checks the wire format carries alongside the bare
    /// broker-id/topic pair: a message from ourselves is dropped (rule
    /// 4); a message whose `start_time` doesn't match the peer's
    /// currently-known one, or whose `change_count` does not exceed the
    /// peer's current one, is stale and dropped. Otherwise the delta is
    /// applied and the peer's change-count is set to the message's
    /// (authoritative over whatever increment applying the delta locally
    /// would have produced).
    pub fn on_topic_event(&mut self, event: TopicEvent) {
        if self.local_id.as_ref() == Some(&event.broker_id) {
            return;
        }

        let Some(state) = self.states.get(&event.broker_id) else {
            debug!(broker = %event.broker_id, "dropping topic delta for unknown broker");
            return;
        };
        if state.descriptor().start_time != event.start_time || event.change_count <= state.change_count() {
            debug!(broker = %event.broker_id, "dropping stale topic delta");
            return;
        }

        let applied = match event.kind {
            TopicEventKind::Added => self.states.get_mut(&event.broker_id).unwrap().add_topic(event.topic.clone()),
            TopicEventKind::Removed => self.states.get_mut(&event.broker_id).unwrap().remove_topic(&event.topic),
        };

        let state = self.states.get_mut(&event.broker_id).unwrap();
        state.set_change_count(event.change_count);
        if applied {
            self.notify(ChangeKind::TopicsChanged, &event.broker_id);
        }
    }

    /// Records (or refreshes) a bridge connection between `from` and `to`.
    pub fn add_connection(&mut self, from: &BrokerId, to: BrokerId, is_child: bool) -> Result<()> {
        let state = self.states.get_mut(from).ok_or_else(|| Error::UnknownBroker(from.clone()))?;
        if state.add_connection(to, is_child) {
            self.notify(ChangeKind::Updated, from);
        }
        Ok(())
    }

    pub fn remove_connection(&mut self, from: &BrokerId, to: &BrokerId) -> Result<()> {
        let state = self.states.get_mut(from).ok_or_else(|| Error::UnknownBroker(from.clone()))?;
        if state.remove_connection(to) {
            self.notify(ChangeKind::Updated, from);
        }
        Ok(())
    }

    fn local_state_event(&self) -> Option<BrokerStateEvent> {
        let id = self.local_id.as_ref()?;
        let state = self.states.get(id)?;
        Some(BrokerStateEvent {
            descriptor: state.descriptor().clone(),
            connections: state.get_connections().into_iter().collect(),
            bridge_children: state.get_child_connections().into_iter().collect(),
            change_count: state.change_count(),
        })
    }

    /// Emits a `BrokerStateEvent` for the local broker unless one was
    /// already emitted within `Config::state_event_coalesce_window`
    /// (§4.5 "Local emission rules": "at most once per coalescing
    /// window").
    fn maybe_emit_local_state(&mut self, dispatcher: &impl Dispatcher) {
        let Some(event) = self.local_state_event() else { return };
        let now = Instant::now();
        let due = match self.last_local_state_emit {
            None => true,
            Some(last) => now.duration_since(last) >= self.config.state_event_coalesce_window,
        };
        if due {
            dispatcher.publish_state_event(&event);
            self.last_local_state_emit = Some(now);
        }
    }

    /// Streams the local broker's active topic set to peers as a batched
    /// `BrokerStateTopicsEvent` sequence, bracketed by START/END flags
    /// (§4.5 "On a new peer bridging in ..."; batching per §4.3
    /// `batch_topics`).
    fn stream_local_topics(&self, dispatcher: &impl Dispatcher) {
        let Some(id) = self.local_id.as_ref() else { return };
        let Some(state) = self.states.get(id) else { return };
        let start_time = state.descriptor().start_time;
        let change_count = state.change_count();
        state.batch_topics(self.config.topic_batch_char_budget, |batch, index, is_first, is_last| {
            let mut bitmask = topics_state::NONE;
            if is_first {
                bitmask |= topics_state::START;
            }
            if is_last {
                bitmask |= topics_state::END;
            }
            let event = BrokerStateTopicsEvent {
                broker_id: id.clone(),
                start_time,
                change_count,
                state: bitmask,
                index: index as u32,
                topics: batch.iter().map(|t| t.to_string()).collect(),
            };
            dispatcher.publish_topics_event(&event);
        });
    }

    /// Records a new bridge connection from the local broker to `peer_id`.
    /// On a genuinely new bridge, broadcasts a `FabricChangeEvent`, streams
    /// the local topic set to the fabric so the new peer can bulk-sync,
    /// and (re-)emits the local `BrokerStateEvent` (§4.5).
    pub fn add_local_connection(&mut self, peer_id: BrokerId, is_child: bool, dispatcher: &impl Dispatcher) -> Result<()> {
        let local_id = self.local_id.clone().ok_or(Error::LocalBrokerNotSet)?;
        let state = self.states.get_mut(&local_id).expect("local state present once set");
        let changed = state.add_connection(peer_id, is_child);
        if changed {
            self.notify(ChangeKind::Updated, &local_id);
            dispatcher.publish_fabric_change();
            self.stream_local_topics(dispatcher);
            self.maybe_emit_local_state(dispatcher);
        }
        Ok(())
    }

    /// Tears down a bridge connection from the local broker to `peer_id`.
    /// On an effective change, broadcasts a `FabricChangeEvent` and
    /// (re-)emits the local `BrokerStateEvent`.
    pub fn remove_local_connection(&mut self, peer_id: &BrokerId, dispatcher: &impl Dispatcher) -> Result<()> {
        let local_id = self.local_id.clone().ok_or(Error::LocalBrokerNotSet)?;
        let state = self.states.get_mut(&local_id).expect("local state present once set");
        let changed = state.remove_connection(peer_id);
        if changed {
            self.notify(ChangeKind::Updated, &local_id);
            dispatcher.publish_fabric_change();
            self.maybe_emit_local_state(dispatcher);
        }
        Ok(())
    }

    /// Adds a topic to the local broker's active subscription set and, on
    /// success, emits a `TopicAdded` delta carrying the current
    /// `startTime`/`changeCount` header (§4.5 "When the local subscription
    /// set changes by a single topic ...").
    pub fn add_local_topic(&mut self, topic: impl Into<String>, dispatcher: &impl Dispatcher) -> Result<bool> {
        let local_id = self.local_id.clone().ok_or(Error::LocalBrokerNotSet)?;
        let state = self.states.get_mut(&local_id).expect("local state present once set");
        let topic = topic.into();
        let added = state.add_topic(topic.clone());
        if added {
            let start_time = state.descriptor().start_time;
            let change_count = state.change_count();
            self.notify(ChangeKind::TopicsChanged, &local_id);
            dispatcher.publish_topic_added(&local_id, &topic, start_time, change_count);
        }
        Ok(added)
    }

    /// Removes a topic from the local broker's active subscription set
    /// and, on success, emits a `TopicRemoved` delta.
    pub fn remove_local_topic(&mut self, topic: &str, dispatcher: &impl Dispatcher) -> Result<bool> {
        let local_id = self.local_id.clone().ok_or(Error::LocalBrokerNotSet)?;
        let state = self.states.get_mut(&local_id).expect("local state present once set");
        let removed = state.remove_topic(topic);
        if removed {
            let start_time = state.descriptor().start_time;
            let change_count = state.change_count();
            self.notify(ChangeKind::TopicsChanged, &local_id);
            dispatcher.publish_topic_removed(&local_id, topic, start_time, change_count);
        }
        Ok(removed)
    }

    /// Test-only seam: backdates a known broker's `registration_time` so
    /// TTL-expiry tests can drive `sweep_expired` deterministically
    /// instead of racing the wall clock with a zero TTL.
    #[cfg(any(test, feature = "test-harness"))]
    pub fn set_registration_time_for_test(&mut self, id: &BrokerId, registration_time: u64) {
        if let Some(state) = self.states.get_mut(id) {
            state.set_registration_time_for_test(registration_time);
        }
    }

    /// Sweeps every peer whose TTL has lapsed. Never removes the local
    /// broker's own state (Design Notes §5: the sweep is purely for peers
    /// learned via the state-sync protocol).
    pub fn sweep_expired(&mut self) -> Vec<BrokerId> {
        let local = self.local_id.clone();
        let expired: Vec<BrokerId> = self
            .states
            .iter()
            .filter(|(id, state)| Some(*id) != local.as_ref() && state.is_expired())
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.states.remove(id);
            self.notify(ChangeKind::Removed, id);
        }
        expired
    }
}
