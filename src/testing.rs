//! Shared test doubles, colocated per the teacher's `testing` module but
//! cfg(test)-gated since nothing here is part of the public API.

use std::cell::RefCell;

use crate::BrokerId;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::messages::{BrokerStateEvent, BrokerStateTopicsEvent, TenantLimitType};

/// Records every call instead of emitting anything, so tests can assert
/// on what the registry/tenant-metrics engine decided to publish.
#[derive(Default)]
pub(crate) struct RecordingDispatcher {
    pub state_events: RefCell<Vec<BrokerStateEvent>>,
    pub topics_events: RefCell<Vec<BrokerStateTopicsEvent>>,
    pub topics_added: RefCell<Vec<(BrokerId, String)>>,
    pub topics_removed: RefCell<Vec<(BrokerId, String)>>,
    pub fabric_changes: RefCell<u32>,
    pub limit_exceeded: RefCell<Vec<(String, TenantLimitType)>>,
    pub subscriber_not_found: RefCell<Vec<String>>,
}

impl Dispatcher for RecordingDispatcher {
    fn publish_state_event(&self, event: &BrokerStateEvent) {
        self.state_events.borrow_mut().push(event.clone());
    }

    fn publish_topics_event(&self, event: &BrokerStateTopicsEvent) {
        self.topics_events.borrow_mut().push(event.clone());
    }

    fn publish_topic_added(&self, broker_id: &BrokerId, topic: &str, _start_time: u64, _change_count: u64) {
        self.topics_added.borrow_mut().push((broker_id.clone(), topic.to_string()));
    }

    fn publish_topic_removed(&self, broker_id: &BrokerId, topic: &str, _start_time: u64, _change_count: u64) {
        self.topics_removed.borrow_mut().push((broker_id.clone(), topic.to_string()));
    }

    fn publish_fabric_change(&self) {
        *self.fabric_changes.borrow_mut() += 1;
    }

    fn publish_tenant_limit_exceeded(&self, tenant_id: &str, limit_type: TenantLimitType) {
        self.limit_exceeded.borrow_mut().push((tenant_id.to_string(), limit_type));
    }

    fn publish_subscriber_not_found(&self, topic: &str) {
        self.subscriber_not_found.borrow_mut().push(topic.to_string());
    }
}
