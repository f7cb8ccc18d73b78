//! Concrete payload types exchanged over the reserved channels in
//! [`super::channels`], grounded on the field vocabulary recovered from
//! the original `*EventPayload.h` headers.

use std::collections::HashMap;

use crate::{BrokerDescriptor, BrokerId};

use super::channels::fields;
use super::codec::{Node, Reader, Writer, required_str, required_u64};

/// State of the sender's node as reflected in `brokerGuid`, connections,
/// and restart-detection fields. Mirrors `BrokerStateEventPayload`.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerStateEvent {
    pub descriptor: BrokerDescriptor,
    pub connections: Vec<BrokerId>,
    pub bridge_children: Vec<BrokerId>,
    pub change_count: u64,
}

/// `state` bitmask for [`BrokerStateTopicsEvent`]: a bulk topic transfer
/// may span several messages, bracketed by START and END.
pub mod topics_state {
    pub const NONE: u8 = 0;
    pub const START: u8 = 1 << 0;
    pub const END: u8 = 1 << 1;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerStateTopicsEvent {
    pub broker_id: BrokerId,
    pub start_time: u64,
    pub change_count: u64,
    pub state: u8,
    pub index: u32,
    pub topics: Vec<String>,
}

impl BrokerStateTopicsEvent {
    pub fn is_start(&self) -> bool {
        self.state & topics_state::START != 0
    }

    pub fn is_end(&self) -> bool {
        self.state & topics_state::END != 0
    }
}

/// Shared header fields for the per-topic added/removed events
/// (`AbstractBrokerTopicEventPayload` in the original source).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicEventKind {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicEvent {
    pub kind: TopicEventKind,
    pub broker_id: BrokerId,
    pub topic: String,
    pub start_time: u64,
    pub change_count: u64,
}

/// Fabric-wide topology change notification. Carries no payload fields
/// in the original source beyond the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FabricChangeEvent;

/// Wire values for `limitType`, taken verbatim (lower-cased) from the
/// original `TENANT_LIMIT_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantLimitType {
    Byte,
    Connections,
    Services,
    Subscriptions,
}

impl TenantLimitType {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            TenantLimitType::Byte => "byte",
            TenantLimitType::Connections => "connections",
            TenantLimitType::Services => "services",
            TenantLimitType::Subscriptions => "subscriptions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantLimitExceededEvent {
    pub tenant_id: String,
    pub limit_type: TenantLimitType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberNotFoundEvent {
    pub topic: String,
}

/// Read-only dump of the registry, one entry per known broker, consumed
/// by the `brokerregistry/query` request handler.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrokerRegistryQueryResponse {
    pub brokers: HashMap<BrokerId, BrokerStateEvent>,
}

/// Response to a `broker/subs` subscription-count request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerSubsResponse {
    pub count: u32,
}

impl Writer for BrokerStateEvent {
    fn write(&self) -> Node {
        let mut node = Node::object();
        node.set(fields::BROKER_GUID, self.descriptor.id.as_str())
            .set(fields::HOSTNAME, self.descriptor.hostname.as_str())
            .set(fields::PORT, u32::from(self.descriptor.port))
            .set(fields::WEBSOCKET_PORT, u32::from(self.descriptor.ws_port))
            .set(fields::BROKER_VERSION, self.descriptor.version.as_str())
            .set(fields::POLICY_HOSTNAME, self.descriptor.policy_hostname.as_str())
            .set(fields::POLICY_IP_ADDRESS, self.descriptor.policy_ip_address.as_str())
            .set(fields::POLICY_PORT, u32::from(self.descriptor.policy_port))
            .set(fields::TOPIC_ROUTING, self.descriptor.topic_routing_enabled)
            .set(fields::TTL_MINS, self.descriptor.ttl_minutes)
            .set(fields::START_TIME, self.descriptor.start_time)
            .set(fields::CHANGE_COUNT, self.change_count)
            .set(
                fields::BROKERS,
                self.connections.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            )
            .set(
                fields::BRIDGE_CHILDREN,
                self.bridge_children.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            );
        node
    }
}

impl Reader for BrokerStateEvent {
    fn read(node: &Node) -> crate::Result<Self> {
        let id = BrokerId::from(required_str(node, fields::BROKER_GUID)?);
        let start_time = required_u64(node, fields::START_TIME)?;
        let ttl_minutes = required_u64(node, fields::TTL_MINS)? as u32;
        let mut descriptor = BrokerDescriptor::new(id, start_time, ttl_minutes);
        if let Some(s) = node.get(fields::HOSTNAME).and_then(Node::as_str) {
            descriptor.hostname = s.to_string();
        }
        if let Some(p) = node.get(fields::PORT).and_then(Node::as_u64) {
            descriptor.port = p as u16;
        }
        if let Some(p) = node.get(fields::WEBSOCKET_PORT).and_then(Node::as_u64) {
            descriptor.ws_port = p as u16;
        }
        if let Some(s) = node.get(fields::BROKER_VERSION).and_then(Node::as_str) {
            descriptor.version = s.to_string();
        }
        if let Some(s) = node.get(fields::POLICY_HOSTNAME).and_then(Node::as_str) {
            descriptor.policy_hostname = s.to_string();
        }
        if let Some(s) = node.get(fields::POLICY_IP_ADDRESS).and_then(Node::as_str) {
            descriptor.policy_ip_address = s.to_string();
        }
        if let Some(p) = node.get(fields::POLICY_PORT).and_then(Node::as_u64) {
            descriptor.policy_port = p as u16;
        }
        if let Some(b) = node.get(fields::TOPIC_ROUTING).and_then(Node::as_bool) {
            descriptor.topic_routing_enabled = b;
        }

        let change_count = required_u64(node, fields::CHANGE_COUNT)?;
        let connections = node
            .get(fields::BROKERS)
            .and_then(Node::as_array)
            .map(|items| items.iter().filter_map(Node::as_str).map(BrokerId::from).collect())
            .unwrap_or_default();
        let bridge_children = node
            .get(fields::BRIDGE_CHILDREN)
            .and_then(Node::as_array)
            .map(|items| items.iter().filter_map(Node::as_str).map(BrokerId::from).collect())
            .unwrap_or_default();

        Ok(BrokerStateEvent {
            descriptor,
            connections,
            bridge_children,
            change_count,
        })
    }
}

impl Writer for BrokerStateTopicsEvent {
    fn write(&self) -> Node {
        let mut node = Node::object();
        node.set(fields::BROKER_GUID, self.broker_id.as_str())
            .set(fields::START_TIME, self.start_time)
            .set(fields::CHANGE_COUNT, self.change_count)
            .set(fields::STATE, u32::from(self.state))
            .set(fields::INDEX, u64::from(self.index))
            .set(fields::TOPICS, self.topics.clone());
        node
    }
}

impl Reader for BrokerStateTopicsEvent {
    fn read(node: &Node) -> crate::Result<Self> {
        let broker_id = BrokerId::from(required_str(node, fields::BROKER_GUID)?);
        let start_time = required_u64(node, fields::START_TIME)?;
        let change_count = required_u64(node, fields::CHANGE_COUNT)?;
        let state = required_u64(node, fields::STATE)? as u8;
        let index = node.get(fields::INDEX).and_then(Node::as_u64).unwrap_or(0) as u32;
        let topics = node
            .get(fields::TOPICS)
            .and_then(Node::as_array)
            .map(|items| items.iter().filter_map(|n| n.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        Ok(BrokerStateTopicsEvent {
            broker_id,
            start_time,
            change_count,
            state,
            index,
            topics,
        })
    }
}

impl Writer for TopicEvent {
    fn write(&self) -> Node {
        let mut node = Node::object();
        node.set(fields::BROKER_GUID, self.broker_id.as_str())
            .set(fields::TOPIC, self.topic.as_str())
            .set(fields::START_TIME, self.start_time)
            .set(fields::CHANGE_COUNT, self.change_count);
        node
    }
}

impl TopicEvent {
    pub fn read_as(node: &Node, kind: TopicEventKind) -> crate::Result<Self> {
        Ok(TopicEvent {
            kind,
            broker_id: BrokerId::from(required_str(node, fields::BROKER_GUID)?),
            topic: required_str(node, fields::TOPIC)?.to_string(),
            start_time: required_u64(node, fields::START_TIME)?,
            change_count: required_u64(node, fields::CHANGE_COUNT)?,
        })
    }
}

impl Writer for FabricChangeEvent {
    fn write(&self) -> Node {
        Node::object()
    }
}

impl Writer for TenantLimitExceededEvent {
    fn write(&self) -> Node {
        let mut node = Node::object();
        node.set(fields::CLIENT_TENANT_GUID, self.tenant_id.as_str())
            .set(fields::LIMIT_TYPE, self.limit_type.as_wire_str());
        node
    }
}

impl Writer for SubscriberNotFoundEvent {
    fn write(&self) -> Node {
        let mut node = Node::object();
        node.set(fields::TOPIC, self.topic.as_str());
        node
    }
}

impl Writer for BrokerRegistryQueryResponse {
    fn write(&self) -> Node {
        let mut node = Node::object();
        let mut brokers = std::collections::BTreeMap::new();
        for (id, event) in &self.brokers {
            brokers.insert(id.to_string(), event.write());
        }
        node.set(fields::BROKERS, Node::Object(brokers));
        node
    }
}

impl Writer for BrokerSubsResponse {
    fn write(&self) -> Node {
        let mut node = Node::object();
        node.set(fields::COUNT, u64::from(self.count));
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_descriptor() -> BrokerDescriptor {
        let mut d = BrokerDescriptor::new(BrokerId::from("b1"), 1000, 15);
        d.hostname = "host1".into();
        d.port = 8883;
        d
    }

    #[test]
    fn broker_state_event_roundtrip() {
        let event = BrokerStateEvent {
            descriptor: sample_descriptor(),
            connections: vec![BrokerId::from("b2")],
            bridge_children: vec![],
            change_count: 7,
        };
        let node = event.write();
        let back = BrokerStateEvent::read(&node).unwrap();
        assert_eq!(back.descriptor.id, event.descriptor.id);
        assert_eq!(back.descriptor.hostname, "host1");
        assert_eq!(back.connections, vec![BrokerId::from("b2")]);
        assert_eq!(back.change_count, 7);
    }

    #[test]
    fn broker_state_event_missing_required_field_errors() {
        let mut node = Node::object();
        node.set(fields::START_TIME, 1000u64).set(fields::TTL_MINS, 15u32).set(fields::CHANGE_COUNT, 0u64);
        assert!(BrokerStateEvent::read(&node).is_err());
    }

    #[test]
    fn topics_event_bitmask_roundtrip() {
        let event = BrokerStateTopicsEvent {
            broker_id: BrokerId::from("b1"),
            start_time: 1000,
            change_count: 2,
            state: topics_state::START | topics_state::END,
            index: 0,
            topics: vec!["a/b".into(), "c/+".into()],
        };
        assert!(event.is_start());
        assert!(event.is_end());
        let back = BrokerStateTopicsEvent::read(&event.write()).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn topic_event_roundtrip_added_and_removed() {
        let event = TopicEvent {
            kind: TopicEventKind::Added,
            broker_id: BrokerId::from("b1"),
            topic: "a/b".into(),
            start_time: 1000,
            change_count: 1,
        };
        let back = TopicEvent::read_as(&event.write(), TopicEventKind::Added).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn tenant_limit_exceeded_wire_strings() {
        assert_eq!(TenantLimitType::Byte.as_wire_str(), "byte");
        assert_eq!(TenantLimitType::Connections.as_wire_str(), "connections");
        assert_eq!(TenantLimitType::Services.as_wire_str(), "services");
        assert_eq!(TenantLimitType::Subscriptions.as_wire_str(), "subscriptions");
    }
}
