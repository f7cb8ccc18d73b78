//! Wire contract: reserved channel names, the payload types exchanged on
//! them, a format-agnostic codec, and the `Dispatcher` seam used to emit
//! them onto an actual transport.

pub mod channels;
pub mod codec;
pub mod dispatcher;
pub mod messages;

pub use dispatcher::Dispatcher;
pub use messages::{
    BrokerRegistryQueryResponse, BrokerStateEvent, BrokerStateTopicsEvent, BrokerSubsResponse,
    FabricChangeEvent, SubscriberNotFoundEvent, TenantLimitExceededEvent, TenantLimitType, TopicEvent,
    TopicEventKind, topics_state,
};
