//! Reserved channel names and topic prefixes that make up the fabric's
//! wire contract (spec.md §6). Field names and channel strings are part
//! of cross-fabric compatibility and must not drift between brokers.

pub const EVENT_PREFIX: &str = "/mcafee/event/dxl/";
pub const REQUEST_PREFIX: &str = "/mcafee/service/dxl/";
pub const CLIENT_PREFIX: &str = "/mcafee/client/";
pub const CLIENT_PREFIX_BRACKET: &str = "/mcafee/client/{";

pub const BROKER_STATE_EVENT: &str = "/mcafee/event/dxl/brokerregistry/brokerstate";
pub const BROKER_STATE_TOPICS_EVENT: &str = "/mcafee/event/dxl/brokerregistry/brokerstatetopics";
pub const TOPIC_ADDED_EVENT: &str = "/mcafee/event/dxl/brokerregistry/topicadded";
pub const TOPIC_REMOVED_EVENT: &str = "/mcafee/event/dxl/brokerregistry/topicremoved";
pub const CLIENTREGISTRY_CONNECT_EVENT: &str = "/mcafee/event/dxl/clientregistry/connect";
pub const CLIENTREGISTRY_DISCONNECT_EVENT: &str = "/mcafee/event/dxl/clientregistry/disconnect";
pub const EVENT_SUBSCRIBER_NOT_FOUND_EVENT: &str = "/mcafee/event/dxl/eventsubscribernotfound";
pub const FABRIC_CHANGE_EVENT: &str = "/mcafee/event/dxl/fabricchange";
pub const SVCREGISTRY_REGISTER_EVENT: &str = "/mcafee/event/dxl/svcregistry/register";
pub const SVCREGISTRY_UNREGISTER_EVENT: &str = "/mcafee/event/dxl/svcregistry/unregister";
pub const TENANT_LIMIT_EXCEEDED_EVENT: &str = "/mcafee/event/dxl/tenant/limit/exceeded";
pub const TENANT_LIMIT_RESET_EVENT: &str = "/mcafee/event/dxl/tenant/limit/reset";

pub const BROKER_HEALTH_REQUEST: &str = "/mcafee/service/dxl/broker/health";
pub const BROKER_SUBS_REQUEST: &str = "/mcafee/service/dxl/broker/subs";
pub const BROKERREGISTRY_QUERY_REQUEST: &str = "/mcafee/service/dxl/brokerregistry/query";
pub const BROKERREGISTRY_TOPICQUERY_REQUEST: &str = "/mcafee/service/dxl/brokerregistry/topicquery";
pub const CLIENTREGISTRY_QUERY_REQUEST: &str = "/mcafee/service/dxl/clientregistry/query";
pub const SVCREGISTRY_QUERY_REQUEST: &str = "/mcafee/service/dxl/svcregistry/query";
pub const SVCREGISTRY_REGISTER_REQUEST: &str = "/mcafee/service/dxl/svcregistry/register";
pub const SVCREGISTRY_UNREGISTER_REQUEST: &str = "/mcafee/service/dxl/svcregistry/unregister";

/// Field-name vocabulary used across the payload types in
/// [`super::messages`], taken verbatim from `DxlMessageConstants.cpp`.
pub mod fields {
    pub const BROKER_GUID: &str = "brokerGuid";
    pub const HOSTNAME: &str = "hostName";
    pub const PORT: &str = "port";
    pub const WEBSOCKET_PORT: &str = "webSocketPort";
    pub const BROKER_VERSION: &str = "version";
    pub const POLICY_HOSTNAME: &str = "policyHostName";
    pub const POLICY_IP_ADDRESS: &str = "policyIpAddress";
    pub const POLICY_PORT: &str = "policyPort";
    pub const TOPIC_ROUTING: &str = "topicRouting";
    pub const TTL_MINS: &str = "ttlMins";
    pub const START_TIME: &str = "startTime";
    pub const CHANGE_COUNT: &str = "changeCount";
    pub const BROKERS: &str = "brokers";
    pub const BRIDGE_CHILDREN: &str = "bridgeChildren";

    pub const STATE: &str = "state";
    pub const INDEX: &str = "index";
    pub const TOPICS: &str = "topics";
    pub const TOPIC: &str = "topic";

    pub const CLIENT_TENANT_GUID: &str = "clientTenantGuid";
    pub const LIMIT_TYPE: &str = "limitType";
    pub const COUNT: &str = "count";
}

/// Whether `topic` is a reserved classifier that the finalize filter must
/// never emit a `SubscriberNotFoundEvent` for (spec.md §4.8).
pub fn is_reserved_for_finalize_filter(topic: &str) -> bool {
    topic.starts_with(CLIENT_PREFIX_BRACKET)
        || topic.starts_with(EVENT_PREFIX)
        || topic == EVENT_SUBSCRIBER_NOT_FOUND_EVENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_classification() {
        assert!(is_reserved_for_finalize_filter("/mcafee/client/{abc}/reply"));
        assert!(is_reserved_for_finalize_filter(
            "/mcafee/event/dxl/brokerregistry/brokerstate"
        ));
        assert!(is_reserved_for_finalize_filter(
            EVENT_SUBSCRIBER_NOT_FOUND_EVENT
        ));
        assert!(!is_reserved_for_finalize_filter("foo/bar"));
    }
}
