//! Decides whether a just-finalized message should raise a
//! `SubscriberNotFoundEvent` (§4.8), grounded on the original
//! `NoEventDestinationHandler`.

use crate::BrokerId;
use crate::protocol::channels::is_reserved_for_finalize_filter;

/// The facts about a finalized message the filter needs. Everything here
/// is read from the message envelope and routing result by the host;
/// this crate only decides, it does not inspect the message itself.
pub struct FinalizedMessage<'a> {
    pub destination_count: u32,
    pub is_dxl_message: bool,
    pub message_insert_enabled: bool,
    pub is_event_message: bool,
    pub source_broker_id: &'a BrokerId,
    pub topic: &'a str,
}

/// Returns `true` if `message` should raise a `SubscriberNotFoundEvent`
/// on `CHANNEL_DXL_EVENT_SUBSCRIBER_NOT_FOUND_EVENT`:
///
/// - it reached zero destinations,
/// - it is a DXL message with message-insert tracking enabled,
/// - it is an event (not a request/response),
/// - it did not originate at `local_broker_id` (loop guard — a broker
///   never reports "no subscriber" for its own locally published event;
///   that's the *other* brokers' job once it's bridged to them),
/// - its topic isn't a client reply channel, a broker event channel, or
///   the subscriber-not-found channel itself (prevents feedback loops).
pub fn should_raise_subscriber_not_found(message: &FinalizedMessage, local_broker_id: &BrokerId) -> bool {
    if message.destination_count != 0 || !message.is_dxl_message || !message.message_insert_enabled {
        return false;
    }

    message.source_broker_id != local_broker_id
        && message.is_event_message
        && !is_reserved_for_finalize_filter(message.topic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base<'a>(source: &'a BrokerId, topic: &'a str) -> FinalizedMessage<'a> {
        FinalizedMessage {
            destination_count: 0,
            is_dxl_message: true,
            message_insert_enabled: true,
            is_event_message: true,
            source_broker_id: source,
            topic,
        }
    }

    #[test]
    fn fires_for_foreign_broker_event_with_no_destination() {
        let local = BrokerId::from("local");
        let peer = BrokerId::from("peer");
        let msg = base(&peer, "com/example/topic");
        assert!(should_raise_subscriber_not_found(&msg, &local));
    }

    #[test]
    fn does_not_fire_for_own_originated_event() {
        let local = BrokerId::from("local");
        let msg = base(&local, "com/example/topic");
        assert!(!should_raise_subscriber_not_found(&msg, &local));
    }

    #[test]
    fn does_not_fire_when_destinations_exist() {
        let local = BrokerId::from("local");
        let peer = BrokerId::from("peer");
        let mut msg = base(&peer, "com/example/topic");
        msg.destination_count = 1;
        assert!(!should_raise_subscriber_not_found(&msg, &local));
    }

    #[test]
    fn does_not_fire_for_request_response_messages() {
        let local = BrokerId::from("local");
        let peer = BrokerId::from("peer");
        let mut msg = base(&peer, "com/example/topic");
        msg.is_event_message = false;
        assert!(!should_raise_subscriber_not_found(&msg, &local));
    }

    #[test]
    fn does_not_fire_for_client_reply_channels() {
        let local = BrokerId::from("local");
        let peer = BrokerId::from("peer");
        let msg = base(&peer, "/mcafee/client/{abc-123}/reply");
        assert!(!should_raise_subscriber_not_found(&msg, &local));
    }

    #[test]
    fn does_not_fire_for_broker_event_channels_or_itself() {
        let local = BrokerId::from("local");
        let peer = BrokerId::from("peer");
        let msg = base(&peer, "/mcafee/event/dxl/brokerregistry/brokerstate");
        assert!(!should_raise_subscriber_not_found(&msg, &local));

        let msg2 = base(&peer, "/mcafee/event/dxl/eventsubscribernotfound");
        assert!(!should_raise_subscriber_not_found(&msg2, &local));
    }
}
