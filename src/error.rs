use crate::BrokerId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Broker descriptor for '{0}' is not registered")]
    UnknownBroker(BrokerId),

    #[error("No local broker has been set on this registry yet")]
    LocalBrokerNotSet,

    #[error("Broker id '{0}' is already registered as the local broker")]
    LocalBrokerAlreadySet(BrokerId),

    #[error("Broker '{0}' is the local broker and cannot be removed")]
    CannotRemoveLocalBroker(BrokerId),

    #[error("Malformed payload: missing or invalid field '{0}'")]
    MalformedPayload(&'static str),
}
