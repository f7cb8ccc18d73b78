use std::{hash::Hash, ops::Deref, sync::Arc};

/// Globally unique identifier for a broker in the fabric.
///
/// Cheap to clone (backed by `Arc<str>`) since it is threaded through
/// every registry entry, protocol message, and observer notification.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrokerId(Arc<str>);

impl BrokerId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for BrokerId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for BrokerId {}

impl Hash for BrokerId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl std::fmt::Display for BrokerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for BrokerId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for BrokerId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for BrokerId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_by_value_not_pointer() {
        let a = BrokerId::from("broker-1");
        let b = BrokerId::from("broker-1".to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn deref_to_str() {
        let id = BrokerId::from("broker-7");
        assert!(id.starts_with("broker"));
    }
}
