//! A small format-agnostic tree (`Node`) that the payload types in
//! [`super::messages`] read from and write to, plus `Reader`/`Writer`
//! traits so a payload's field vocabulary is the contract rather than any
//! one wire format. A `serde_json`-backed conversion is provided behind
//! the `serde` feature since `serde_json` is already an optional
//! dependency.

use std::collections::BTreeMap;

/// A value in the generic payload tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Node>),
    Object(BTreeMap<String, Node>),
}

impl Node {
    pub fn object() -> Self {
        Node::Object(BTreeMap::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Node::Number(n) if *n >= 0.0 => Some(*n as u64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Node> {
        self.as_object().and_then(|m| m.get(field))
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Node>) -> &mut Self {
        if let Node::Object(map) = self {
            map.insert(field.into(), value.into());
        }
        self
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}
impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}
impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}
impl From<u64> for Node {
    fn from(value: u64) -> Self {
        Node::Number(value as f64)
    }
}
impl From<u32> for Node {
    fn from(value: u32) -> Self {
        Node::Number(value as f64)
    }
}
impl From<u16> for Node {
    fn from(value: u16) -> Self {
        Node::Number(value as f64)
    }
}
impl<T: Into<Node>> From<Vec<T>> for Node {
    fn from(value: Vec<T>) -> Self {
        Node::Array(value.into_iter().map(Into::into).collect())
    }
}

/// Decodes `Self` out of a generic [`Node`] tree. Implemented by every
/// payload type in [`super::messages`].
pub trait Reader: Sized {
    fn read(node: &Node) -> crate::Result<Self>;
}

/// Encodes `Self` into a generic [`Node`] tree.
pub trait Writer {
    fn write(&self) -> Node;
}

/// Fetches a required string field, mapping absence/type-mismatch to
/// [`crate::Error::MalformedPayload`].
pub(crate) fn required_str<'a>(node: &'a Node, field: &'static str) -> crate::Result<&'a str> {
    node.get(field)
        .and_then(Node::as_str)
        .ok_or(crate::Error::MalformedPayload(field))
}

pub(crate) fn required_u64(node: &Node, field: &'static str) -> crate::Result<u64> {
    node.get(field)
        .and_then(Node::as_u64)
        .ok_or(crate::Error::MalformedPayload(field))
}

#[cfg(feature = "serde")]
mod serde_json_interop {
    use super::Node;
    use std::collections::BTreeMap;

    impl From<serde_json::Value> for Node {
        fn from(value: serde_json::Value) -> Self {
            match value {
                serde_json::Value::Null => Node::Null,
                serde_json::Value::Bool(b) => Node::Bool(b),
                serde_json::Value::Number(n) => Node::Number(n.as_f64().unwrap_or_default()),
                serde_json::Value::String(s) => Node::String(s),
                serde_json::Value::Array(items) => {
                    Node::Array(items.into_iter().map(Node::from).collect())
                }
                serde_json::Value::Object(map) => Node::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, Node::from(v)))
                        .collect::<BTreeMap<_, _>>(),
                ),
            }
        }
    }

    impl From<&Node> for serde_json::Value {
        fn from(node: &Node) -> Self {
            match node {
                Node::Null => serde_json::Value::Null,
                Node::Bool(b) => serde_json::Value::Bool(*b),
                Node::Number(n) => serde_json::json!(n),
                Node::String(s) => serde_json::Value::String(s.clone()),
                Node::Array(items) => {
                    serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
                }
                Node::Object(map) => serde_json::Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                        .collect(),
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_get_set_roundtrip() {
        let mut n = Node::object();
        n.set("brokerGuid", "b1").set("ttlMins", 15u32);
        assert_eq!(n.get("brokerGuid").and_then(Node::as_str), Some("b1"));
        assert_eq!(n.get("ttlMins").and_then(Node::as_u64), Some(15));
        assert!(n.get("missing").is_none());
    }

    #[test]
    fn required_field_helpers_error_on_absence() {
        let n = Node::object();
        assert!(required_str(&n, "brokerGuid").is_err());
        assert!(required_u64(&n, "ttlMins").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_json_interop_roundtrip() {
        let mut n = Node::object();
        n.set("topic", "a/b").set("changeCount", 3u64);
        let json: serde_json::Value = (&n).into();
        let back: Node = json.into();
        assert_eq!(back.get("topic").and_then(Node::as_str), Some("a/b"));
        assert_eq!(back.get("changeCount").and_then(Node::as_u64), Some(3));
    }
}
