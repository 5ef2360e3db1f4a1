//! Event definitions for the composition layer.
//!
//! An event is a `(port, value)` pair. The value is a closed sum over the
//! payload kinds components actually exchange, so injection and extraction stay
//! type-safe at the edges while still allowing foreign objects (raster tiles,
//! feature collections, ...) to travel through the hierarchy untouched.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::PortId;

/// An event delivered to, or produced by, a component port.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The port this event is addressed to (input) or emitted from (output)
    pub port: PortId,
    /// The payload, understood only by the two ends of a coupling
    pub value: Value,
}

impl Event {
    /// Creates a new event with the given port and value.
    pub fn new(port: impl Into<PortId>, value: Value) -> Self {
        Self {
            port: port.into(),
            value,
        }
    }

    /// Creates a numeric event.
    pub fn number(port: impl Into<PortId>, value: f64) -> Self {
        Self::new(port, Value::Number(value))
    }

    /// Creates a text event.
    pub fn text(port: impl Into<PortId>, value: impl Into<String>) -> Self {
        Self::new(port, Value::Text(value.into()))
    }

    /// Creates a structured (JSON) event.
    pub fn json(port: impl Into<PortId>, value: serde_json::Value) -> Self {
        Self::new(port, Value::Json(value))
    }

    /// Returns a copy of this event addressed to another port.
    pub fn renamed(&self, port: impl Into<PortId>) -> Self {
        Self {
            port: port.into(),
            value: self.value.clone(),
        }
    }
}

/// The payload of an event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    /// A plain number.
    Number(f64),
    /// A plain string.
    Text(String),
    /// Structured data (configuration payloads travel this way).
    Json(serde_json::Value),
    /// An external object the core never looks into.
    ///
    /// Opaque values cannot be written to a document.
    #[serde(skip)]
    Opaque(Opaque),
}

impl Value {
    /// Wraps an arbitrary external object.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Opaque(Arc::new(value)))
    }

    /// Returns the number if this is a numeric payload.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Json(v) => v.as_f64(),
            _ => None,
        }
    }

    /// Returns the text if this is a text payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Json(v) => v.as_str(),
            _ => None,
        }
    }

    /// Returns the structured payload, if any.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Downcasts an opaque payload.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Opaque(o) => o.0.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

/// A shared handle to an external object carried inside an event.
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Opaque(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_constructors() {
        let e = Event::number("out", 3.0);
        assert_eq!(e.port, "out");
        assert_eq!(e.value.as_f64(), Some(3.0));

        let e = Event::text("msg", "hello");
        assert_eq!(e.value.as_str(), Some("hello"));

        let e = Event::json("properties_in", serde_json::json!({"rate": 2}));
        assert_eq!(e.value.as_json().unwrap()["rate"], 2);
    }

    #[test]
    fn test_event_renamed() {
        let e = Event::number("out", 1.0);
        let r = e.renamed("in");
        assert_eq!(r.port, "in");
        assert_eq!(r.value, e.value);
    }

    #[test]
    fn test_opaque_payload() {
        #[derive(Debug, PartialEq)]
        struct Tile {
            row: u32,
        }

        let value = Value::opaque(Tile { row: 7 });
        assert_eq!(value.downcast_ref::<Tile>(), Some(&Tile { row: 7 }));
        assert!(value.downcast_ref::<String>().is_none());
        assert_eq!(value.clone(), value);
        assert_ne!(value, Value::opaque(Tile { row: 7 }));
    }

    #[test]
    fn test_opaque_not_serializable() {
        let event = Event::new("x", Value::opaque(5u8));
        assert!(serde_json::to_string(&event).is_err());
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::json("in", serde_json::json!({"seq": 1}));
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
