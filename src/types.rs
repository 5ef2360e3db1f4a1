//! Core type definitions for the composition layer.
//!
//! This module defines the fundamental types shared by every other module.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Simulation time (elapsed time handed to external transitions).
///
/// The core never advances time itself; it only forwards the value the
/// external driver passes to [`inject_events`](crate::hierarchy::inject_events).
pub type SimTime = f64;

/// Port identifier type.
///
/// Ports carry no static schema; an event's port name is only meaningful to
/// the two endpoints of a coupling.
pub type PortId = String;

/// Name used in coupling edges to denote a digraph's own boundary.
pub const THIS: &str = "this";

/// Default port on which configuration payloads are delivered to a freshly
/// built component.
pub const PROPERTIES_PORT: &str = "properties_in";

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a live component.
///
/// Identities are never reused: a clone or a reloaded graph always receives
/// fresh ones. Parent links are stored as ids, so they never own anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Allocates a fresh identity.
    pub fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
