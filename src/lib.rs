//! # Kumiki Component Composition Layer
//!
//! The structural core of a discrete-event simulation toolkit: how primitive
//! models and composite models are named, constructed, nested, wired,
//! initialized, copied and persisted. Simulation scheduling lives outside this
//! crate; an external driver calls [`hierarchy::inject_events`] and
//! [`hierarchy::extract_output`] on the trees built here.
//!
//! ## Design Principles
//!
//! - **Closed shapes, open leaves**: a component is a leaf, a wrapper (at most
//!   one child behind an [`Adapter`]) or a digraph (named children plus
//!   couplings). Leaf behavior is supplied by callers through [`Atomic`].
//! - **Tree ownership**: containers own their children by value; parent links
//!   are plain [`ComponentId`]s. Dropping a root drops its whole subtree.
//! - **Explicit registry**: a [`TypeRegistry`] is created at startup and passed
//!   by reference to the [`ModelBuilder`] and the [`Codec`].
//! - **All-or-nothing construction**: builds, clones and loads either return a
//!   complete tree or nothing at all.
//!
//! ## Quick Start
//!
//! ```rust
//! use kumiki::{create_default_registry, Codec, Event, ModelBuilder};
//! use kumiki::hierarchy::{extract_output, initialize_component, inject_events};
//!
//! let registry = create_default_registry();
//!
//! let cfg = serde_json::json!({
//!     "typeName": "Digraph",
//!     "models": {"g": {"typeName": "Gen"}, "o": {"typeName": "Obs"}},
//!     "couplings": [{"from": {"model": "g", "port": "out"}, "to": {"model": "o", "port": "in"}}]
//! });
//! let mut root = ModelBuilder::new(&registry).build(&cfg).unwrap();
//! assert!(initialize_component(&mut root));
//!
//! inject_events(1.0, &[Event::text("tick", "")], &mut root);
//! assert_eq!(extract_output(&root), vec![Event::number("out", 1.0)]);
//!
//! // Snapshot and restore
//! let codec = Codec::new(&registry);
//! let copy = codec.load(&codec.save(&root).unwrap()).unwrap();
//! assert_eq!(copy.couplings().len(), 1);
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use kumiki::config::BuildSettings;
//!
//! let settings = BuildSettings::from_file("settings.yaml")?;
//! kumiki::init_logging(&settings.log_level);
//! let root = ModelBuilder::with_settings(&registry, settings).build_from_file("model.yaml")?;
//! ```

pub mod types;
pub mod event;
pub mod error;
pub mod component;
pub mod registry;
pub mod hierarchy;
pub mod builder;
pub mod codec;
pub mod config;
pub mod models;

// Re-export commonly used types
pub use types::{ComponentId, PortId, SimTime, PROPERTIES_PORT, THIS};
pub use event::{Event, Value};
pub use error::{BuildError, CodecError, GraphError, InitError, LogicError, StateError};
pub use component::{Adapter, Atomic, Component, Coupling, Initialize, Kind, Passthrough, Pin};
pub use registry::{create_default_registry, Metadata, ModelLibrary, TypeRegistry};
pub use hierarchy::{
    clone_component, extract_output, get_root_component, initialize_component, inject_events, route_input,
    route_output, try_initialize, ParentIndex,
};
pub use builder::ModelBuilder;
pub use codec::Codec;
pub use config::{BuildSettings, BuildSettingsBuilder, ConfigError, CouplingPolicy, DocumentFormat};

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging.
///
/// # Example
///
/// ```rust,ignore
/// kumiki::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
