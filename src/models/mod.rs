//! Built-in container types and reference models.
//!
//! - [`mock`] - simple leaves (`Gen`, `Obs`, `Counter`)
//! - [`port_map`] - a port-renaming wrapper adapter (`PortMap`)
//!
//! Both are packaged as [`ModelLibrary`] implementations so they are
//! registered the same way third-party model libraries are.

pub mod mock;
pub mod port_map;

pub use mock::{Counter, Generator, Observer};
pub use port_map::PortMap;

use crate::component::{Kind, Passthrough};
use crate::registry::{Metadata, ModelLibrary, TypeRegistry};

/// The generic container types: `Digraph` and `Wrapper`.
pub struct Builtins;

impl ModelLibrary for Builtins {
    fn name(&self) -> &str {
        "builtins"
    }

    fn register(&self, registry: &mut TypeRegistry) {
        registry.register_digraph(
            "Digraph",
            Metadata::new().with_description("coupled network of named components"),
        );
        registry.register(
            "Wrapper",
            || Kind::wrapper(Passthrough),
            Metadata::new().with_description("wraps a single component, forwarding events unchanged"),
        );
    }
}

/// The reference models from this module.
pub struct ReferenceModels;

impl ModelLibrary for ReferenceModels {
    fn name(&self) -> &str {
        "reference-models"
    }

    fn register(&self, registry: &mut TypeRegistry) {
        registry.register_atomic::<Generator>(
            "Gen",
            Metadata::new()
                .with_description("emits its tick count on `out`")
                .with_ports(&["tick", "properties_in"], &["out"])
                .with("properties", serde_json::json!({"period": 1.0})),
        );
        registry.register_atomic::<Observer>(
            "Obs",
            Metadata::new()
                .with_description("records numbers arriving on `in`")
                .with_ports(&["in"], &[]),
        );
        registry.register_atomic::<Counter>(
            "Counter",
            Metadata::new()
                .with_description("counts external transitions")
                .with_ports(&[], &["count"]),
        );
        let meta = Metadata::new().with_description("wrapper renaming ports across its boundary");
        registry.register("PortMap", || Kind::wrapper(PortMap::default()), meta.clone());
        registry.register_with_args(
            "PortMap",
            |args| PortMap::from_json(args).map(|map| Kind::wrapper(map)),
            meta,
        );
    }
}
