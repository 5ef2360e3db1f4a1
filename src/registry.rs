//! Component type registry.
//!
//! The registry maps type names to constructors and introspection metadata,
//! decoupling *what* concrete component to build from *who* builds it. The
//! declarative builder and the codec both resolve type names through it.
//!
//! There is no ambient global registry: create one at startup, populate it,
//! and pass it by reference to [`ModelBuilder`](crate::builder::ModelBuilder)
//! and [`Codec`](crate::codec::Codec).
//!
//! # Example
//!
//! ```
//! use kumiki::component::{Atomic, Kind};
//! use kumiki::registry::{Metadata, TypeRegistry};
//!
//! #[derive(Default)]
//! struct Lamp;
//! impl Atomic for Lamp {}
//!
//! let mut registry = TypeRegistry::new();
//! assert!(registry.register("Lamp", || Kind::leaf(Lamp), Metadata::new()));
//! assert!(!registry.register("Lamp", || Kind::leaf(Lamp), Metadata::new()));
//!
//! let lamp = registry.create("Lamp").unwrap();
//! assert_eq!(lamp.type_name(), "Lamp");
//! assert!(registry.create("Missing").is_none());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::component::{Atomic, Component, Kind};

/// Zero-argument constructor.
pub type Constructor = Arc<dyn Fn() -> Kind + Send + Sync>;

/// Constructor consuming an opaque argument payload.
///
/// Returns `None` when the arguments do not describe a valid instance.
pub type ArgsConstructor = Arc<dyn Fn(&serde_json::Value) -> Option<Kind> + Send + Sync>;

/// Free-form metadata describing a registered type.
///
/// Used for discovery only (declared ports, default configuration, a
/// description), never for construction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(serde_json::Map<String, serde_json::Value>);

impl Metadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a human-readable description.
    pub fn with_description(self, text: impl Into<String>) -> Self {
        self.with("description", serde_json::Value::String(text.into()))
    }

    /// Declares input and output ports.
    pub fn with_ports(self, inputs: &[&str], outputs: &[&str]) -> Self {
        self.with("inputs", serde_json::json!(inputs))
            .with("outputs", serde_json::json!(outputs))
    }

    /// Adds an arbitrary property.
    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Returns a property.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        self.get("description").and_then(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the metadata as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.0.clone())
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Metadata {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// A bundle of component types registered in one step.
///
/// This is the unit a plugin or model library hands to the registry at
/// startup, before the first `create` that needs its types.
pub trait ModelLibrary {
    /// Library name, used in logs.
    fn name(&self) -> &str;

    /// Registers this library's types.
    fn register(&self, registry: &mut TypeRegistry);
}

/// The catalog of component types.
#[derive(Default)]
pub struct TypeRegistry {
    constructors: BTreeMap<String, Constructor>,
    args_constructors: BTreeMap<String, ArgsConstructor>,
    metadata: BTreeMap<String, Metadata>,
}

impl TypeRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a zero-argument constructor.
    ///
    /// Returns `false`, leaving the first registration intact, if the name
    /// already has a zero-argument constructor.
    pub fn register<F>(&mut self, type_name: impl Into<String>, constructor: F, metadata: Metadata) -> bool
    where
        F: Fn() -> Kind + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        if self.constructors.contains_key(&type_name) {
            tracing::debug!(type_name = %type_name, "type already registered");
            return false;
        }
        self.metadata.entry(type_name.clone()).or_insert(metadata);
        self.constructors.insert(type_name, Arc::new(constructor));
        true
    }

    /// Registers a constructor that consumes an argument payload.
    ///
    /// Same uniqueness rule as [`register`](Self::register), applied to
    /// args-constructors. Metadata is only recorded if the name has none yet.
    pub fn register_with_args<F>(
        &mut self,
        type_name: impl Into<String>,
        constructor: F,
        metadata: Metadata,
    ) -> bool
    where
        F: Fn(&serde_json::Value) -> Option<Kind> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        if self.args_constructors.contains_key(&type_name) {
            tracing::debug!(type_name = %type_name, "type already registered with args");
            return false;
        }
        self.metadata.entry(type_name.clone()).or_insert(metadata);
        self.args_constructors.insert(type_name, Arc::new(constructor));
        true
    }

    /// Registers a default-constructible leaf model.
    pub fn register_atomic<T>(&mut self, type_name: impl Into<String>, metadata: Metadata) -> bool
    where
        T: Atomic + Default,
    {
        self.register(type_name, || Kind::leaf(T::default()), metadata)
    }

    /// Registers a plain digraph type.
    pub fn register_digraph(&mut self, type_name: impl Into<String>, metadata: Metadata) -> bool {
        self.register(type_name, Kind::digraph, metadata)
    }

    /// Creates an unattached, default-constructed component.
    ///
    /// Returns `None` for an unknown name (or one with only an
    /// args-constructor).
    pub fn create(&self, type_name: &str) -> Option<Component> {
        let constructor = self.constructors.get(type_name)?;
        Some(Component::new(type_name, constructor()))
    }

    /// Creates an unattached component through its args-constructor.
    ///
    /// Returns `None` if the name has no args-constructor or the constructor
    /// rejects the arguments.
    pub fn create_with_args(&self, type_name: &str, args: &serde_json::Value) -> Option<Component> {
        let constructor = self.args_constructors.get(type_name)?;
        constructor(args).map(|kind| Component::new(type_name, kind))
    }

    /// Returns the metadata for a type (empty for unknown names).
    pub fn get_properties(&self, type_name: &str) -> Metadata {
        self.metadata.get(type_name).cloned().unwrap_or_default()
    }

    /// Returns every registered type name.
    pub fn list_type_ids(&self) -> BTreeSet<String> {
        self.constructors
            .keys()
            .chain(self.args_constructors.keys())
            .cloned()
            .collect()
    }

    /// Returns true if a type is registered with any constructor.
    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name) || self.args_constructors.contains_key(type_name)
    }

    /// Returns true if the type has a zero-argument constructor.
    pub fn has_constructor(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Returns the number of registered type names.
    pub fn len(&self) -> usize {
        self.list_type_ids().len()
    }

    /// Returns true if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty() && self.args_constructors.is_empty()
    }

    /// Runs a library's registration step.
    ///
    /// Returns the names the library added.
    pub fn install(&mut self, library: &dyn ModelLibrary) -> BTreeSet<String> {
        let before = self.list_type_ids();
        library.register(self);
        let added: BTreeSet<String> = self.list_type_ids().difference(&before).cloned().collect();
        tracing::info!(library = library.name(), types = added.len(), "installed model library");
        for name in &added {
            tracing::debug!(library = library.name(), type_name = %name, "registered type");
        }
        added
    }

    /// Logs every available type id; used as a diagnostic after a failed create.
    pub fn log_available(&self) {
        tracing::debug!("*** available types ***");
        for (i, name) in self.list_type_ids().iter().enumerate() {
            tracing::debug!("=> {}) {}", i + 1, name);
        }
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("registered_types", &self.list_type_ids())
            .finish()
    }
}

/// Creates a registry with the built-in container types and the reference
/// models.
///
/// Includes:
/// - `Digraph` - plain coupled network
/// - `Wrapper` - wrapper with a pass-through adapter
/// - `PortMap` - wrapper renaming ports across its boundary (args: `{"inputs": {..}, "outputs": {..}}`)
/// - `Gen`, `Obs`, `Counter` - reference leaves from [`crate::models`]
pub fn create_default_registry() -> TypeRegistry {
    use crate::models::{Builtins, ReferenceModels};

    let mut registry = TypeRegistry::new();
    registry.install(&Builtins);
    registry.install(&ReferenceModels);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mock::{Counter, Generator};

    #[test]
    fn test_registry_basic() {
        let mut registry = TypeRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.register_atomic::<Counter>("Test", Metadata::new()));
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("Test"));
    }

    #[test]
    fn test_registry_uniqueness() {
        let mut registry = TypeRegistry::new();
        let first = Metadata::new().with_description("first");
        let second = Metadata::new().with_description("second");

        assert!(registry.register_atomic::<Counter>("Counter", first));
        assert!(!registry.register_atomic::<Generator>("Counter", second));

        let c = registry.create("Counter").unwrap();
        assert!(c.leaf_ref::<Counter>().is_some());
        assert_eq!(registry.get_properties("Counter").description(), Some("first"));
    }

    #[test]
    fn test_registry_create() {
        let mut registry = TypeRegistry::new();
        registry.register_atomic::<Counter>("Counter", Metadata::new());

        let a = registry.create("Counter").unwrap();
        let b = registry.create("Counter").unwrap();
        assert_ne!(a.id(), b.id());
        assert!(a.parent().is_none());

        assert!(registry.create("NonExistent").is_none());
    }

    #[test]
    fn test_registry_with_args() {
        let mut registry = TypeRegistry::new();
        registry.register_with_args(
            "Gen",
            |args| {
                let period = args.get("period")?.as_f64()?;
                Some(Kind::leaf(Generator::with_period(period)))
            },
            Metadata::new(),
        );

        let args = serde_json::json!({"period": 2.5});
        let gen = registry.create_with_args("Gen", &args).unwrap();
        assert_eq!(gen.leaf_ref::<Generator>().unwrap().period, 2.5);

        // rejected arguments
        assert!(registry.create_with_args("Gen", &serde_json::json!({})).is_none());
        // args-only types cannot be default-constructed
        assert!(registry.create("Gen").is_none());
        assert!(!registry.has_constructor("Gen"));
        assert!(registry.contains("Gen"));
    }

    #[test]
    fn test_create_with_args_needs_args_constructor() {
        let mut registry = TypeRegistry::new();
        registry.register_atomic::<Counter>("Counter", Metadata::new());
        assert!(registry.create_with_args("Counter", &serde_json::Value::Null).is_none());
    }

    #[test]
    fn test_get_properties_unknown_is_empty() {
        let registry = TypeRegistry::new();
        assert!(registry.get_properties("Nope").is_empty());
    }

    #[test]
    fn test_metadata_builders() {
        let meta = Metadata::new()
            .with_description("emits ticks")
            .with_ports(&["in"], &["out"]);
        assert_eq!(meta.description(), Some("emits ticks"));
        assert_eq!(meta.get("outputs").unwrap(), &serde_json::json!(["out"]));
        assert_eq!(meta.to_json()["inputs"][0], "in");
    }

    #[test]
    fn test_list_type_ids_merges_both_maps() {
        let mut registry = TypeRegistry::new();
        registry.register_atomic::<Counter>("A", Metadata::new());
        registry.register_with_args("B", |_| Some(Kind::digraph()), Metadata::new());
        registry.register_with_args("A", |_| Some(Kind::digraph()), Metadata::new());

        let ids: Vec<_> = registry.list_type_ids().into_iter().collect();
        assert_eq!(ids, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_install_library() {
        struct Lib;
        impl ModelLibrary for Lib {
            fn name(&self) -> &str {
                "lib"
            }
            fn register(&self, registry: &mut TypeRegistry) {
                registry.register_atomic::<Counter>("X", Metadata::new());
                registry.register_atomic::<Counter>("Y", Metadata::new());
            }
        }

        let mut registry = TypeRegistry::new();
        registry.register_atomic::<Counter>("X", Metadata::new());
        let added = registry.install(&Lib);
        assert_eq!(added.into_iter().collect::<Vec<_>>(), vec!["Y".to_string()]);
    }

    #[test]
    fn test_default_registry() {
        let registry = create_default_registry();
        for name in ["Digraph", "Wrapper", "PortMap", "Gen", "Obs", "Counter"] {
            assert!(registry.contains(name), "missing {name}");
        }
    }
}
