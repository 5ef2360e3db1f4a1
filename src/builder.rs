//! Declarative construction of component hierarchies.
//!
//! [`ModelBuilder`] interprets a configuration document (see
//! [`crate::config`] for the schema) into a live, fully attached component
//! tree. The returned tree is never attached to a parent; attaching it is the
//! caller's job, which is how the recursion transfers ownership one level up.
//!
//! Builds are all-or-nothing: any failure returns an error and drops every
//! component allocated by the failed call.
//!
//! # Example
//!
//! ```
//! use kumiki::builder::ModelBuilder;
//! use kumiki::registry::create_default_registry;
//!
//! let registry = create_default_registry();
//! let builder = ModelBuilder::new(&registry);
//!
//! let cfg = serde_json::json!({
//!     "typeName": "Digraph",
//!     "models": {"g": {"typeName": "Gen"}, "o": {"typeName": "Obs"}},
//!     "couplings": [{"from": {"model": "g", "port": "out"}, "to": {"model": "o", "port": "in"}}]
//! });
//! let root = builder.build(&cfg).unwrap();
//! assert_eq!(root.children().len(), 2);
//! assert_eq!(root.couplings().len(), 1);
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::component::{Component, Kind};
use crate::config::{
    load_document, BuildSettings, CouplingPolicy, CouplingSpec, DocumentFormat, COUPLINGS, MODELS, PROPERTIES,
    TYPE_NAME, WRAPPED_MODEL,
};
use crate::error::{BuildError, BuildResult};
use crate::event::Event;
use crate::hierarchy::inject_events;
use crate::registry::TypeRegistry;
use crate::types::PROPERTIES_PORT;

/// Builds component trees from configuration documents.
#[derive(Debug)]
pub struct ModelBuilder<'r> {
    registry: &'r TypeRegistry,
    settings: BuildSettings,
}

impl<'r> ModelBuilder<'r> {
    /// Creates a builder with default settings.
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self::with_settings(registry, BuildSettings::default())
    }

    pub fn with_settings(registry: &'r TypeRegistry, settings: BuildSettings) -> Self {
        Self { registry, settings }
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    /// Builds a component tree from a configuration document.
    pub fn build(&self, cfg: &Value) -> BuildResult<Component> {
        match self.build_node(cfg) {
            Ok(component) => {
                tracing::debug!(
                    type_name = component.type_name(),
                    components = component.size(),
                    "build complete"
                );
                Ok(component)
            }
            Err(err) => {
                tracing::error!(error = %err, "build aborted");
                Err(err)
            }
        }
    }

    /// Parses and builds a document held in a string.
    pub fn build_from_str(&self, text: &str, format: DocumentFormat) -> BuildResult<Component> {
        let cfg = format.parse(text)?;
        self.build(&cfg)
    }

    /// Loads and builds a document file, auto-detecting format.
    pub fn build_from_file<P: AsRef<Path>>(&self, path: P) -> BuildResult<Component> {
        let cfg = load_document(path)?;
        self.build(&cfg)
    }

    fn build_node(&self, cfg: &Value) -> BuildResult<Component> {
        let type_name = cfg
            .get(TYPE_NAME)
            .and_then(Value::as_str)
            .ok_or(BuildError::MissingTypeName)?;

        let (mut component, from_args) = self.instantiate(type_name, cfg)?;
        tracing::debug!(type_name, id = %component.id(), "instantiated");

        if component.as_wrapper().is_some() {
            self.build_wrapper(&mut component, cfg, from_args)?;
        } else if component.as_digraph().is_some() {
            self.build_digraph(&mut component, cfg)?;
        } else if !from_args {
            if let Some(properties) = cfg.get(PROPERTIES).filter(|p| p.is_object()) {
                self.inject_properties(&mut component, properties.clone());
            }
        }
        Ok(component)
    }

    /// Creates the bare component, falling back to the args-constructor when
    /// the type has no zero-argument one. The flag reports that fallback.
    fn instantiate(&self, type_name: &str, cfg: &Value) -> BuildResult<(Component, bool)> {
        if let Some(component) = self.registry.create(type_name) {
            return Ok((component, false));
        }
        if self.registry.contains(type_name) {
            let args = cfg.get(PROPERTIES).unwrap_or(&Value::Null);
            return match self.registry.create_with_args(type_name, args) {
                Some(component) => Ok((component, true)),
                None => Err(malformed(type_name, PROPERTIES, "rejected by the type's constructor")),
            };
        }
        self.registry.log_available();
        Err(BuildError::UnknownType(type_name.to_string()))
    }

    fn build_wrapper(&self, wrapper: &mut Component, cfg: &Value, from_args: bool) -> BuildResult<()> {
        let inner = match cfg.get(WRAPPED_MODEL) {
            Some(inner) if inner.is_object() => inner,
            Some(_) => return Err(malformed(wrapper.type_name(), WRAPPED_MODEL, "expected an object")),
            None => return Err(malformed(wrapper.type_name(), WRAPPED_MODEL, "missing")),
        };
        let child = self.build_node(inner).map_err(|source| BuildError::Wrapped {
            source: Box::new(source),
        })?;
        wrapper.set_wrapped(child)?;

        if from_args || !self.settings.inject_properties {
            return Ok(());
        }
        // the wrapper's own configuration, without the subtree
        let payload: serde_json::Map<String, Value> = cfg
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(key, _)| key.as_str() != WRAPPED_MODEL)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let type_name = wrapper.type_name().to_string();
        if let Kind::Wrapper(inner) = wrapper.kind_mut() {
            inner
                .adapter_mut()
                .configure(&Value::Object(payload))
                .map_err(|err| malformed(&type_name, PROPERTIES, err.to_string()))?;
        }
        Ok(())
    }

    fn build_digraph(&self, digraph: &mut Component, cfg: &Value) -> BuildResult<()> {
        let models = cfg
            .get(MODELS)
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(digraph.type_name(), MODELS, "expected an object"))?;
        let couplings = cfg
            .get(COUPLINGS)
            .and_then(Value::as_array)
            .ok_or_else(|| malformed(digraph.type_name(), COUPLINGS, "expected a list"))?;

        for (name, child_cfg) in models {
            let child = self.build_node(child_cfg).map_err(|source| BuildError::Child {
                name: name.clone(),
                source: Box::new(source),
            })?;
            digraph.add(name.clone(), child)?;
        }

        for edge in couplings {
            let spec = CouplingSpec::deserialize(edge)
                .map_err(|err| malformed(digraph.type_name(), COUPLINGS, err.to_string()))?;

            let from = digraph.resolve(&spec.from.model);
            let to = digraph.resolve(&spec.to.model);
            match (from, to) {
                (Some(from), Some(to)) => digraph.couple(from, spec.from.port, to, spec.to.port)?,
                _ => {
                    let missing = if from.is_none() { spec.from.model } else { spec.to.model };
                    match self.settings.unresolved_couplings {
                        CouplingPolicy::Skip => {
                            tracing::warn!(
                                digraph = digraph.type_name(),
                                model = %missing,
                                "dropping coupling to unknown model"
                            );
                        }
                        CouplingPolicy::Reject => return Err(BuildError::UnresolvedCoupling(missing)),
                    }
                }
            }
        }
        Ok(())
    }

    fn inject_properties(&self, component: &mut Component, payload: Value) {
        if !self.settings.inject_properties {
            return;
        }
        let event = Event::json(PROPERTIES_PORT, payload);
        inject_events(0.0, std::slice::from_ref(&event), component);
    }
}

fn malformed(type_name: &str, field: &'static str, reason: impl Into<String>) -> BuildError {
    BuildError::MalformedField {
        type_name: type_name.to_string(),
        field,
        reason: reason.into(),
    }
}
