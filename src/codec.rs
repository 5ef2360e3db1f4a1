//! Saving and loading live component hierarchies.
//!
//! A saved node records its `typeName`, the `state` produced by its own save
//! hook (omitted when null), and for containers the same structural fields a
//! configuration document uses: `wrappedModel` for a wrapper, `models` and
//! `couplings` for a digraph. A saved document can therefore also be fed to
//! [`ModelBuilder`](crate::builder::ModelBuilder).
//!
//! Loading is strict. An unknown type name, a malformed field, a coupling
//! naming an unknown child or a rejected state payload fails the whole load,
//! and nothing built so far survives.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::component::{Component, Kind};
use crate::config::{
    load_document, write_document, CouplingSpec, DocumentFormat, COUPLINGS, MODELS, STATE, TYPE_NAME,
    WRAPPED_MODEL,
};
use crate::error::{CodecError, CodecResult};
use crate::registry::TypeRegistry;

/// Serializes and deserializes hierarchies against a registry.
#[derive(Debug)]
pub struct Codec<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> Codec<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Records a hierarchy as a document.
    ///
    /// Fails if any save hook refuses its state.
    pub fn save(&self, root: &Component) -> CodecResult<Value> {
        let result = save_node(root);
        if let Err(err) = &result {
            tracing::error!(error = %err, "save aborted");
        }
        result
    }

    /// Records a hierarchy as text.
    pub fn save_to_string(&self, root: &Component, format: DocumentFormat) -> CodecResult<String> {
        Ok(format.render(&self.save(root)?)?)
    }

    /// Records a hierarchy in a file; the extension picks the format.
    pub fn save_to_file<P: AsRef<Path>>(&self, root: &Component, path: P) -> CodecResult<()> {
        write_document(path, &self.save(root)?)?;
        Ok(())
    }

    /// Rebuilds a hierarchy from a document.
    pub fn load(&self, doc: &Value) -> CodecResult<Component> {
        let result = self.load_node(doc);
        if let Err(err) = &result {
            tracing::error!(error = %err, "load aborted");
        }
        result
    }

    pub fn load_from_str(&self, text: &str, format: DocumentFormat) -> CodecResult<Component> {
        let doc = format.parse(text)?;
        self.load(&doc)
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> CodecResult<Component> {
        let doc = load_document(path)?;
        self.load(&doc)
    }

    /// Copies a hierarchy by saving and reloading it.
    ///
    /// Unlike [`clone_component`](crate::hierarchy::clone_component) this only
    /// needs the state hooks, not the cloning hooks.
    pub fn clone_via_round_trip(&self, root: &Component) -> CodecResult<Component> {
        self.load(&self.save(root)?)
    }

    fn load_node(&self, doc: &Value) -> CodecResult<Component> {
        let type_name = doc
            .get(TYPE_NAME)
            .and_then(Value::as_str)
            .ok_or_else(|| CodecError::Malformed(format!("node without a string <{TYPE_NAME}>")))?;
        let state = doc.get(STATE);

        let mut component = self.instantiate(type_name, state)?;
        tracing::debug!(type_name, id = %component.id(), "loading");

        if let Some(state) = state {
            let restored = match component.kind_mut() {
                Kind::Leaf(model) => model.restore_state(state),
                Kind::Wrapper(wrapper) => wrapper.adapter_mut().restore_state(state),
                Kind::Digraph(_) => Ok(()),
            };
            restored.map_err(|source| CodecError::State {
                type_name: type_name.to_string(),
                source,
            })?;
        }

        if component.as_wrapper().is_some() {
            if let Some(inner) = doc.get(WRAPPED_MODEL) {
                let child = self.load_node(inner)?;
                component.set_wrapped(child)?;
            }
        } else if component.as_digraph().is_some() {
            self.load_digraph(&mut component, doc)?;
        }
        Ok(component)
    }

    fn instantiate(&self, type_name: &str, state: Option<&Value>) -> CodecResult<Component> {
        let component = self.registry.create(type_name).or_else(|| {
            self.registry
                .create_with_args(type_name, state.unwrap_or(&Value::Null))
        });
        match component {
            Some(component) => Ok(component),
            None => {
                self.registry.log_available();
                Err(CodecError::UnknownType(type_name.to_string()))
            }
        }
    }

    fn load_digraph(&self, digraph: &mut Component, doc: &Value) -> CodecResult<()> {
        let models = doc
            .get(MODELS)
            .and_then(Value::as_object)
            .ok_or_else(|| CodecError::Malformed(format!("digraph {} without <{MODELS}>", digraph.type_name())))?;
        let couplings = match doc.get(COUPLINGS) {
            None => &[][..],
            Some(Value::Array(edges)) => edges.as_slice(),
            Some(_) => {
                return Err(CodecError::Malformed(format!(
                    "<{COUPLINGS}> of digraph {} is not a list",
                    digraph.type_name()
                )))
            }
        };

        for (name, child_doc) in models {
            let child = self.load_node(child_doc)?;
            digraph.add(name.clone(), child)?;
        }

        for edge in couplings {
            let spec = CouplingSpec::deserialize(edge).map_err(|err| CodecError::Malformed(err.to_string()))?;
            let resolve = |name: &str| {
                digraph
                    .resolve(name)
                    .ok_or_else(|| CodecError::Malformed(format!("coupling references unknown model '{name}'")))
            };
            let from = resolve(&spec.from.model)?;
            let to = resolve(&spec.to.model)?;
            digraph.couple(from, spec.from.port, to, spec.to.port)?;
        }
        Ok(())
    }
}

fn save_node(root: &Component) -> CodecResult<Value> {
    let mut doc = Map::new();
    doc.insert(TYPE_NAME.to_string(), Value::String(root.type_name().to_string()));

    let state = match root.kind() {
        Kind::Leaf(model) => model.save_state(),
        Kind::Wrapper(wrapper) => wrapper.adapter().save_state(),
        Kind::Digraph(_) => Ok(Value::Null),
    }
    .map_err(|source| CodecError::State {
        type_name: root.type_name().to_string(),
        source,
    })?;
    if !state.is_null() {
        doc.insert(STATE.to_string(), state);
    }

    match root.kind() {
        Kind::Leaf(_) => {}
        Kind::Wrapper(wrapper) => {
            if let Some(child) = wrapper.child() {
                doc.insert(WRAPPED_MODEL.to_string(), save_node(child)?);
            }
        }
        Kind::Digraph(digraph) => {
            let models = digraph
                .members()
                .iter()
                .map(|member| Ok((member.name.clone(), save_node(&member.component)?)))
                .collect::<CodecResult<Map<String, Value>>>()?;
            let couplings: Vec<Value> = digraph
                .couplings()
                .iter()
                .filter_map(|edge| {
                    let from = root.name_of(edge.from.model)?;
                    let to = root.name_of(edge.to.model)?;
                    Some(CouplingSpec::new(from, edge.from.port.as_str(), to, edge.to.port.as_str()).to_json())
                })
                .collect();
            doc.insert(MODELS.to_string(), Value::Object(models));
            doc.insert(COUPLINGS.to_string(), Value::Array(couplings));
        }
    }
    Ok(Value::Object(doc))
}
