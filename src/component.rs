//! Component definitions and the capability model.
//!
//! A [`Component`] is a node of the model hierarchy. Its shape is a closed set
//! ([`Kind::Leaf`], [`Kind::Wrapper`], [`Kind::Digraph`]); leaf behavior is the
//! open extension point, supplied by callers through the [`Atomic`] trait.
//!
//! Ownership flows strictly parent to child: a container owns its children by
//! value and dropping it destroys the whole subtree. The parent link is a bare
//! [`ComponentId`] and is only ever used for lookups.
//!
//! Optional capabilities ([`Initialize`], cloning, state hooks) are discovered
//! at the point of use through query methods that default to "not supported".

use std::any::Any;
use std::fmt;

use crate::error::{GraphError, LogicError, StateError};
use crate::event::Event;
use crate::types::{ComponentId, PortId, SimTime, THIS};

/// Upcast helper so trait objects can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Optional initialization capability.
pub trait Initialize {
    /// Prepares the component for a simulation run.
    fn initialize(&mut self) -> Result<(), LogicError>;
}

/// The contract a primitive (leaf) model implements.
///
/// The core never inspects a leaf's fields. It only calls the methods below,
/// and every one of them has a neutral default.
pub trait Atomic: AsAny + Send {
    /// External transition: consume a bag of input events.
    fn delta_ext(&mut self, _elapsed: SimTime, _inputs: &[Event]) {}

    /// Output function: the events this leaf currently emits.
    fn output(&self) -> Vec<Event> {
        Vec::new()
    }

    /// Returns the initialization capability, if supported.
    fn as_initialize(&mut self) -> Option<&mut dyn Initialize> {
        None
    }

    /// Returns a copy of this leaf's state, if cloning is supported.
    fn clone_atomic(&self) -> Option<Box<dyn Atomic>> {
        None
    }

    /// Returns the state to record in a serialized document.
    ///
    /// `Null` means "nothing to record".
    fn save_state(&self) -> Result<serde_json::Value, StateError> {
        Ok(serde_json::Value::Null)
    }

    /// Restores state recorded by [`save_state`](Atomic::save_state).
    fn restore_state(&mut self, _state: &serde_json::Value) -> Result<(), StateError> {
        Ok(())
    }
}

/// Boundary behavior of a wrapper: translates between the wrapper's external
/// port vocabulary and its wrapped component's internal one.
pub trait Adapter: AsAny + Send {
    /// Converts events arriving at the wrapper into events for the child.
    fn translate_input(&mut self, _elapsed: SimTime, external: &[Event]) -> Vec<Event> {
        external.to_vec()
    }

    /// Converts the child's output into the wrapper's output.
    fn translate_output(&self, internal: Vec<Event>) -> Vec<Event> {
        internal
    }

    /// Returns the initialization capability, if supported.
    fn as_initialize(&mut self) -> Option<&mut dyn Initialize> {
        None
    }

    /// Returns a copy of this adapter, if cloning is supported.
    fn clone_adapter(&self) -> Option<Box<dyn Adapter>> {
        None
    }

    /// Applies the wrapper's own configuration document.
    ///
    /// Called once by the builder after the wrapped component is attached.
    /// The configuration stops here; it never crosses into the child.
    fn configure(&mut self, _config: &serde_json::Value) -> Result<(), LogicError> {
        Ok(())
    }

    /// Returns the state to record in a serialized document.
    fn save_state(&self) -> Result<serde_json::Value, StateError> {
        Ok(serde_json::Value::Null)
    }

    /// Restores state recorded by [`save_state`](Adapter::save_state).
    fn restore_state(&mut self, _state: &serde_json::Value) -> Result<(), StateError> {
        Ok(())
    }
}

/// Adapter that forwards events unchanged in both directions.
#[derive(Clone, Debug, Default)]
pub struct Passthrough;

impl Adapter for Passthrough {
    fn clone_adapter(&self) -> Option<Box<dyn Adapter>> {
        Some(Box::new(self.clone()))
    }
}

/// One end of a coupling edge.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pin {
    pub model: ComponentId,
    pub port: PortId,
}

impl Pin {
    pub fn new(model: ComponentId, port: impl Into<PortId>) -> Self {
        Self {
            model,
            port: port.into(),
        }
    }
}

/// A directed edge `(source, port) -> (destination, port)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Coupling {
    pub from: Pin,
    pub to: Pin,
}

/// A named child of a digraph.
pub struct Member {
    pub name: String,
    pub component: Component,
}

/// A container owning at most one component.
pub struct Wrapper {
    adapter: Box<dyn Adapter>,
    child: Option<Box<Component>>,
}

impl Wrapper {
    /// Returns the adapter.
    pub fn adapter(&self) -> &dyn Adapter {
        &*self.adapter
    }

    /// Returns the adapter mutably.
    pub fn adapter_mut(&mut self) -> &mut dyn Adapter {
        &mut *self.adapter
    }

    /// Returns the wrapped component, if any.
    pub fn child(&self) -> Option<&Component> {
        self.child.as_deref()
    }

    /// Returns the wrapped component mutably, if any.
    pub fn child_mut(&mut self) -> Option<&mut Component> {
        self.child.as_deref_mut()
    }
}

/// A container owning named children plus an explicit coupling graph.
#[derive(Default)]
pub struct Digraph {
    members: Vec<Member>,
    couplings: Vec<Coupling>,
}

impl Digraph {
    /// Returns the named children in insertion order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Returns the children mutably, in insertion order.
    pub fn components_mut(&mut self) -> impl Iterator<Item = &mut Component> {
        self.members.iter_mut().map(|m| &mut m.component)
    }

    /// Returns the coupling edges.
    pub fn couplings(&self) -> &[Coupling] {
        &self.couplings
    }

    /// Returns the name of the child with the given id.
    pub fn member_name(&self, id: ComponentId) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.component.id == id)
            .map(|m| m.name.as_str())
    }

    fn has_member(&self, id: ComponentId) -> bool {
        self.members.iter().any(|m| m.component.id == id)
    }
}

/// The shape of a component.
pub enum Kind {
    /// Primitive state machine.
    Leaf(Box<dyn Atomic>),
    /// Container holding 0 or 1 component behind an [`Adapter`].
    Wrapper(Wrapper),
    /// Container holding named components and couplings.
    Digraph(Digraph),
}

impl Kind {
    /// Creates a leaf kind.
    pub fn leaf(model: impl Atomic) -> Self {
        Kind::Leaf(Box::new(model))
    }

    /// Creates an empty wrapper kind.
    pub fn wrapper(adapter: impl Adapter) -> Self {
        Kind::Wrapper(Wrapper {
            adapter: Box::new(adapter),
            child: None,
        })
    }

    /// Creates an empty wrapper kind from a boxed adapter.
    pub fn wrapper_boxed(adapter: Box<dyn Adapter>) -> Self {
        Kind::Wrapper(Wrapper {
            adapter,
            child: None,
        })
    }

    /// Creates an empty digraph kind.
    pub fn digraph() -> Self {
        Kind::Digraph(Digraph::default())
    }
}

/// A node in the model hierarchy.
pub struct Component {
    id: ComponentId,
    type_name: String,
    parent: Option<ComponentId>,
    kind: Kind,
}

impl Component {
    /// Creates an unattached component with a fresh identity.
    pub fn new(type_name: impl Into<String>, kind: Kind) -> Self {
        Self {
            id: ComponentId::next(),
            type_name: type_name.into(),
            parent: None,
            kind,
        }
    }

    /// Creates an unattached leaf.
    pub fn leaf(type_name: impl Into<String>, model: impl Atomic) -> Self {
        Self::new(type_name, Kind::leaf(model))
    }

    /// Creates an empty, unattached wrapper.
    pub fn wrapper(type_name: impl Into<String>, adapter: impl Adapter) -> Self {
        Self::new(type_name, Kind::wrapper(adapter))
    }

    /// Creates an empty, unattached digraph.
    pub fn digraph(type_name: impl Into<String>) -> Self {
        Self::new(type_name, Kind::digraph())
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The registered type name this component was created from.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The owning container, or `None` for a root.
    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut Kind {
        &mut self.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, Kind::Leaf(_))
    }

    pub fn is_container(&self) -> bool {
        !self.is_leaf()
    }

    pub fn as_digraph(&self) -> Option<&Digraph> {
        match &self.kind {
            Kind::Digraph(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_wrapper(&self) -> Option<&Wrapper> {
        match &self.kind {
            Kind::Wrapper(w) => Some(w),
            _ => None,
        }
    }

    /// Enumerates the direct children (empty for a leaf).
    pub fn children(&self) -> Vec<&Component> {
        match &self.kind {
            Kind::Leaf(_) => Vec::new(),
            Kind::Wrapper(w) => w.child.as_deref().into_iter().collect(),
            Kind::Digraph(d) => d.members.iter().map(|m| &m.component).collect(),
        }
    }

    /// Enumerates the direct children mutably.
    pub fn children_mut(&mut self) -> Vec<&mut Component> {
        match &mut self.kind {
            Kind::Leaf(_) => Vec::new(),
            Kind::Wrapper(w) => w.child.as_deref_mut().into_iter().collect(),
            Kind::Digraph(d) => d.members.iter_mut().map(|m| &mut m.component).collect(),
        }
    }

    /// Returns the coupling edges (empty unless this is a digraph).
    pub fn couplings(&self) -> &[Coupling] {
        match &self.kind {
            Kind::Digraph(d) => &d.couplings,
            _ => &[],
        }
    }

    /// Adds a named child to a digraph, taking ownership of it.
    ///
    /// Returns the child's id. On error the child is dropped.
    pub fn add(&mut self, name: impl Into<String>, mut child: Component) -> Result<ComponentId, GraphError> {
        let name = name.into();
        let parent = self.id;
        let Kind::Digraph(digraph) = &mut self.kind else {
            return Err(GraphError::NotADigraph(self.type_name.clone()));
        };
        if name == THIS {
            return Err(GraphError::ReservedName(name));
        }
        if digraph.members.iter().any(|m| m.name == name) {
            return Err(GraphError::DuplicateName(name));
        }
        child.attach(parent);
        let id = child.id;
        digraph.members.push(Member {
            name,
            component: child,
        });
        Ok(id)
    }

    /// Places a component inside a wrapper, taking ownership of it.
    pub fn set_wrapped(&mut self, mut child: Component) -> Result<ComponentId, GraphError> {
        let parent = self.id;
        let Kind::Wrapper(wrapper) = &mut self.kind else {
            return Err(GraphError::NotAContainer(self.type_name.clone()));
        };
        if wrapper.child.is_some() {
            return Err(GraphError::WrapperOccupied(self.type_name.clone()));
        }
        child.attach(parent);
        let id = child.id;
        wrapper.child = Some(Box::new(child));
        Ok(id)
    }

    /// Adds a coupling edge between two endpoints of this digraph.
    ///
    /// Either endpoint may be this digraph's own id (its boundary). Adding an
    /// edge that already exists is a no-op.
    pub fn couple(
        &mut self,
        from: ComponentId,
        from_port: impl Into<PortId>,
        to: ComponentId,
        to_port: impl Into<PortId>,
    ) -> Result<(), GraphError> {
        let own = self.id;
        let Kind::Digraph(digraph) = &mut self.kind else {
            return Err(GraphError::NotADigraph(self.type_name.clone()));
        };
        for end in [from, to] {
            if end != own && !digraph.has_member(end) {
                return Err(GraphError::UnknownEndpoint(end));
            }
        }
        let edge = Coupling {
            from: Pin::new(from, from_port),
            to: Pin::new(to, to_port),
        };
        if !digraph.couplings.contains(&edge) {
            digraph.couplings.push(edge);
        }
        Ok(())
    }

    /// Adds a coupling edge by child name (`"this"` names the boundary).
    pub fn couple_named(
        &mut self,
        from: &str,
        from_port: impl Into<PortId>,
        to: &str,
        to_port: impl Into<PortId>,
    ) -> Result<(), GraphError> {
        let from_id = self
            .resolve(from)
            .ok_or_else(|| GraphError::UnknownChild(from.to_string()))?;
        let to_id = self
            .resolve(to)
            .ok_or_else(|| GraphError::UnknownChild(to.to_string()))?;
        self.couple(from_id, from_port, to_id, to_port)
    }

    /// Resolves a coupling name to an id: `"this"` or a digraph child's name.
    pub fn resolve(&self, name: &str) -> Option<ComponentId> {
        if name == THIS {
            return Some(self.id);
        }
        self.child(name).map(|c| c.id)
    }

    /// Returns the name under which `id` appears in this digraph's couplings.
    pub fn name_of(&self, id: ComponentId) -> Option<&str> {
        if id == self.id {
            return Some(THIS);
        }
        self.as_digraph().and_then(|d| d.member_name(id))
    }

    /// Looks up a digraph child by name.
    pub fn child(&self, name: &str) -> Option<&Component> {
        self.as_digraph()?
            .members
            .iter()
            .find(|m| m.name == name)
            .map(|m| &m.component)
    }

    /// Looks up a digraph child by name, mutably.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Component> {
        match &mut self.kind {
            Kind::Digraph(d) => d
                .members
                .iter_mut()
                .find(|m| m.name == name)
                .map(|m| &mut m.component),
            _ => None,
        }
    }

    /// Returns the component held by a wrapper.
    pub fn wrapped(&self) -> Option<&Component> {
        self.as_wrapper().and_then(|w| w.child())
    }

    /// Downcasts a leaf's model to its concrete type.
    pub fn leaf_ref<T: Atomic>(&self) -> Option<&T> {
        match &self.kind {
            Kind::Leaf(model) => {
                let model: &dyn Atomic = &**model;
                model.as_any().downcast_ref::<T>()
            }
            _ => None,
        }
    }

    /// Downcasts a leaf's model to its concrete type, mutably.
    pub fn leaf_mut<T: Atomic>(&mut self) -> Option<&mut T> {
        match &mut self.kind {
            Kind::Leaf(model) => {
                let model: &mut dyn Atomic = &mut **model;
                model.as_any_mut().downcast_mut::<T>()
            }
            _ => None,
        }
    }

    /// Finds a component in this subtree by id.
    pub fn find(&self, id: ComponentId) -> Option<&Component> {
        if self.id == id {
            return Some(self);
        }
        self.children().into_iter().find_map(|c| c.find(id))
    }

    /// Finds a component in this subtree by id, mutably.
    pub fn find_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        if self.id == id {
            return Some(self);
        }
        self.children_mut().into_iter().find_map(|c| c.find_mut(id))
    }

    /// Finds the first component of the given type, depth first.
    pub fn find_by_type(&self, type_name: &str) -> Option<&Component> {
        if self.type_name == type_name {
            return Some(self);
        }
        self.children()
            .into_iter()
            .find_map(|c| c.find_by_type(type_name))
    }

    /// Number of components in this subtree, including itself.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    fn attach(&mut self, parent: ComponentId) {
        debug_assert!(self.parent.is_none(), "component {} attached twice", self.id);
        self.parent = Some(parent);
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match &self.kind {
            Kind::Leaf(_) => "leaf",
            Kind::Wrapper(_) => "wrapper",
            Kind::Digraph(_) => "digraph",
        };
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("shape", &shape)
            .field("children", &self.children())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Tally {
        hits: usize,
    }

    impl Atomic for Tally {
        fn delta_ext(&mut self, _elapsed: SimTime, inputs: &[Event]) {
            self.hits += inputs.len();
        }
    }

    #[test]
    fn test_leaf_basics() {
        let leaf = Component::leaf("Tally", Tally::default());
        assert!(leaf.is_leaf());
        assert!(!leaf.is_container());
        assert!(leaf.children().is_empty());
        assert!(leaf.parent().is_none());
        assert_eq!(leaf.type_name(), "Tally");
        assert_eq!(leaf.size(), 1);
    }

    #[test]
    fn test_digraph_add_sets_parent() {
        let mut dg = Component::digraph("Digraph");
        let id = dg.add("p", Component::leaf("Tally", Tally::default())).unwrap();

        let child = dg.child("p").unwrap();
        assert_eq!(child.id(), id);
        assert_eq!(child.parent(), Some(dg.id()));
        assert_eq!(dg.children().len(), 1);
        assert_eq!(dg.size(), 2);
    }

    #[test]
    fn test_digraph_rejects_bad_names() {
        let mut dg = Component::digraph("Digraph");
        dg.add("a", Component::leaf("Tally", Tally::default())).unwrap();

        let dup = dg.add("a", Component::leaf("Tally", Tally::default()));
        assert_eq!(dup, Err(GraphError::DuplicateName("a".into())));

        let reserved = dg.add(THIS, Component::leaf("Tally", Tally::default()));
        assert_eq!(reserved, Err(GraphError::ReservedName(THIS.into())));
    }

    #[test]
    fn test_leaf_is_not_a_container() {
        let mut leaf = Component::leaf("Tally", Tally::default());
        let err = leaf.add("x", Component::leaf("Tally", Tally::default()));
        assert!(matches!(err, Err(GraphError::NotADigraph(_))));
        let err = leaf.set_wrapped(Component::leaf("Tally", Tally::default()));
        assert!(matches!(err, Err(GraphError::NotAContainer(_))));
    }

    #[test]
    fn test_wrapper_holds_at_most_one() {
        let mut w = Component::wrapper("Wrapper", Passthrough);
        assert!(w.is_container());
        assert!(w.wrapped().is_none());

        let id = w.set_wrapped(Component::leaf("Tally", Tally::default())).unwrap();
        assert_eq!(w.wrapped().unwrap().id(), id);
        assert_eq!(w.wrapped().unwrap().parent(), Some(w.id()));

        let second = w.set_wrapped(Component::leaf("Tally", Tally::default()));
        assert!(matches!(second, Err(GraphError::WrapperOccupied(_))));
        assert_eq!(w.children().len(), 1);
    }

    #[test]
    fn test_couple_validates_endpoints() {
        let mut dg = Component::digraph("Digraph");
        let a = dg.add("a", Component::leaf("Tally", Tally::default())).unwrap();
        let b = dg.add("b", Component::leaf("Tally", Tally::default())).unwrap();
        let own = dg.id();

        dg.couple(a, "out", b, "in").unwrap();
        dg.couple(own, "in", a, "in").unwrap();
        dg.couple(a, "out", b, "in").unwrap(); // duplicate ignored
        assert_eq!(dg.couplings().len(), 2);

        let stranger = Component::leaf("Tally", Tally::default());
        let err = dg.couple(a, "out", stranger.id(), "in");
        assert_eq!(err, Err(GraphError::UnknownEndpoint(stranger.id())));
    }

    #[test]
    fn test_couple_named_and_name_of() {
        let mut dg = Component::digraph("Digraph");
        let a = dg.add("a", Component::leaf("Tally", Tally::default())).unwrap();
        dg.couple_named("a", "out", THIS, "out").unwrap();

        let edge = &dg.couplings()[0];
        assert_eq!(edge.from, Pin::new(a, "out"));
        assert_eq!(edge.to, Pin::new(dg.id(), "out"));
        assert_eq!(dg.name_of(a), Some("a"));
        assert_eq!(dg.name_of(dg.id()), Some(THIS));

        let err = dg.couple_named("zz", "out", "a", "in");
        assert_eq!(err, Err(GraphError::UnknownChild("zz".into())));
    }

    #[test]
    fn test_find_and_downcast() {
        let mut dg = Component::digraph("Digraph");
        let mut inner = Component::digraph("Inner");
        let deep = inner.add("p", Component::leaf("Tally", Tally::default())).unwrap();
        dg.add("inner", inner).unwrap();

        assert_eq!(dg.find(deep).unwrap().type_name(), "Tally");
        assert_eq!(dg.find_by_type("Inner").unwrap().type_name(), "Inner");
        assert!(dg.find_by_type("Missing").is_none());

        dg.find_mut(deep).unwrap().leaf_mut::<Tally>().unwrap().hits = 4;
        assert_eq!(dg.find(deep).unwrap().leaf_ref::<Tally>().unwrap().hits, 4);
        assert!(dg.leaf_ref::<Tally>().is_none());
    }
}
