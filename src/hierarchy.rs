//! Tree-wide operations over heterogeneous component hierarchies.
//!
//! Everything here is written once against the capability model in
//! [`crate::component`]: leaf or container, and if a container, its children.
//!
//! Two event-delivery flavors are provided:
//!
//! - [`inject_events`] / [`extract_output`] broadcast: every child of a
//!   container sees the same events, and a container's output is the flat
//!   union of its children's output. Coupling graphs are not consulted.
//! - [`route_input`] / [`route_output`] follow a digraph's boundary couplings
//!   (`this.port -> child.port` on the way in, `child.port -> this.port` on
//!   the way out) and rename ports accordingly.
//!
//! Wrappers always pass events through their adapter, in both flavors.

use std::collections::HashMap;

use crate::component::{Component, Digraph, Kind};
use crate::error::InitError;
use crate::event::Event;
use crate::types::{ComponentId, SimTime};

/// Delivers `events` to every leaf below `root` (broadcast).
pub fn inject_events(elapsed: SimTime, events: &[Event], root: &mut Component) {
    match root.kind_mut() {
        Kind::Leaf(model) => model.delta_ext(elapsed, events),
        Kind::Wrapper(wrapper) => {
            let inner = wrapper.adapter_mut().translate_input(elapsed, events);
            if let Some(child) = wrapper.child_mut() {
                inject_events(elapsed, &inner, child);
            }
        }
        Kind::Digraph(digraph) => {
            for child in digraph.components_mut() {
                inject_events(elapsed, events, child);
            }
        }
    }
}

/// Collects the output of every leaf below `root` into one flat list.
pub fn extract_output(root: &Component) -> Vec<Event> {
    let mut out = Vec::new();
    collect_output(root, &mut out);
    out
}

fn collect_output(root: &Component, out: &mut Vec<Event>) {
    match root.kind() {
        Kind::Leaf(model) => out.extend(model.output()),
        Kind::Wrapper(wrapper) => {
            if let Some(child) = wrapper.child() {
                out.extend(wrapper.adapter().translate_output(extract_output(child)));
            }
        }
        Kind::Digraph(digraph) => {
            for member in digraph.members() {
                collect_output(&member.component, out);
            }
        }
    }
}

/// Delivers `events` through the coupling graph.
///
/// At each digraph, an event on boundary port `p` reaches every child `c`
/// with a coupling `this.p -> c.q`, renamed to `q`. Children that receive
/// nothing are not called.
pub fn route_input(elapsed: SimTime, events: &[Event], root: &mut Component) {
    let own = root.id();
    match root.kind_mut() {
        Kind::Leaf(model) => model.delta_ext(elapsed, events),
        Kind::Wrapper(wrapper) => {
            let inner = wrapper.adapter_mut().translate_input(elapsed, events);
            if let Some(child) = wrapper.child_mut() {
                route_input(elapsed, &inner, child);
            }
        }
        Kind::Digraph(digraph) => {
            let mut inbox: HashMap<ComponentId, Vec<Event>> = HashMap::new();
            for edge in digraph.couplings().iter().filter(|e| e.from.model == own && e.to.model != own) {
                for event in events.iter().filter(|e| e.port == edge.from.port) {
                    inbox
                        .entry(edge.to.model)
                        .or_default()
                        .push(event.renamed(edge.to.port.as_str()));
                }
            }
            for child in digraph.components_mut() {
                if let Some(bag) = inbox.get(&child.id()) {
                    route_input(elapsed, bag, child);
                }
            }
        }
    }
}

/// Collects output that leaves `root` through its boundary couplings.
///
/// At each digraph, an event a child emits on port `p` surfaces for every
/// coupling `child.p -> this.q`, renamed to `q`. Child-to-child traffic stays
/// inside the digraph and is not returned.
pub fn route_output(root: &Component) -> Vec<Event> {
    match root.kind() {
        Kind::Leaf(model) => model.output(),
        Kind::Wrapper(wrapper) => match wrapper.child() {
            Some(child) => wrapper.adapter().translate_output(route_output(child)),
            None => Vec::new(),
        },
        Kind::Digraph(digraph) => route_digraph_output(root.id(), digraph),
    }
}

fn route_digraph_output(own: ComponentId, digraph: &Digraph) -> Vec<Event> {
    let mut out = Vec::new();
    for member in digraph.members() {
        let child = &member.component;
        let emitted = route_output(child);
        if emitted.is_empty() {
            continue;
        }
        for edge in digraph
            .couplings()
            .iter()
            .filter(|e| e.from.model == child.id() && e.to.model == own)
        {
            out.extend(
                emitted
                    .iter()
                    .filter(|e| e.port == edge.from.port)
                    .map(|e| e.renamed(edge.to.port.as_str())),
            );
        }
    }
    out
}

/// Initializes a hierarchy.
///
/// A component with its own initialization hook is initialized through it and
/// its children are left alone. Otherwise a container initializes its children
/// in order and stops at the first failure.
pub fn try_initialize(root: &mut Component) -> Result<(), InitError> {
    let own = match root.kind_mut() {
        Kind::Leaf(model) => model.as_initialize().map(|init| init.initialize()),
        Kind::Wrapper(wrapper) => wrapper.adapter_mut().as_initialize().map(|init| init.initialize()),
        Kind::Digraph(_) => None,
    };
    match own {
        Some(result) => result.map_err(|source| InitError {
            id: root.id(),
            type_name: root.type_name().to_string(),
            source,
        }),
        None => {
            for child in root.children_mut() {
                try_initialize(child)?;
            }
            Ok(())
        }
    }
}

/// Initializes a hierarchy, reporting only success or failure.
///
/// See [`try_initialize`] for the traversal rules.
pub fn initialize_component(root: &mut Component) -> bool {
    match try_initialize(root) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "initialization failed");
            false
        }
    }
}

/// Deep-clones a hierarchy.
///
/// Leaves and wrappers are cloned through their own cloning hooks; a digraph
/// is rebuilt from clones of its children and its couplings are replayed over
/// the new identities. Returns `None`, discarding everything cloned so far, as
/// soon as any part cannot be cloned.
pub fn clone_component(root: &Component) -> Option<Component> {
    match root.kind() {
        Kind::Leaf(model) => match model.clone_atomic() {
            Some(copy) => Some(Component::new(root.type_name(), Kind::Leaf(copy))),
            None => {
                tracing::debug!(type_name = root.type_name(), "leaf is not cloneable");
                None
            }
        },
        Kind::Wrapper(wrapper) => {
            let Some(adapter) = wrapper.adapter().clone_adapter() else {
                tracing::debug!(type_name = root.type_name(), "wrapper is not cloneable");
                return None;
            };
            let mut copy = Component::new(root.type_name(), Kind::wrapper_boxed(adapter));
            if let Some(child) = wrapper.child() {
                let child_copy = clone_component(child)?;
                copy.set_wrapped(child_copy).ok()?;
            }
            Some(copy)
        }
        Kind::Digraph(digraph) => clone_digraph(root, digraph),
    }
}

fn clone_digraph(root: &Component, digraph: &Digraph) -> Option<Component> {
    let mut copy = Component::digraph(root.type_name());
    let mut mirror: HashMap<ComponentId, ComponentId> = HashMap::new();
    mirror.insert(root.id(), copy.id());

    for member in digraph.members() {
        let Some(child_copy) = clone_component(&member.component) else {
            tracing::debug!(child = %member.name, "aborting digraph clone");
            return None;
        };
        let new_id = copy.add(member.name.clone(), child_copy).ok()?;
        mirror.insert(member.component.id(), new_id);
    }

    for edge in digraph.couplings() {
        let (Some(&from), Some(&to)) = (mirror.get(&edge.from.model), mirror.get(&edge.to.model)) else {
            tracing::debug!(from = %edge.from.model, to = %edge.to.model, "coupling endpoint not cloned");
            return None;
        };
        copy.couple(from, edge.from.port.clone(), to, edge.to.port.clone()).ok()?;
    }

    Some(copy)
}

/// Parent links of a hierarchy, indexed by component id.
#[derive(Clone, Debug, Default)]
pub struct ParentIndex {
    parents: HashMap<ComponentId, Option<ComponentId>>,
}

impl ParentIndex {
    /// Records the parent link of every component in `root`'s subtree.
    pub fn new(root: &Component) -> Self {
        let mut index = Self::default();
        index.record(root);
        index
    }

    fn record(&mut self, component: &Component) {
        self.parents.insert(component.id(), component.parent());
        for child in component.children() {
            self.record(child);
        }
    }

    /// Returns the parent of `id`, if known.
    pub fn parent_of(&self, id: ComponentId) -> Option<ComponentId> {
        self.parents.get(&id).copied().flatten()
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.parents.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Follows parent links from `id` until a component without a parent.
pub fn get_root_component(index: &ParentIndex, id: ComponentId) -> ComponentId {
    let mut current = id;
    while let Some(parent) = index.parent_of(current) {
        current = parent;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Passthrough;
    use crate::error::LogicError;
    use crate::models::mock::{Counter, Generator, Observer};
    use crate::models::PortMap;

    fn pipeline() -> Component {
        let mut dg = Component::digraph("Digraph");
        dg.add("g", Component::leaf("Gen", Generator::default())).unwrap();
        dg.add("o", Component::leaf("Obs", Observer::default())).unwrap();
        dg.couple_named("g", "out", "o", "in").unwrap();
        dg.couple_named("this", "in", "o", "in").unwrap();
        dg.couple_named("g", "out", "this", "out").unwrap();
        dg
    }

    #[test]
    fn test_inject_broadcasts_to_every_leaf() {
        let mut dg = Component::digraph("Digraph");
        dg.add("a", Component::leaf("Counter", Counter::default())).unwrap();
        let mut inner = Component::digraph("Digraph");
        inner.add("b", Component::leaf("Counter", Counter::default())).unwrap();
        dg.add("inner", inner).unwrap();

        inject_events(0.5, &[Event::number("x", 1.0), Event::number("y", 2.0)], &mut dg);

        let a = dg.child("a").unwrap().leaf_ref::<Counter>().unwrap();
        let b = dg.child("inner").unwrap().child("b").unwrap().leaf_ref::<Counter>().unwrap();
        assert_eq!((a.transitions, a.events), (1, 2));
        assert_eq!((b.transitions, b.events), (1, 2));
    }

    #[test]
    fn test_extract_collects_every_leaf() {
        let mut dg = pipeline();
        inject_events(0.0, &[Event::text("tick", "")], &mut dg);

        let out = extract_output(&dg);
        // Gen emits, Obs emits nothing
        assert_eq!(out, vec![Event::number("out", 1.0)]);
    }

    #[test]
    fn test_wrapper_translates_both_ways() {
        let mut w = Component::wrapper("PortMap", PortMap::default().map_input("ext", "in").map_output("out", "ext_out"));
        w.set_wrapped(Component::leaf("Obs", Observer::default())).unwrap();

        inject_events(0.0, &[Event::number("ext", 5.0)], &mut w);
        assert_eq!(w.wrapped().unwrap().leaf_ref::<Observer>().unwrap().seen, vec![5.0]);

        let mut w = Component::wrapper("PortMap", PortMap::default().map_output("out", "ext_out"));
        w.set_wrapped(Component::leaf("Gen", Generator::default())).unwrap();
        assert_eq!(extract_output(&w), vec![Event::number("ext_out", 0.0)]);
    }

    #[test]
    fn test_empty_wrapper_is_inert() {
        let mut w = Component::wrapper("Wrapper", Passthrough);
        inject_events(0.0, &[Event::number("x", 1.0)], &mut w);
        assert!(extract_output(&w).is_empty());
        assert!(route_output(&w).is_empty());
    }

    #[test]
    fn test_route_input_follows_boundary_couplings() {
        let mut dg = pipeline();
        route_input(0.0, &[Event::number("in", 7.0), Event::text("tick", "")], &mut dg);

        let obs = dg.child("o").unwrap().leaf_ref::<Observer>().unwrap();
        assert_eq!(obs.seen, vec![7.0]);
        // no this.tick coupling, so the generator saw nothing
        let gen = dg.child("g").unwrap().leaf_ref::<Generator>().unwrap();
        assert_eq!(gen.count, 0);
    }

    #[test]
    fn test_route_output_only_surfaces_boundary_edges() {
        let mut dg = Component::digraph("Digraph");
        dg.add("g", Component::leaf("Gen", Generator::default())).unwrap();
        dg.add("c", Component::leaf("Counter", Counter::default())).unwrap();
        dg.couple_named("g", "out", "this", "y").unwrap();

        assert_eq!(route_output(&dg), vec![Event::number("y", 0.0)]);
        // broadcast extraction sees both leaves
        assert_eq!(extract_output(&dg).len(), 2);
    }

    struct Scripted {
        fail: bool,
        calls: std::sync::Arc<std::sync::Mutex<Vec<&'static str>>>,
        name: &'static str,
    }

    impl crate::component::Initialize for Scripted {
        fn initialize(&mut self) -> Result<(), LogicError> {
            self.calls.lock().unwrap().push(self.name);
            if self.fail {
                Err(LogicError::new("scripted failure"))
            } else {
                Ok(())
            }
        }
    }

    impl crate::component::Atomic for Scripted {
        fn as_initialize(&mut self) -> Option<&mut dyn crate::component::Initialize> {
            Some(self)
        }
    }

    #[test]
    fn test_initialize_short_circuits() {
        let calls = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut dg = Component::digraph("Digraph");
        for (name, fail) in [("first", false), ("second", true), ("third", false)] {
            let leaf = Scripted {
                fail,
                calls: calls.clone(),
                name,
            };
            dg.add(name, Component::leaf("Scripted", leaf)).unwrap();
        }

        assert!(!initialize_component(&mut dg));
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);

        let err = try_initialize(&mut dg).unwrap_err();
        assert_eq!(err.id, dg.child("second").unwrap().id());
        assert_eq!(err.source, LogicError::new("scripted failure"));
    }

    #[test]
    fn test_initialize_without_hooks_succeeds() {
        let mut dg = Component::digraph("Digraph");
        dg.add("c", Component::leaf("Counter", Counter::default())).unwrap();
        assert!(initialize_component(&mut dg));
    }

    #[test]
    fn test_clone_is_isomorphic_with_fresh_ids() {
        let mut dg = pipeline();
        inject_events(0.0, &[Event::text("tick", "")], &mut dg);

        let copy = clone_component(&dg).unwrap();
        assert_ne!(copy.id(), dg.id());
        assert!(copy.parent().is_none());
        assert_eq!(copy.size(), dg.size());

        let g = copy.child("g").unwrap();
        assert_ne!(g.id(), dg.child("g").unwrap().id());
        assert_eq!(g.parent(), Some(copy.id()));
        assert_eq!(g.leaf_ref::<Generator>().unwrap().count, 1);

        let names = |c: &Component| {
            let mut edges: Vec<_> = c
                .couplings()
                .iter()
                .map(|e| {
                    (
                        c.name_of(e.from.model).unwrap().to_string(),
                        e.from.port.clone(),
                        c.name_of(e.to.model).unwrap().to_string(),
                        e.to.port.clone(),
                    )
                })
                .collect();
            edges.sort();
            edges
        };
        assert_eq!(names(&copy), names(&dg));
    }

    #[test]
    fn test_clone_fails_atomically() {
        let mut dg = pipeline();
        dg.add("c", Component::leaf("Counter", Counter::default())).unwrap();
        assert!(clone_component(&dg).is_none());
    }

    #[test]
    fn test_clone_wrapper() {
        let mut w = Component::wrapper("Wrapper", Passthrough);
        w.set_wrapped(Component::leaf("Gen", Generator::with_period(3.0))).unwrap();
        let copy = clone_component(&w).unwrap();
        let inner = copy.wrapped().unwrap();
        assert_eq!(inner.leaf_ref::<Generator>().unwrap().period, 3.0);
        assert_eq!(inner.parent(), Some(copy.id()));
    }

    #[test]
    fn test_uncloneable_wrapper_yields_none() {
        struct Fixed;
        impl crate::component::Adapter for Fixed {}

        let mut w = Component::wrapper("Fixed", Fixed);
        w.set_wrapped(Component::leaf("Gen", Generator::default())).unwrap();
        assert!(clone_component(&w).is_none());
    }

    #[test]
    fn test_root_lookup() {
        let mut outer = Component::digraph("Digraph");
        let mut inner = Component::digraph("Digraph");
        let leaf = inner.add("g", Component::leaf("Gen", Generator::default())).unwrap();
        let inner_id = outer.add("inner", inner).unwrap();

        let index = ParentIndex::new(&outer);
        assert_eq!(index.len(), 3);
        assert_eq!(index.parent_of(leaf), Some(inner_id));
        assert_eq!(get_root_component(&index, leaf), outer.id());
        assert_eq!(get_root_component(&index, outer.id()), outer.id());
    }
}
