//! A wrapper adapter that renames ports across the wrapper boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::component::Adapter;
use crate::error::{LogicError, StateError};
use crate::event::Event;
use crate::types::SimTime;

/// Renames ports between a wrapper's external vocabulary and its child's.
///
/// Events on unmapped ports cross the boundary unchanged. The maps come from
/// the `properties` object of the wrapper's configuration, which may carry
/// `inputs` and/or `outputs`; any other key is rejected.
///
/// ```
/// use kumiki::component::Adapter;
/// use kumiki::event::Event;
/// use kumiki::models::PortMap;
///
/// let mut map = PortMap::default().map_input("request", "in");
/// let inner = map.translate_input(0.0, &[Event::number("request", 1.0)]);
/// assert_eq!(inner[0].port, "in");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortMap {
    /// external port -> child port
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    /// child port -> external port
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

impl PortMap {
    /// Builds a port map from `{"inputs": {..}, "outputs": {..}}`.
    pub fn from_json(args: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(args.clone()).ok()
    }

    pub fn map_input(mut self, external: impl Into<String>, internal: impl Into<String>) -> Self {
        self.inputs.insert(external.into(), internal.into());
        self
    }

    pub fn map_output(mut self, internal: impl Into<String>, external: impl Into<String>) -> Self {
        self.outputs.insert(internal.into(), external.into());
        self
    }
}

impl Adapter for PortMap {
    fn translate_input(&mut self, _elapsed: SimTime, external: &[Event]) -> Vec<Event> {
        external
            .iter()
            .map(|event| match self.inputs.get(&event.port) {
                Some(port) => event.renamed(port.as_str()),
                None => event.clone(),
            })
            .collect()
    }

    fn translate_output(&self, internal: Vec<Event>) -> Vec<Event> {
        internal
            .into_iter()
            .map(|event| match self.outputs.get(&event.port) {
                Some(port) => Event {
                    port: port.clone(),
                    value: event.value,
                },
                None => event,
            })
            .collect()
    }

    fn configure(&mut self, config: &serde_json::Value) -> Result<(), LogicError> {
        let Some(props) = config.get("properties") else {
            return Ok(());
        };
        let map: PortMap = serde_json::from_value(props.clone())
            .map_err(|err| LogicError::new(format!("invalid port map: {err}")))?;
        tracing::debug!(inputs = map.inputs.len(), outputs = map.outputs.len(), "port map configured");
        *self = map;
        Ok(())
    }

    fn clone_adapter(&self) -> Option<Box<dyn Adapter>> {
        Some(Box::new(self.clone()))
    }

    fn save_state(&self) -> Result<serde_json::Value, StateError> {
        Ok(serde_json::to_value(self)?)
    }

    fn restore_state(&mut self, state: &serde_json::Value) -> Result<(), StateError> {
        *self = serde_json::from_value(state.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renames_both_directions() {
        let mut map = PortMap::default()
            .map_input("request", "in")
            .map_output("out", "reply");

        let inner = map.translate_input(0.0, &[Event::number("request", 1.0), Event::number("misc", 2.0)]);
        assert_eq!(inner[0].port, "in");
        assert_eq!(inner[1].port, "misc");

        let outer = map.translate_output(vec![Event::number("out", 3.0)]);
        assert_eq!(outer, vec![Event::number("reply", 3.0)]);
    }

    #[test]
    fn test_configure_from_wrapper_config() {
        let mut map = PortMap::default().map_input("old", "in");
        let cfg = serde_json::json!({
            "typeName": "PortMap",
            "properties": {"inputs": {"x": "in"}}
        });
        map.configure(&cfg).unwrap();
        assert_eq!(map.inputs.get("x").map(String::as_str), Some("in"));
        assert!(map.inputs.get("old").is_none());
    }

    #[test]
    fn test_configure_without_properties_keeps_maps() {
        let mut map = PortMap::default().map_input("x", "in");
        map.configure(&serde_json::json!({"typeName": "PortMap"})).unwrap();
        assert_eq!(map.inputs.len(), 1);
    }

    #[test]
    fn test_configure_rejects_foreign_properties() {
        let mut map = PortMap::default().map_input("x", "in");
        let cfg = serde_json::json!({"properties": {"note": "outer"}});
        assert!(map.configure(&cfg).is_err());
        assert_eq!(map.inputs.get("x").map(String::as_str), Some("in"));
    }

    #[test]
    fn test_properties_port_events_cross_unchanged() {
        let mut map = PortMap::default().map_input("x", "in");
        let payload = serde_json::json!({"properties": {"inputs": {}}});
        let forwarded = map.translate_input(0.0, &[Event::json(crate::types::PROPERTIES_PORT, payload)]);
        assert_eq!(forwarded.len(), 1);
        assert_eq!(map.inputs.len(), 1);
    }

    #[test]
    fn test_from_json() {
        let map = PortMap::from_json(&serde_json::json!({"outputs": {"a": "b"}})).unwrap();
        assert_eq!(map.outputs.get("a").map(String::as_str), Some("b"));
        assert!(PortMap::from_json(&serde_json::json!({"inputs": 3})).is_none());
        assert!(PortMap::from_json(&serde_json::json!({"note": "x"})).is_none());
    }
}
