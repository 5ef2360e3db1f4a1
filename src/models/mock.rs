//! Reference leaf models.
//!
//! These models have simple, predictable behavior and implement every
//! optional capability, which makes them useful for exercising builders,
//! hierarchy operations and round-trips.

use serde::{Deserialize, Serialize};

use crate::component::{Atomic, Initialize};
use crate::error::{LogicError, StateError};
use crate::event::Event;
use crate::types::{SimTime, PROPERTIES_PORT};

/// Emits its sequence number on `out`.
///
/// Accepts `{"period": <number>}` on the properties port and counts every
/// `tick` event it receives.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Generator {
    /// Interval between emissions
    pub period: f64,
    /// Number of ticks seen so far
    pub count: u64,
}

impl Generator {
    pub fn with_period(period: f64) -> Self {
        Self { period, count: 0 }
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::with_period(1.0)
    }
}

impl Initialize for Generator {
    fn initialize(&mut self) -> Result<(), LogicError> {
        if !self.period.is_finite() || self.period <= 0.0 {
            return Err(LogicError::new(format!("period must be positive, got {}", self.period)));
        }
        self.count = 0;
        Ok(())
    }
}

impl Atomic for Generator {
    fn delta_ext(&mut self, _elapsed: SimTime, inputs: &[Event]) {
        for event in inputs {
            match event.port.as_str() {
                PROPERTIES_PORT => {
                    if let Some(period) = event.value.as_json().and_then(|v| v.get("period")).and_then(|p| p.as_f64()) {
                        self.period = period;
                    }
                }
                "tick" => self.count += 1,
                _ => {}
            }
        }
    }

    fn output(&self) -> Vec<Event> {
        vec![Event::number("out", self.count as f64)]
    }

    fn as_initialize(&mut self) -> Option<&mut dyn Initialize> {
        Some(self)
    }

    fn clone_atomic(&self) -> Option<Box<dyn Atomic>> {
        Some(Box::new(self.clone()))
    }

    fn save_state(&self) -> Result<serde_json::Value, StateError> {
        if !self.period.is_finite() {
            return Err(StateError::new(format!("period must be finite, got {}", self.period)));
        }
        Ok(serde_json::to_value(self)?)
    }

    fn restore_state(&mut self, state: &serde_json::Value) -> Result<(), StateError> {
        *self = serde_json::from_value(state.clone())?;
        Ok(())
    }
}

/// Records every numeric value arriving on `in`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Observer {
    /// Values seen, in arrival order
    pub seen: Vec<f64>,
}

impl Initialize for Observer {
    fn initialize(&mut self) -> Result<(), LogicError> {
        self.seen.clear();
        Ok(())
    }
}

impl Atomic for Observer {
    fn delta_ext(&mut self, _elapsed: SimTime, inputs: &[Event]) {
        self.seen.extend(
            inputs
                .iter()
                .filter(|e| e.port == "in")
                .filter_map(|e| e.value.as_f64()),
        );
    }

    fn as_initialize(&mut self) -> Option<&mut dyn Initialize> {
        Some(self)
    }

    fn clone_atomic(&self) -> Option<Box<dyn Atomic>> {
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

/// Counts external transitions and the events they carried.
///
/// Has no initialization hook and cannot be cloned.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Counter {
    /// Number of `delta_ext` calls
    pub transitions: u64,
    /// Number of events received
    pub events: u64,
}

impl Atomic for Counter {
    fn delta_ext(&mut self, _elapsed: SimTime, inputs: &[Event]) {
        self.transitions += 1;
        self.events += inputs.len() as u64;
    }

    fn output(&self) -> Vec<Event> {
        vec![Event::number("count", self.events as f64)]
    }

    fn save_state(&self) -> Result<serde_json::Value, StateError> {
        Ok(serde_json::to_value(self)?)
    }

    fn restore_state(&mut self, state: &serde_json::Value) -> Result<(), StateError> {
        *self = serde_json::from_value(state.clone())?;
        Ok(())
    }
}
