//! Named evidence collected by one evaluation cycle.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A single piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SignalValue {
    Flag(bool),
    Number(f64),
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Flag(v) => write!(f, "{}", v),
            SignalValue::Number(v) => write!(f, "{}", v),
        }
    }
}

/// Per-cycle evidence bundle plus the site rule's verdict.
///
/// Signal names are fixed per site; the map keeps them ordered so log
/// lines are stable between cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdSignal {
    values: BTreeMap<&'static str, SignalValue>,
    detected: bool,
}

impl AdSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a boolean signal.
    pub fn flag(mut self, name: &'static str, value: bool) -> Self {
        self.values.insert(name, SignalValue::Flag(value));
        self
    }

    /// Record a numeric signal; absent values are left out.
    pub fn number(mut self, name: &'static str, value: Option<f64>) -> Self {
        if let Some(value) = value {
            self.values.insert(name, SignalValue::Number(value));
        }
        self
    }

    /// Set the site rule's conclusion.
    pub fn with_detected(mut self, detected: bool) -> Self {
        self.detected = detected;
        self
    }

    pub fn is_detected(&self) -> bool {
        self.detected
    }

    /// Value of a boolean signal; unknown names read as `false`.
    pub fn get_flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(SignalValue::Flag(true)))
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(SignalValue::Number(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, SignalValue)> + '_ {
        self.values.iter().map(|(name, value)| (*name, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for AdSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "detected={}", self.detected)?;
        for (name, value) in &self.values {
            write!(f, " {}={}", name, value)?;
        }
        Ok(())
    }
}
