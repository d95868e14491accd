use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::schema::semantic;

/// What a column means to the optimizer. Rendered verbatim in header row 2.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum SemanticType {
    Load,
    Generation,
    Massflow,
    Temperature,
    Derived,
    /// Any other token, kept exactly as written (e.g. `Generation`).
    Other(String),
}

impl SemanticType {
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            semantic::LOAD => SemanticType::Load,
            semantic::GENERATION => SemanticType::Generation,
            semantic::MASSFLOW => SemanticType::Massflow,
            semantic::TEMPERATURE => SemanticType::Temperature,
            semantic::DERIVED => SemanticType::Derived,
            other => SemanticType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SemanticType::Load => semantic::LOAD,
            SemanticType::Generation => semantic::GENERATION,
            SemanticType::Massflow => semantic::MASSFLOW,
            SemanticType::Temperature => semantic::TEMPERATURE,
            SemanticType::Derived => semantic::DERIVED,
            SemanticType::Other(s) => s,
        }
    }
}

impl From<String> for SemanticType {
    fn from(s: String) -> Self {
        SemanticType::parse(&s)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-column metadata that travels with the working table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    /// Maximum magnitude for sampled zones, divisor for imported series.
    pub scale: Option<f64>,
    /// Reference-shape id the column was sampled from.
    pub shape_ref: Option<i64>,
    pub semantic_type: SemanticType,
    pub unit: String,
}

impl ColumnMeta {
    pub fn new(semantic_type: SemanticType, unit: impl Into<String>) -> Self {
        Self {
            scale: None,
            shape_ref: None,
            semantic_type,
            unit: unit.into(),
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_shape_ref(mut self, shape_ref: i64) -> Self {
        self.shape_ref = Some(shape_ref);
        self
    }
}

/// Ordered map from column name to its metadata.
///
/// Registering an existing name replaces the entry in place (last write wins)
/// and keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    entries: IndexMap<String, ColumnMeta>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry that was replaced, if any.
    pub fn register(&mut self, name: impl Into<String>, meta: ColumnMeta) -> Option<ColumnMeta> {
        self.entries.insert(name.into(), meta)
    }

    pub fn remove(&mut self, name: &str) -> Option<ColumnMeta> {
        self.entries.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ColumnMeta> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnMeta)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_tokens_render_as_parsed() {
        for token in ["load", "generation", "massflow", "temperature", "derived", "Generation"] {
            assert_eq!(SemanticType::parse(token).as_str(), token);
        }
        assert_eq!(
            SemanticType::parse("Generation"),
            SemanticType::Other("Generation".into())
        );
    }

    #[test]
    fn last_registration_wins_and_keeps_position() {
        let mut reg = ColumnRegistry::new();
        reg.register("A", ColumnMeta::new(SemanticType::Load, "MW"));
        reg.register("B", ColumnMeta::new(SemanticType::Load, "MW"));
        let prev = reg.register("A", ColumnMeta::new(SemanticType::Generation, "kW"));

        assert_eq!(prev.map(|m| m.unit), Some("MW".to_string()));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(reg.get("A").unwrap().semantic_type, SemanticType::Generation);
        assert_eq!(reg.get("A").unwrap().unit, "kW");
    }

    #[test]
    fn remove_drops_entry_and_preserves_order() {
        let mut reg = ColumnRegistry::new();
        for name in ["A", "B", "C"] {
            reg.register(name, ColumnMeta::new(SemanticType::Load, "MW"));
        }
        assert!(reg.remove("B").is_some());
        assert!(reg.remove("B").is_none());
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["A", "C"]);
    }
}
