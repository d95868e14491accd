use serde::Deserialize;
use tracing::{debug, info};

use crate::error::AssemblyError;
use crate::registry::{ColumnMeta, SemanticType};
use crate::table::Assembly;

/// Sum of existing columns, addressed by their position in the working table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeRule {
    pub name: String,
    /// Table positions of the summed columns; `Time` sits at 0 and is not allowed.
    pub columns_idx: Vec<usize>,
    #[serde(rename = "load_type")]
    pub semantic_type: SemanticType,
    #[serde(rename = "units")]
    pub unit: String,
}

impl MergeRule {
    pub fn new(
        name: impl Into<String>,
        columns_idx: Vec<usize>,
        semantic_type: SemanticType,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns_idx,
            semantic_type,
            unit: unit.into(),
        }
    }
}

/// Apply `rules` in order. Each rule sees the table as left by the previous one.
///
/// With `drop_originals` the summed columns leave the table and the registry,
/// except a source that shares the merged column's name.
pub fn merge_loads(
    mut assembly: Assembly,
    rules: &[MergeRule],
    drop_originals: bool,
) -> Result<Assembly, AssemblyError> {
    for rule in rules {
        if rule.columns_idx.is_empty() {
            return Err(AssemblyError::Shape(format!(
                "merge '{}' lists no source columns",
                rule.name
            )));
        }

        let mut sources = Vec::with_capacity(rule.columns_idx.len());
        let mut sum = vec![0.0; assembly.table.height()];
        for &idx in &rule.columns_idx {
            if idx == 0 {
                return Err(AssemblyError::Shape(format!(
                    "merge '{}' cannot include the time axis",
                    rule.name
                )));
            }
            let name = assembly.table.name_at(idx).map_err(|_| {
                AssemblyError::Shape(format!(
                    "merge '{}' references column {idx}, table has {} columns",
                    rule.name,
                    assembly.table.width()
                ))
            })?;
            let values = assembly.table.values_at(idx)?;
            if values.len() != sum.len() {
                return Err(AssemblyError::length_mismatch(&name, sum.len(), values.len()));
            }
            for (acc, v) in sum.iter_mut().zip(values) {
                *acc += v;
            }
            sources.push(name);
        }

        let source_name = format!("merge '{}'", rule.name);
        assembly.table.set_column(&rule.name, sum, &source_name)?;
        assembly.registry.register(
            rule.name.clone(),
            ColumnMeta::new(rule.semantic_type.clone(), rule.unit.clone()),
        );

        if drop_originals {
            for source in sources.iter().filter(|s| **s != rule.name) {
                // Listing the same index twice must not drop twice.
                if assembly.table.contains(source) {
                    assembly.table.drop_column(source)?;
                }
                assembly.registry.remove(source);
            }
        }

        debug!(merged = %rule.name, sources = ?sources, drop_originals, "merged columns");
    }

    info!(rules = rules.len(), drop_originals, "merged loads");
    Ok(assembly)
}
