//! External series (renewables.ninja PV, wind and demand exports) pulled into
//! the working table by column position.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::AssemblyError;
use crate::io::{parse_numeric, read_numeric_block};
use crate::registry::{ColumnMeta, SemanticType};
use crate::table::Assembly;

/// renewables.ninja exports open with three `#` comment lines.
pub const DEFAULT_SKIP_ROWS: usize = 3;

/// One import call: which source columns land under which names.
#[derive(Debug, Clone)]
pub struct SeriesImport {
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub positions: Vec<usize>,
    pub divisor: f64,
    pub semantic_type: SemanticType,
    pub unit: String,
    pub skip_rows: usize,
    pub separator: u8,
}

impl SeriesImport {
    pub fn new(
        path: impl Into<PathBuf>,
        columns: Vec<String>,
        positions: Vec<usize>,
        divisor: f64,
    ) -> Self {
        Self {
            path: path.into(),
            columns,
            positions,
            divisor,
            semantic_type: SemanticType::Load,
            unit: "MW".to_string(),
            skip_rows: DEFAULT_SKIP_ROWS,
            separator: b',',
        }
    }

    pub fn with_semantic_type(mut self, semantic_type: SemanticType) -> Self {
        self.semantic_type = semantic_type;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    fn validate(&self) -> Result<(), AssemblyError> {
        if self.divisor == 0.0 || !self.divisor.is_finite() {
            return Err(AssemblyError::InvalidDivisor {
                path: self.path.clone(),
                divisor: self.divisor,
            });
        }
        if self.columns.len() != self.positions.len() {
            return Err(AssemblyError::Shape(format!(
                "{}: {} column names for {} positions",
                self.path.display(),
                self.columns.len(),
                self.positions.len()
            )));
        }
        Ok(())
    }
}

/// Read `import.path` and set each destination column to the selected source
/// column divided by `import.divisor`.
///
/// A destination name that already exists is overwritten in place, registry
/// entry included. All selected columns are parsed before the table changes.
pub fn load_series(mut assembly: Assembly, import: &SeriesImport) -> Result<Assembly, AssemblyError> {
    import.validate()?;

    let df = read_numeric_block(&import.path, import.skip_rows, import.separator)?;
    let source_name = import.path.display().to_string();
    if df.height() != assembly.table.height() {
        return Err(AssemblyError::length_mismatch(
            source_name,
            assembly.table.height(),
            df.height(),
        ));
    }

    let mut parsed = Vec::with_capacity(import.columns.len());
    for (name, &position) in import.columns.iter().zip(&import.positions) {
        let column = df.get_columns().get(position).ok_or_else(|| {
            AssemblyError::Shape(format!(
                "{}: column position {position} out of bounds for width {}",
                source_name,
                df.width()
            ))
        })?;
        let values = parse_numeric(column, &import.path)?
            .into_iter()
            .map(|v| v / import.divisor)
            .collect::<Vec<_>>();
        debug!(column = %name, source = %column.name(), position, "imported series column");
        parsed.push((name, values));
    }

    for (name, values) in parsed {
        assembly.table.set_column(name, values, &source_name)?;
        let meta = ColumnMeta::new(import.semantic_type.clone(), import.unit.clone())
            .with_scale(import.divisor);
        if assembly.registry.register(name.clone(), meta).is_some() {
            debug!(column = %name, "overwrote existing column");
        }
    }

    info!(
        file = %source_name,
        columns = import.columns.len(),
        divisor = import.divisor,
        "loaded external series"
    );
    Ok(assembly)
}
