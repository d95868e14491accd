use polars::prelude::*;

use crate::error::AssemblyError;
use crate::registry::ColumnRegistry;
use crate::schema;
use crate::time_axis::TimeAxis;

/// The live columns of a run, `Time` first, all of the axis length.
#[derive(Debug, Clone)]
pub struct WorkingTable {
    df: DataFrame,
    len: usize,
}

impl WorkingTable {
    pub fn new(axis: &TimeAxis) -> Result<Self, AssemblyError> {
        Self::from_timestamps(axis.timestamps())
    }

    pub(crate) fn from_timestamps(timestamps: Vec<i64>) -> Result<Self, AssemblyError> {
        let len = timestamps.len();
        let time = Column::new(schema::table::TIME.into(), timestamps);
        let df = DataFrame::new(vec![time])?;
        Ok(Self { df, len })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Row count, equal to the time-axis length.
    pub fn height(&self) -> usize {
        self.len
    }

    /// Column count including `Time`.
    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names_str()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    pub fn name_at(&self, idx: usize) -> Result<String, AssemblyError> {
        self.df
            .get_columns()
            .get(idx)
            .map(|c| c.name().to_string())
            .ok_or_else(|| {
                AssemblyError::Shape(format!(
                    "column index {idx} out of bounds for table of width {}",
                    self.width()
                ))
            })
    }

    /// Insert or overwrite a value column.
    ///
    /// An existing column with the same name is replaced in place.
    /// `source_name` identifies the producer in a length mismatch error.
    pub fn set_column(
        &mut self,
        name: &str,
        values: Vec<f64>,
        source_name: &str,
    ) -> Result<(), AssemblyError> {
        if name == schema::table::TIME {
            return Err(AssemblyError::Shape(format!(
                "'{name}' is reserved for the time axis ({source_name})"
            )));
        }
        if values.len() != self.len {
            return Err(AssemblyError::length_mismatch(
                source_name,
                self.len,
                values.len(),
            ));
        }
        self.df.with_column(Column::new(name.into(), values))?;
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<(), AssemblyError> {
        if name == schema::table::TIME {
            return Err(AssemblyError::Shape("the time axis cannot be dropped".into()));
        }
        self.df.drop_in_place(name)?;
        Ok(())
    }

    pub fn values(&self, name: &str) -> Result<Vec<f64>, AssemblyError> {
        let column = self
            .df
            .column(name)
            .map_err(|_| AssemblyError::Shape(format!("no column named '{name}'")))?;
        column_to_f64(column)
    }

    pub fn values_at(&self, idx: usize) -> Result<Vec<f64>, AssemblyError> {
        let name = self.name_at(idx)?;
        self.values(&name)
    }

    pub fn timestamps(&self) -> Result<Vec<i64>, AssemblyError> {
        let time = self.df.column(schema::table::TIME)?.as_materialized_series().i64()?;
        time.into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| AssemblyError::Shape(format!("null timestamp at row {i}")))
            })
            .collect()
    }
}

fn column_to_f64(column: &Column) -> Result<Vec<f64>, AssemblyError> {
    let cast = column.cast(&DataType::Float64)?;
    let values = cast.as_materialized_series().f64()?;
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.ok_or_else(|| {
                AssemblyError::Shape(format!("null value in '{}' at row {i}", column.name()))
            })
        })
        .collect()
}

/// Working table plus its registry, handed from stage to stage by value.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub table: WorkingTable,
    pub registry: ColumnRegistry,
}

impl Assembly {
    pub fn new(axis: &TimeAxis) -> Result<Self, AssemblyError> {
        Ok(Self {
            table: WorkingTable::new(axis)?,
            registry: ColumnRegistry::new(),
        })
    }

    /// Names of value columns that have no registry entry, in table order.
    pub fn unregistered_columns(&self) -> Vec<String> {
        self.table
            .column_names()
            .into_iter()
            .skip(1)
            .filter(|name| !self.registry.contains(name))
            .collect()
    }
}
