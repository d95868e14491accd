//! Heat-pump coefficient of performance derived from ambient temperature.
//!
//! The full physical simulation lives outside this crate. Here the COP is
//! interpolated from a reference curve per part-load ratio, which is enough to
//! give the optimizer a per-hour efficiency column.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDateTime};
use polars::prelude::*;
use serde::Deserialize;
use tracing::info;

use crate::error::AssemblyError;
use crate::io::parse_numeric;
use crate::registry::{ColumnMeta, SemanticType};
use crate::schema::weather;
use crate::table::Assembly;

const CURVE_TEMPS: [f64; 8] = [-15.0, -10.0, -5.0, 0.0, 5.0, 10.0, 15.0, 20.0];
const COP_FULL_LOAD: [f64; 8] = [2.80, 3.00, 3.20, 3.35, 3.45, 3.55, 3.62, 3.70];
const COP_PART_LOAD_60: [f64; 8] = [3.20, 3.35, 3.55, 3.70, 3.85, 4.00, 4.15, 4.30];
const COP_PART_LOAD_30: [f64; 8] = [3.45, 3.60, 3.85, 4.05, 4.25, 4.40, 4.50, 4.60];

const SUMMER_MONTHS: [u32; 3] = [6, 7, 8];
const WINTER_MONTHS: [u32; 3] = [12, 1, 2];

const TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// COP as a function of ambient temperature at one part-load ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopCurve {
    temps: [f64; 8],
    cops: [f64; 8],
}

impl CopCurve {
    /// Reference curves exist for ratios 1.0, 0.6 and 0.3 only.
    pub fn for_part_load(ratio: f64) -> Option<Self> {
        let cops = if ratio == 1.0 {
            COP_FULL_LOAD
        } else if ratio == 0.6 {
            COP_PART_LOAD_60
        } else if ratio == 0.3 {
            COP_PART_LOAD_30
        } else {
            return None;
        };
        Some(Self {
            temps: CURVE_TEMPS,
            cops,
        })
    }

    /// Linear interpolation, clamped to the curve's temperature range.
    pub fn cop_at(&self, temp_c: f64) -> f64 {
        let t = temp_c.clamp(self.temps[0], self.temps[self.temps.len() - 1]);
        let upper = self
            .temps
            .iter()
            .position(|&x| x >= t)
            .unwrap_or(self.temps.len() - 1);
        if self.temps[upper] == t {
            return self.cops[upper];
        }
        let (x0, x1) = (self.temps[upper - 1], self.temps[upper]);
        let (y0, y1) = (self.cops[upper - 1], self.cops[upper]);
        y0 + (y1 - y0) * (t - x0) / (x1 - x0)
    }
}

/// Hourly 2 m air temperature from a renewables.ninja weather export.
#[derive(Debug, Clone)]
pub struct TemperatureSeries {
    times: Vec<NaiveDateTime>,
    t2m: Vec<f64>,
}

impl TemperatureSeries {
    pub fn new(times: Vec<NaiveDateTime>, t2m: Vec<f64>) -> Result<Self, AssemblyError> {
        if times.len() != t2m.len() {
            return Err(AssemblyError::length_mismatch("temperature series", times.len(), t2m.len()));
        }
        Ok(Self { times, t2m })
    }

    /// Load a `#`-commented CSV with `time` and `t2m` columns.
    pub fn from_csv(path: &Path) -> Result<Self, AssemblyError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .map_parse_options(|opts| opts.with_comment_prefix(Some(weather::COMMENT_PREFIX)))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(|e| AssemblyError::config_load(path, e.to_string()))?;

        let column = |name: &str| {
            df.column(name)
                .map_err(|_| AssemblyError::config_load(path, format!("missing column '{name}'")))
        };
        let t2m = parse_numeric(column(weather::T2M)?, path)?;
        let times = column(weather::TIME)?
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                cell.and_then(parse_timestamp).ok_or_else(|| {
                    AssemblyError::config_load(
                        path,
                        format!("data row {}: unreadable time '{}'", row + 1, cell.unwrap_or_default()),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(times, t2m)
    }

    pub fn len(&self) -> usize {
        self.t2m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t2m.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.t2m
    }

    pub fn mean(&self) -> Option<f64> {
        mean(self.t2m.iter().copied())
    }

    /// Mean temperature of (summer, winter), June-August and December-February
    /// swapped for sites south of the equator.
    pub fn seasonal_means(&self, latitude: f64) -> (Option<f64>, Option<f64>) {
        let months = |set: [u32; 3]| {
            mean(
                self.times
                    .iter()
                    .zip(&self.t2m)
                    .filter(|(t, _)| set.contains(&t.month()))
                    .map(|(_, v)| *v),
            )
        };
        let jja = months(SUMMER_MONTHS);
        let djf = months(WINTER_MONTHS);
        if latitude >= 0.0 {
            (jja, djf)
        } else {
            (djf, jja)
        }
    }
}

/// A COP column to derive from a weather file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DerivedCop {
    pub name: String,
    pub weather: PathBuf,
    #[serde(default = "default_part_load")]
    pub part_load: f64,
    /// Only used to report seasonal averages.
    #[serde(default)]
    pub latitude: Option<f64>,
}

fn default_part_load() -> f64 {
    0.6
}

/// Add a `derived` COP column computed from `spec.weather`.
pub fn add_cop_column(mut assembly: Assembly, spec: &DerivedCop) -> Result<Assembly, AssemblyError> {
    let curve = CopCurve::for_part_load(spec.part_load).ok_or_else(|| {
        AssemblyError::config_load(
            &spec.weather,
            format!(
                "no COP curve for part-load ratio {} (expected 1.0, 0.6 or 0.3)",
                spec.part_load
            ),
        )
    })?;
    let temps = TemperatureSeries::from_csv(&spec.weather)?;

    if let Some(latitude) = spec.latitude {
        let (summer, winter) = temps.seasonal_means(latitude);
        info!(mean = ?temps.mean(), ?summer, ?winter, "ambient temperature");
    }

    let cop = temps.values().iter().map(|&t| curve.cop_at(t)).collect();
    let source_name = spec.weather.display().to_string();
    assembly.table.set_column(&spec.name, cop, &source_name)?;
    assembly.registry.register(
        spec.name.clone(),
        ColumnMeta::new(SemanticType::Derived, "-"),
    );
    info!(column = %spec.name, part_load = spec.part_load, "derived heat-pump COP");
    Ok(assembly)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
