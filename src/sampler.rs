//! Synthetic load profiles built from daily reference curves.
//!
//! A shape table names one zone per row; each zone points at a daily curve in
//! the reference-shape table and is repeated for every whole day of the axis,
//! scaled by `max_power / 100` and an optional random multiplier.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::AssemblyError;
use crate::io::read_csv_as_strings;
use crate::registry::{ColumnMeta, SemanticType};
use crate::schema::shape;
use crate::table::Assembly;
use crate::time_axis::TimeAxis;

/// What to do with a zone whose `Profile` cell is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingProfilePolicy {
    /// Produce no column and no registry entry for the zone.
    #[default]
    SkipIfNoProfile,
    Reject,
}

/// What to do when the axis does not end on a day boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialDayPolicy {
    /// Sample whole days only. The resulting columns are shorter than the
    /// axis and the working table rejects them with a length mismatch.
    #[default]
    TruncateToWholeDays,
    Reject,
}

/// Closed interval the per-value multiplier is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    lo: f64,
    hi: f64,
}

impl Default for Jitter {
    fn default() -> Self {
        Self { lo: 1.0, hi: 1.0 }
    }
}

impl Jitter {
    pub fn new(lo: f64, hi: f64) -> Result<Self, AssemblyError> {
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(AssemblyError::Config(format!(
                "jitter interval [{lo}, {hi}] is not a finite closed interval"
            )));
        }
        Ok(Self { lo, hi })
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    /// A degenerate interval returns its bound without touching the generator.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.lo == self.hi {
            self.lo
        } else {
            rng.gen_range(self.lo..=self.hi)
        }
    }
}

/// One row of the shape table.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDef {
    pub name: String,
    pub max_power: f64,
    pub profile: Option<i64>,
    pub semantic_type: SemanticType,
    pub unit: String,
}

#[derive(Debug, Clone, Default)]
pub struct ShapeTable {
    origin: PathBuf,
    zones: Vec<ZoneDef>,
}

impl ShapeTable {
    pub fn new(zones: Vec<ZoneDef>) -> Self {
        Self {
            origin: PathBuf::from("<shape table>"),
            zones,
        }
    }

    pub fn zones(&self) -> &[ZoneDef] {
        &self.zones
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Load a shape table with columns `Name, Max Power, Profile, Load Type, Units`.
    pub fn from_csv(path: &Path, separator: u8) -> Result<Self, AssemblyError> {
        let df = read_csv_as_strings(path, separator)?;
        Self::from_frame(&df, path)
    }

    pub fn from_frame(df: &DataFrame, origin: &Path) -> Result<Self, AssemblyError> {
        for required in shape::ALL {
            if df.column(required).is_err() {
                return Err(AssemblyError::config_load(
                    origin,
                    format!("missing column '{required}'"),
                ));
            }
        }

        let names = text_column(df, shape::NAME, origin)?;
        let max_power = text_column(df, shape::MAX_POWER, origin)?;
        let profile = text_column(df, shape::PROFILE, origin)?;
        let load_type = text_column(df, shape::LOAD_TYPE, origin)?;
        let units = text_column(df, shape::UNITS, origin)?;

        let mut zones = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let row = i + 1;
            let name = non_empty(names.get(i)).ok_or_else(|| {
                AssemblyError::config_load(origin, format!("row {row}: empty '{}'", shape::NAME))
            })?;
            let max_power = non_empty(max_power.get(i))
                .and_then(|v| v.parse::<f64>().ok())
                .ok_or_else(|| {
                    AssemblyError::config_load(
                        origin,
                        format!("row {row} ({name}): '{}' is not a number", shape::MAX_POWER),
                    )
                })?;
            let profile = match non_empty(profile.get(i)) {
                None => None,
                Some(v) => Some(parse_profile_id(v).ok_or_else(|| {
                    AssemblyError::config_load(
                        origin,
                        format!("row {row} ({name}): profile '{v}' is not an integer id"),
                    )
                })?),
            };
            let semantic_type = non_empty(load_type.get(i))
                .map(SemanticType::parse)
                .ok_or_else(|| {
                    AssemblyError::config_load(
                        origin,
                        format!("row {row} ({name}): empty '{}'", shape::LOAD_TYPE),
                    )
                })?;
            let unit = non_empty(units.get(i)).unwrap_or_default().to_string();

            zones.push(ZoneDef {
                name: name.to_string(),
                max_power,
                profile,
                semantic_type,
                unit,
            });
        }

        Ok(Self {
            origin: origin.to_path_buf(),
            zones,
        })
    }
}

/// Daily reference curves keyed by integer profile id.
#[derive(Debug, Clone)]
pub struct ReferenceShapes {
    origin: PathBuf,
    curves: BTreeMap<i64, Vec<f64>>,
}

impl Default for ReferenceShapes {
    fn default() -> Self {
        Self {
            origin: PathBuf::from("<reference shapes>"),
            curves: BTreeMap::new(),
        }
    }
}

impl ReferenceShapes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn insert(&mut self, id: i64, curve: Vec<f64>) -> Option<Vec<f64>> {
        self.curves.insert(id, curve)
    }

    pub fn get(&self, id: i64) -> Option<&[f64]> {
        self.curves.get(&id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Load a rectangular table whose header row holds the integer profile ids.
    pub fn from_csv(path: &Path, separator: u8) -> Result<Self, AssemblyError> {
        let df = read_csv_as_strings(path, separator)?;
        Self::from_frame(&df, path)
    }

    pub fn from_frame(df: &DataFrame, origin: &Path) -> Result<Self, AssemblyError> {
        let mut shapes = Self {
            origin: origin.to_path_buf(),
            curves: BTreeMap::new(),
        };
        for column in df.get_columns() {
            let header = column.name().to_string();
            let id = parse_profile_id(&header).ok_or_else(|| {
                AssemblyError::config_load(
                    origin,
                    format!("profile header '{header}' is not an integer id"),
                )
            })?;
            let cells = column
                .str()
                .map_err(|e| AssemblyError::config_load(origin, e.to_string()))?;
            let curve = cells
                .into_iter()
                .enumerate()
                .map(|(row, cell)| {
                    non_empty(cell)
                        .and_then(|v| v.parse::<f64>().ok())
                        .ok_or_else(|| {
                            AssemblyError::config_load(
                                origin,
                                format!("profile {id}, row {}: not a number", row + 1),
                            )
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            shapes.insert(id, curve);
        }
        Ok(shapes)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerOptions {
    pub jitter: Jitter,
    pub missing_profile: MissingProfilePolicy,
    pub partial_day: PartialDayPolicy,
}

/// A zone expanded to a full column, not yet applied to a table.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledZone {
    pub name: String,
    pub values: Vec<f64>,
    pub meta: ColumnMeta,
}

/// Expand every zone of `shapes` into a column.
///
/// Nothing is applied here, so a failure on any zone leaves the caller's
/// table untouched.
pub fn sample_profiles<R: Rng + ?Sized>(
    shapes: &ShapeTable,
    reference: &ReferenceShapes,
    axis: &TimeAxis,
    options: &SamplerOptions,
    rng: &mut R,
) -> Result<Vec<SampledZone>, AssemblyError> {
    if axis.has_partial_day() && options.partial_day == PartialDayPolicy::Reject {
        return Err(AssemblyError::Config(format!(
            "{} steps is not a whole number of {}-step days",
            axis.len(),
            axis.steps_per_day()
        )));
    }

    let days = axis.whole_days();
    let mut sampled = Vec::with_capacity(shapes.zones().len());

    for zone in shapes.zones() {
        let Some(profile) = zone.profile else {
            match options.missing_profile {
                MissingProfilePolicy::SkipIfNoProfile => {
                    warn!(zone = %zone.name, "zone has no profile, skipping");
                    continue;
                }
                MissingProfilePolicy::Reject => {
                    return Err(AssemblyError::config_load(
                        shapes.origin(),
                        format!("zone '{}' has no profile", zone.name),
                    ));
                }
            }
        };

        let curve = reference.get(profile).ok_or_else(|| {
            AssemblyError::config_load(
                shapes.origin(),
                format!("zone '{}' references unknown profile {profile}", zone.name),
            )
        })?;
        if curve.len() != axis.steps_per_day() {
            return Err(AssemblyError::config_load(
                reference.origin(),
                format!(
                    "profile {profile} has {} values, expected {} per day",
                    curve.len(),
                    axis.steps_per_day()
                ),
            ));
        }

        let factor = zone.max_power / 100.0;
        let mut values = Vec::with_capacity(days * curve.len());
        for _ in 0..days {
            values.extend(curve.iter().map(|v| v * factor * options.jitter.draw(rng)));
        }

        debug!(zone = %zone.name, profile, values = values.len(), "sampled zone");
        sampled.push(SampledZone {
            name: zone.name.clone(),
            values,
            meta: ColumnMeta::new(zone.semantic_type.clone(), zone.unit.clone())
                .with_scale(zone.max_power)
                .with_shape_ref(profile),
        });
    }

    Ok(sampled)
}

/// Sample every zone and add the columns to the assembly.
pub fn generate_loads<R: Rng + ?Sized>(
    mut assembly: Assembly,
    shapes: &ShapeTable,
    reference: &ReferenceShapes,
    axis: &TimeAxis,
    options: &SamplerOptions,
    rng: &mut R,
) -> Result<Assembly, AssemblyError> {
    let sampled = sample_profiles(shapes, reference, axis, options, rng)?;
    let count = sampled.len();
    for zone in sampled {
        let source = format!("profile zone '{}'", zone.name);
        assembly.table.set_column(&zone.name, zone.values, &source)?;
        assembly.registry.register(zone.name, zone.meta);
    }
    info!(zones = count, "generated load profiles");
    Ok(assembly)
}

fn text_column<'a>(df: &'a DataFrame, name: &str, origin: &Path) -> Result<&'a StringChunked, AssemblyError> {
    df.column(name)
        .and_then(|c| c.str())
        .map_err(|e| AssemblyError::config_load(origin, e.to_string()))
}

fn non_empty(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts `3` as well as spreadsheet exports such as `3.0`.
fn parse_profile_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && v.is_finite())
            .map(|v| v as i64)
    })
}
