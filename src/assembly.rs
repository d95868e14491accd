use std::path::PathBuf;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::error::AssemblyError;
use crate::header::PerseeDocument;
use crate::heat_pump::add_cop_column;
use crate::importer::load_series;
use crate::merge::merge_loads;
use crate::sampler::{generate_loads, ReferenceShapes, ShapeTable};
use crate::table::Assembly;

/// Run every configured stage and build the output document in memory.
///
/// Stages run in a fixed order: profiles, imports, merges, derived columns.
pub fn assemble<R: Rng + ?Sized>(config: &RunConfig, rng: &mut R) -> Result<PerseeDocument, AssemblyError> {
    let axis = config.time_axis()?;
    let mut assembly = Assembly::new(&axis)?;

    if let Some(profiles) = &config.profiles {
        let separator = profiles.input_delimiter()?;
        let shapes = ShapeTable::from_csv(&profiles.shapes, separator)?;
        let reference = ReferenceShapes::from_csv(&profiles.reference, separator)?;
        let options = profiles.sampler_options()?;
        assembly = generate_loads(assembly, &shapes, &reference, &axis, &options, rng)?;
    }

    for import in &config.imports {
        assembly = load_series(assembly, &import.to_import()?)?;
    }

    for stage in &config.merges {
        assembly = merge_loads(assembly, &stage.rules, stage.drop_originals)?;
    }

    for cop in &config.derived_cop {
        assembly = add_cop_column(assembly, cop)?;
    }

    PerseeDocument::build(
        &assembly.table,
        &assembly.registry,
        axis.start_date(),
        config.output.precision,
    )
}

/// Assemble and write the configured output file.
///
/// The RNG is seeded from `seed_override`, then `profiles.seed`, then entropy.
pub fn run(config: &RunConfig, seed_override: Option<u64>) -> Result<PathBuf, AssemblyError> {
    let run_id = Uuid::new_v4();
    let span = info_span!("assemble", %run_id);
    let _guard = span.enter();

    let seed = seed_override.or_else(|| config.profiles.as_ref().and_then(|p| p.seed));
    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    info!(?seed, output = %config.output.path.display(), "starting run");

    let delimiter = config.output_delimiter()?;
    let document = assemble(config, &mut rng)?;
    document.write(&config.output.path, delimiter)?;
    Ok(config.output.path.clone())
}
