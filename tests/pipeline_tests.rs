use std::fs;
use std::path::Path;

use persee_series::header::format_general;
use persee_series::{
    parse_document, run, Assembly, AssemblyError, ColumnMeta, PerseeDocument, RunConfig,
    SemanticType, TimeAxis,
};

const DAYS: usize = 2;
const STEPS: usize = 24 * DAYS;

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

/// Shape table with two sampled zones and one zone without a profile.
fn write_profiles(dir: &Path) {
    write(
        dir,
        "Loads_LJ.csv",
        "Name, Max Power, Profile, Load Type, Units\n\
         Kitchen,100,0,load,MW\n\
         Barracks,50,1,load,MW\n\
         Spare,10,,load,MW\n",
    );

    let mut reference = String::from("0,1\n");
    for h in 0..24 {
        reference.push_str(&format!("{h},{}\n", if h < 12 { 2 } else { 4 }));
    }
    write(dir, "profiles.csv", &reference);
}

fn write_ninja(dir: &Path, name: &str, value: impl Fn(usize) -> f64) {
    let mut text = String::from(
        "# Renewables.ninja export\n# Model: MERRA-2\n# Units: kW\ntime,local_time,electricity\n",
    );
    for i in 0..STEPS {
        text.push_str(&format!("2019-01-01 00:00,2019-01-01 00:00,{}\n", value(i)));
    }
    write(dir, name, &text);
}

fn config_text(extra: &str) -> String {
    format!(
        r#"
        [calendar]
        start_date = "2025-01-01 00:00"
        nb_steps = {STEPS}

        [output]
        path = "series.csv"

        [profiles]
        shapes = "Loads_LJ.csv"
        reference = "profiles.csv"
        seed = 1

        [[imports]]
        path = "ninja_pv.csv"
        columns = ["PV"]
        positions = [2]
        divisor = 1000
        load_type = "Generation"
        {extra}
        "#
    )
}

fn load_config(dir: &Path, extra: &str) -> RunConfig {
    write(dir, "run.toml", &config_text(extra));
    RunConfig::load(&dir.join("run.toml")).unwrap()
}

#[test]
fn full_run_writes_persee_layout() {
    let dir = tempfile::tempdir().unwrap();
    write_profiles(dir.path());
    write_ninja(dir.path(), "ninja_pv.csv", |i| (i % 24) as f64 * 100.0);
    let config = load_config(
        dir.path(),
        r#"
        [[merges]]
        drop_originals = true
        [[merges.rules]]
        name = "Elec_Central"
        columns_idx = [1, 2]
        load_type = "load"
        units = "MW"
        "#,
    );

    let path = run(&config, None).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 4 + STEPS);
    assert_eq!(lines[0], "Time;PV;Elec_Central");
    assert_eq!(lines[1], "2025-01-01 00:00;Generation;load");
    assert_eq!(lines[2], "s;MW;MW");
    assert_eq!(lines[3], "true;true;true");
    // Kitchen follows the hour ramp at 1.0, Barracks the 2/4 step at 0.5.
    assert_eq!(lines[5], "7200;0.1;2");
    assert_eq!(lines[4 + 12], "46800;1.2;14");
    assert_eq!(lines[4 + STEPS - 1], format!("{};2.3;25", STEPS * 3600));
}

#[test]
fn merge_without_drop_keeps_sources_for_audit() {
    let dir = tempfile::tempdir().unwrap();
    write_profiles(dir.path());
    write_ninja(dir.path(), "ninja_pv.csv", |_| 0.0);
    let config = load_config(
        dir.path(),
        r#"
        [[merges]]
        drop_originals = false
        [[merges.rules]]
        name = "Elec_Central"
        columns_idx = [1, 2]
        load_type = "load"
        units = "MW"
        "#,
    );

    let text = fs::read_to_string(run(&config, Some(3)).unwrap()).unwrap();
    assert_eq!(
        text.lines().next().unwrap(),
        "Time;Kitchen;Barracks;PV;Elec_Central"
    );
}

#[test]
fn output_round_trips_through_parser() {
    let dir = tempfile::tempdir().unwrap();
    write_profiles(dir.path());
    write_ninja(dir.path(), "ninja_pv.csv", |i| 1.0 / (i as f64 + 3.0));
    let config = load_config(dir.path(), "");

    let document = persee_series::assemble(&config, &mut rand::thread_rng()).unwrap();
    let bytes = document.to_bytes(b';').unwrap();
    let parsed = parse_document(&bytes, b';').unwrap();

    let header = document.header();
    assert_eq!(header[0], vec!["Time", "Kitchen", "Barracks", "PV"]);
    assert!(header.iter().all(|row| row.len() == header[0].len()));

    assert_eq!(parsed.start_date, "2025-01-01 00:00");
    let table = &parsed.assembly.table;
    assert_eq!(table.column_names(), vec!["Time", "Kitchen", "Barracks", "PV"]);
    assert_eq!(table.timestamps().unwrap()[0], 3600);
    assert_eq!(parsed.assembly.registry.get("PV").unwrap().unit, "MW");

    let pv = table.values("PV").unwrap();
    for (i, v) in pv.iter().enumerate() {
        let expected = 1.0 / (i as f64 + 3.0) / 1000.0;
        assert!(((v - expected) / expected).abs() < 1e-5, "row {i}: {v} vs {expected}");
        assert_eq!(format_general(*v, 6), format_general(expected, 6));
    }
}

#[test]
fn same_seed_same_jittered_output() {
    let dir = tempfile::tempdir().unwrap();
    write_profiles(dir.path());
    write_ninja(dir.path(), "ninja_pv.csv", |_| 1.0);
    let text = config_text("").replace("seed = 1", "seed = 9\njitter = [0.9, 1.1]");
    let config = RunConfig::from_toml(&text).map(|mut c| {
        c.resolve_paths(dir.path());
        c
    })
    .unwrap();

    let a = run(&config, None).unwrap();
    let first = fs::read(&a).unwrap();
    let b = run(&config, None).unwrap();
    assert_eq!(first, fs::read(&b).unwrap());

    run(&config, Some(10)).unwrap();
    assert_ne!(first, fs::read(&b).unwrap());
}

#[test]
fn failed_run_leaves_no_output_file() {
    let dir = tempfile::tempdir().unwrap();
    write_profiles(dir.path());
    // One row short of the axis.
    let mut text = String::from("#\n#\n#\ntime,local_time,electricity\n");
    for _ in 0..STEPS - 1 {
        text.push_str("t,t,1\n");
    }
    write(dir.path(), "ninja_pv.csv", &text);
    let config = load_config(dir.path(), "");

    let err = run(&config, None).unwrap_err();
    assert!(matches!(
        err,
        AssemblyError::LengthMismatch { expected: STEPS, found, .. } if found == STEPS - 1
    ));
    assert!(!dir.path().join("series.csv").exists());
}

#[test]
fn unregistered_column_fails_formatting_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("series.csv");
    let axis = TimeAxis::new("2025-01-01 00:00", 3600, 2, 2).unwrap();
    let mut assembly = Assembly::new(&axis).unwrap();
    assembly.table.set_column("A", vec![1.0, 2.0], "test").unwrap();
    assembly
        .registry
        .register("A", ColumnMeta::new(SemanticType::Load, "MW"));
    assembly.table.set_column("Ghost", vec![0.0, 0.0], "test").unwrap();

    assert_eq!(assembly.unregistered_columns(), vec!["Ghost".to_string()]);
    let result = PerseeDocument::build(&assembly.table, &assembly.registry, axis.start_date(), 6)
        .and_then(|doc| doc.write(&out, b';'));
    assert!(matches!(result, Err(AssemblyError::MissingMetadata(name)) if name == "Ghost"));
    assert!(!out.exists());
}
