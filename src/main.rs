//! power-group entry point: CLI wiring, config loading and replay.

use std::process;

use tracing::info;

use power_group::config::GroupConfig;
use power_group::demo::DemoStream;
use power_group::io::export::export_csv;
use power_group::replay::{Replay, read_events_from_path};
use power_group::report::Report;
use power_group::sensor::GroupSensor;
use power_group::telemetry::init_tracing;

mod cli;

use cli::CliOptions;

fn load_config(cli: &CliOptions) -> power_group::Result<GroupConfig> {
    let mut cfg = match (&cli.config, &cli.preset) {
        (Some(path), _) => GroupConfig::from_toml_file(path)?,
        (None, Some(name)) => GroupConfig::from_preset(name)?,
        (None, None) => GroupConfig::demo(),
    };
    if let Some(seed) = cli.seed {
        cfg.demo.seed = seed;
    }
    if let Some(steps) = cli.steps {
        cfg.demo.steps = steps;
    }
    Ok(cfg)
}

fn run(cli: &CliOptions, cfg: &GroupConfig) -> power_group::Result<()> {
    let sensor = GroupSensor::from_config(&cfg.group);
    info!(
        name = sensor.name(),
        unique_id = sensor.unique_id(),
        kind = sensor.kind(),
        members = sensor.members().len(),
        "group sensor ready"
    );

    let (snapshot, events) = match &cli.events {
        Some(path) => (Vec::new(), read_events_from_path(path)?),
        None => {
            let mut demo = DemoStream::from_config(cfg);
            let snapshot = demo.snapshot();
            (snapshot, demo.events(cfg.demo.steps))
        }
    };

    let mut replay = Replay::new(sensor);
    let rows = replay.run(&snapshot, &events);
    let final_state = replay.sensor().state();
    info!(
        value = ?final_state.value,
        available = final_state.available,
        "final sensor state"
    );

    for r in &rows {
        println!("{r}");
    }

    let report = Report::from_rows(&rows);
    println!("\n{report}");

    if let Some(path) = &cli.telemetry_out {
        export_csv(&rows, path)?;
        info!(path = %path.display(), rows = rows.len(), "telemetry written");
    }
    Ok(())
}

fn main() {
    init_tracing();

    let cli = match cli::parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(2);
        }
    };

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let errors = cfg.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    if let Err(e) = run(&cli, &cfg) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
