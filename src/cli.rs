use std::env;
use std::path::PathBuf;

pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub preset: Option<String>,
    pub events: Option<PathBuf>,
    pub seed: Option<u64>,
    pub steps: Option<usize>,
    pub telemetry_out: Option<PathBuf>,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    if args.len() == 1 && (args[0] == "--help" || args[0] == "-h") {
        print_usage();
        std::process::exit(0);
    }
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut config = None;
    let mut preset = None;
    let mut events = None;
    let mut seed = None;
    let mut steps = None;
    let mut telemetry_out = None;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --config (expected a TOML file path)",
                )?;
                if config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(
                    i,
                    "missing value for --preset (expected a preset name)",
                )?;
                if preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--events" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --events (expected a CSV file path)",
                )?;
                if events.replace(PathBuf::from(path)).is_some() {
                    return Err("--events provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let value = raw
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
                seed = Some(value);
            }
            "--steps" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --steps (expected a count)")?;
                let value = raw
                    .parse::<usize>()
                    .map_err(|_| format!("--steps value \"{raw}\" is not a valid count"))?;
                steps = Some(value);
            }
            "--telemetry-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --telemetry-out (expected a file path)",
                )?;
                if telemetry_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--telemetry-out provided more than once".to_string());
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if config.is_some() && preset.is_some() {
        return Err(
            "arguments `--config` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if config.is_none() && preset.is_none() {
        preset = Some("demo".to_string());
    }

    Ok(CliOptions {
        config,
        preset,
        events,
        seed,
        steps,
        telemetry_out,
    })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("power-group: replay state changes through a grouped power sensor");
    eprintln!();
    eprintln!("Usage: power-group [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>          Load the group from a TOML file");
    eprintln!("  --preset <name>          Use a built-in group (demo, demo_sum)");
    eprintln!("  --events <path>          Replay a CSV event log (entity_id,state[,unit])");
    eprintln!("  --seed <u64>             Override the demo generator seed");
    eprintln!("  --steps <n>              Override the number of demo events");
    eprintln!("  --telemetry-out <path>   Export published states to CSV");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("Without --events a seeded demo stream is generated from the group.");
}
