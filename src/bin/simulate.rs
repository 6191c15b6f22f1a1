use std::env;
use std::path::PathBuf;
use std::process;

use getopts::Options;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bandicoot::simulation::batch::{load_dataset, Batch};
use bandicoot::SimulationConfig;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("d", "data", "Ratings file (required). One user, item and optional \
        value per line, separated by tabs.", "PATH");
    opts.optopt("c", "config", "Simulation config in JSON (required).", "PATH");
    opts.optopt("o", "output", "Directory for the iteration logs (optional, overrides the \
        config, defaults to 'results').", "DIR");
    opts.optflag("r", "resume", "Continue from existing logs in the output directory.");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, &opts, Some(&hint));
        }
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, &opts, None);
    }

    let (Some(data_path), Some(config_path)) = (matches.opt_str("d"), matches.opt_str("c")) else {
        return print_usage_and_exit(
            &program,
            &opts,
            Some("Please specify a ratings file via --data and a config via --config."),
        );
    };

    let mut config = match SimulationConfig::from_path(&config_path) {
        Ok(config) => config,
        Err(err) => {
            let hint = format!("Problem with config '{config_path}': {err}");
            return print_usage_and_exit(&program, &opts, Some(&hint));
        }
    };
    if matches.opt_present("r") {
        config.resume = true;
    }

    let dataset = match load_dataset(&config, &data_path) {
        Ok(dataset) => dataset,
        Err(err) => {
            error!(path = %data_path, error = %err, "could not load ratings");
            process::exit(1);
        }
    };

    let output: PathBuf = matches
        .opt_str("o")
        .map(PathBuf::from)
        .or_else(|| config.output.clone())
        .unwrap_or_else(|| PathBuf::from("results"));
    let batch = Batch::new(config, dataset, output);
    match batch.run() {
        Ok(outcomes) => {
            for outcome in &outcomes {
                if let Ok(iterations) = &outcome.result {
                    info!(algorithm = %outcome.name, iterations, "done");
                }
            }
            if outcomes.iter().any(|o| !o.is_ok()) {
                process::exit(1);
            }
        }
        Err(err) => {
            error!(error = %err, "batch failed");
            process::exit(1);
        }
    }
}

fn print_usage_and_exit(program: &str, opts: &Options, hint: Option<&str>) {
    if let Some(hint) = hint {
        eprintln!("\n{hint}\n");
    }

    let brief = format!("Usage: {program} --data PATH --config PATH [options]");
    eprint!("{}", opts.usage(&brief));
    process::exit(if hint.is_some() { 2 } else { 0 });
}
