use cadence_clock::SystemClock;
use cadence_runner::{DatabaseExecutor, Driver, DriverConfig, MemoryDatabase, operation_stream};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

const OPERATIONS_DELIMITER: &str = "|";

fn print_help() {
    eprintln!(
        r#"Cadence Driver - scheduled benchmark operations against an in-memory database

USAGE:
    cadence-driver [OPTIONS] <OPERATIONS>

ARGUMENTS:
    <OPERATIONS>        Delimited rows: kind|scheduled_ms|dependency_ms|params_json

OPTIONS:
    --config <PATH>     Load driver configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)
"#
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut operations_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg if operations_path.is_none() && !arg.starts_with('-') => {
                operations_path = Some(arg.to_string());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(operations_path) = operations_path else {
        print_help();
        std::process::exit(1);
    };

    let config = match config_path {
        Some(path) => {
            log::info!("Loading configuration from: {}", path);
            DriverConfig::from_file(&path)?
        }
        None => DriverConfig::default(),
    };

    let operations = operation_stream(
        BufReader::new(File::open(&operations_path)?),
        OPERATIONS_DELIMITER,
    );
    let driver = Driver::new(config, Arc::new(SystemClock::new()))?;
    let body = Arc::new(DatabaseExecutor::new(Arc::new(MemoryDatabase::new())));

    let report = driver.run(operations, body)?;
    println!("{}", report.snapshot.to_json()?);
    Ok(())
}
