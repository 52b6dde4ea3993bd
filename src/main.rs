//! Nodle numeric - command-line host for the numeric node pack
//!
//! `list` prints the node catalogue as JSON. `run` reads a request of the form
//! `{"node": "ArrayOnes", "inputs": {"Shape": {"String": "(2, 2)"}}}` from
//! stdin and prints the node's outputs as JSON.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};
use serde::{Deserialize, Serialize};

use nodle_numeric::errstate;
use nodle_numeric::nodes::{NodeData, NodeExecutor, NodeInputs, REGISTRY};
use nodle_numeric::PackConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file, defaults to ~/.nodle/numeric.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every registered node as JSON
    List,
    /// Execute one node with a JSON request read from stdin
    Run,
}

#[derive(Debug, Deserialize)]
struct RunRequest {
    node: String,
    #[serde(default)]
    inputs: NodeInputs,
}

#[derive(Debug, Serialize)]
struct RunResponse<'a> {
    node: &'a str,
    outputs: Vec<NamedOutput>,
}

#[derive(Debug, Serialize)]
struct NamedOutput {
    name: String,
    value: NodeData,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PackConfig::load(path),
        None => PackConfig::load_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // RUST_LOG wins over the config file
    let filter = config.log_filter.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    errstate::replace(config.float_errors);
    info!("Floating-point error modes: {:?}", config.float_errors);

    let result = match args.command {
        Command::List => list(&config),
        Command::Run => run(),
    };

    match result {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn list(config: &PackConfig) -> Result<String, String> {
    let mut entries = REGISTRY.catalogue(&config.category_prefix);
    entries.sort_by(|a, b| a.unique_name.cmp(&b.unique_name));
    info!("Listing {} nodes", entries.len());
    serde_json::to_string_pretty(&entries).map_err(|e| format!("Failed to serialize catalogue: {}", e))
}

fn run() -> Result<String, String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| format!("Failed to read request: {}", e))?;
    let request: RunRequest = serde_json::from_str(&input).map_err(|e| format!("Failed to parse request: {}", e))?;

    let outputs = NodeExecutor::builtin()
        .execute(&request.node, &request.inputs)
        .map_err(|e| e.to_string())?;

    let names = REGISTRY
        .metadata(&request.node)
        .map(|metadata| metadata.outputs.into_iter().map(|port| port.name).collect::<Vec<_>>())
        .unwrap_or_default();
    let outputs = outputs
        .into_iter()
        .enumerate()
        .map(|(index, value)| NamedOutput {
            name: names.get(index).cloned().unwrap_or_else(|| format!("Output {}", index + 1)),
            value,
        })
        .collect();

    serde_json::to_string_pretty(&RunResponse {
        node: &request.node,
        outputs,
    })
    .map_err(|e| format!("Failed to serialize outputs: {}", e))
}
