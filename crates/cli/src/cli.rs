//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use cr_protocol::process_models::RunParameters;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "control-room")]
#[command(about = "Drive a pipeline of backend processing stages", long_about = None)]
pub struct Cli {
    /// Project root containing `.control-room/`
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Pipeline to operate on
    #[arg(long, global = true, default_value = "completeness")]
    pub pipeline: String,

    /// Use the in-memory backend instead of the REST API
    #[arg(long, global = true)]
    pub mock: bool,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create `.control-room/` with a default config and pipelines
    Init {
        /// Overwrite an existing `.control-room/`
        #[arg(long)]
        force: bool,

        /// Only write the config and the completeness pipeline
        #[arg(long)]
        minimal: bool,
    },

    /// List pipelines, or show the stages and edges of the selected one
    Graph {
        /// List pipeline names only
        #[arg(long)]
        list: bool,
    },

    /// Show the status of every node
    Status,

    /// Show or set run parameters
    Params {
        #[command(subcommand)]
        action: ParamsAction,
    },

    /// Run a node, running its unmet dependencies first
    Run { node_id: String },

    /// Run every node in dependency order
    RunAll,

    /// Stop a running node
    Stop { node_id: String },

    /// Reset a node and everything downstream of it
    Reset { node_id: String },

    /// Reset every node and clear all outputs
    ResetAll,

    /// Keep polling runs that were in flight when the last session ended
    Resume,

    /// Check that the backend is reachable
    Health,
}

#[derive(Subcommand, Debug)]
pub enum ParamsAction {
    /// Print the stored parameters
    Show,

    /// Validate and store parameters
    Set(ParamsArgs),
}

#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// Expected run date, YYYY-MM-DD
    #[arg(long)]
    pub expected_run_date: String,

    #[arg(long)]
    pub input_config_file_path: String,

    #[arg(long)]
    pub input_config_file_pattern: String,

    #[arg(long)]
    pub root_file_dir: String,

    /// development, staging or production
    #[arg(long)]
    pub run_env: String,

    #[arg(long)]
    pub temp_file_path: String,
}

impl From<ParamsArgs> for RunParameters {
    fn from(args: ParamsArgs) -> Self {
        Self {
            expected_run_date: args.expected_run_date,
            input_config_file_path: args.input_config_file_path,
            input_config_file_pattern: args.input_config_file_pattern,
            root_file_dir: args.root_file_dir,
            run_env: args.run_env,
            temp_file_path: args.temp_file_path,
        }
    }
}
