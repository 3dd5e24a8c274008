//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use assetline::config::CONFIG_FILE;

/// Assetline asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path
    #[arg(short = 'C', long, global = true, default_value = CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print per-compile timings and cache decisions
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve assets over HTTP
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Compile every asset before accepting requests
        #[arg(short, long)]
        warm: bool,
    },

    /// Compile every asset and locale, reporting sizes and ETags
    #[command(visible_alias = "b")]
    Build {
        /// Write compiled assets and `manifest.json` here
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        output: Option<PathBuf>,
    },

    /// Print the registered route table
    #[command(visible_alias = "r")]
    Routes,
}
