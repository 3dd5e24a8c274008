//! Assetline - serve and build asset bundles.

mod cli;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};

use assetline::config::AssetlineConfig;
use assetline::{logger, serve};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    serve::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    logger::set_verbose(cli.verbose);

    let mut config = AssetlineConfig::load(&cli.config)?;

    match &cli.command {
        Commands::Serve {
            interface,
            port,
            warm,
        } => {
            config.apply_serve_options(*interface, *port);
            cli::serve::serve(&config, *warm)
        }
        Commands::Build { output } => {
            let pipeline = config.build_pipeline()?;
            cli::build::build(&pipeline, &config.locales(), output.as_deref())
        }
        Commands::Routes => {
            cli::routes::print_routes(&config.build_pipeline()?);
            Ok(())
        }
    }
}
