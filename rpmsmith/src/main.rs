use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use rpmsmith::commands;
use rpmsmith::executor::RealExecutor;
use rpmsmith::pipeline::BuildEnv;
use rpmsmith::{Cli, Commands};

fn main() -> Result<()> {
    // e.g. RUST_LOG=rpmsmith=debug
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    tracing::debug!(?config, "configuration");

    let env = BuildEnv::new(config, Arc::new(RealExecutor::new(cli.global.quiet)));

    match cli.command {
        Commands::Clone(args) => commands::clone::run(args, &env),
        Commands::CreateSrpm(args) => commands::create_srpm::run(args, &env),
        Commands::Mock(args) => commands::mock::run(args, &env),
        Commands::Build(args) => commands::build::run(args, &env),
        Commands::Checkenv(args) => commands::checkenv::run(args, &env.config),
        Commands::ListUnverifiedSources(args) => commands::list_unverified::run(args, &env.config),
    }
}
