use clap::Parser;
use tracing_subscriber::EnvFilter;

use apivault::cli::{Cli, Commands};

fn main() {
    // Operational logging; controlled via APIVAULT_LOG (e.g. "debug").
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("APIVAULT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Store {
            ref name,
            ref value,
            ref service,
            ref description,
        } => apivault::cli::commands::store::execute(
            &cli,
            name,
            value.as_deref(),
            service,
            description.as_deref(),
        ),
        Commands::Get { ref name } => apivault::cli::commands::get::execute(&cli, name),
        Commands::List {
            ref service,
            include_inactive,
        } => apivault::cli::commands::list::execute(&cli, service.as_deref(), include_inactive),
        Commands::Update {
            ref name,
            ref value,
            ref description,
        } => apivault::cli::commands::update::execute(
            &cli,
            name,
            value.as_deref(),
            description.as_deref(),
        ),
        Commands::Delete { ref name, force } => {
            apivault::cli::commands::delete::execute(&cli, name, force)
        }
        Commands::Test { ref name } => apivault::cli::commands::test_cmd::execute(&cli, name),
        Commands::Audit { last } => apivault::cli::commands::audit_cmd::execute(&cli, last),
        Commands::Cache { ref action } => apivault::cli::commands::cache_cmd::execute(&cli, action),
    };

    if let Err(e) = result {
        apivault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
