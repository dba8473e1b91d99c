mod cli;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, RulesCommands};

/// Log to stderr. RUST_LOG wins over the -v count.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { batch, json } => cli::run::run(&batch, json),
        Commands::Export {
            batch,
            output_dir,
            format,
        } => cli::export::run(&batch, output_dir, format),
        Commands::Rules { command } => match command {
            RulesCommands::List => cli::rules::list(),
            RulesCommands::Test { description } => cli::rules::test(&description),
        },
        Commands::Scan { dir, days } => cli::scan::run(dir, days),
        Commands::Init { write_rules } => cli::init::run(write_rules),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "cardpivot", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
