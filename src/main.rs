use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use k3dforge::cli::{format_cluster_summary, format_usage_hint, Cli, Commands, CreateArgs, OutputFormat};
use k3dforge::cluster::{assemble, BuildContext};
use k3dforge::config::{default_config_path, load_options_file, validate_options, RawCreateOptions};

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Create(args) => run_create(&cli, args),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
}

/// Options from the options file, if there is one
fn load_file_options(cli: &Cli) -> anyhow::Result<RawCreateOptions> {
    if let Some(path) = &cli.config {
        return load_options_file(path)
            .with_context(|| format!("Failed to load options file {}", path.display()));
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading default options file {}", path.display());
        return load_options_file(&path)
            .with_context(|| format!("Failed to load options file {}", path.display()));
    }

    Ok(RawCreateOptions::default())
}

fn run_create(cli: &Cli, args: &CreateArgs) -> anyhow::Result<()> {
    let raw = load_file_options(cli)?.merge(args.to_raw_options());

    let ctx = BuildContext::default();
    let options = validate_options(raw, &ctx).context("Invalid cluster options")?;
    let kubeconfig = options.kubeconfig;
    let cluster = assemble(options, ctx.filters).context("Failed to assemble cluster")?;

    let output = match args.output {
        OutputFormat::Yaml => serde_yaml::to_string(&cluster)?,
        OutputFormat::Json => serde_json::to_string_pretty(&cluster)? + "\n",
        OutputFormat::Table => format_cluster_summary(&cluster),
    };
    print!("{}", output);

    let program = std::env::args().next().unwrap_or_else(|| "k3dforge".to_string());
    eprint!(
        "{}",
        format_usage_hint(&cluster, &kubeconfig, &program, cfg!(windows))
    );

    Ok(())
}
