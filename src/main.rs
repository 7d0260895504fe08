use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cftest::dispatcher;

/// Render a CloudFormation JSON document from a Jinja (.j2) or code (.cft) template.
#[derive(Parser, Debug)]
#[command(name = "cftest", version, about)]
struct Cli {
    /// Input template file in Jinja2 (.j2) or code unit (.cft) format
    template: PathBuf,

    /// Output JSON config file
    outfile: PathBuf,

    /// JSON file with the template parameters
    paramfile: PathBuf,

    /// JSON document to compare the rendered output against
    #[arg(short = 'c', long = "c", visible_alias = "compare", value_name = "COMPARE_FILE")]
    compare_file: Option<PathBuf>,

    /// Override the `environment` parameter
    #[arg(short, long)]
    environment: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) if cli.verbose => filter.add_directive("cftest=debug".parse()?),
        Ok(filter) => filter,
        Err(_) if cli.verbose => EnvFilter::new("cftest=debug"),
        Err(_) => EnvFilter::new("cftest=warn"),
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let options = dispatcher::Options {
        template: cli.template,
        outfile: cli.outfile,
        paramfile: cli.paramfile,
        compare_file: cli.compare_file,
        environment: cli.environment,
    };
    dispatcher::run(&options)
        .with_context(|| format!("cftest failed for {}", options.template.display()))?;

    return Ok(());
}
