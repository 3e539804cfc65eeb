// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vcd_oidc::prelude::*;

/// IAM integration with vCD (command line interface).
#[derive(Parser)]
#[command(name = "iamvcd")]
#[command(version = concat!("v", env!("CARGO_PKG_VERSION")))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enable/Refresh IBM Cloud IAM access in a vCD organization.
    Integrate,
    /// Import IBM Cloud IAM users into a vCD organization.
    Import {
        /// IAM user to import into vCD organization
        #[arg(long, value_name = "iam_user@foo.com")]
        user: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let code = exit_code(run().await);
    if code != 0 {
        std::process::exit(code);
    }
}

/// Prints the error chain of a failed run and maps it to the process exit status.
fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to read configuration from the environment")?;
    let target = config.target_label();
    let provisioner = Provisioner::new(config);

    match cli.command {
        Commands::Integrate => {
            println!("IAM integration with {target} - Started...");
            provisioner
                .integrate_org()
                .await
                .with_context(|| format!("IAM integration with {target} failed"))?;
            println!("IAM integration with {target} - Finished");
        }
        Commands::Import { user } => {
            println!("Importing {user} to {target} - Started...");
            provisioner
                .import_user(&user)
                .await
                .with_context(|| format!("Importing {user} to {target} failed"))?;
            println!("Importing {user} to {target} - Finished");
        }
    }

    Ok(())
}
