//! scangate CLI tool.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "scangate")]
#[command(about = "scangate release gate CLI", long_about = None)]
struct Cli {
    /// API server URL
    #[arg(long, env = "SCANGATE_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Role sent as the x-role header
    #[arg(long, env = "SCANGATE_ROLE", default_value = "appsec_engineer")]
    role: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit scanner artifacts as an async batch job
    Submit {
        /// Release the batch targets
        #[arg(long)]
        release: String,
        /// tool=path pair; supported tools: gitleaks, semgrep, checkov, grype, osv
        #[arg(long = "input", value_name = "TOOL=PATH")]
        inputs: Vec<String>,
        /// Repository the reports were produced for
        #[arg(long)]
        repo: String,
        /// Service name
        #[arg(long)]
        service: String,
        /// Owning team
        #[arg(long)]
        owner: String,
        /// Deployment environment (dev, staging, prod)
        #[arg(long, default_value = "prod")]
        environment: String,
        /// Business criticality tier
        #[arg(long, default_value = "tier1")]
        criticality: String,
        /// Data classification of the asset
        #[arg(long, default_value = "confidential")]
        data_classification: String,
        /// Whether the service is internet facing
        #[arg(long, default_value_t = true)]
        internet_facing: bool,
        /// Idempotency key for retry-safe submission
        #[arg(long)]
        idempotency_key: Option<String>,
        /// Poll until the job reaches a terminal state
        #[arg(long)]
        wait: bool,
    },
    /// Show a job's status and result
    Job {
        /// Job ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            release,
            inputs,
            repo,
            service,
            owner,
            environment,
            criticality,
            data_classification,
            internet_facing,
            idempotency_key,
            wait,
        } => {
            commands::submit(
                &cli.api_url,
                &cli.role,
                commands::SubmitArgs {
                    release,
                    inputs,
                    repo,
                    service,
                    owner,
                    environment,
                    criticality,
                    data_classification,
                    internet_facing,
                    idempotency_key,
                    wait,
                },
            )
            .await?;
        }
        Commands::Job { id } => {
            commands::job(&cli.api_url, &cli.role, &id).await?;
        }
    }

    Ok(())
}
