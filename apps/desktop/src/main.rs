use anyhow::{anyhow, Result};
use clap::Parser;
use client_core::{ClientEvent, DeployClient};
use shared::domain::{GitRepoUrl, ProjectSlug};

/// Headless deployment trigger: POSTs a GitHub repository to the deployment
/// API and tails the streamed build logs to stdout.
#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the deployment API, e.g. http://127.0.0.1:9000
    #[arg(long)]
    api_url: String,
    /// GitHub repository to deploy, e.g. github.com/owner/repo
    #[arg(long, conflicts_with = "slug")]
    repo_url: Option<String>,
    /// Tail logs for an existing deployment instead of triggering a new one
    #[arg(long)]
    slug: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let client = DeployClient::new(args.api_url);
    let mut events = client.subscribe_events();

    let slug = match (args.repo_url, args.slug) {
        (Some(repo_url), None) => {
            let repo = GitRepoUrl::parse(&repo_url).map_err(|err| anyhow!("{err}: {repo_url}"))?;
            let accepted = client.trigger_deployment(&repo).await?;
            println!("Deployment accepted: slug={}", accepted.project_slug);
            println!("Preview URL: {}", accepted.url);
            accepted.project_slug
        }
        (None, Some(slug)) => ProjectSlug(slug),
        _ => return Err(anyhow!("pass exactly one of --repo-url or --slug")),
    };

    client.subscribe_logs(&slug).await?;

    while let Ok(event) = events.recv().await {
        match event {
            ClientEvent::Log(log) => println!("> {}", log.log),
            ClientEvent::Error(err) => tracing::warn!("log stream: {err}"),
            ClientEvent::LogStreamClosed => {
                println!("Log stream closed by server.");
                break;
            }
            ClientEvent::DeploymentAccepted { .. } => {}
        }
    }

    Ok(())
}
