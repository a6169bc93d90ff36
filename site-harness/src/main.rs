use clap::{Parser, Subcommand};
use futures::FutureExt;
use site_harness::{
    probe_until, AssertionSet, CaseReport, HarnessError, LifecycleConfig, Phase, SiteLifecycle,
    TeardownOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use websites::prelude::*;

#[derive(Parser)]
#[command(name = "site-harness")]
#[command(about = "Drive website management resources through create/verify/delete cycles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List web spaces in the subscription
    Webspaces,
    /// Show one web space
    Webspace {
        name: String,
    },
    /// List sites in a web space
    Sites {
        #[arg(short, long, default_value = "eastuswebspace")]
        webspace: String,
    },
    /// Show one site
    Site {
        name: String,
        #[arg(short, long, default_value = "eastuswebspace")]
        webspace: String,
    },
    /// Create a throwaway site, exercise it, and delete it
    Smoke {
        /// Lifecycle config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Restart the site while it is live
        #[arg(long)]
        restart: bool,
        /// Fetch metric definitions while the site is live
        #[arg(long)]
        metrics: bool,
        #[arg(long)]
        delete_empty_farm: bool,
        #[arg(long)]
        delete_metrics: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let client = WebsiteClient::from_env()?;

    match cli.command {
        Commands::Webspaces => {
            for webspace in client.list_webspaces().await? {
                println!(
                    "{:<24} {:<16} {}",
                    webspace.name, webspace.geo_region, webspace.status
                );
            }
        }
        Commands::Webspace { name } => {
            let webspace = client.get_webspace(&name).await?;
            println!("{}", serde_json::to_string_pretty(&webspace)?);
        }
        Commands::Sites { webspace } => {
            for site in client.list_sites(&webspace).await? {
                println!("{:<40} {:<10} {}", site.name, site.state, site.usage_state);
            }
        }
        Commands::Site { name, webspace } => {
            let site = client.get_site(&webspace, &name).await?;
            println!("{}", serde_json::to_string_pretty(&site)?);
        }
        Commands::Smoke {
            config,
            restart,
            metrics,
            delete_empty_farm,
            delete_metrics,
        } => {
            let lifecycle_config = match config {
                Some(path) => LifecycleConfig::from_toml_file(&path)?,
                None => LifecycleConfig::default(),
            }
            .enable_delete_flags(delete_empty_farm, delete_metrics);

            let report = smoke(Arc::new(client), lifecycle_config, restart, metrics).await?;
            println!("{}", report.summary());
            if !report.is_success() || report.leaked_site() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn smoke(
    client: Arc<WebsiteClient>,
    config: LifecycleConfig,
    restart: bool,
    metrics: bool,
) -> Result<CaseReport<()>, Box<dyn std::error::Error>> {
    let webspace = config.webspace.clone();
    let absence_policy = config.absence_policy.clone();
    let lifecycle = SiteLifecycle::new(client.clone(), config)?;

    let mut report = lifecycle
        .scoped(move |lc| {
            async move {
                let site = lc.setup().await?;
                lc.verify().await?;

                let fetched = lc.fetch_site().await?;
                let mut checks = AssertionSet::new(&site.name);
                checks.check_site(&fetched, &site.name, &site.webspace);

                if restart {
                    lc.restart().await?;
                    info!("Restarted {}", site.name);
                }

                if metrics {
                    let definitions = lc.metric_definitions().await?;
                    checks.check_metric_definitions(&definitions);
                }

                checks.finish()
            }
            .boxed()
        })
        .await;

    if !matches!(report.teardown, TeardownOutcome::Deleted { .. }) {
        return Ok(report);
    }
    let Some(name) = report.site.clone() else {
        return Ok(report);
    };

    info!("Waiting for {} to disappear", name);
    match probe_until(&*client, &webspace, &name, false, &absence_policy).await {
        Ok(outcome) if outcome.satisfied => {}
        Ok(outcome) => {
            let e = HarnessError::StillPresent {
                site: name,
                attempts: outcome.attempts,
                waited: outcome.waited,
            };
            error!("{}", e);
            if report.result.is_ok() {
                report.result = Err(e);
            }
        }
        Err(source) => {
            let e = HarnessError::Probe {
                site: name,
                phase: Phase::Teardown,
                source,
            };
            error!("{}", e);
            if report.result.is_ok() {
                report.result = Err(e);
            }
        }
    }

    Ok(report)
}
