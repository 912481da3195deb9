//! CLI runner - executes commands

use crate::auth::SessionAuthenticator;
use crate::cancel::CancelToken;
use crate::cli::commands::{Cli, Commands};
use crate::config::{load_config, FetchConfig};
use crate::error::Result;
use crate::feed::{FeedScraper, SearchParameters, UserRef};
use crate::http::HttpFeedSource;
use crate::pacing::{HumanPacing, NoPacing, PacingModel};
use crate::pagination::{FetchOutcome, Progress, ProgressSink, RunStatus};
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        let cancel = CancelToken::new();
        watch_interrupt(cancel.clone());

        let scraper = self.build_scraper(&config, cancel)?;
        if config.login.is_some() {
            scraper.authenticate().await?;
        }

        let sink: &dyn ProgressSink = &|progress: Progress| {
            debug!(
                "Progress: {}/{} ({:.0}%)",
                progress.collected,
                progress.target,
                progress.fraction * 100.0
            );
        };

        let outcome = match &self.cli.command {
            Commands::Timeline { user } => {
                let user = UserRef::parse(user)?;
                scraper
                    .fetch_user_timeline(&user, self.cli.count, Some(sink))
                    .await?
            }
            Commands::Search {
                query,
                mode,
                since,
                until,
            } => {
                let mut params = SearchParameters::new(query.clone())
                    .with_count(self.cli.count)
                    .with_mode(*mode);
                params.start_date = *since;
                params.end_date = *until;
                scraper.search(&params, Some(sink)).await?
            }
        };

        write_items(&outcome)?;
        report(&outcome);
        Ok(())
    }

    /// Load configuration, falling back to defaults when no file is given
    fn load_config(&self) -> Result<FetchConfig> {
        match &self.cli.config {
            Some(path) => load_config(path),
            None => Ok(FetchConfig::default()),
        }
    }

    fn build_scraper(
        &self,
        config: &FetchConfig,
        cancel: CancelToken,
    ) -> Result<FeedScraper<HttpFeedSource>> {
        let mut source = HttpFeedSource::new(config.require_source()?.clone())?;

        let authenticator = match &config.login {
            Some(login) => {
                let auth = Arc::new(SessionAuthenticator::new(login.clone())?);
                source = source.with_authenticator(Arc::clone(&auth));
                Some(auth)
            }
            None => None,
        };

        let pacing: Arc<dyn PacingModel> = if self.cli.no_pacing {
            Arc::new(NoPacing)
        } else {
            Arc::new(HumanPacing::new(config.pacing.clone())?)
        };

        let mut builder = FeedScraper::builder(source)
            .rate_limit(config.rate_limit.clone())
            .pacing(pacing)
            .page_cap(config.page_cap)
            .cancel(cancel);
        if let Some(auth) = authenticator {
            builder = builder.authenticator(auth);
        }
        builder.build()
    }
}

/// Cancel the run on Ctrl+C
fn watch_interrupt(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping at the next wait");
            cancel.cancel();
        }
    });
}

/// Print items to stdout, one JSON document per line
fn write_items(outcome: &FetchOutcome<Value>) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for item in &outcome.items {
        serde_json::to_writer(&mut out, item)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn report(outcome: &FetchOutcome<Value>) {
    match &outcome.status {
        RunStatus::Complete | RunStatus::Exhausted => {
            info!("Fetched {} items ({})", outcome.len(), outcome.status);
        }
        RunStatus::Partial { .. } | RunStatus::Cancelled => {
            warn!("Fetched {} items ({})", outcome.len(), outcome.status);
        }
    }
}
