//! CLI runner - executes commands

use crate::batch::PurgeOptions;
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::SessionConfig;
use crate::entity::Page;
use crate::error::{Error, Result, ResultExt};
use crate::generators::{QueryDescriptor, Revisions, Search};
use crate::session::{Enumeration, Session};
use serde_json::{json, Value};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let session = Session::connect(self.load_config()?)?;
        let result = match &self.cli.command {
            Commands::Search {
                query,
                limit,
                namespace,
            } => {
                let search = Search::new(query.clone()).namespaces(namespace.iter().copied());
                self.print_pages(session.enumerate(search)?, *limit).await
            }
            Commands::List { descriptor, limit } => {
                let descriptor: QueryDescriptor =
                    serde_json::from_str(descriptor).context("Invalid query descriptor")?;
                self.print_pages(session.enumerate(descriptor)?, *limit).await
            }
            Commands::Revisions { title, limit } => {
                self.revisions(&session, title, *limit).await
            }
            Commands::Redirect { title } => self.redirect(&session, title).await,
            Commands::Purge {
                titles,
                force_link_update,
            } => self.purge(&session, titles, *force_link_update).await,
        };

        self.output_message(&json!({"type": "STATS", "stats": session.stats()}));
        session.close();
        result
    }

    /// Session config from the config file, with `--api-url` on top
    fn load_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.cli.config {
            Some(path) => SessionConfig::from_file(path)?,
            None => SessionConfig::default(),
        };
        if let Some(api_url) = &self.cli.api_url {
            config.api_url.clone_from(api_url);
        }
        if config.api_url.is_empty() {
            return Err(Error::config(
                "API URL not specified (use --api-url or a config file)",
            ));
        }
        config.validate()?;
        Ok(config)
    }

    async fn print_pages(&self, mut pages: Enumeration, limit: Option<usize>) -> Result<()> {
        let mut printed = 0;
        while limit.map_or(true, |limit| printed < limit) {
            let Some(page) = pages.next().await? else {
                break;
            };
            self.output_page(&page);
            printed += 1;
        }
        Ok(())
    }

    async fn revisions(&self, session: &Session, title: &str, limit: Option<usize>) -> Result<()> {
        let mut revisions = session.revisions(Revisions::of_title(title))?;
        let mut printed = 0;
        while limit.map_or(true, |limit| printed < limit) {
            let Some(fetched) = revisions.next().await? else {
                break;
            };
            self.output_message(&json!({
                "type": "REVISION",
                "title": fetched.page.title(),
                "revision": fetched.revision,
            }));
            printed += 1;
        }
        Ok(())
    }

    async fn redirect(&self, session: &Session, title: &str) -> Result<()> {
        let start = session.page(title)?;
        let resolution = session.resolve_redirect(&start).await?;
        self.output_message(&json!({
            "type": "REDIRECT",
            "target": resolution.target.snapshot(),
            "path": resolution.path.titles(),
        }));
        Ok(())
    }

    async fn purge(&self, session: &Session, titles: &[String], force_link_update: bool) -> Result<()> {
        let pages = titles
            .iter()
            .map(|title| session.page(title))
            .collect::<Result<Vec<Page>>>()?;
        let options = PurgeOptions {
            force_link_update,
            ..PurgeOptions::default()
        };
        let report = session.purge(pages, options).await?;
        for item in &report.items {
            self.output_message(&json!({
                "type": "PURGE",
                "title": item.identity.title,
                "success": item.outcome.is_success(),
                "failure": item.outcome.failure(),
            }));
        }
        Ok(())
    }

    fn output_page(&self, page: &Page) {
        self.output_message(&json!({"type": "PAGE", "page": page.snapshot()}));
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
