//! nbpublish binary.
//!
//! Publishes one notebook to Medium as a draft by calling the external
//! publishing library. The integration token is read from the environment
//! here and nowhere else.

mod config;

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use config::Config;
use nbpublish_tools::{
    resolve_token, License, PublishInvoker, PublishOptions, PublishOutcome, PublishStatus,
    PythonPublisher, TableConversion,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_NOTEBOOK: &str = "november_2020/climate_streamlit/climacell.ipynb";

#[derive(Parser, Debug)]
#[command(name = "nbpublish")]
#[command(version, about = "Publish a notebook to Medium as a draft post", long_about = None)]
struct Cli {
    /// Notebook to publish
    #[arg(value_name = "NOTEBOOK", default_value = DEFAULT_NOTEBOOK)]
    notebook: PathBuf,

    /// Environment variable holding the integration token (default: TOKEN)
    #[arg(long, value_name = "NAME")]
    token_env: Option<String>,

    /// Config file (default: ~/.nbpublish/config.yaml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Publication to publish under
    #[arg(long)]
    pub_name: Option<String>,

    /// Post title
    #[arg(long)]
    title: Option<String>,

    /// Post tag, can be repeated
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Publish status: public, draft, unlisted
    #[arg(long)]
    status: Option<PublishStatus>,

    /// Notify followers
    #[arg(long, overrides_with = "no_notify_followers")]
    notify_followers: bool,

    /// Do not notify followers, even if the config file says so
    #[arg(long, overrides_with = "notify_followers")]
    no_notify_followers: bool,

    /// License id, e.g. all-rights-reserved, cc-40-by, public-domain
    #[arg(long)]
    license: Option<License>,

    /// Canonical URL of the original post
    #[arg(long)]
    canonical_url: Option<String>,

    /// Browser executable used for table rendering
    #[arg(long)]
    chrome_path: Option<String>,

    /// Keep the generated markdown
    #[arg(long, overrides_with = "no_save_markdown")]
    save_markdown: bool,

    /// Do not keep the generated markdown, even if the config file says so
    #[arg(long, overrides_with = "save_markdown")]
    no_save_markdown: bool,

    /// Table conversion: chrome, matplotlib
    #[arg(long)]
    table_conversion: Option<TableConversion>,

    /// Python interpreter (default: $PYTHON_PATH or python3)
    #[arg(long)]
    python: Option<String>,

    /// Python module providing publish()
    #[arg(long)]
    module: Option<String>,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Print the request (token masked) without publishing
    #[arg(long)]
    dry_run: bool,

    /// Print the publisher response as JSON
    #[arg(short, long)]
    json: bool,
}

impl Cli {
    /// Layer flags over the config file options.
    fn apply_overrides(&self, mut options: PublishOptions) -> PublishOptions {
        if let Some(pub_name) = &self.pub_name {
            options.pub_name = Some(pub_name.clone());
        }
        if let Some(title) = &self.title {
            options.title = Some(title.clone());
        }
        if !self.tags.is_empty() {
            options.tags = Some(self.tags.clone());
        }
        if let Some(status) = self.status {
            options.publish_status = status;
        }
        if self.notify_followers {
            options.notify_followers = true;
        } else if self.no_notify_followers {
            options.notify_followers = false;
        }
        if let Some(license) = self.license {
            options.license = license;
        }
        if let Some(url) = &self.canonical_url {
            options.canonical_url = Some(url.clone());
        }
        if let Some(path) = &self.chrome_path {
            options.chrome_path = Some(path.clone());
        }
        if self.save_markdown {
            options.save_markdown = true;
        } else if self.no_save_markdown {
            options.save_markdown = false;
        }
        if let Some(mode) = self.table_conversion {
            options.table_conversion = mode;
        }
        options
    }

    fn apply_config(&self, config: &mut Config) {
        if let Some(var) = &self.token_env {
            config.token_env = Some(var.clone());
        }
        if let Some(python) = &self.python {
            config.python = Some(python.clone());
        }
        if let Some(module) = &self.module {
            config.module = Some(module.clone());
        }
        if let Some(secs) = self.timeout {
            config.timeout_seconds = Some(secs);
        }
        config.options = self.apply_overrides(std::mem::take(&mut config.options));
    }
}

/// `RUST_LOG` if set (a `.env` file counts), else the default directives.
fn log_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,nbpublish=debug,nbpublish_tools=debug".into())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before the subscriber, so RUST_LOG from .env applies.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_config(&mut config);

    let token = resolve_token(config.token_env(), |name| std::env::var(name).ok())?;

    let mut invoker = PublishInvoker::new(
        PythonPublisher::new(config.python_config()),
        config.options,
    );

    let python = invoker.publisher().config();
    tracing::debug!(
        python = %python.python,
        module = %python.module,
        timeout = ?python.timeout_seconds,
        status = %invoker.options().publish_status,
        license = %invoker.options().license,
        "Publisher configuration loaded"
    );

    if cli.dry_run {
        let request = invoker.prepare(&cli.notebook, token)?;
        let preview = serde_json::json!({
            "path": request.path().to_string_lossy(),
            "kwargs": request.to_redacted_kwargs(),
        });
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    let outcome = invoker
        .invoke(&cli.notebook, token)
        .await
        .with_context(|| format!("Failed to publish {}", cli.notebook.display()))?;

    if cli.json {
        let data = outcome.data.clone().unwrap_or(serde_json::Value::Null);
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{}", summary(&outcome, invoker.options().publish_status, &cli.notebook));
    }

    Ok(())
}

/// One-line result shown when `--json` is not given.
fn summary(outcome: &PublishOutcome, status: PublishStatus, notebook: &Path) -> String {
    match (outcome.url(), outcome.post_id()) {
        (Some(url), Some(id)) => format!("Created {} post {}: {}", status, id, url),
        (Some(url), None) => format!("Created {} post: {}", status, url),
        _ => format!("Published {}", notebook.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_match_fixed_configuration() {
        let cli = Cli::parse_from(["nbpublish"]);
        assert_eq!(cli.notebook, PathBuf::from(DEFAULT_NOTEBOOK));

        let mut config = Config::default();
        cli.apply_config(&mut config);

        assert_eq!(config.token_env(), "TOKEN");
        assert_eq!(config.options, PublishOptions::default());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "nbpublish",
            "report.ipynb",
            "--token-env",
            "MEDIUM_TOKEN",
            "--tag",
            "rust",
            "--tag",
            "jupyter",
            "--status",
            "unlisted",
            "--license",
            "cc-40-zero",
            "--table-conversion",
            "matplotlib",
            "--timeout",
            "60",
        ]);

        let mut config = Config {
            timeout_seconds: Some(10),
            options: PublishOptions {
                title: Some("From config".to_string()),
                ..PublishOptions::default()
            },
            ..Config::default()
        };
        cli.apply_config(&mut config);

        assert_eq!(cli.notebook, PathBuf::from("report.ipynb"));
        assert_eq!(config.token_env(), "MEDIUM_TOKEN");
        assert_eq!(config.timeout_seconds, Some(60));

        let options = &config.options;
        assert_eq!(options.title.as_deref(), Some("From config"));
        assert_eq!(
            options.tags,
            Some(vec!["rust".to_string(), "jupyter".to_string()])
        );
        assert_eq!(options.publish_status, PublishStatus::Unlisted);
        assert_eq!(options.license, License::Cc40Zero);
        assert_eq!(options.table_conversion, TableConversion::Matplotlib);
        assert!(!options.notify_followers);
    }

    #[test]
    fn test_cli_rejects_unknown_license() {
        assert!(Cli::try_parse_from(["nbpublish", "--license", "gpl-3"]).is_err());
    }

    #[test]
    fn test_negated_flags_override_config() {
        let cli = Cli::parse_from(["nbpublish", "--no-notify-followers", "--no-save-markdown"]);

        let mut config = Config {
            options: PublishOptions {
                notify_followers: true,
                save_markdown: true,
                ..PublishOptions::default()
            },
            ..Config::default()
        };
        cli.apply_config(&mut config);

        assert!(!config.options.notify_followers);
        assert!(!config.options.save_markdown);
    }

    #[test]
    fn test_last_of_paired_flags_wins() {
        let cli = Cli::parse_from([
            "nbpublish",
            "--no-notify-followers",
            "--notify-followers",
            "--save-markdown",
            "--no-save-markdown",
        ]);

        let options = cli.apply_overrides(PublishOptions::default());
        assert!(options.notify_followers);
        assert!(!options.save_markdown);
    }

    #[test]
    fn test_summary_reads_enveloped_response() {
        let outcome = PublishOutcome::success(serde_json::json!({
            "data": {"id": "abc", "url": "https://medium.com/p/abc", "publishStatus": "draft"}
        }));
        assert_eq!(
            summary(&outcome, PublishStatus::Draft, Path::new("report.ipynb")),
            "Created draft post abc: https://medium.com/p/abc"
        );

        let empty = PublishOutcome::success(serde_json::json!({}));
        assert_eq!(
            summary(&empty, PublishStatus::Draft, Path::new("report.ipynb")),
            "Published report.ipynb"
        );
    }

    #[test]
    fn test_log_filter_reads_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, "RUST_LOG=warn\n").unwrap();

        dotenvy::from_path_override(&env_file).unwrap();
        assert_eq!(log_filter().to_string(), "warn");
    }
}
