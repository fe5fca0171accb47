mod config;

use clap::{Parser, Subcommand};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use navigation::api::{self, ApiServerError};
use navigation::api_manager::ApiError;
use navigation::lazy_builder::ExternalMenuLazyBuilder;
use navigation::main_menu::SyncError;
use navigation::menu::{BuildOptions, RequestContext};
use navigation::metrics_defs::{ALL_METRICS, MetricType};
use navigation::transport::RequestOptions;
use navigation::{Navigation, NavigationError};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(version, about = "Global navigation client")]
struct Cli {
    #[arg(long, short, default_value = "navigator.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the public menu endpoints
    Serve,
    /// Fetch a menu and print it
    Get {
        #[arg(long)]
        lang: String,
        #[arg(long, default_value = "main")]
        menu: String,
        #[arg(long)]
        bypass_cache: bool,
        /// Render the menu as seen from this page instead of printing the raw payload
        #[arg(long)]
        path: Option<String>,
        #[arg(long, default_value_t = 10)]
        max_depth: usize,
    },
    /// Push the local main menu upstream
    Sync {
        #[arg(long)]
        lang: Vec<String>,
    },
    /// Refresh cached menus
    Warm {
        #[arg(long)]
        lang: Vec<String>,
        #[arg(long)]
        menu: Vec<String>,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Server(#[from] ApiServerError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not encode output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "navigator failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::from_file(&cli.config)?;

    let _sentry = init_logging(config.common.logging.as_ref());
    init_metrics(config.common.metrics.as_ref())?;

    let navigation = Arc::new(Navigation::from_config(config.navigation)?);

    // Requests are handled one at a time, a single thread is enough.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(execute(cli.command, navigation))
}

fn init_logging(logging: Option<&LoggingConfig>) -> Option<sentry::ClientInitGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    match logging {
        Some(logging) => {
            let guard = sentry::init((
                logging.sentry_dsn.as_str(),
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    ..Default::default()
                },
            ));
            registry.with(sentry::integrations::tracing::layer()).init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

fn init_metrics(metrics: Option<&MetricsConfig>) -> Result<(), CliError> {
    let Some(metrics) = metrics else {
        return Ok(());
    };

    let recorder = StatsdBuilder::from(metrics.statsd_host.as_str(), metrics.statsd_port)
        .build(Some("navigator"))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    for def in ALL_METRICS {
        match def.metric_type {
            MetricType::Counter => metrics::describe_counter!(def.name, def.description),
            MetricType::Histogram => metrics::describe_histogram!(def.name, def.description),
        }
    }
    Ok(())
}

async fn execute(command: CliCommand, navigation: Arc<Navigation>) -> Result<(), CliError> {
    match command {
        CliCommand::Serve => {
            let listener = navigation.config().listener.clone();
            api::serve(listener, navigation).await?;
        }
        CliCommand::Get {
            lang,
            menu,
            bypass_cache,
            path,
            max_depth,
        } => {
            let mut client = navigation.api_manager();
            if bypass_cache {
                client = client.with_bypass_cache();
            }

            match path {
                Some(path) => {
                    let tree_builder = navigation.external_tree_builder();
                    let options = BuildOptions {
                        menu_type: menu.clone(),
                        max_depth,
                        ..Default::default()
                    };
                    let rendered = ExternalMenuLazyBuilder::new(&client, &tree_builder)
                        .build(
                            &menu,
                            &lang,
                            &RequestOptions::default(),
                            &options,
                            Some(&RequestContext::new(&path)),
                        )
                        .await;
                    print(&rendered)?;
                }
                None => {
                    let response = client.get(&lang, &menu, &RequestOptions::default()).await?;
                    print(&response.data)?;
                }
            }
        }
        CliCommand::Sync { lang } => {
            let manager = navigation.main_menu_manager();

            for langcode in languages(&navigation, lang) {
                let published = manager.sync(&langcode).await?;
                println!("{langcode}: {}", if published { "published" } else { "unpublished" });
            }
        }
        CliCommand::Warm { lang, menu } => {
            let languages = languages(&navigation, lang);
            let report = navigation
                .cache_warmer()
                .warm(&navigation.api_manager(), &languages, &menu)
                .await;
            print(&report)?;
        }
    }
    Ok(())
}

/// The requested languages, or every language this site is served in.
fn languages(navigation: &Navigation, requested: Vec<String>) -> Vec<String> {
    if !requested.is_empty() {
        return requested;
    }

    let config = navigation.config();
    let mut languages: Vec<String> = config.environment.urls.keys().cloned().collect();
    if languages.is_empty() {
        languages.push(config.site.default_language.clone());
    }
    languages.sort();
    languages
}

fn print<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
