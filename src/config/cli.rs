use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

use crate::domain::content::ContentKey;

/// Command-line arguments for the Bulletin binary.
///
/// Every override is global so it can be given before or after the subcommand.
/// Several overrides also read the legacy deployment variables (`PORT`, `CACHE_TTL`, ...).
#[derive(Debug, Parser)]
#[command(name = "bulletin", version, about = "Bulletin content server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "BULLETIN_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public and administrative HTTP listeners.
    Serve,
    /// Load one collection through the content service and print it as JSON.
    Fetch(FetchArgs),
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Collection to load (events, news or faq).
    #[arg(value_name = "KEY")]
    pub key: ContentKey,

    /// Pretty-print the document.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pretty: bool,
}

/// Deployment profile selecting store and cache defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ProfileArg {
    #[default]
    Development,
    Production,
    Testing,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Select the deployment profile.
    #[arg(long = "profile", env = "BULLETIN_PROFILE", value_name = "PROFILE", global = true)]
    pub profile: Option<ProfileArg>,

    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST", global = true)]
    pub server_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-port", env = "PORT", value_name = "PORT", global = true)]
    pub server_port: Option<u16>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST", global = true)]
    pub server_admin_host: Option<String>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT", global = true)]
    pub server_admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(
        long = "server-graceful-shutdown-seconds",
        value_name = "SECONDS",
        global = true
    )]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Read content from the local filesystem instead of blob storage.
    #[arg(
        long = "store-use-local",
        env = "USE_LOCAL_FILES",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub store_use_local: Option<bool>,

    /// Override the local content directory.
    #[arg(
        long = "store-local-root",
        env = "LOCAL_DATA_PATH",
        value_name = "PATH",
        value_hint = ValueHint::DirPath,
        global = true
    )]
    pub store_local_root: Option<PathBuf>,

    /// Override the blob storage connection string.
    #[arg(
        long = "store-connection-string",
        env = "AZURE_STORAGE_CONNECTION_STRING",
        hide_env_values = true,
        value_name = "STRING",
        global = true
    )]
    pub store_connection_string: Option<String>,

    /// Override the blob container name.
    #[arg(
        long = "store-container",
        env = "BLOB_CONTAINER_NAME",
        value_name = "NAME",
        global = true
    )]
    pub store_container: Option<String>,

    /// Override the cache lifetime of loaded documents.
    #[arg(
        long = "cache-ttl-seconds",
        env = "CACHE_TTL",
        value_name = "SECONDS",
        global = true
    )]
    pub cache_ttl_seconds: Option<u64>,

    /// Load every collection once before accepting traffic.
    #[arg(
        long = "cache-warm-on-startup",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_warm_on_startup: Option<bool>,

    /// Override the events resource name.
    #[arg(long = "events-file", env = "EVENTS_FILE", value_name = "NAME", global = true)]
    pub events_file: Option<String>,

    /// Override the news resource name.
    #[arg(long = "news-file", env = "NEWS_FILE", value_name = "NAME", global = true)]
    pub news_file: Option<String>,

    /// Override the FAQ resource name.
    #[arg(long = "faq-file", env = "FAQ_FILE", value_name = "NAME", global = true)]
    pub faq_file: Option<String>,
}
