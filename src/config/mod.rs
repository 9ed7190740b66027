//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    collections::HashMap, fmt, net::SocketAddr, num::NonZeroUsize, path::PathBuf, str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::content::{ContentFiles, ContentKey};

mod cli;

pub use cli::{CliArgs, Command, FetchArgs, Overrides, ProfileArg};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "bulletin";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 5000;
const DEFAULT_ADMIN_PORT: u16 = 5001;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CONTAINER: &str = "content";
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_CACHE_CAPACITY: usize = 100;
const DEVELOPMENT_LOCAL_ROOT: &str = "data";
const TESTING_LOCAL_ROOT: &str = "tests/data";
const TESTING_CACHE_TTL_SECS: u64 = 1;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub profile: Profile,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub content: ContentFiles,
    pub cache: CacheSettings,
}

/// Deployment profile. Supplies defaults that explicit values always override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Testing,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Development => "development",
            Profile::Production => "production",
            Profile::Testing => "testing",
        }
    }

    fn uses_local_store(self) -> bool {
        !matches!(self, Profile::Production)
    }

    fn local_root(self) -> &'static str {
        match self {
            Profile::Testing => TESTING_LOCAL_ROOT,
            Profile::Development | Profile::Production => DEVELOPMENT_LOCAL_ROOT,
        }
    }

    fn cache_ttl_seconds(self) -> u64 {
        match self {
            Profile::Testing => TESTING_CACHE_TTL_SECS,
            Profile::Development | Profile::Production => DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "default" => Ok(Profile::Development),
            "production" => Ok(Profile::Production),
            "testing" => Ok(Profile::Testing),
            other => Err(format!(
                "unknown profile `{other}` (expected development, production or testing)"
            )),
        }
    }
}

impl From<ProfileArg> for Profile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Development => Profile::Development,
            ProfileArg::Production => Profile::Production,
            ProfileArg::Testing => Profile::Testing,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Upper bound on the remote availability probe.
    pub probe_timeout: Duration,
    /// Upper bound on a single remote download.
    pub request_timeout: Duration,
}

#[derive(Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Local {
        root: PathBuf,
    },
    /// An empty connection string is accepted; the store then never becomes available.
    Remote {
        connection_string: String,
        container: String,
    },
}

impl fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Local { root } => f.debug_struct("Local").field("root", root).finish(),
            StoreBackend::Remote {
                connection_string,
                container,
            } => f
                .debug_struct("Remote")
                .field(
                    "connection_string",
                    &if connection_string.is_empty() {
                        "<empty>"
                    } else {
                        "<redacted>"
                    },
                )
                .field("container", container)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub ttl_overrides: HashMap<ContentKey, Duration>,
    pub capacity: NonZeroUsize,
    pub warm_on_startup: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

const ENV_PREFIX: &str = "BULLETIN";
const ENV_SEPARATOR: &str = "__";

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR)
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    load_with_environment(cli, environment())
}

/// [`load`] with an explicit `BULLETIN__*` environment layer.
fn load_with_environment(cli: &CliArgs, env: Environment) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(env);

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    profile: Option<String>,
    server: RawServerSettings,
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    content: RawContentSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(profile) = overrides.profile {
            self.profile = Some(Profile::from(profile).as_str().to_string());
        }
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.server_admin_port {
            self.server.admin_port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(use_local) = overrides.store_use_local {
            self.store.use_local = Some(use_local);
        }
        if let Some(root) = overrides.store_local_root.as_ref() {
            self.store.local_root = Some(root.clone());
        }
        if let Some(connection) = overrides.store_connection_string.as_ref() {
            self.store.connection_string = Some(connection.clone());
        }
        if let Some(container) = overrides.store_container.as_ref() {
            self.store.container = Some(container.clone());
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(warm) = overrides.cache_warm_on_startup {
            self.cache.warm_on_startup = Some(warm);
        }
        if let Some(name) = overrides.events_file.as_ref() {
            self.content.events_file = Some(name.clone());
        }
        if let Some(name) = overrides.news_file.as_ref() {
            self.content.news_file = Some(name.clone());
        }
        if let Some(name) = overrides.faq_file.as_ref() {
            self.content.faq_file = Some(name.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            profile,
            server,
            logging,
            store,
            content,
            cache,
        } = raw;

        let profile = match profile {
            Some(value) => {
                Profile::from_str(&value).map_err(|reason| LoadError::invalid("profile", reason))?
            }
            None => Profile::default(),
        };

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let store = build_store_settings(store, profile)?;
        let content = build_content_files(content)?;
        let cache = build_cache_settings(cache, profile)?;

        Ok(Self {
            profile,
            server,
            logging,
            store,
            content,
            cache,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = server.port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;
    if public_addr == admin_addr {
        return Err(LoadError::invalid(
            "server.admin_port",
            "administrative listener must not share the public address",
        ));
    }

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(
    store: RawStoreSettings,
    profile: Profile,
) -> Result<StoreSettings, LoadError> {
    let use_local = store.use_local.unwrap_or(profile.uses_local_store());

    let backend = if use_local {
        let root = store
            .local_root
            .unwrap_or_else(|| PathBuf::from(profile.local_root()));
        if root.as_os_str().is_empty() {
            return Err(LoadError::invalid(
                "store.local_root",
                "path must not be empty",
            ));
        }
        StoreBackend::Local { root }
    } else {
        let container = store
            .container
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_CONTAINER.to_string());
        if container.is_empty() {
            return Err(LoadError::invalid(
                "store.container",
                "container name must not be empty",
            ));
        }
        StoreBackend::Remote {
            connection_string: store
                .connection_string
                .map(|value| value.trim().to_string())
                .unwrap_or_default(),
            container,
        }
    };

    let probe_timeout = non_zero_millis(
        store.probe_timeout_ms.unwrap_or(DEFAULT_PROBE_TIMEOUT_MS),
        "store.probe_timeout_ms",
    )?;
    let request_timeout = non_zero_millis(
        store
            .request_timeout_ms
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        "store.request_timeout_ms",
    )?;

    Ok(StoreSettings {
        backend,
        probe_timeout,
        request_timeout,
    })
}

fn build_content_files(content: RawContentSettings) -> Result<ContentFiles, LoadError> {
    let defaults = ContentFiles::default();
    Ok(ContentFiles {
        events: resource_name(content.events_file, defaults.events, "content.events_file")?,
        news: resource_name(content.news_file, defaults.news, "content.news_file")?,
        faq: resource_name(content.faq_file, defaults.faq, "content.faq_file")?,
    })
}

fn build_cache_settings(
    cache: RawCacheSettings,
    profile: Profile,
) -> Result<CacheSettings, LoadError> {
    let ttl_seconds = cache.ttl_seconds.unwrap_or(profile.cache_ttl_seconds());
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let mut ttl_overrides = HashMap::new();
    for (name, seconds) in cache.ttl_overrides {
        let key = ContentKey::from_str(&name)
            .map_err(|err| LoadError::invalid("cache.ttl_overrides", err.to_string()))?;
        if seconds == 0 {
            return Err(LoadError::invalid(
                "cache.ttl_overrides",
                format!("ttl for `{key}` must be greater than zero"),
            ));
        }
        ttl_overrides.insert(key, Duration::from_secs(seconds));
    }

    let capacity = NonZeroUsize::new(cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY))
        .ok_or_else(|| LoadError::invalid("cache.capacity", "must be greater than zero"))?;

    Ok(CacheSettings {
        ttl: Duration::from_secs(ttl_seconds),
        ttl_overrides,
        capacity,
        warm_on_startup: cache.warm_on_startup.unwrap_or(false),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    admin_host: Option<String>,
    admin_port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    use_local: Option<bool>,
    local_root: Option<PathBuf>,
    connection_string: Option<String>,
    container: Option<String>,
    probe_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    events_file: Option<String>,
    news_file: Option<String>,
    faq_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    ttl_seconds: Option<u64>,
    capacity: Option<usize>,
    warm_on_startup: Option<bool>,
    ttl_overrides: HashMap<String, u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_millis(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(value))
}

fn resource_name(
    value: Option<String>,
    default: String,
    key: &'static str,
) -> Result<String, LoadError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LoadError::invalid(key, "resource name must not be empty"));
    }
    Ok(trimmed.to_string())
}
