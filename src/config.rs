//! Credential file loading for pg-dataframe.
//!
//! Reads an INI file, picks the `[postgresql]` section and validates it into
//! a typed [`ConnectionConfig`]. Parameters missing from the file fall back to
//! the libpq environment variables (`PGHOST`, `PGPORT`, ...).

use crate::error::{FrameError, Result};
use crate::path::PathNormalizer;
use ini::{Ini, ParseOption};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Section holding the connection parameters.
pub const DEFAULT_SECTION: &str = "postgresql";

/// Accepted values for the `sslmode` parameter.
const SSL_MODES: &[&str] = &[
    "disable",
    "allow",
    "prefer",
    "require",
    "verify-ca",
    "verify-full",
];

/// libpq connection keywords the driver cannot honour.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "channel_binding",
    "client_encoding",
    "gssdelegation",
    "gssencmode",
    "gsslib",
    "hostaddr",
    "keepalives",
    "keepalives_count",
    "keepalives_idle",
    "keepalives_interval",
    "krbsrvname",
    "load_balance_hosts",
    "passfile",
    "replication",
    "require_auth",
    "requirepeer",
    "service",
    "ssl_max_protocol_version",
    "ssl_min_protocol_version",
    "sslcertmode",
    "sslcompression",
    "sslcrl",
    "sslcrldir",
    "sslnegotiation",
    "sslpassword",
    "sslsni",
    "target_session_attrs",
    "tcp_user_timeout",
];

/// Raw key/value pairs read from the credential section.
pub type ConnectionParams = BTreeMap<String, String>;

/// Validated database connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host.
    pub host: Option<String>,

    /// Database port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Database user.
    pub user: Option<String>,

    /// Database password.
    pub password: Option<String>,

    /// TLS mode (`disable`, `prefer`, `require`, ...).
    pub sslmode: Option<String>,

    /// Application name reported to the server.
    pub application_name: Option<String>,

    /// Seconds to wait for the connection to open.
    pub connect_timeout: Option<u64>,

    /// CA certificate used to verify the server (`sslrootcert`).
    pub sslrootcert: Option<String>,

    /// Client certificate (`sslcert`).
    pub sslcert: Option<String>,

    /// Client private key (`sslkey`).
    pub sslkey: Option<String>,

    /// Server runtime parameters: unrecognized keys plus the settings given
    /// in `options`. An explicit key wins over the same setting in `options`.
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
}

fn default_port() -> u16 {
    5432
}

impl ConnectionConfig {
    /// Creates a config for `database` on localhost with everything else unset.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            host: None,
            port: default_port(),
            database: database.into(),
            user: None,
            password: None,
            sslmode: None,
            application_name: None,
            connect_timeout: None,
            sslrootcert: None,
            sslcert: None,
            sslkey: None,
            extras: BTreeMap::new(),
        }
    }

    /// Validates credential parameters, using the process environment for missing values.
    pub fn from_params(params: &ConnectionParams) -> Result<Self> {
        Self::from_params_with_env(params, |key| std::env::var(key).ok())
    }

    /// Validates credential parameters, using `env` to look up libpq defaults.
    pub fn from_params_with_env<F>(params: &ConnectionParams, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut host = None;
        let mut port = None;
        let mut dbname = None;
        let mut database = None;
        let mut user = None;
        let mut password = None;
        let mut sslmode = None;
        let mut application_name = None;
        let mut fallback_application_name = None;
        let mut connect_timeout = None;
        let mut sslrootcert = None;
        let mut sslcert = None;
        let mut sslkey = None;
        let mut server_options = Vec::new();
        let mut extras = BTreeMap::new();

        for (key, value) in params {
            match key.as_str() {
                "host" => host = Some(value.clone()),
                "port" => port = Some(parse_port(value)?),
                "dbname" => dbname = Some(value.clone()),
                "database" => database = Some(value.clone()),
                "user" => user = Some(value.clone()),
                "password" => password = Some(value.clone()),
                "sslmode" => sslmode = Some(parse_sslmode(value)?),
                "application_name" => application_name = Some(value.clone()),
                "fallback_application_name" => fallback_application_name = Some(value.clone()),
                "sslrootcert" => sslrootcert = Some(value.clone()),
                "sslcert" => sslcert = Some(value.clone()),
                "sslkey" => sslkey = Some(value.clone()),
                "options" => server_options = parse_server_options(value)?,
                "connect_timeout" => {
                    let secs = value.parse::<u64>().map_err(|_| {
                        FrameError::config(format!(
                            "Invalid connect_timeout '{value}': expected a number of seconds"
                        ))
                    })?;
                    connect_timeout = Some(secs);
                }
                unsupported if UNSUPPORTED_KEYWORDS.contains(&unsupported) => {
                    return Err(FrameError::config(format!(
                        "Connection parameter '{unsupported}' is not supported"
                    )));
                }
                _ => {
                    extras.insert(key.clone(), value.clone());
                }
            }
        }

        let mut settings: BTreeMap<String, String> = server_options.into_iter().collect();
        settings.extend(extras);

        let mut config = Self {
            host,
            port: port.unwrap_or_else(default_port),
            database: String::new(),
            user,
            password,
            sslmode,
            application_name: application_name.or(fallback_application_name),
            connect_timeout,
            sslrootcert,
            sslcert,
            sslkey,
            extras: settings,
        };

        if port.is_none() {
            if let Some(port_str) = env("PGPORT") {
                config.port = parse_port(&port_str)?;
            }
        }
        config.apply_env_defaults(&env);

        // libpq spells it `dbname`; the Python-style `database` is accepted too.
        config.database = dbname
            .or(database)
            .or_else(|| env("PGDATABASE"))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                FrameError::config("Database name is required (set 'dbname' or 'database')")
            })?;

        Ok(config)
    }

    /// Applies environment variables (PGHOST, PGUSER, PGPASSWORD) as defaults.
    fn apply_env_defaults<F>(&mut self, env: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.host.is_none() {
            self.host = env("PGHOST");
        }
        if self.user.is_none() {
            self.user = env("PGUSER");
        }
        if self.password.is_none() {
            self.password = env("PGPASSWORD");
        }
    }

    /// Returns the host, defaulting to localhost.
    pub fn host_or_default(&self) -> &str {
        self.host.as_deref().unwrap_or("localhost")
    }

    /// Returns a display-safe string (no password) for logs.
    pub fn display_string(&self) -> String {
        format!("{} @ {}:{}", self.database, self.host_or_default(), self.port)
    }
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .parse::<u16>()
        .map_err(|_| FrameError::config(format!("Invalid port '{value}': expected 0-65535")))
}

fn parse_sslmode(value: &str) -> Result<String> {
    let mode = value.to_lowercase();
    if SSL_MODES.contains(&mode.as_str()) {
        Ok(mode)
    } else {
        Err(FrameError::config(format!(
            "Invalid sslmode '{value}'. Expected one of: {}",
            SSL_MODES.join(", ")
        )))
    }
}

/// Splits a libpq `options` string into server settings.
///
/// Accepts `-c name=value`, `-cname=value` and `--name=value`, with `\`
/// escaping the next character. Dashes in a setting name become
/// underscores, as the server does.
fn parse_server_options(value: &str) -> Result<Vec<(String, String)>> {
    let invalid = || {
        FrameError::config(format!(
            "Invalid options '{value}': expected settings of the form -c name=value"
        ))
    };

    let mut settings = Vec::new();
    let mut tokens = split_option_tokens(value).into_iter();
    while let Some(token) = tokens.next() {
        let setting = if token == "-c" {
            tokens.next().ok_or_else(invalid)?
        } else if let Some(rest) = token.strip_prefix("--") {
            rest.to_string()
        } else if let Some(rest) = token.strip_prefix("-c") {
            rest.to_string()
        } else {
            return Err(invalid());
        };

        let (name, setting_value) = setting
            .split_once('=')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(invalid)?;
        settings.push((name.replace('-', "_"), setting_value.to_string()));
    }

    Ok(settings)
}

fn split_option_tokens(value: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => current.extend(chars.next()),
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Loads connection settings from an INI credential file.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    normalizer: PathNormalizer,
    section: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(PathNormalizer::default())
    }
}

impl ConfigLoader {
    /// Creates a loader reading the `[postgresql]` section.
    pub fn new(normalizer: PathNormalizer) -> Self {
        Self {
            normalizer,
            section: DEFAULT_SECTION.to_string(),
        }
    }

    /// Reads a differently named section instead.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    /// Loads and validates the connection config stored at `path`.
    pub fn load(&self, path: &str) -> Result<ConnectionConfig> {
        let params = self.load_params(path)?;
        ConnectionConfig::from_params(&params)
    }

    /// Loads the raw key/value pairs of the credential section at `path`.
    pub fn load_params(&self, path: &str) -> Result<ConnectionParams> {
        let filename = self.normalizer.normalize(path);
        let file = Path::new(&filename);

        if !file.is_file() {
            return Err(FrameError::config(format!(
                "Connection file not found: {filename}"
            )));
        }

        debug!("Loading credentials from: {}", filename);
        let content = std::fs::read_to_string(file).map_err(|e| {
            FrameError::config(format!("Failed to read connection file {filename}: {e}"))
        })?;

        parse_params(&content, &self.section, &filename)
    }
}

/// Parses INI `content` and collects the keys of `section`.
///
/// Keys are lowercased and values trimmed. Quotes and backslash escapes are
/// taken literally so passwords survive unchanged.
pub fn parse_params(content: &str, section: &str, filename: &str) -> Result<ConnectionParams> {
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..Default::default()
    };

    let ini = Ini::load_from_str_opt(content, options).map_err(|e| {
        FrameError::config(format!("Configuration error in {filename}:\n  {e}"))
    })?;

    let mut seen_sections = HashSet::new();
    for name in ini.iter().filter_map(|(name, _)| name) {
        if !seen_sections.insert(name) {
            return Err(FrameError::config(format!(
                "Section {name} is defined more than once in the {filename} file"
            )));
        }
    }

    let properties = ini.section(Some(section)).ok_or_else(|| {
        FrameError::config(format!(
            "Section {section} not found in the {filename} file"
        ))
    })?;

    let mut params = ConnectionParams::new();
    for (key, value) in properties.iter() {
        let key = key.trim().to_lowercase();
        if params.contains_key(&key) {
            return Err(FrameError::config(format!(
                "Option {key} in section {section} is defined more than once in the {filename} file"
            )));
        }
        params.insert(key, value.trim().to_string());
    }

    Ok(params)
}
