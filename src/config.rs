use std::{
    env,
    fmt::{self, Display},
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
};

use log::{info, warn};

use crate::{
    constants::{
        DEFAULT_BIND_ADDRESS, DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_UPLOAD_BYTES,
        DEFAULT_MEDIA_ROOT, DEFAULT_MEDIA_URL, DEFAULT_TOKEN_TTL_HOURS,
    },
    cryptography::generate_secret,
};

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, info: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::Invalid { key, info } => write!(f, "Invalid {key} value: {info}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: SocketAddr,
    pub max_connections: u32,
    pub secret_key: Vec<u8>,
    pub token_ttl_hours: i64,
    pub media_root: PathBuf,
    pub media_url: String,
    pub public_url: String,
    pub max_upload_bytes: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("max_connections", &self.max_connections)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("media_root", &self.media_root)
            .field("media_url", &self.media_url)
            .field("public_url", &self.public_url)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let secret_key = match var("SECRET_KEY") {
            Some(secret) => secret.into_bytes(),
            None => {
                warn!("SECRET_KEY not set, tokens will not survive a restart");
                generate_secret()
            }
        };

        let token_ttl_hours: i64 = try_load(&var, "TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?;
        if token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "TOKEN_TTL_HOURS",
                info: String::from("must be positive"),
            });
        }

        Ok(Self {
            database_url,
            bind_address: try_load(&var, "BIND_ADDRESS", DEFAULT_BIND_ADDRESS)?,
            max_connections: try_load(&var, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            secret_key,
            token_ttl_hours,
            media_root: PathBuf::from(var("MEDIA_ROOT").unwrap_or_else(|| DEFAULT_MEDIA_ROOT.into())),
            media_url: normalize_url_prefix(
                &var("MEDIA_URL").unwrap_or_else(|| DEFAULT_MEDIA_URL.into()),
            ),
            public_url: var("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            max_upload_bytes: try_load(&var, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    /// Path segments of the media URL, e.g. `["static", "media"]`.
    pub fn media_segments(&self) -> Vec<String> {
        self.media_url
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// URL a stored media file is served from.
    pub fn media_url_for(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.public_url,
            self.media_url,
            path.trim_start_matches('/')
        )
    }
}

fn try_load<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            info: e.to_string(),
        })
}

fn normalize_url_prefix(url: &str) -> String {
    let trimmed = url.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::from("/")
    } else {
        format!("/{trimmed}/")
    }
}
