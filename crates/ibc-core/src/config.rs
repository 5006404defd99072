//! Configuration module
//!
//! Settings are read from the environment (and an optional `.env` file).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const SERVER_PORT: u16 = 3000;
const NONCE_LIFETIME_SECS: u64 = 86_400;
const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DAM_URL: &str = "https://apps.intelligencebank.com";
const DEV_NONCE_SECRET: &str = "ibc-development-nonce-secret-change-me";
const MIN_ACCESS_KEY_LENGTH: usize = 32;

/// Path of the diagnostic log, relative to the uploads directory
pub const LOG_SUBPATH: &str = "ibc/logs";
pub const LOG_FILENAME: &str = "log.txt";

#[derive(Clone, Debug)]
pub struct IbcConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    /// Root of the media library; the diagnostic log lives below it
    pub uploads_dir: PathBuf,
    /// Public base URL of `uploads_dir`
    pub uploads_url: String,
    /// Staging directory for downloads
    pub temp_dir: PathBuf,
    pub nonce_secret: String,
    pub nonce_lifetime_secs: u64,
    pub download_timeout_secs: u64,
    /// DAM platform URL handed to the browser UI
    pub dam_url: String,
    /// Diagnostic file log switch
    pub log_enabled: bool,
    /// Bearer key the CMS presents to obtain an upload session
    pub access_key: String,
    /// Hosts assets may be downloaded from, subdomains included.
    /// `None` allows any public host.
    pub download_allowed_hosts: Option<Vec<String>>,
    /// Allow downloads from loopback and private networks
    pub download_allow_private: bool,
}

impl IbcConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let server_port = env_number("PORT", SERVER_PORT)?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let uploads_dir = env::var("IBC_UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let uploads_url = env::var("IBC_UPLOADS_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}/uploads", server_port));

        let temp_dir = env::var("IBC_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir());

        let nonce_secret =
            env::var("IBC_NONCE_SECRET").unwrap_or_else(|_| DEV_NONCE_SECRET.to_string());

        let access_key = env::var("IBC_ACCESS_KEY")
            .map_err(|_| anyhow::anyhow!("IBC_ACCESS_KEY environment variable not set"))?;

        let dam_url = env::var("IBC_DAM_URL").unwrap_or_else(|_| DAM_URL.to_string());

        let download_allowed_hosts = match env::var("IBC_DOWNLOAD_ALLOWED_HOSTS") {
            Ok(hosts) => parse_host_list(&hosts),
            Err(_) => default_download_hosts(&dam_url),
        };

        let config = IbcConfig {
            server_port,
            environment,
            cors_origins,
            uploads_dir,
            uploads_url,
            temp_dir,
            nonce_secret,
            nonce_lifetime_secs: env_number("IBC_NONCE_LIFETIME_SECS", NONCE_LIFETIME_SECS)?,
            download_timeout_secs: env_number("IBC_DOWNLOAD_TIMEOUT_SECS", DOWNLOAD_TIMEOUT_SECS)?,
            dam_url,
            log_enabled: env::var("IBC_LOG")
                .map(|v| parse_bool(&v))
                .unwrap_or(true),
            access_key,
            download_allowed_hosts,
            download_allow_private: env::var("IBC_DOWNLOAD_ALLOW_PRIVATE")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.nonce_secret == DEV_NONCE_SECRET {
            return Err(anyhow::anyhow!(
                "IBC_NONCE_SECRET must be set in production"
            ));
        }

        if self.nonce_secret.len() < 16 {
            return Err(anyhow::anyhow!(
                "IBC_NONCE_SECRET must be at least 16 characters long"
            ));
        }

        if self.access_key.len() < MIN_ACCESS_KEY_LENGTH {
            return Err(anyhow::anyhow!(
                "IBC_ACCESS_KEY must be at least {} characters long",
                MIN_ACCESS_KEY_LENGTH
            ));
        }

        if self.is_production() && self.download_allow_private {
            return Err(anyhow::anyhow!(
                "IBC_DOWNLOAD_ALLOW_PRIVATE cannot be enabled in production"
            ));
        }

        if self.nonce_lifetime_secs < 2 {
            return Err(anyhow::anyhow!(
                "IBC_NONCE_LIFETIME_SECS must be at least 2 seconds"
            ));
        }

        if self.download_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "IBC_DOWNLOAD_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn log_dir(&self) -> PathBuf {
        self.uploads_dir.join(LOG_SUBPATH)
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.log_dir().join(LOG_FILENAME)
    }
}

/// Numeric setting with a default when unset; a set but unparsable value
/// is an error.
fn env_number<T: FromStr>(name: &str, default: T) -> Result<T, anyhow::Error> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}

/// Comma-separated host list; `*` lifts the restriction
fn parse_host_list(value: &str) -> Option<Vec<String>> {
    let hosts: Vec<String> = value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if hosts.iter().any(|h| h == "*") {
        None
    } else {
        Some(hosts)
    }
}

/// Registrable part of the DAM host: `apps.intelligencebank.com` allows
/// `intelligencebank.com` and its subdomains.
fn default_download_hosts(dam_url: &str) -> Option<Vec<String>> {
    let authority = dam_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(dam_url);
    let host = authority
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('@')
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if host.is_empty() {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    let allowed = if labels.len() >= 3 {
        labels[1..].join(".")
    } else {
        host
    };
    Some(vec![allowed])
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
