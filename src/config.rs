use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::bail;

const DEFAULT_STABILITY_BASE: &str = "https://api.stability.ai";
const DEFAULT_CLOUDINARY_BASE: &str = "https://api.cloudinary.com";
const DEFAULT_GRAPH_BASE: &str = "https://graph.facebook.com";
const DEFAULT_GRAPH_VERSION: &str = "v19.0";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub request_timeout: Duration,
    /// Per outbound vendor call; always below `request_timeout`.
    pub upstream_timeout: Duration,
    pub allow_partial: bool,
    pub generation: Option<GenerationSettings>,
    pub hosting: Option<HostingSettings>,
    pub publishing: Option<PublishingSettings>,
    /// Names of the variables that were missing, for startup diagnostics.
    pub missing: Vec<&'static str>,
}

#[derive(Clone)]
pub struct GenerationSettings {
    pub api_key: String,
    pub api_base: String,
    pub model: Option<String>,
}

#[derive(Clone)]
pub struct HostingSettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: String,
}

#[derive(Clone)]
pub struct PublishingSettings {
    pub access_token: String,
    pub account_id: String,
    pub graph_base: String,
    pub graph_version: String,
}

// Credentials stay out of Debug output so `?config` is safe to log.
impl std::fmt::Debug for GenerationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSettings")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for HostingSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostingSettings")
            .field("cloud_name", &self.cloud_name)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for PublishingSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishingSettings")
            .field("account_id", &self.account_id)
            .field("graph_base", &self.graph_base)
            .field("graph_version", &self.graph_version)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self::from_lookup(|key| env::var(key).ok());
        config.ensure_complete()?;
        Ok(config)
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values
    /// are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let base = |key: &str, default: &str| {
            get(key)
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| default.to_string())
        };
        let mut missing = Vec::new();

        let listen_addr = get("SERVER_ADDR")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080));
        let request_timeout = get("REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or_else(|| Duration::from_secs(120));
        let upstream_timeout = get("UPSTREAM_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .filter(|timeout| !timeout.is_zero() && *timeout < request_timeout)
            .unwrap_or_else(|| request_timeout * 3 / 4);
        let allow_partial = get("STUDIO_ALLOW_PARTIAL_CONFIG")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let generation = match get("STABILITY_API_KEY") {
            Some(api_key) => Some(GenerationSettings {
                api_key,
                api_base: base("STABILITY_API_BASE", DEFAULT_STABILITY_BASE),
                model: get("STABILITY_MODEL"),
            }),
            None => {
                missing.push("STABILITY_API_KEY");
                None
            }
        };

        let cloud_name = get("CLOUDINARY_CLOUD_NAME");
        let hosting_key = get("CLOUDINARY_API_KEY");
        let hosting_secret = get("CLOUDINARY_API_SECRET");
        let hosting = match (cloud_name, hosting_key, hosting_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(HostingSettings {
                cloud_name,
                api_key,
                api_secret,
                api_base: base("CLOUDINARY_API_BASE", DEFAULT_CLOUDINARY_BASE),
            }),
            (cloud_name, api_key, api_secret) => {
                if cloud_name.is_none() {
                    missing.push("CLOUDINARY_CLOUD_NAME");
                }
                if api_key.is_none() {
                    missing.push("CLOUDINARY_API_KEY");
                }
                if api_secret.is_none() {
                    missing.push("CLOUDINARY_API_SECRET");
                }
                None
            }
        };

        let publishing = match (get("INSTAGRAM_ACCESS_TOKEN"), get("INSTAGRAM_ACCOUNT_ID")) {
            (Some(access_token), Some(account_id)) => Some(PublishingSettings {
                access_token,
                account_id,
                graph_base: base("GRAPH_API_BASE", DEFAULT_GRAPH_BASE),
                graph_version: get("GRAPH_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_GRAPH_VERSION.to_string()),
            }),
            (token, account) => {
                if token.is_none() {
                    missing.push("INSTAGRAM_ACCESS_TOKEN");
                }
                if account.is_none() {
                    missing.push("INSTAGRAM_ACCOUNT_ID");
                }
                None
            }
        };

        Self {
            listen_addr,
            request_timeout,
            upstream_timeout,
            allow_partial,
            generation,
            hosting,
            publishing,
            missing,
        }
    }

    /// Fails when credentials are missing, unless partial configuration was
    /// explicitly allowed.
    pub fn ensure_complete(&self) -> anyhow::Result<()> {
        if self.missing.is_empty() || self.allow_partial {
            return Ok(());
        }
        bail!(
            "missing required configuration: {} (set STUDIO_ALLOW_PARTIAL_CONFIG=true to skip)",
            self.missing.join(", ")
        )
    }
}
