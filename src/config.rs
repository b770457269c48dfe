//! Guard configuration: the guard name keys are derived from, recall cookie attributes and the signing secret.
//! Loadable from JSON or from `WARDEN_*` environment variables.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Five years, in minutes: the lifetime given to "forever" cookies.
pub const FOREVER_MINUTES: i64 = 2_628_000;

pub const DEFAULT_GUARD_NAME: &str = "web";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub forever_minutes: i64,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self { path: "/".to_string(), domain: None, secure: false, http_only: true, forever_minutes: FOREVER_MINUTES }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Stable guard name; session and recall keys are derived from it.
    pub name: String,
    pub cookie: CookieConfig,
    /// Recall-token signing secret. Generated per process when left empty.
    pub secret: Option<String>,
}

impl Default for GuardConfig {
    fn default() -> Self { Self { name: DEFAULT_GUARD_NAME.to_string(), cookie: CookieConfig::default(), secret: None } }
}

// Keep the secret out of logs.
impl std::fmt::Debug for GuardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardConfig")
            .field("name", &self.name)
            .field("cookie", &self.cookie)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// 256-bit random signing key, base64url without padding.
pub fn gen_secret() -> Result<String> {
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| anyhow!("failed to generate random key: {e}"))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

fn env_flag(var: &str, default: bool) -> bool {
    match std::env::var(var) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

impl GuardConfig {
    pub fn named<S: Into<String>>(name: S) -> Self { Self { name: name.into(), ..Default::default() } }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid guard config json")
    }

    pub fn from_env() -> Self {
        let defaults = CookieConfig::default();
        let name = std::env::var("WARDEN_GUARD_NAME").unwrap_or_else(|_| DEFAULT_GUARD_NAME.to_string());
        let secret = std::env::var("WARDEN_COOKIE_SECRET").ok().filter(|s| !s.is_empty());
        let path = std::env::var("WARDEN_COOKIE_PATH").unwrap_or_else(|_| defaults.path.clone());
        let domain = std::env::var("WARDEN_COOKIE_DOMAIN").ok().filter(|s| !s.is_empty());
        let secure = env_flag("WARDEN_COOKIE_SECURE", defaults.secure);
        Self { name, cookie: CookieConfig { path, domain, secure, ..defaults }, secret }
    }

    /// Signing secret bytes, generating an ephemeral one if none was configured.
    pub fn secret_or_generate(&self) -> Result<String> {
        match &self.secret {
            Some(s) => Ok(s.clone()),
            None => {
                tracing::warn!(target: "warden::config", "no recall cookie secret configured for guard '{}'; generated an ephemeral one, remember-me cookies will not survive a restart", self.name);
                gen_secret()
            }
        }
    }
}
