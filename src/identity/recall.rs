//! Remember-me ("recall") tokens and the cookie directives that carry them.
//!
//! The guard only ever *queues* directives; setting or clearing the cookie on the
//! response is the host's job. [`SignedCookieJar`] is the in-process reference store:
//! it signs identifiers with HMAC-SHA256 and reads back the cookies of the current
//! request.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::CookieConfig;

type HmacSha256 = Hmac<Sha256>;

/// Durable, tamper-evident token container the guard reads recall identifiers from.
pub trait RecallTokenStore: Send + Sync {
    /// Identifier carried by the current request's cookie `key`; `None` when absent or not verifiable.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Directive setting a never-expiring cookie that encodes `identifier`.
    fn forever(&self, key: &str, identifier: &str) -> Result<CookieDirective>;
    /// Directive invalidating cookie `key`.
    fn forget(&self, key: &str) -> Result<CookieDirective>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Forever,
    Invalidate,
}

/// Deferred Set-Cookie instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieDirective {
    pub kind: DirectiveKind,
    pub name: String,
    pub value: String,
    pub max_age_minutes: i64,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl CookieDirective {
    pub fn forever<N: Into<String>, V: Into<String>>(name: N, value: V, cfg: &CookieConfig) -> Self {
        Self::make(DirectiveKind::Forever, name.into(), value.into(), cfg.forever_minutes, cfg)
    }

    pub fn invalidate<N: Into<String>>(name: N, cfg: &CookieConfig) -> Self {
        Self::make(DirectiveKind::Invalidate, name.into(), String::new(), -cfg.forever_minutes, cfg)
    }

    fn make(kind: DirectiveKind, name: String, value: String, max_age_minutes: i64, cfg: &CookieConfig) -> Self {
        Self {
            kind,
            name,
            value,
            max_age_minutes,
            path: cfg.path.clone(),
            domain: cfg.domain.clone(),
            secure: cfg.secure,
            http_only: cfg.http_only,
        }
    }

    pub fn is_forever(&self) -> bool { self.kind == DirectiveKind::Forever }

    pub fn is_invalidation(&self) -> bool { self.kind == DirectiveKind::Invalidate }

    /// Render as a `Set-Cookie` header value.
    pub fn set_cookie_header(&self) -> String {
        let max_age_secs = self.max_age_minutes.max(0) * 60;
        let mut out = format!("{}={}; Max-Age={}; Path={}", self.name, self.value, max_age_secs, self.path);
        if let Some(domain) = &self.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if self.secure { out.push_str("; Secure"); }
        if self.http_only { out.push_str("; HttpOnly"); }
        out
    }
}

/// HMAC-signed cookie jar holding the inbound request's cookies.
pub struct SignedCookieJar {
    secret: Vec<u8>,
    cookie: CookieConfig,
    request_cookies: RwLock<HashMap<String, String>>,
}

impl std::fmt::Debug for SignedCookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedCookieJar")
            .field("cookie", &self.cookie)
            .field("request_cookies", &self.request_cookies.read().len())
            .finish_non_exhaustive()
    }
}

impl SignedCookieJar {
    pub fn new<S: AsRef<[u8]>>(secret: S, cookie: CookieConfig) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(anyhow!("cookie signing secret must not be empty"));
        }
        Ok(Self { secret: secret.to_vec(), cookie, request_cookies: RwLock::new(HashMap::new()) })
    }

    pub fn cookie_config(&self) -> &CookieConfig { &self.cookie }

    /// Register a raw cookie value as received on the current request.
    pub fn receive<N: Into<String>, V: Into<String>>(&self, name: N, raw_value: V) {
        self.request_cookies.write().insert(name.into(), raw_value.into());
    }

    /// Replay a directive from a previous response as the browser would: set or drop the cookie.
    pub fn apply(&self, directive: &CookieDirective) {
        match directive.kind {
            DirectiveKind::Forever => self.receive(directive.name.clone(), directive.value.clone()),
            DirectiveKind::Invalidate => { self.request_cookies.write().remove(&directive.name); }
        }
    }

    pub fn raw(&self, name: &str) -> Option<String> { self.request_cookies.read().get(name).cloned() }

    /// Verify a signed value issued for cookie `name` and return the identifier it carries.
    pub fn decode(&self, name: &str, raw_value: &str) -> Option<String> {
        let (payload, tag) = raw_value.split_once('.')?;
        let id_bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let tag = hex::decode(tag).ok()?;
        let mac = self.mac_for(name, &id_bytes).ok()?;
        mac.verify_slice(&tag).ok()?;
        String::from_utf8(id_bytes).ok()
    }

    fn encode(&self, name: &str, identifier: &str) -> Result<String> {
        let mac = self.mac_for(name, identifier.as_bytes())?;
        let tag = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", URL_SAFE_NO_PAD.encode(identifier.as_bytes()), tag))
    }

    // MAC covers the cookie name so a token cannot be replayed under another name.
    fn mac_for(&self, name: &str, payload: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| anyhow!("invalid cookie signing secret: {err}"))?;
        mac.update(name.as_bytes());
        mac.update(&[0u8]);
        mac.update(payload);
        Ok(mac)
    }
}

impl RecallTokenStore for SignedCookieJar {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(raw) = self.raw(key) else { return Ok(None); };
        let decoded = self.decode(key, &raw);
        if decoded.is_none() {
            tracing::warn!(target: "warden::recall", "recall cookie '{}' failed verification; ignoring", key);
        }
        Ok(decoded)
    }

    fn forever(&self, key: &str, identifier: &str) -> Result<CookieDirective> {
        let value = self.encode(key, identifier)?;
        Ok(CookieDirective::forever(key, value, &self.cookie))
    }

    fn forget(&self, key: &str) -> Result<CookieDirective> {
        Ok(CookieDirective::invalidate(key, &self.cookie))
    }
}
