use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use warden::identity::TracingNotifier;
use warden::{AuthGuard, Credentials, GuardConfig, MemorySessionStore, MemoryUserProvider, Principal, SignedCookieJar};

fn main() -> Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let mut cfg = GuardConfig::from_env();
    // Both simulated requests must sign and verify with the same key
    cfg.secret = Some(cfg.secret_or_generate()?);
    info!(target: "warden", "warden demo starting: guard='{}' cookie_path='{}' secure={}", cfg.name, cfg.cookie.path, cfg.cookie.secure);

    let provider = Arc::new(MemoryUserProvider::new());
    provider.add_user(Principal::new("1").with_role("admin"), [("username", "demo")], "demo")?;

    // Request 1: remembered login
    let session = Arc::new(MemorySessionStore::new());
    let mut guard = AuthGuard::from_config(&cfg, provider.clone(), session)?
        .with_notifier(Arc::new(TracingNotifier));
    let creds = Credentials::new().with("username", "demo").with("password", "demo");
    if !guard.attempt(&creds, true, true)? {
        return Err(anyhow!("demo credentials rejected"));
    }
    let cookies = guard.take_queued_cookies();
    for c in &cookies {
        println!("request 1 Set-Cookie: {}", c.set_cookie_header());
    }

    // Request 2: fresh session, remember-me cookie carried over
    let jar = Arc::new(SignedCookieJar::new(cfg.secret_or_generate()?, cfg.cookie.clone())?);
    for c in &cookies {
        jar.apply(c);
    }
    let mut guard = AuthGuard::new(&cfg.name, provider, Arc::new(MemorySessionStore::new()))
        .with_cookie_jar(jar)
        .with_notifier(Arc::new(TracingNotifier));
    match guard.user()? {
        Some(user) => println!("request 2 user: {} (via remember: {})", user.user_id, guard.via_remember()),
        None => println!("request 2 user: <anonymous>"),
    }
    guard.logout()?;
    for c in guard.take_queued_cookies() {
        println!("request 2 Set-Cookie: {}", c.set_cookie_header());
    }
    println!("request 2 after logout, guest: {}", guard.guest()?);
    Ok(())
}
