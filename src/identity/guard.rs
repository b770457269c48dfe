//! Request-scoped authentication guard.
//!
//! One [`AuthGuard`] is built per inbound request. It resolves the current actor from the
//! session, falling back to the remember-me cookie, memoizes the result for the rest of
//! the request, and performs login/logout transitions. Cookie changes are queued on the
//! guard and never applied by it.

use std::sync::Arc;

use crate::config::GuardConfig;
use crate::error::{GuardError, GuardResult};

use super::credentials::Credentials;
use super::events::{AuthEvent, NullNotifier, TransitionNotifier};
use super::keys::GuardKeys;
use super::principal::Identity;
use super::provider::IdentityBackend;
use super::recall::{CookieDirective, RecallTokenStore, SignedCookieJar};
use super::session::SessionStore;

/// Memoized outcome of identity resolution for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserState<U> {
    /// Nothing looked up yet.
    Unresolved,
    Authenticated(U),
    /// Looked up, nobody found.
    Anonymous,
    /// Logged out during this request; resolution stays off until the next login or `set_user`.
    LoggedOut,
}

impl<U> UserState<U> {
    pub fn label(&self) -> &'static str {
        match self {
            UserState::Unresolved => "unresolved",
            UserState::Authenticated(_) => "authenticated",
            UserState::Anonymous => "anonymous",
            UserState::LoggedOut => "logged_out",
        }
    }
}

pub struct AuthGuard<P: IdentityBackend> {
    keys: GuardKeys,
    provider: Arc<P>,
    session: Arc<dyn SessionStore>,
    cookie_jar: Option<Arc<dyn RecallTokenStore>>,
    notifier: Arc<dyn TransitionNotifier<P::User>>,
    state: UserState<P::User>,
    via_remember: bool,
    last_attempted: Option<P::User>,
    queued_cookies: Vec<CookieDirective>,
}

impl<P: IdentityBackend> std::fmt::Debug for AuthGuard<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGuard")
            .field("name", &self.keys.session())
            .field("state", &self.state.label())
            .field("via_remember", &self.via_remember)
            .field("has_cookie_jar", &self.cookie_jar.is_some())
            .field("queued_cookies", &self.queued_cookies.len())
            .finish()
    }
}

impl<P: IdentityBackend> AuthGuard<P> {
    /// Guard without a cookie jar; remember-me and logout need one set before use.
    pub fn new(guard_name: &str, provider: Arc<P>, session: Arc<dyn SessionStore>) -> Self {
        Self {
            keys: GuardKeys::derive(guard_name),
            provider,
            session,
            cookie_jar: None,
            notifier: Arc::new(NullNotifier),
            state: UserState::Unresolved,
            via_remember: false,
            last_attempted: None,
            queued_cookies: Vec::new(),
        }
    }

    /// Guard wired to a [`SignedCookieJar`] built from `cfg`.
    pub fn from_config(cfg: &GuardConfig, provider: Arc<P>, session: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        let jar = SignedCookieJar::new(cfg.secret_or_generate()?, cfg.cookie.clone())?;
        Ok(Self::new(&cfg.name, provider, session).with_cookie_jar(Arc::new(jar)))
    }

    pub fn with_cookie_jar(mut self, jar: Arc<dyn RecallTokenStore>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn TransitionNotifier<P::User>>) -> Self {
        self.notifier = notifier;
        self
    }

    // --- identity resolution ---

    pub fn check(&mut self) -> GuardResult<bool> {
        Ok(self.user()?.is_some())
    }

    pub fn guest(&mut self) -> GuardResult<bool> {
        Ok(!self.check()?)
    }

    /// Currently authenticated identity. Collaborators are consulted at most once per request.
    pub fn user(&mut self) -> GuardResult<Option<P::User>> {
        match &self.state {
            UserState::Authenticated(user) => return Ok(Some(user.clone())),
            UserState::Anonymous | UserState::LoggedOut => return Ok(None),
            UserState::Unresolved => {}
        }

        let mut user = self.user_from_session()?;
        if user.is_none() {
            user = self.user_from_recaller()?;
        }
        self.state = match &user {
            Some(u) => UserState::Authenticated(u.clone()),
            None => UserState::Anonymous,
        };
        Ok(user)
    }

    fn user_from_session(&self) -> GuardResult<Option<P::User>> {
        let Some(id) = self.session.get(self.keys.session())? else { return Ok(None); };
        let user = self.provider.retrieve_by_id(&id)?;
        if user.is_none() {
            tracing::debug!(target: "warden::guard", "session holds unknown identifier {}", id);
        }
        Ok(user)
    }

    fn user_from_recaller(&mut self) -> GuardResult<Option<P::User>> {
        let Some(jar) = &self.cookie_jar else {
            tracing::trace!(target: "warden::guard", "no cookie jar configured; skipping recall lookup");
            return Ok(None);
        };
        let Some(id) = jar.get(self.keys.recaller())? else { return Ok(None); };
        let Some(user) = self.provider.retrieve_by_id(&id)? else {
            tracing::debug!(target: "warden::guard", "recall token names unknown identifier {}", id);
            return Ok(None);
        };
        // Promote into the session so the next request skips the cookie.
        self.session.put(self.keys.session(), &user.identifier())?;
        self.via_remember = true;
        tracing::debug!(target: "warden::guard", "user {} recalled from remember cookie", id);
        Ok(Some(user))
    }

    /// Memoized identity, without triggering resolution.
    pub fn get_user(&self) -> Option<&P::User> {
        match &self.state {
            UserState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// In-memory override; no session, cookie or notifier side effects.
    pub fn set_user(&mut self, user: P::User) {
        self.via_remember = false;
        self.state = UserState::Authenticated(user);
    }

    pub fn state(&self) -> &UserState<P::User> { &self.state }

    /// Whether the current identity came from the remember-me cookie.
    pub fn via_remember(&self) -> bool { self.via_remember }

    // --- credential checks ---

    /// Check credentials without logging anybody in.
    pub fn validate(&mut self, credentials: &Credentials) -> GuardResult<bool> {
        self.attempt(credentials, false, false)
    }

    /// Check credentials and, when `login` is set and they are valid, log the identity in.
    pub fn attempt(&mut self, credentials: &Credentials, remember: bool, login: bool) -> GuardResult<bool> {
        self.notifier.fire(&AuthEvent::Attempt { credentials, remember, login });

        let found = self.provider.retrieve_by_credentials(credentials)?;
        self.last_attempted = found.clone();
        let Some(user) = found else {
            tracing::debug!(target: "warden::guard", "attempt rejected: no matching identity");
            return Ok(false);
        };
        if !self.provider.validate_credentials(&user, credentials)? {
            tracing::debug!(target: "warden::guard", "attempt rejected for {}", user.identifier());
            return Ok(false);
        }
        if login {
            self.login(user, remember)?;
        }
        Ok(true)
    }

    /// Authenticate for this guard instance only: no session or cookie writes.
    pub fn stateless(&mut self, credentials: &Credentials) -> GuardResult<bool> {
        if !self.validate(credentials)? {
            return Ok(false);
        }
        match self.provider.retrieve_by_credentials(credentials)? {
            Some(user) => self.set_user(user),
            None => {
                self.via_remember = false;
                self.state = UserState::Anonymous;
            }
        }
        Ok(true)
    }

    /// Identity the backend returned for the most recent attempt, valid or not.
    pub fn last_attempted(&self) -> Option<&P::User> { self.last_attempted.as_ref() }

    // --- transitions ---

    pub fn login(&mut self, user: P::User, remember: bool) -> GuardResult<()> {
        let id = user.identifier();
        let recaller = if remember {
            Some(self.require_cookie_jar()?.forever(self.keys.recaller(), &id)?)
        } else {
            None
        };

        self.session.put(self.keys.session(), &id)?;
        if let Some(directive) = recaller {
            self.queued_cookies.push(directive);
        }
        self.notifier.fire(&AuthEvent::Login { user: &user, remember });
        tracing::debug!(target: "warden::guard", "login user={} remember={}", id, remember);

        self.set_user(user);
        Ok(())
    }

    /// Write `id` into the session, then log in whoever the backend resolves it to.
    /// Returns `None` (and clears the session entry) when the backend does not know `id`.
    pub fn login_using_id(&mut self, id: &str, remember: bool) -> GuardResult<Option<P::User>> {
        if remember {
            self.require_cookie_jar()?;
        }
        self.session.put(self.keys.session(), id)?;
        self.state = UserState::Unresolved;
        self.via_remember = false;

        let Some(user) = self.user_from_session()? else {
            tracing::warn!(target: "warden::guard", "login_using_id: backend has no identity for {}", id);
            self.session.forget(self.keys.session())?;
            self.state = UserState::Anonymous;
            return Ok(None);
        };
        self.state = UserState::Authenticated(user.clone());
        if user.identifier() != id {
            tracing::warn!(target: "warden::guard", "login_using_id: backend resolved {} to identifier {}", id, user.identifier());
        }
        self.login(user.clone(), remember)?;
        Ok(Some(user))
    }

    pub fn logout(&mut self) -> GuardResult<()> {
        let jar = self.require_cookie_jar()?;
        let user = self.user()?;
        let directive = jar.forget(self.keys.recaller())?;

        self.session.forget(self.keys.session())?;
        self.queued_cookies.push(directive);
        self.notifier.fire(&AuthEvent::Logout { user: user.as_ref() });
        tracing::debug!(
            target: "warden::guard",
            "logout user={}",
            user.as_ref().map(|u| u.identifier()).unwrap_or_else(|| "<anonymous>".to_string())
        );

        self.via_remember = false;
        self.state = UserState::LoggedOut;
        Ok(())
    }

    // --- queued cookies ---

    pub fn queued_cookies(&self) -> &[CookieDirective] { &self.queued_cookies }

    /// Hand the queued directives to the response layer.
    pub fn take_queued_cookies(&mut self) -> Vec<CookieDirective> {
        std::mem::take(&mut self.queued_cookies)
    }

    // --- names and collaborators ---

    /// Session key the identifier is stored under.
    pub fn name(&self) -> &str { self.keys.session() }

    /// Cookie name of the remember-me token.
    pub fn recaller_name(&self) -> &str { self.keys.recaller() }

    pub fn provider(&self) -> &Arc<P> { &self.provider }

    pub fn set_provider(&mut self, provider: Arc<P>) { self.provider = provider; }

    pub fn session(&self) -> &Arc<dyn SessionStore> { &self.session }

    pub fn cookie_jar(&self) -> GuardResult<&Arc<dyn RecallTokenStore>> {
        self.cookie_jar.as_ref().ok_or(GuardError::MissingCookieJar)
    }

    pub fn set_cookie_jar(&mut self, jar: Arc<dyn RecallTokenStore>) { self.cookie_jar = Some(jar); }

    pub fn notifier(&self) -> &Arc<dyn TransitionNotifier<P::User>> { &self.notifier }

    pub fn set_notifier(&mut self, notifier: Arc<dyn TransitionNotifier<P::User>>) { self.notifier = notifier; }

    pub fn unset_notifier(&mut self) { self.notifier = Arc::new(NullNotifier); }

    fn require_cookie_jar(&self) -> GuardResult<Arc<dyn RecallTokenStore>> {
        self.cookie_jar().map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{MemorySessionStore, MemoryUserProvider, Principal};

    fn guard() -> AuthGuard<MemoryUserProvider> {
        let provider = Arc::new(MemoryUserProvider::new());
        provider.add_user(Principal::new("1"), [("username", "alice")], "pw").unwrap();
        AuthGuard::new("web", provider, Arc::new(MemorySessionStore::new()))
    }

    #[test]
    fn fresh_guard_is_unresolved_then_anonymous() {
        let mut g = guard();
        assert_eq!(g.state().label(), "unresolved");
        assert!(g.guest().unwrap());
        assert_eq!(g.state(), &UserState::Anonymous);
        assert!(g.get_user().is_none());
    }

    #[test]
    fn set_user_clears_logged_out() {
        let mut g = guard().with_cookie_jar(Arc::new(
            SignedCookieJar::new("k", crate::config::CookieConfig::default()).unwrap(),
        ));
        g.logout().unwrap();
        assert_eq!(g.state(), &UserState::LoggedOut);
        g.set_user(Principal::new("1"));
        assert!(g.check().unwrap());
        assert!(g.session().get(g.name()).unwrap().is_none(), "set_user must not write the session");
    }

    #[test]
    fn login_without_remember_needs_no_cookie_jar() {
        let mut g = guard();
        g.login(Principal::new("1"), false).unwrap();
        assert!(g.queued_cookies().is_empty());
        assert!(g.cookie_jar().is_err());
    }

    #[test]
    fn names_follow_guard_name() {
        let g = guard();
        let keys = GuardKeys::derive("web");
        assert_eq!(g.name(), keys.session());
        assert_eq!(g.recaller_name(), keys.recaller());
    }

    #[test]
    fn take_queued_cookies_drains() {
        let mut g = guard().with_cookie_jar(Arc::new(
            SignedCookieJar::new("k", crate::config::CookieConfig::default()).unwrap(),
        ));
        g.login(Principal::new("1"), true).unwrap();
        assert_eq!(g.take_queued_cookies().len(), 1);
        assert!(g.queued_cookies().is_empty());
    }
}
