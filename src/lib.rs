//! Request-scoped authentication guard.
//!
//! Resolves the current actor from a session or a signed remember-me cookie, memoizes it
//! for the request, and mediates login/logout. Session storage, cookie signing, identity
//! lookup and transition hooks are injected through the traits in [`identity`].

pub mod config;
pub mod error;
pub mod identity;

pub use config::{CookieConfig, GuardConfig};
pub use error::{GuardError, GuardResult};
pub use identity::{
    AuthEvent, AuthGuard, CookieDirective, Credentials, DirectiveKind, Identity, IdentityBackend,
    MemorySessionStore, MemoryUserProvider, Principal, RecallTokenStore, SessionStore,
    SignedCookieJar, TransitionNotifier, UserState,
};
