//! Identity resolution and login/logout for a single request.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod credentials;
pub(crate) mod session;
mod provider;
mod recall;
mod events;
mod keys;
mod guard;

pub use principal::{Identity, Principal};
pub use credentials::{Credentials, PASSWORD_FIELD};
pub use session::{SessionStore, MemorySessionStore};
pub use provider::{IdentityBackend, MemoryUserProvider, hash_password, verify_password};
pub use recall::{RecallTokenStore, SignedCookieJar, CookieDirective, DirectiveKind};
pub use events::{AuthEvent, TransitionNotifier, NullNotifier, TracingNotifier};
pub use keys::GuardKeys;
pub use guard::{AuthGuard, UserState};
