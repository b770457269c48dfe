use super::credentials::Credentials;
use super::principal::Identity;

/// Transition announced by the guard, borrowed for the duration of the call.
#[derive(Debug)]
pub enum AuthEvent<'a, U> {
    /// Credentials are about to be checked.
    Attempt { credentials: &'a Credentials, remember: bool, login: bool },
    Login { user: &'a U, remember: bool },
    /// `user` is whoever was authenticated before the logout, if anyone.
    Logout { user: Option<&'a U> },
}

impl<U> AuthEvent<'_, U> {
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::Attempt { .. } => "attempt",
            AuthEvent::Login { .. } => "login",
            AuthEvent::Logout { .. } => "logout",
        }
    }
}

/// Observer called synchronously at guard transitions.
pub trait TransitionNotifier<U>: Send + Sync {
    fn fire(&self, event: &AuthEvent<'_, U>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl<U> TransitionNotifier<U> for NullNotifier {
    fn fire(&self, _event: &AuthEvent<'_, U>) {}
}

/// Logs every transition under the `warden::events` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl<U: Identity> TransitionNotifier<U> for TracingNotifier {
    fn fire(&self, event: &AuthEvent<'_, U>) {
        match event {
            AuthEvent::Attempt { credentials, remember, login } => {
                tracing::debug!(target: "warden::events", "auth.attempt credentials={:?} remember={} login={}", credentials, remember, login);
            }
            AuthEvent::Login { user, remember } => {
                tracing::info!(target: "warden::events", "auth.login user={} remember={}", user.identifier(), remember);
            }
            AuthEvent::Logout { user } => {
                let id = user.map(|u| u.identifier()).unwrap_or_else(|| "<anonymous>".to_string());
                tracing::info!(target: "warden::events", "auth.logout user={}", id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Principal;

    #[test]
    fn event_names() {
        let p = Principal::new("1");
        let c = Credentials::new();
        let attempt: AuthEvent<'_, Principal> = AuthEvent::Attempt { credentials: &c, remember: false, login: true };
        let logout: AuthEvent<'_, Principal> = AuthEvent::Logout { user: None };
        assert_eq!(attempt.name(), "attempt");
        assert_eq!(AuthEvent::Login { user: &p, remember: true }.name(), "login");
        assert_eq!(logout.name(), "logout");
    }

    #[test]
    fn builtin_notifiers_accept_all_events() {
        let p = Principal::new("1");
        let notifiers: [&dyn TransitionNotifier<Principal>; 2] = [&NullNotifier, &TracingNotifier];
        for n in notifiers {
            n.fire(&AuthEvent::Login { user: &p, remember: false });
            n.fire(&AuthEvent::Logout { user: Some(&p) });
            n.fire(&AuthEvent::Logout { user: None });
        }
    }
}
