use sha2::{Digest, Sha256};

/// Session and recall keys derived from a guard name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardKeys {
    session: String,
    recaller: String,
}

fn derive(prefix: &str, guard_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(guard_name.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}{}", prefix, &digest[..32])
}

impl GuardKeys {
    pub fn derive(guard_name: &str) -> Self {
        Self { session: derive("login_", guard_name), recaller: derive("remember_", guard_name) }
    }

    pub fn session(&self) -> &str { &self.session }

    pub fn recaller(&self) -> &str { &self.recaller }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_per_name() {
        assert_eq!(GuardKeys::derive("web"), GuardKeys::derive("web"));
    }

    #[test]
    fn session_and_recaller_differ() {
        let k = GuardKeys::derive("web");
        assert_ne!(k.session(), k.recaller());
        assert!(k.session().starts_with("login_"));
        assert!(k.recaller().starts_with("remember_"));
        assert_eq!(k.session().len(), "login_".len() + 32);
    }

    #[test]
    fn names_do_not_collide() {
        let a = GuardKeys::derive("web");
        let b = GuardKeys::derive("admin");
        assert_ne!(a.session(), b.session());
        assert_ne!(a.recaller(), b.recaller());
    }
}
