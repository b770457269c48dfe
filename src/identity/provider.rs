use std::collections::HashMap;

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};

use super::credentials::Credentials;
use super::principal::{Identity, Principal};

/// Lookup backend mapping identifiers and credentials to identity records.
/// Returning `Ok(None)` means "not found"; `Err` is reserved for the backend itself failing.
pub trait IdentityBackend: Send + Sync {
    type User: Identity + Clone;

    fn retrieve_by_id(&self, id: &str) -> Result<Option<Self::User>>;
    fn retrieve_by_credentials(&self, credentials: &Credentials) -> Result<Option<Self::User>>;
    fn validate_credentials(&self, user: &Self::User, credentials: &Credentials) -> Result<bool>;
}

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

#[derive(Debug, Clone)]
struct UserRecord {
    principal: Principal,
    lookup: HashMap<String, String>,
    password_hash: String,
}

/// In-process user directory with argon2 password hashes.
/// Credentials match a record when every non-password field equals one of its lookup attributes.
/// Lookup values are expected to be unique; credentials matching more than one record match none.
#[derive(Debug, Default)]
pub struct MemoryUserProvider {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserProvider {
    pub fn new() -> Self { Self::default() }

    /// Add or replace a user. `lookup` holds the fields credentials are matched against (e.g. username, email).
    pub fn add_user<I, K, V>(&self, principal: Principal, lookup: I, password: &str) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let password_hash = hash_password(password)?;
        let lookup = lookup.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        let user_id = principal.user_id.clone();
        self.users.write().insert(user_id.clone(), UserRecord { principal, lookup, password_hash });
        tracing::debug!(target: "warden::provider", "provider.add_user user={}", user_id);
        Ok(())
    }

    pub fn remove_user(&self, user_id: &str) -> bool {
        self.users.write().remove(user_id).is_some()
    }

    pub fn len(&self) -> usize { self.users.read().len() }

    pub fn is_empty(&self) -> bool { self.users.read().is_empty() }
}

impl IdentityBackend for MemoryUserProvider {
    type User = Principal;

    fn retrieve_by_id(&self, id: &str) -> Result<Option<Principal>> {
        Ok(self.users.read().get(id).map(|r| r.principal.clone()))
    }

    fn retrieve_by_credentials(&self, credentials: &Credentials) -> Result<Option<Principal>> {
        let fields: Vec<(&str, &str)> = credentials.lookup_fields().collect();
        if fields.is_empty() { return Ok(None); }
        let users = self.users.read();
        let mut matches = users.values().filter(|r| {
            fields.iter().all(|(k, v)| r.lookup.get(*k).map(|x| x.as_str() == *v).unwrap_or(false))
        });
        let Some(found) = matches.next() else { return Ok(None); };
        if let Some(other) = matches.next() {
            tracing::warn!(target: "warden::provider", "ambiguous credentials match users {} and {}; rejecting", found.principal.user_id, other.principal.user_id);
            return Ok(None);
        }
        Ok(Some(found.principal.clone()))
    }

    fn validate_credentials(&self, user: &Principal, credentials: &Credentials) -> Result<bool> {
        let Some(password) = credentials.password() else { return Ok(false); };
        let users = self.users.read();
        let Some(record) = users.get(&user.user_id) else { return Ok(false); };
        Ok(verify_password(&record.password_hash, password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> MemoryUserProvider {
        let p = MemoryUserProvider::new();
        p.add_user(Principal::new("1"), [("username", "alice"), ("email", "alice@example.com")], "wonderland").unwrap();
        p.add_user(Principal::new("2"), [("username", "bob")], "builder").unwrap();
        p
    }

    #[test]
    fn hash_and_verify() {
        let phc = hash_password("pw").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(verify_password(&phc, "pw"));
        assert!(!verify_password(&phc, "nope"));
        assert!(!verify_password("not-a-phc", "pw"));
    }

    #[test]
    fn retrieve_by_credentials_matches_all_lookup_fields() {
        let p = provider();
        let c = Credentials::new().with("username", "alice").with("password", "x");
        assert_eq!(p.retrieve_by_credentials(&c).unwrap().map(|u| u.user_id), Some("1".to_string()));

        let c = Credentials::new().with("username", "alice").with("email", "bob@example.com");
        assert_eq!(p.retrieve_by_credentials(&c).unwrap(), None);

        // password alone never identifies anybody
        let c = Credentials::new().with("password", "builder");
        assert_eq!(p.retrieve_by_credentials(&c).unwrap(), None);
    }

    #[test]
    fn ambiguous_lookup_matches_nobody() {
        let p = provider();
        p.add_user(Principal::new("3"), [("username", "carol"), ("team", "ops")], "pw").unwrap();
        p.add_user(Principal::new("4"), [("username", "dave"), ("team", "ops")], "pw").unwrap();

        let shared = Credentials::new().with("team", "ops").with("password", "pw");
        assert_eq!(p.retrieve_by_credentials(&shared).unwrap(), None);

        let narrowed = Credentials::new().with("team", "ops").with("username", "dave");
        assert_eq!(p.retrieve_by_credentials(&narrowed).unwrap().map(|u| u.user_id), Some("4".to_string()));
    }

    #[test]
    fn validate_credentials_checks_password() {
        let p = provider();
        let bob = p.retrieve_by_id("2").unwrap().unwrap();
        assert!(p.validate_credentials(&bob, &Credentials::new().with("password", "builder")).unwrap());
        assert!(!p.validate_credentials(&bob, &Credentials::new().with("password", "wonderland")).unwrap());
        assert!(!p.validate_credentials(&bob, &Credentials::new()).unwrap());
    }

    #[test]
    fn unknown_ids_resolve_to_none() {
        let p = provider();
        assert_eq!(p.retrieve_by_id("99").unwrap(), None);
        assert!(p.remove_user("2"));
        assert_eq!(p.retrieve_by_id("2").unwrap(), None);
        assert_eq!(p.len(), 1);
    }
}
