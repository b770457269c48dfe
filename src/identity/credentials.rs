use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Field name the reference provider treats as the secret to verify rather than match on.
pub const PASSWORD_FIELD: &str = "password";

/// Credential fields as submitted by a login form or API call. Never stored by the guard.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Credentials(HashMap<String, String>);

impl Credentials {
    pub fn new() -> Self { Self::default() }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, field: K, value: V) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn password(&self) -> Option<&str> { self.get(PASSWORD_FIELD) }

    /// Every field except the password, i.e. the ones used to look a record up.
    pub fn lookup_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(k, _)| k.as_str() != PASSWORD_FIELD)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// Values are redacted so credentials can be traced without leaking secrets.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        fields.sort_unstable();
        f.debug_struct("Credentials").field("fields", &fields).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_values() {
        let c = Credentials::new().with("username", "alice").with("password", "hunter2");
        let dbg = format!("{:?}", c);
        assert!(dbg.contains("username"));
        assert!(!dbg.contains("alice"));
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn lookup_fields_skip_password() {
        let c: Credentials = [("email", "a@example.com"), ("password", "pw")].into_iter().collect();
        let fields: Vec<_> = c.lookup_fields().collect();
        assert_eq!(fields, vec![("email", "a@example.com")]);
        assert_eq!(c.password(), Some("pw"));
    }

    #[test]
    fn deserializes_from_flat_json_object() {
        let c: Credentials = serde_json::from_str(r#"{"username":"bob","password":"x"}"#).unwrap();
        assert_eq!(c.get("username"), Some("bob"));
    }
}
