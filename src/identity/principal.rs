use serde::{Deserialize, Serialize};

/// An authenticated actor record as far as the guard is concerned: something with a stable identifier.
pub trait Identity {
    /// Identifier written into the session and encoded into recall tokens.
    fn identifier(&self) -> String;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new<S: Into<String>>(user_id: S) -> Self {
        Self { user_id: user_id.into(), ..Default::default() }
    }

    pub fn with_role<S: Into<String>>(mut self, role: S) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

impl Identity for Principal {
    fn identifier(&self) -> String { self.user_id.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_identifier_is_user_id() {
        let p = Principal::new("42").with_role("admin");
        assert_eq!(p.identifier(), "42");
        assert!(p.has_role("ADMIN"));
        assert!(!p.has_role("db_writer"));
    }

    #[test]
    fn principal_deserializes_with_defaults() {
        let p: Principal = serde_json::from_str(r#"{"user_id":"7"}"#).unwrap();
        assert_eq!(p, Principal::new("7"));
    }
}
