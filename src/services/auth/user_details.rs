use std::collections::BTreeSet;
use std::fmt;

/// Read-only snapshot of a stored user, fetched once per authentication
/// attempt. A password upgrade goes through the store and yields a new
/// snapshot; this one is never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct UserDetails {
    username: String,
    password: String,
    authorities: BTreeSet<String>,
    account_non_expired: bool,
    account_non_locked: bool,
    credentials_non_expired: bool,
    enabled: bool,
}

impl UserDetails {
    /// Healthy account with all four flags set.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            authorities: BTreeSet::new(),
            account_non_expired: true,
            account_non_locked: true,
            credentials_non_expired: true,
            enabled: true,
        }
    }

    pub fn with_authorities<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorities = authorities.into_iter().map(Into::into).collect();
        self
    }

    pub fn account_expired(mut self, expired: bool) -> Self {
        self.account_non_expired = !expired;
        self
    }

    pub fn account_locked(mut self, locked: bool) -> Self {
        self.account_non_locked = !locked;
        self
    }

    pub fn credentials_expired(mut self, expired: bool) -> Self {
        self.credentials_non_expired = !expired;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.enabled = !disabled;
        self
    }

    /// Copy of this snapshot carrying a different stored hash.
    pub fn with_password(&self, password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            ..self.clone()
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }

    pub fn is_account_non_expired(&self) -> bool {
        self.account_non_expired
    }

    pub fn is_account_non_locked(&self) -> bool {
        self.account_non_locked
    }

    pub fn is_credentials_non_expired(&self) -> bool {
        self.credentials_non_expired
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl fmt::Debug for UserDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDetails")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("authorities", &self.authorities)
            .field("account_non_expired", &self.account_non_expired)
            .field("account_non_locked", &self.account_non_locked)
            .field("credentials_non_expired", &self.credentials_non_expired)
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_the_hash() {
        let user = UserDetails::new("alice", "{noop}secret");
        let out = format!("{user:?}");

        assert!(out.contains("alice"));
        assert!(!out.contains("secret"));
    }

    #[test]
    fn with_password_leaves_the_original_untouched() {
        let user = UserDetails::new("alice", "{noop}old").with_authorities(["ROLE_USER"]);
        let upgraded = user.with_password("{argon2}new");

        assert_eq!(user.password(), "{noop}old");
        assert_eq!(upgraded.password(), "{argon2}new");
        assert_eq!(upgraded.authorities(), user.authorities());
    }
}
