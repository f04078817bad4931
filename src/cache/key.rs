use std::fmt;
use std::time::Duration;

/// Parameters handed to the acquisition function.
///
/// Only `email`, `scopes` and the domain of `delegation_email` take part in
/// key derivation. `expiration` overrides the validity window of the token
/// issued for this request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRequest {
    pub email: String,
    pub scopes: Vec<String>,
    pub delegation_email: Option<String>,
    pub expiration: Option<Duration>,
}

impl TokenRequest {
    pub fn new<S: Into<String>>(email: S, scopes: &[&str]) -> Self {
        Self {
            email: email.into(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            delegation_email: None,
            expiration: None,
        }
    }

    pub fn with_delegation<S: Into<String>>(mut self, delegation_email: S) -> Self {
        self.delegation_email = Some(delegation_email.into());
        self
    }

    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::from(self)
    }
}

/// Identity of a cache slot.
///
/// Normalization rules:
/// - scopes are a set: sorted, duplicates removed
/// - only the domain of the delegation address is kept (text after the last
///   `@`, lower-cased); an address without `@` is taken whole
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    email: String,
    scopes: Vec<String>,
    delegation_domain: Option<String>,
}

impl CacheKey {
    pub fn new<S: Into<String>>(email: S, scopes: &[String], delegation_email: Option<&str>) -> Self {
        let mut scopes = scopes.to_vec();
        scopes.sort();
        scopes.dedup();

        Self {
            email: email.into(),
            scopes,
            delegation_domain: delegation_email.map(delegation_domain),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn delegation_domain(&self) -> Option<&str> {
        self.delegation_domain.as_deref()
    }
}

impl From<&TokenRequest> for CacheKey {
    fn from(request: &TokenRequest) -> Self {
        CacheKey::new(
            request.email.as_str(),
            &request.scopes,
            request.delegation_email.as_deref(),
        )
    }
}

/// Log form `email:scope1,scope2[:domain]`.
///
/// Parts are not escaped, so two distinct keys can render the same string.
/// Compare keys, never their display form.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.email, self.scopes.join(","))?;
        if let Some(domain) = &self.delegation_domain {
            write!(f, ":{}", domain)?;
        }
        Ok(())
    }
}

fn delegation_domain(address: &str) -> String {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .unwrap_or(address)
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_order_and_duplicates_do_not_matter() {
        let a = TokenRequest::new("x@y.com", &["scope2", "scope1"]).cache_key();
        let b = TokenRequest::new("x@y.com", &["scope1", "scope2", "scope1"]).cache_key();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "x@y.com:scope1,scope2");
    }

    #[test]
    fn delegation_only_contributes_its_domain() {
        let a = TokenRequest::new("x@y.com", &["s"]).with_delegation("a@corp.com").cache_key();
        let b = TokenRequest::new("x@y.com", &["s"]).with_delegation("b@corp.com").cache_key();
        let c = TokenRequest::new("x@y.com", &["s"]).with_delegation("a@other.com").cache_key();
        let none = TokenRequest::new("x@y.com", &["s"]).cache_key();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, none);
        assert_eq!(a.delegation_domain(), Some("corp.com"));
        assert_eq!(a.to_string(), "x@y.com:s:corp.com");
    }

    #[test]
    fn delegation_domain_is_case_insensitive() {
        let a = TokenRequest::new("x@y.com", &["s"]).with_delegation("a@Corp.COM").cache_key();
        let b = TokenRequest::new("x@y.com", &["s"]).with_delegation("b@corp.com").cache_key();
        assert_eq!(a, b);
    }

    #[test]
    fn identity_and_scopes_separate_keys() {
        let base = TokenRequest::new("x@y.com", &["s1"]).cache_key();
        assert_ne!(base, TokenRequest::new("z@y.com", &["s1"]).cache_key());
        assert_ne!(base, TokenRequest::new("x@y.com", &["s1", "s2"]).cache_key());
    }

    #[test]
    fn expiration_does_not_take_part_in_the_key() {
        let a = TokenRequest::new("x@y.com", &["s1"]);
        let b = a.clone().with_expiration(Duration::from_secs(5));
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn display_collision_does_not_merge_keys() {
        let a = TokenRequest::new("x@y.com:s", &["t"]).cache_key();
        let b = TokenRequest::new("x@y.com", &["s:t"]).cache_key();
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a, b);
    }
}
