//! Publication credentials.
//!
//! A publishing target names an entry of `[credentials.<name>]` in the
//! global config. `${env:SECRET}` references in that file are already
//! interpolated by the time it is loaded, so this module only decides how
//! the resolved values are attached to a request.

use reqwest::RequestBuilder;

use keel_core::config::CredentialEntry;

/// Resolved credentials for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

impl From<&CredentialEntry> for Credentials {
    fn from(entry: &CredentialEntry) -> Self {
        Self {
            username: entry.username.clone().filter(|s| !s.is_empty()),
            password: entry.password.clone().filter(|s| !s.is_empty()),
            token: entry.token.clone().filter(|s| !s.is_empty()),
        }
    }
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.token.is_none()
    }
}

/// Attach credentials to a request. A token wins over a username; a
/// password without a username is sent as a bearer token.
pub fn apply_auth(request: RequestBuilder, credentials: Option<&Credentials>) -> RequestBuilder {
    let Some(c) = credentials else {
        return request;
    };
    match (&c.token, &c.username, &c.password) {
        (Some(token), _, _) => request.bearer_auth(token),
        (None, Some(user), pass) => request.basic_auth(user, pass.as_deref()),
        (None, None, Some(token)) => request.bearer_auth(token),
        (None, None, None) => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_strings_count_as_missing() {
        let entry = CredentialEntry {
            username: Some(String::new()),
            password: Some(String::new()),
            token: None,
        };
        assert!(Credentials::from(&entry).is_empty());
    }

    #[test]
    fn basic_auth_header_is_set() {
        let creds = Credentials {
            username: Some("ci".into()),
            password: Some("pw".into()),
            token: None,
        };
        let client = reqwest::Client::new();
        let req = apply_auth(client.put("http://localhost/x"), Some(&creds))
            .build()
            .unwrap();
        let header = req.headers()[reqwest::header::AUTHORIZATION].to_str().unwrap();
        assert!(header.starts_with("Basic "));
    }

    #[test]
    fn token_becomes_bearer() {
        let creds = Credentials {
            token: Some("ghp_123".into()),
            ..Credentials::default()
        };
        let client = reqwest::Client::new();
        let req = apply_auth(client.put("http://localhost/x"), Some(&creds))
            .build()
            .unwrap();
        assert_eq!(
            req.headers()[reqwest::header::AUTHORIZATION],
            "Bearer ghp_123"
        );
    }
}
