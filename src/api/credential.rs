//! Basic-auth credential for the TFS REST API.
//!
//! TFS accepts either a personal access token (sent with an empty user name)
//! or an explicit `user:password` pair. Both end up in a single
//! `Authorization: Basic <base64>` header.

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};

/// Credential used to authenticate every request.
///
/// The raw credential string is stored as a `SecretString` and only exposed
/// while the header value is being encoded.
///
/// # Example
///
/// ```rust
/// use tfs_tools::api::BasicCredential;
///
/// let credential = BasicCredential::from_string("my-pat".to_string());
/// assert_eq!(credential.authorization_header(), "Basic Om15LXBhdA==");
/// ```
#[derive(Clone)]
pub struct BasicCredential {
    secret: SecretString,
}

impl BasicCredential {
    /// Creates a credential from a SecretString.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Creates a credential from a plain string.
    pub fn from_string(secret: String) -> Self {
        Self {
            secret: SecretString::from(secret),
        }
    }

    /// Whether the credential is empty or whitespace.
    pub fn is_empty(&self) -> bool {
        self.secret.expose_secret().trim().is_empty()
    }

    /// Builds the `Authorization` header value.
    ///
    /// A credential without `:` is a PAT and is encoded as `:<pat>`.
    pub fn authorization_header(&self) -> String {
        let raw = self.secret.expose_secret();
        let pair = if raw.contains(':') {
            raw.to_string()
        } else {
            format!(":{}", raw)
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(pair);
        format!("Basic {}", encoded)
    }
}

impl std::fmt::Debug for BasicCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredential")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
