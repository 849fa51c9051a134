use std::fmt;

use zeroize::Zeroizing;

/// The bearer credential of one Threads account, supplied by the caller on every request.
///
/// The relay never stores it: it is extracted from the incoming request, handed to
/// each upstream call, and dropped (and wiped) when the request completes.
#[derive(Clone)]
pub struct Credential {
    token: Zeroizing<String>,
    account_id: Option<String>,
}

impl Credential {
    /// Returns `None` for an empty or whitespace-only token.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            token: Zeroizing::new(trimmed.to_string()),
            account_id: None,
        })
    }

    /// Attach an already-known account id so the `/me` lookup can be skipped.
    pub fn with_account_id(mut self, account_id: Option<String>) -> Self {
        self.account_id = account_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    /// First and last four characters only, for logs.
    pub fn masked(&self) -> String {
        let t = self.token.as_str();
        if t.len() > 8 && t.is_char_boundary(4) && t.is_char_boundary(t.len() - 4) {
            format!("{}…{}", &t[..4], &t[t.len() - 4..])
        } else {
            "****".to_string()
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.masked())
            .field("account_id", &self.account_id)
            .finish()
    }
}
