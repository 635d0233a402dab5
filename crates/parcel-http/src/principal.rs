//! Principal resolution from request headers.

use std::collections::HashMap;

use parcel_model::Principal;

/// Maps request credentials to an authenticated principal.
pub trait PrincipalResolver: Send + Sync + 'static {
    /// The principal behind `headers`, or `None` if unauthenticated.
    fn resolve(&self, headers: &http::HeaderMap) -> Option<Principal>;
}

/// Resolves API tokens from the `Authorization` header against a fixed table.
///
/// Both `Authorization: <token>` and `Authorization: Bearer <token>` are
/// accepted.
#[derive(Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, Principal>,
}

impl StaticTokenResolver {
    /// Build from `(token, user)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            tokens: entries
                .into_iter()
                .map(|(token, user)| (token, Principal::new(user)))
                .collect(),
        }
    }

    /// Number of known tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no tokens are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Debug for StaticTokenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenResolver")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl PrincipalResolver for StaticTokenResolver {
    fn resolve(&self, headers: &http::HeaderMap) -> Option<Principal> {
        let value = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?.trim();
        let token = match value.get(..7) {
            Some(scheme) if scheme.eq_ignore_ascii_case("bearer ") => value[7..].trim(),
            _ => value,
        };
        if token.is_empty() {
            return None;
        }
        self.tokens.get(token).cloned()
    }
}
