//! Caller identity resolution.
//!
//! Authentication happens upstream. The service only needs to know who the
//! caller is and which level they hold, and reads that through an
//! [`IdentityResolver`].

use axum::http::HeaderMap;

use crate::types::{LevelId, UserIdentity};

/// Header carrying the authenticated subject.
pub const USER_HEADER: &str = "x-geogate-user";

/// Header carrying the subject's authorization level.
pub const LEVEL_HEADER: &str = "x-geogate-level";

/// Resolves the already-authenticated caller of a request.
pub trait IdentityResolver: Send + Sync {
    /// Identity for the request, or `None` when the caller is anonymous.
    fn resolve(&self, headers: &HeaderMap) -> Option<UserIdentity>;
}

/// Trusts identity headers set by an upstream authenticator.
///
/// A request without [`USER_HEADER`] is anonymous. A missing or unparsable
/// [`LEVEL_HEADER`] yields an identity without a level.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderIdentityResolver;

impl IdentityResolver for HeaderIdentityResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<UserIdentity> {
        let subject = headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())?;

        let level = headers
            .get(LEVEL_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(LevelId::parse);

        Some(UserIdentity {
            subject: subject.to_string(),
            level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_resolves_subject_and_level() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("geo@example.com"));
        headers.insert(LEVEL_HEADER, HeaderValue::from_static(" 2 "));
        let identity = HeaderIdentityResolver.resolve(&headers).unwrap();
        assert_eq!(identity.subject, "geo@example.com");
        assert_eq!(identity.level, LevelId::new(2));
    }

    #[test]
    fn test_anonymous_without_subject() {
        let mut headers = HeaderMap::new();
        headers.insert(LEVEL_HEADER, HeaderValue::from_static("1"));
        assert!(HeaderIdentityResolver.resolve(&headers).is_none());
    }

    #[test]
    fn test_bad_level_yields_identity_without_level() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("geo"));
        headers.insert(LEVEL_HEADER, HeaderValue::from_static("admin"));
        let identity = HeaderIdentityResolver.resolve(&headers).unwrap();
        assert_eq!(identity.level, None);
    }
}
