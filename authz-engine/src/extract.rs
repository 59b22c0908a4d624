use http::HeaderMap;
use http::header::AUTHORIZATION;

/// Extracts a bearer token from the `Authorization` header.
///
/// Only the `Bearer` scheme is recognized, case-insensitively per RFC 6750.
/// An absent header, a non-UTF-8 value, a different scheme, or an empty
/// token all yield `None`: absence of credentials is a normal state, not an
/// error.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    // A second space would mean auth-params, which bearer tokens don't carry.
    if token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}
