//! [CSRF] protection via the double-submit cookie pattern.
//!
//! [CSRF]: https://owasp.org/www-community/attacks/csrf

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse as _, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Serialize;
use subtle::ConstantTimeEq as _;
use tracing as log;

use crate::{define_error, Context};

/// Name of the cookie holding the expected token.
///
/// Readable by scripts, so clients are able to echo it in a [`HEADERS`] one.
pub const COOKIE: &str = "XSRF-TOKEN";

/// Headers a submitted token is looked up in, by priority.
pub const HEADERS: [&str; 3] = ["x-csrf-token", "csrf-token", "x-xsrf-token"];

/// Number of random bytes in a minted token.
const TOKEN_LEN: usize = 32;

/// Mints a new unpredictable token.
#[must_use]
pub fn mint() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; TOKEN_LEN]>())
}

/// Indicates whether the provided [`http::Method`] doesn't change any state,
/// so is never checked.
#[must_use]
pub fn is_safe(method: &http::Method) -> bool {
    [
        http::Method::GET,
        http::Method::HEAD,
        http::Method::OPTIONS,
        http::Method::TRACE,
    ]
    .contains(method)
}

/// Checks whether the `submitted` token matches the `expected` one.
///
/// Comparison is performed in constant time. Empty tokens never match.
#[must_use]
pub fn matches(submitted: Option<&str>, expected: Option<&str>) -> bool {
    match (submitted, expected) {
        (Some(submitted), Some(expected)) if !expected.is_empty() => {
            submitted.as_bytes().ct_eq(expected.as_bytes()).into()
        }
        _ => false,
    }
}

/// Middleware rejecting any unsafe request which doesn't echo the [`COOKIE`]
/// value in one of the [`HEADERS`].
///
/// Runs before any session verification, so a request without a valid token
/// is rejected with `CSRF_MISMATCH` regardless of its session.
pub async fn verify(request: Request, next: Next) -> Response {
    if is_safe(request.method()) {
        return next.run(request).await;
    }

    let headers = request.headers();
    let jar = CookieJar::from_headers(headers);
    let submitted = HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok());
    let verified = matches(submitted, jar.get(COOKIE).map(|c| c.value()));

    if verified {
        next.run(request).await
    } else {
        log::debug!(
            header = submitted.is_some(),
            cookie = jar.get(COOKIE).is_some(),
            "CSRF token mismatch",
        );
        CsrfError::Mismatch.into_response()
    }
}

/// Response of a [`token`] request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Minted token, to be sent back in a [`HEADERS`] one.
    pub csrf_token: String,
}

/// Mints a new token and sets it as the [`COOKIE`].
///
/// Previously minted tokens aren't revoked: a pair of any cookie and the
/// header holding the same value stays valid.
#[expect(
    clippy::unused_async,
    reason = "`async` is required to match signature"
)]
#[tracing::instrument(skip_all)]
pub async fn token(
    ctx: Context,
    jar: CookieJar,
) -> (CookieJar, Json<TokenResponse>) {
    let csrf_token = mint();
    let jar = jar.add(ctx.cookies().cookie(COOKIE, csrf_token.clone()));
    (jar, Json(TokenResponse { csrf_token }))
}

define_error! {
    enum CsrfError {
        #[code = "CSRF_MISMATCH"]
        #[status = FORBIDDEN]
        #[message = "Missing or invalid CSRF token"]
        Mismatch,
    }
}

#[cfg(test)]
mod spec {
    use super::{is_safe, matches, mint};

    #[test]
    fn mints_unique_url_safe_tokens() {
        let first = mint();
        let second = mint();

        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn only_unsafe_methods_are_checked() {
        assert!(is_safe(&http::Method::GET));
        assert!(is_safe(&http::Method::HEAD));
        assert!(is_safe(&http::Method::OPTIONS));
        assert!(!is_safe(&http::Method::POST));
        assert!(!is_safe(&http::Method::PUT));
        assert!(!is_safe(&http::Method::PATCH));
        assert!(!is_safe(&http::Method::DELETE));
    }

    #[test]
    fn matches_only_equal_tokens() {
        assert!(matches(Some("abc"), Some("abc")));

        assert!(!matches(Some("abc"), Some("abd")));
        assert!(!matches(Some("abc"), Some("abcd")));
        assert!(!matches(None, Some("abc")));
        assert!(!matches(Some("abc"), None));
        assert!(!matches(Some(""), Some("")));
    }
}
