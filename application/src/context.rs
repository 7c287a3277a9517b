//! [`Context`]-related definitions.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts};

use crate::{captcha::Captcha, gate::CookiePolicy, Error, Service};

/// Application context shared by all the request handlers.
///
/// Built once at startup and attached to every request as an
/// [`Extension`](axum::Extension).
#[derive(Clone, Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// [`CookiePolicy`] of the session and CSRF cookies.
    cookies: CookiePolicy,

    /// [`Captcha`] verifying logins.
    captcha: Arc<Captcha>,

    /// Whether failed logins tell an unknown email apart from a wrong
    /// password.
    detailed_login_errors: bool,
}

impl Context {
    /// Creates a new [`Context`] out of the provided parts.
    #[must_use]
    pub fn new(
        service: Service,
        cookies: CookiePolicy,
        captcha: Captcha,
        detailed_login_errors: bool,
    ) -> Self {
        Self {
            service,
            cookies,
            captcha: Arc::new(captcha),
            detailed_login_errors,
        }
    }

    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub const fn service(&self) -> &Service {
        &self.service
    }

    /// Returns [`CookiePolicy`] of this [`Context`].
    #[must_use]
    pub const fn cookies(&self) -> CookiePolicy {
        self.cookies
    }

    /// Returns [`Captcha`] of this [`Context`].
    #[must_use]
    pub fn captcha(&self) -> &Captcha {
        &self.captcha
    }

    /// Indicates whether failed logins are reported in detail.
    #[must_use]
    pub const fn detailed_login_errors(&self) -> bool {
        self.detailed_login_errors
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Context` extension"))
    }
}
