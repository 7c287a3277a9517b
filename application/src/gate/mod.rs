//! Security gate of the HTTP API.
//!
//! Every request passes it in the following order, each step rejecting with
//! its own machine-distinguishable [`Error`]:
//! 1. [`csrf::verify`] middleware (unsafe methods only);
//! 2. [`Authenticated`] extractor verifying the session cookie;
//! 3. [`Authorized`] extractor checking the session [`Role`] against the
//!    route [`Policy`].

pub mod csrf;

use std::{marker::PhantomData, time::Duration};

use axum::{async_trait, extract::FromRequestParts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service::{
    command::{self, Command as _},
    domain::user::{session, Role, Session},
};
use tracing as log;

use crate::{config, define_error, AsError, Context, Error};

/// Name of the cookie holding a [`session::Token`].
pub const SESSION_COOKIE: &str = "token";

/// Attributes shared by the session and CSRF cookies.
#[derive(Clone, Copy, Debug)]
pub struct CookiePolicy {
    /// `SameSite` attribute of the cookies.
    same_site: SameSite,

    /// `Secure` attribute of the cookies.
    secure: bool,
}

impl CookiePolicy {
    /// Creates a new [`CookiePolicy`].
    ///
    /// [`SameSite::None`] always implies `Secure`, as browsers reject it
    /// otherwise.
    #[must_use]
    pub fn new(same_site: SameSite, secure: bool) -> Self {
        Self {
            same_site,
            secure: secure || same_site == SameSite::None,
        }
    }

    /// Creates a new httpOnly cookie holding the provided
    /// [`session::Token`] for the provided `ttl`.
    #[must_use]
    pub fn session_cookie(
        self,
        token: &session::Token,
        ttl: Duration,
    ) -> Cookie<'static> {
        let mut cookie = self.cookie(SESSION_COOKIE, token.to_string());
        cookie.set_http_only(true);
        cookie.set_max_age(
            time::Duration::try_from(ttl).unwrap_or(time::Duration::MAX),
        );
        cookie
    }

    /// Creates a new cookie expiring the one with the provided `name`.
    #[must_use]
    pub fn removal_cookie(self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.cookie(name, "");
        cookie.make_removal();
        cookie
    }

    /// Creates a new cookie with the attributes of this [`CookiePolicy`].
    pub(crate) fn cookie(
        self,
        name: &'static str,
        value: impl Into<String>,
    ) -> Cookie<'static> {
        Cookie::build((name, value.into()))
            .path("/")
            .same_site(self.same_site)
            .secure(self.secure)
            .build()
    }
}

impl Default for CookiePolicy {
    fn default() -> Self {
        config::Cookies::default().into()
    }
}

impl From<config::Cookies> for CookiePolicy {
    fn from(conf: config::Cookies) -> Self {
        let same_site = match conf.same_site {
            config::SameSite::Strict => SameSite::Strict,
            config::SameSite::Lax => SameSite::Lax,
            config::SameSite::None => SameSite::None,
        };
        Self::new(same_site, conf.secure)
    }
}

/// Extractor of a verified [`Session`] from the [`SESSION_COOKIE`].
///
/// Rejects with `AUTHENTICATION_REQUIRED` if the cookie is absent, or its
/// token is forged or expired.
#[derive(Clone, Debug)]
pub struct Authenticated(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let ctx = Context::from_request_parts(parts, state).await?;

        let token = CookieJar::from_headers(&parts.headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::AuthenticationRequired)?;
        #[expect(unsafe_code, reason = "verified by the command right away")]
        let token = unsafe { session::Token::new_unchecked(token) };

        ctx.service()
            .execute(command::AuthorizeUserSession { token })
            .await
            .map(Self)
            .map_err(|e| {
                log::debug!("session rejected: {e}");
                e.into_error()
            })
    }
}

/// Set of [`Role`]s a route accepts.
///
/// [`Role::Admin`] is implicitly accepted by every [`Policy`].
pub trait Policy {
    /// [`Role`]s accepted in addition to [`Role::Admin`].
    const ROLES: &'static [Role];
}

/// [`Policy`] of routes reserved to administrators.
#[derive(Clone, Copy, Debug)]
pub struct AdminOnly;

impl Policy for AdminOnly {
    const ROLES: &'static [Role] = &[];
}

/// [`Policy`] of routes managing the menu.
#[derive(Clone, Copy, Debug)]
pub struct Kitchen;

impl Policy for Kitchen {
    const ROLES: &'static [Role] = &[Role::ChefCuisine];
}

/// Extractor of a verified [`Session`] which [`Role`] satisfies the
/// [`Policy`] `P`.
///
/// Rejects with `AUTHENTICATION_REQUIRED` just like [`Authenticated`] does,
/// and with `FORBIDDEN` if the [`Role`] is not accepted.
#[derive(Debug)]
pub struct Authorized<P> {
    /// Verified [`Session`].
    pub session: Session,

    /// Satisfied [`Policy`].
    policy: PhantomData<P>,
}

#[async_trait]
impl<S, P> FromRequestParts<S> for Authorized<P>
where
    S: Send + Sync,
    P: Policy + Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated(session) =
            Authenticated::from_request_parts(parts, state).await?;

        if !session.role.is_authorized(P::ROLES) {
            log::debug!(
                user.id = %session.user_id,
                user.role = %session.role,
                "role is not accepted",
            );
            return Err(AuthError::Forbidden.into());
        }

        Ok(Self {
            session,
            policy: PhantomData,
        })
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::JsonWebTokenDecodeError(_) => {
                Some(AuthError::AuthenticationRequired.into())
            }
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHENTICATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authentication required"]
        AuthenticationRequired,

        #[code = "FORBIDDEN"]
        #[status = FORBIDDEN]
        #[message = "Access denied"]
        Forbidden,
    }
}

#[cfg(test)]
pub(crate) mod spec {
    use std::time::Duration;

    use axum_extra::extract::cookie::SameSite;
    use common::DateTime;
    use service::{
        domain::user::{self, session, Role, Session},
        infra::{database::memory::Memory, Documents},
    };

    use super::CookiePolicy;
    use crate::{captcha::Captcha, config, Context, Service};

    /// Secret the [`context()`] signs the sessions with.
    pub(crate) const SECRET: &[u8] = b"test-secret-of-enough-length";

    /// Creates a new [`Service`] backed by a seeded in-memory database,
    /// returned alongside for inspection.
    pub(crate) fn service() -> (Service, Memory) {
        let db = Memory::seeded();
        let service = Service::new(
            service::Config {
                jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                    SECRET,
                ),
                jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                    SECRET,
                ),
                session_ttl: Duration::from_secs(24 * 60 * 60),
            },
            db.clone(),
            Documents::new(Default::default()).unwrap(),
        );
        (service, db)
    }

    /// Creates a new [`Context`] over the provided [`Service`] with the
    /// provided [`Captcha`] configuration.
    pub(crate) fn context_with(
        service: Service,
        captcha: config::Captcha,
    ) -> Context {
        let captcha = Captcha::new(captcha).unwrap();
        Context::new(service, CookiePolicy::default(), captcha, false)
    }

    /// Returns a [`config::Captcha`] bypassing the human verification.
    pub(crate) fn bypassed() -> config::Captcha {
        config::Captcha {
            mode: config::CaptchaMode::Bypass,
            ..config::Captcha::default()
        }
    }

    /// Creates a new [`Context`] over a fresh in-memory [`Service`] with the
    /// human verification bypassed.
    pub(crate) fn context() -> Context {
        context_with(service().0, bypassed())
    }

    /// Signs a new [`session::Token`] for the provided [`Role`], expiring at
    /// the provided Unix timestamp.
    pub(crate) fn token(role: Role, expires_at: i64) -> session::Token {
        let now = DateTime::now();
        let session = Session {
            user_id: user::Id::new(),
            role,
            email: user::Email::new("someone@example.com").unwrap(),
            name: user::Name::new("Someone").unwrap(),
            issued_at: now.coerce(),
            expires_at: DateTime::from_unix_timestamp(expires_at)
                .unwrap()
                .coerce(),
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &session,
            &jsonwebtoken::EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        token.parse().unwrap()
    }

    /// Signs a new [`session::Token`] for the provided [`Role`], valid for an
    /// hour.
    pub(crate) fn valid_token(role: Role) -> session::Token {
        token(role, DateTime::now().unix_timestamp() + 60 * 60)
    }

    #[test]
    fn none_same_site_forces_secure() {
        let policy = CookiePolicy::new(SameSite::None, false);
        let token = valid_token(Role::Employe);

        let cookie = policy.session_cookie(&token, Duration::from_secs(60));

        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn session_cookie_is_http_only() {
        let policy = CookiePolicy::default();
        let token = valid_token(Role::Employe);

        let cookie =
            policy.session_cookie(&token, Duration::from_secs(24 * 60 * 60));

        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), token.as_ref());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::seconds(24 * 60 * 60)),
        );
    }

    #[test]
    fn removal_cookie_expires() {
        let cookie = CookiePolicy::default().removal_cookie("token");

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
