//! Application provides REST API for interacting with the [`Service`].

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod args;
pub mod captcha;
pub mod config;
mod context;
pub mod error;
pub mod gate;

use axum::{middleware, Extension, Router};
// Used in binary.
use axum_client_ip as _;
use http::{HeaderName, HeaderValue};
use refinery as _;
use tokio as _;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing_subscriber as _;

pub use self::{
    args::Args,
    captcha::Captcha,
    config::Config,
    context::Context,
    error::{AsError, Error},
    gate::CookiePolicy,
};

/// [`Service`] with filled infrastructure dependencies.
///
/// [`Service`]: service::Service
pub type Service = service::Service<Database, service::infra::Documents>;

/// Relational database the [`Service`] is backed by.
#[cfg(not(test))]
pub type Database = service::infra::Postgres;

/// Relational database the [`Service`] is backed by.
#[cfg(test)]
pub type Database = service::infra::database::memory::Memory;

/// Headers set on every response, hardening the way browsers handle it.
pub const SECURITY_HEADERS: [(&str, &str); 8] = [
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "cross-origin"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
];

/// Builds the whole HTTP application serving the provided [`Context`].
///
/// Every request passes the CSRF check of the [`gate`] before reaching any
/// route, and every response, rejections included, carries the
/// [`SECURITY_HEADERS`].
#[must_use]
pub fn app(ctx: Context) -> Router {
    let app = api::router()
        .layer(middleware::from_fn(gate::csrf::verify))
        .layer(Extension(ctx));
    SECURITY_HEADERS.into_iter().fold(app, |app, (name, value)| {
        app.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}

#[cfg(test)]
mod spec {
    use axum::{
        body::{self, Body},
        Router,
    };
    use axum_extra::extract::cookie::Cookie;
    use common::DateTime;
    use http::{header, Method, Request, Response, StatusCode};
    use serde_json::{json, Value};
    use service::domain::user::{session, Role};
    use tower::ServiceExt as _;

    use crate::{
        config,
        gate::spec::{
            bypassed, context, context_with, service, token, valid_token,
        },
    };

    fn app() -> Router {
        super::app(context())
    }

    async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json(resp: Response<Body>) -> Value {
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn cookies(resp: &Response<Body>) -> Vec<Cookie<'static>> {
        resp.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| Cookie::parse(v.to_str().unwrap().to_owned()).unwrap())
            .collect()
    }

    /// Builds a request with the provided session and CSRF cookie/header
    /// pair, and an empty JSON object as body.
    fn request(
        method: Method,
        uri: &str,
        session: Option<&session::Token>,
        csrf: Option<(&str, &str)>,
    ) -> Request<Body> {
        request_with(method, uri, session, csrf, &json!({}))
    }

    /// Builds a request with the provided session, CSRF cookie/header pair
    /// and JSON body.
    fn request_with(
        method: Method,
        uri: &str,
        session: Option<&session::Token>,
        csrf: Option<(&str, &str)>,
        body: &Value,
    ) -> Request<Body> {
        let mut cookie = Vec::new();
        if let Some(token) = session {
            cookie.push(format!("token={}", token.as_ref()));
        }
        let mut req = Request::builder().method(method).uri(uri);
        if let Some((in_cookie, in_header)) = csrf {
            cookie.push(format!("XSRF-TOKEN={in_cookie}"));
            req = req.header("x-csrf-token", in_header);
        }
        if !cookie.is_empty() {
            req = req.header(header::COOKIE, cookie.join("; "));
        }
        req.header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn mint_csrf(app: &Router) -> String {
        let resp =
            send(app, request(Method::GET, "/api/csrf-token", None, None))
                .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let cookie = cookies(&resp)
            .into_iter()
            .find(|c| c.name() == "XSRF-TOKEN")
            .unwrap();
        assert_eq!(cookie.http_only(), None);
        assert_eq!(cookie.path(), Some("/"));

        let body = json(resp).await;
        assert_eq!(body["csrfToken"], cookie.value());
        cookie.value().to_owned()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app();

        let resp =
            send(&app, request(Method::GET, "/api/health", None, None)).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["message"], "OK");
    }

    #[tokio::test]
    async fn unsafe_request_without_csrf_is_rejected_regardless_of_session() {
        let app = app();
        let admin = valid_token(Role::Admin);
        let expired = token(Role::Admin, 1_000);

        for session in [Some(&admin), Some(&expired), None] {
            let resp = send(
                &app,
                request(Method::POST, "/api/categories", session, None),
            )
            .await;

            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
            assert_eq!(json(resp).await["error"]["code"], "CSRF_MISMATCH");
        }

        let resp = send(
            &app,
            request(
                Method::DELETE,
                "/api/plats/00000000-0000-0000-0000-000000000000",
                Some(&admin),
                Some(("", "")),
            ),
        )
        .await;
        assert_eq!(json(resp).await["error"]["code"], "CSRF_MISMATCH");
    }

    #[tokio::test]
    async fn previously_minted_csrf_pairs_stay_valid() {
        let app = app();
        let old = mint_csrf(&app).await;
        let new = mint_csrf(&app).await;
        assert_ne!(old, new);

        let resp = send(
            &app,
            request(Method::POST, "/api/auth/logout", None, Some((&old, &old))),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(
            &app,
            request(Method::POST, "/api/auth/logout", None, Some((&new, &old))),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(json(resp).await["error"]["code"], "CSRF_MISMATCH");
    }

    #[tokio::test]
    async fn expired_session_is_unauthenticated() {
        let app = app();
        let expired =
            token(Role::Admin, DateTime::now().unix_timestamp() - 60 * 60);

        let resp = send(
            &app,
            request(Method::GET, "/api/auth/me", Some(&expired), None),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json(resp).await["error"]["code"],
            "AUTHENTICATION_REQUIRED",
        );
    }

    #[tokio::test]
    async fn forged_session_is_unauthenticated() {
        let app = app();
        let forged = format!("{}x", valid_token(Role::Admin).as_ref())
            .parse::<session::Token>()
            .unwrap();

        let resp = send(
            &app,
            request(Method::GET, "/api/auth/me", Some(&forged), None),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_returns_principal_without_secrets() {
        let app = app();
        let chef = valid_token(Role::ChefCuisine);

        let resp =
            send(&app, request(Method::GET, "/api/auth/me", Some(&chef), None))
                .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let user = json(resp).await["user"].clone();
        assert_eq!(user["role"], "chef_cuisine");
        assert_eq!(user["email"], "someone@example.com");
        assert!(user.get("password_hash").is_none());
        assert!(user.get("password").is_none());
    }

    #[tokio::test]
    async fn role_is_checked_against_route_policy() {
        let app = app();
        let uri = "/api/utilisateurs/admin-only";

        let resp = send(
            &app,
            request(Method::GET, uri, Some(&valid_token(Role::Admin)), None),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(
            &app,
            request(Method::GET, uri, Some(&valid_token(Role::Employe)), None),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(json(resp).await["error"]["code"], "FORBIDDEN");

        let resp = send(&app, request(Method::GET, uri, None, None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn session_is_checked_after_csrf() {
        let app = app();
        let csrf = mint_csrf(&app).await;
        let employe = valid_token(Role::Employe);

        let resp = send(
            &app,
            request(Method::POST, "/api/plats", None, Some((&csrf, &csrf))),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = send(
            &app,
            request(
                Method::POST,
                "/api/plats",
                Some(&employe),
                Some((&csrf, &csrf)),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(json(resp).await["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn csrf_then_admin_session_reaches_admin_route() {
        let app = app();
        let csrf = mint_csrf(&app).await;
        let admin = valid_token(Role::Admin);

        let resp = send(
            &app,
            request(
                Method::GET,
                "/api/utilisateurs/admin-only",
                Some(&admin),
                Some((&csrf, &csrf)),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            json(resp).await["message"],
            "Bienvenue administrateur !",
        );

        let resp = send(
            &app,
            request(
                Method::POST,
                "/api/auth/logout",
                Some(&admin),
                Some((&csrf, &csrf)),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let cleared = cookies(&resp);
        for name in ["token", "XSRF-TOKEN"] {
            let cookie = cleared.iter().find(|c| c.name() == name).unwrap();
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        }
    }

    /// Sends a CSRF-protected `POST` request with the provided JSON body.
    async fn post(
        app: &Router,
        uri: &str,
        session: Option<&session::Token>,
        body: Value,
    ) -> Response<Body> {
        let csrf = mint_csrf(app).await;
        send(
            app,
            request_with(
                Method::POST,
                uri,
                session,
                Some((&csrf, &csrf)),
                &body,
            ),
        )
        .await
    }

    async fn register(app: &Router, email: &str, password: &str) {
        let resp = post(
            app,
            "/api/auth/register",
            None,
            json!({
                "email": email,
                "password": password,
                "prenom": "Gourmet",
                "telephone": "+33 6 12 34 56 78",
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    async fn login(
        app: &Router,
        email: &str,
        password: &str,
    ) -> Response<Body> {
        post(
            app,
            "/api/auth/login",
            None,
            json!({"email": email, "password": password}),
        )
        .await
    }

    fn session_cookie(resp: &Response<Body>) -> Option<Cookie<'static>> {
        cookies(resp).into_iter().find(|c| c.name() == "token")
    }

    #[tokio::test]
    async fn login_sets_session_cookie() {
        let app = app();
        register(&app, "chef@example.com", "cuisine1").await;

        let resp = login(&app, "CHEF@Example.com", "cuisine1").await;

        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = session_cookie(&resp).unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::seconds(24 * 60 * 60)),
        );

        let user = json(resp).await["user"].clone();
        assert_eq!(user["email"], "chef@example.com");
        assert_eq!(user["role"], "employe");
        assert!(user.get("password_hash").is_none());

        let token = cookie.value().parse::<session::Token>().unwrap();
        let resp = send(
            &app,
            request(Method::GET, "/api/auth/me", Some(&token), None),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["user"]["email"], "chef@example.com");
    }

    #[tokio::test]
    async fn failed_login_sets_no_cookie() {
        let app = app();
        register(&app, "chef@example.com", "cuisine1").await;

        for (email, password) in [
            ("chef@example.com", "cuisine2"),
            ("ghost@example.com", "cuisine1"),
        ] {
            let resp = login(&app, email, password).await;

            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            assert!(session_cookie(&resp).is_none());
            assert_eq!(
                json(resp).await["error"]["code"],
                "INVALID_CREDENTIALS",
            );
        }
    }

    #[tokio::test]
    async fn captcha_is_checked_before_credentials() {
        let (service, _) = service();
        let app = super::app(context_with(
            service,
            config::Captcha {
                mode: config::CaptchaMode::Enforce,
                secret: Some("captcha-secret".into()),
                ..config::Captcha::default()
            },
        ));

        let resp = login(&app, "ghost@example.com", "whatever").await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(session_cookie(&resp).is_none());
        assert_eq!(json(resp).await["error"]["code"], "CAPTCHA_REQUIRED");
    }

    #[tokio::test]
    async fn registration_conflicts_on_duplicate_email() {
        let (service, db) = service();
        let app = super::app(context_with(service, bypassed()));

        let resp = post(
            &app,
            "/api/auth/register",
            None,
            json!({
                "email": "serveur@example.com",
                "password": "service1",
                "prenom": "Serveur",
                "role": "admin",
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(json(resp).await["role"], "employe");

        let resp = post(
            &app,
            "/api/auth/register",
            None,
            json!({
                "email": "Serveur@Example.com",
                "password": "service2",
                "prenom": "Autre",
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(json(resp).await["error"]["code"], "DUPLICATE_IDENTITY");
        assert_eq!(db.state().users.len(), 1);
    }

    #[tokio::test]
    async fn password_change_requires_old_password() {
        let app = app();
        register(&app, "chef@example.com", "cuisine1").await;
        let resp = login(&app, "chef@example.com", "cuisine1").await;
        let token = session_cookie(&resp)
            .unwrap()
            .value()
            .parse::<session::Token>()
            .unwrap();
        let csrf = mint_csrf(&app).await;
        let change = |old: &str| {
            request_with(
                Method::PUT,
                "/api/auth/password",
                Some(&token),
                Some((&csrf, &csrf)),
                &json!({"old_password": old, "new_password": "cuisine2"}),
            )
        };

        let resp = send(&app, change("cuisine9")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["error"]["code"], "WRONG_PASSWORD");

        let resp = send(&app, change("cuisine1")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = login(&app, "chef@example.com", "cuisine1").await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = login(&app, "chef@example.com", "cuisine2").await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn user_check_exposes_no_contact_details() {
        let app = app();
        register(&app, "chef@example.com", "cuisine1").await;

        let resp = post(
            &app,
            "/api/utilisateurs/check",
            None,
            json!({"email": "chef@example.com"}),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        let mut fields =
            body.as_object().unwrap().keys().cloned().collect::<Vec<_>>();
        fields.sort();
        assert_eq!(fields, ["email", "id", "nom", "prenom", "role"]);
        assert_eq!(body["prenom"], "Gourmet");
    }

    #[tokio::test]
    async fn responses_carry_security_headers() {
        let app = app();

        let ok =
            send(&app, request(Method::GET, "/api/health", None, None)).await;
        let rejected =
            send(&app, request(Method::POST, "/api/categories", None, None))
                .await;
        assert_eq!(rejected.status(), StatusCode::FORBIDDEN);

        for resp in [ok, rejected] {
            let headers = resp.headers();
            assert_eq!(headers["x-content-type-options"], "nosniff");
            assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
            assert_eq!(headers["referrer-policy"], "no-referrer");
            assert_eq!(
                headers["cross-origin-resource-policy"],
                "cross-origin",
            );
        }
    }

    #[tokio::test]
    async fn overlong_dish_description_is_rejected() {
        let (service, db) = service();
        let app = super::app(context_with(service, bypassed()));
        let chef = valid_token(Role::ChefCuisine);
        let dish = |description: String| {
            json!({
                "nom": "Tartare",
                "description": description,
                "prix": 14.5,
                "id_categorie": 2,
            })
        };

        let resp =
            post(&app, "/api/plats", Some(&chef), dish("a".repeat(2049))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(db.state().dishes.is_empty());

        let resp =
            post(&app, "/api/plats", Some(&chef), dish("a".repeat(2048))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(db.state().dishes.len(), 1);
    }
}
