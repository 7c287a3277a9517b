//! Authentication endpoints.

use axum::{http::StatusCode, Json};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::user::{self, Role, Session},
};
use tracing as log;

use crate::{
    api::{self, Message},
    define_error,
    gate::{csrf, Authenticated, SESSION_COOKIE},
    AsError, Context, Error,
};

/// Verified principal of a [`Session`].
///
/// Never holds anything secret.
#[derive(Clone, Debug, Serialize)]
pub struct Principal {
    /// ID of the user.
    pub id: user::Id,

    /// Email of the user.
    pub email: user::Email,

    /// [`Role`] of the user.
    pub role: Role,

    /// First name of the user.
    pub prenom: user::Name,
}

impl From<Session> for Principal {
    fn from(session: Session) -> Self {
        Self {
            id: session.user_id,
            email: session.email,
            role: session.role,
            prenom: session.name,
        }
    }
}

/// Body of a [`login`] request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Email of the user, matched case-insensitively.
    pub email: String,

    /// Password of the user.
    #[serde(alias = "mot_de_passe")]
    pub password: String,

    /// Human verification token.
    pub recaptcha_token: Option<String>,
}

/// Response of a successful [`login`].
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Human-readable text.
    pub message: &'static str,

    /// Logged in [`Principal`].
    pub user: Principal,
}

/// Logs a user in, setting the session cookie.
///
/// # Errors
///
/// Possible error codes:
/// - `CAPTCHA_REQUIRED` - no human verification token is provided;
/// - `CAPTCHA_REJECTED` - human verification failed;
/// - `INVALID_CREDENTIALS` - unknown email or wrong password. Reported as
///   `USER_NOT_FOUND` or `WRONG_PASSWORD` if the detailed login errors are
///   enabled.
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn login(
    ctx: Context,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<Credentials>, Error>,
) -> Result<(CookieJar, Json<LoginResponse>), Error> {
    use command::create_user_session::ExecutionError as E;

    let Credentials {
        email,
        password,
        recaptcha_token,
    } = body;

    ctx.captcha()
        .verify(recaptcha_token.as_deref())
        .await
        .map_err(AsError::into_error)?;

    let email = api::parse::<user::Email>(&email)?;
    let password = api::parse::<user::Password>(&password)?;

    let output = ctx
        .service()
        .execute(command::CreateUserSession {
            email,
            password: SecretBox::init_with(move || password),
        })
        .await
        .map_err(|e| {
            let unify = !ctx.detailed_login_errors()
                && matches!(
                    e.as_ref(),
                    E::UserNotExists(_) | E::WrongPassword,
                );
            if unify {
                log::debug!("login failed: {e}");
                LoginError::InvalidCredentials.into()
            } else {
                e.into_error()
            }
        })?;

    log::info!(user.id = %output.user.id, "user logged in");

    let ttl = ctx.service().config().session_ttl;
    let jar = jar.add(ctx.cookies().session_cookie(&output.token, ttl));
    Ok((
        jar,
        Json(LoginResponse {
            message: "Connexion réussie",
            user: output.session.into(),
        }),
    ))
}

/// Body of a [`register`] request.
#[derive(Debug, Deserialize)]
pub struct Registration {
    /// Email of the new user.
    pub email: String,

    /// Password of the new user.
    #[serde(alias = "mot_de_passe")]
    pub password: String,

    /// First name of the new user.
    pub prenom: String,

    /// Last name of the new user.
    pub nom: Option<String>,

    /// Phone of the new user.
    pub telephone: Option<String>,

    /// Requested [`Role`], never granted as is.
    pub role: Option<String>,
}

/// Registers a new user with the default [`Role`].
///
/// No session is created.
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - invalid fields;
/// - `DUPLICATE_IDENTITY` - the email is already registered.
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn register(
    ctx: Context,
    WithRejection(Json(body), _): WithRejection<Json<Registration>, Error>,
) -> Result<(StatusCode, Json<api::user::User>), Error> {
    let Registration {
        email,
        password,
        prenom,
        nom,
        telephone,
        role,
    } = body;

    let password = api::parse::<user::Password>(&password)?;
    let user = ctx
        .service()
        .execute(command::RegisterUser {
            email: api::parse(&email)?,
            password: SecretBox::init_with(move || password),
            first_name: api::parse(&prenom)?,
            last_name: nom.as_deref().map(api::parse).transpose()?,
            phone: telephone.as_deref().map(api::parse).transpose()?,
            requested_role: role,
        })
        .await
        .map_err(AsError::into_error)?;

    log::info!(user.id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Logs the user out by expiring the session and CSRF cookies.
///
/// Sessions are stateless, so the token itself stays valid until it expires.
#[expect(
    clippy::unused_async,
    reason = "`async` is required to match signature"
)]
#[tracing::instrument(skip_all)]
pub async fn logout(
    ctx: Context,
    jar: CookieJar,
) -> (CookieJar, Json<Message>) {
    let jar = jar
        .add(ctx.cookies().removal_cookie(SESSION_COOKIE))
        .add(ctx.cookies().removal_cookie(csrf::COOKIE));
    (jar, Json(Message::new("Déconnexion réussie")))
}

/// Response of a [`me`] request.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Current [`Principal`].
    pub user: Principal,
}

/// Returns the [`Principal`] of the current session.
///
/// # Errors
///
/// With `AUTHENTICATION_REQUIRED` if there is no valid session.
#[expect(
    clippy::unused_async,
    reason = "`async` is required to match signature"
)]
pub async fn me(Authenticated(session): Authenticated) -> Json<MeResponse> {
    Json(MeResponse {
        user: session.into(),
    })
}

/// Body of a [`change_password`] request.
#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    /// Current password of the user.
    #[serde(alias = "ancien_mot_de_passe")]
    pub old_password: String,

    /// New password of the user.
    #[serde(alias = "nouveau_mot_de_passe")]
    pub new_password: String,
}

/// Changes the password of the current user.
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - the new password is invalid;
/// - `WRONG_PASSWORD` - the old password doesn't match;
/// - `NOT_FOUND` - the user has been deleted since the login.
#[tracing::instrument(skip_all, fields(user.id = %session.user_id))]
pub async fn change_password(
    ctx: Context,
    Authenticated(session): Authenticated,
    WithRejection(Json(body), _): WithRejection<Json<PasswordChange>, Error>,
) -> Result<Json<Message>, Error> {
    let PasswordChange {
        old_password,
        new_password,
    } = body;

    let old_password = api::parse::<user::Password>(&old_password)
        .map_err(|_| PasswordError::WrongPassword)?;
    let new_password = api::parse::<user::Password>(&new_password)?;

    _ = ctx
        .service()
        .execute(command::UpdateUserPassword {
            user_id: session.user_id,
            new_password: SecretBox::init_with(move || new_password),
            old_password: SecretBox::init_with(move || old_password),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Message::new("Mot de passe mis à jour")))
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserNotExists(_) => Some(LoginError::UserNotFound.into()),
            Self::WrongPassword => Some(LoginError::WrongPassword.into()),
        }
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Hashing(_) => None,
            Self::EmailOccupied(_) => {
                Some(api::user::UserError::DuplicateIdentity.into())
            }
        }
    }
}

impl AsError for command::update_user_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Hashing(_) => None,
            Self::UserNotExists(_) => {
                Some(api::user::UserError::NotFound.into())
            }
            Self::WrongPassword => Some(PasswordError::WrongPassword.into()),
        }
    }
}

define_error! {
    enum LoginError {
        #[code = "INVALID_CREDENTIALS"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid email or password"]
        InvalidCredentials,

        #[code = "USER_NOT_FOUND"]
        #[status = UNAUTHORIZED]
        #[message = "User not found"]
        UserNotFound,

        #[code = "WRONG_PASSWORD"]
        #[status = UNAUTHORIZED]
        #[message = "Wrong password"]
        WrongPassword,
    }
}

define_error! {
    enum PasswordError {
        #[code = "WRONG_PASSWORD"]
        #[status = BAD_REQUEST]
        #[message = "Old password is wrong"]
        WrongPassword,
    }
}
