//! [`User`]-related definitions.

use axum::{extract::Path, http::StatusCode, Json};
use axum_extra::extract::WithRejection;
use futures::TryFutureExt as _;
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, user, user::Role},
    query, Query as _,
};
use tracing as log;
use uuid::Uuid;

use crate::{
    api::{self, Message},
    define_error,
    gate::{AdminOnly, Authenticated, Authorized},
    AsError, Context, Error,
};

/// User as exposed by the API.
///
/// Never holds the password hash.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    /// ID of this [`User`].
    pub id: user::Id,

    /// Email of this [`User`].
    pub email: user::Email,

    /// First name of this [`User`].
    pub prenom: user::Name,

    /// Last name of this [`User`], if any.
    pub nom: Option<user::Name>,

    /// Phone of this [`User`], if any.
    pub telephone: Option<user::Phone>,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// When this [`User`] was created.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: user::CreationDateTime,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        let domain::User {
            id,
            email,
            password_hash: _,
            first_name,
            last_name,
            phone,
            role,
            created_at,
        } = user;
        Self {
            id,
            email,
            prenom: first_name,
            nom: last_name,
            telephone: phone,
            role,
            created_at,
        }
    }
}

/// Lists all the users.
///
/// # Errors
///
/// With `AUTHENTICATION_REQUIRED` or `FORBIDDEN` if not an administrator.
#[tracing::instrument(skip_all)]
pub async fn list(
    ctx: Context,
    _: Authorized<AdminOnly>,
) -> Result<Json<Vec<User>>, Error> {
    let users = ctx
        .service()
        .execute(query::users::All::by(()))
        .map_err(AsError::into_error)
        .await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Body of a [`create`] request.
#[derive(Debug, Deserialize)]
pub struct NewUser {
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

    /// [`Role`] of the new user, [`Role::Employe`] by default.
    pub role: Option<Role>,
}

/// Creates a new user with any [`Role`].
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - invalid fields;
/// - `DUPLICATE_IDENTITY` - the email is already registered.
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn create(
    ctx: Context,
    Authorized { session, .. }: Authorized<AdminOnly>,
    WithRejection(Json(body), _): WithRejection<Json<NewUser>, Error>,
) -> Result<(StatusCode, Json<User>), Error> {
    let NewUser {
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
        .execute(command::CreateUser {
            email: api::parse(&email)?,
            password: SecretBox::init_with(move || password),
            first_name: api::parse(&prenom)?,
            last_name: nom.as_deref().map(api::parse).transpose()?,
            phone: telephone.as_deref().map(api::parse).transpose()?,
            role: role.unwrap_or_default(),
        })
        .await
        .map_err(AsError::into_error)?;

    log::info!(
        user.id = %user.id,
        user.role = %user.role,
        by = %session.user_id,
        "user created",
    );

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Body of an [`update`] request.
///
/// Absent fields are left untouched, and `null` removes an optional one.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserPatch {
    /// New email.
    pub email: Option<String>,

    /// New password.
    #[serde(alias = "mot_de_passe")]
    pub password: Option<String>,

    /// New first name.
    pub prenom: Option<String>,

    /// New last name.
    #[serde(deserialize_with = "api::present")]
    pub nom: Option<Option<String>>,

    /// New phone.
    #[serde(deserialize_with = "api::present")]
    pub telephone: Option<Option<String>>,

    /// New [`Role`].
    pub role: Option<Role>,
}

/// Updates the provided fields of a user.
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - invalid fields;
/// - `NOT_FOUND` - no user with such ID;
/// - `DUPLICATE_IDENTITY` - the new email is already registered.
#[tracing::instrument(skip_all, fields(user.id = %id))]
pub async fn update(
    ctx: Context,
    _: Authorized<AdminOnly>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(body), _): WithRejection<Json<UserPatch>, Error>,
) -> Result<Json<User>, Error> {
    let UserPatch {
        email,
        password,
        prenom,
        nom,
        telephone,
        role,
    } = body;

    let password = password
        .as_deref()
        .map(api::parse::<user::Password>)
        .transpose()?;
    let user = ctx
        .service()
        .execute(command::UpdateUser {
            id: id.into(),
            email: email.as_deref().map(api::parse).transpose()?,
            password: password.map(|p| SecretBox::init_with(move || p)),
            first_name: prenom.as_deref().map(api::parse).transpose()?,
            last_name: nom
                .map(|n| n.as_deref().map(api::parse).transpose())
                .transpose()?,
            phone: telephone
                .map(|p| p.as_deref().map(api::parse).transpose())
                .transpose()?,
            role,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(user.into()))
}

/// Deletes a user permanently.
///
/// # Errors
///
/// With `NOT_FOUND` if there is no user with such ID.
#[tracing::instrument(skip_all, fields(user.id = %id))]
pub async fn delete(
    ctx: Context,
    Authorized { session, .. }: Authorized<AdminOnly>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<Json<Message>, Error> {
    ctx.service()
        .execute(command::DeleteUser { id: id.into() })
        .await
        .map_err(AsError::into_error)?;

    log::info!(by = %session.user_id, "user deleted");

    Ok(Json(Message::new("Utilisateur supprimé")))
}

/// Returns the current user, as stored now.
///
/// # Errors
///
/// With `NOT_FOUND` if the user has been deleted since the login.
#[tracing::instrument(skip_all, fields(user.id = %session.user_id))]
pub async fn me(
    ctx: Context,
    Authenticated(session): Authenticated,
) -> Result<Json<User>, Error> {
    let user = ctx
        .service()
        .execute(query::user::ById::by(session.user_id))
        .map_err(AsError::into_error)
        .await?
        .ok_or(UserError::NotFound)?;
    Ok(Json(user.into()))
}

/// Body of a [`check`] request.
#[derive(Debug, Deserialize)]
pub struct Lookup {
    /// Email to look the user up by.
    pub email: String,
}

/// Existing user as exposed to anyone knowing the email.
///
/// Narrower than a [`User`]: neither the phone nor the creation time leaks.
#[derive(Clone, Debug, Serialize)]
pub struct Existing {
    /// ID of the user.
    pub id: user::Id,

    /// Email of the user.
    pub email: user::Email,

    /// Last name of the user, if any.
    pub nom: Option<user::Name>,

    /// First name of the user.
    pub prenom: user::Name,

    /// [`Role`] of the user.
    pub role: Role,
}

impl From<domain::User> for Existing {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            nom: user.last_name,
            prenom: user.first_name,
            role: user.role,
        }
    }
}

/// Looks a user up by email.
///
/// # Errors
///
/// With `NOT_FOUND` if no user has such email.
#[tracing::instrument(skip_all)]
pub async fn check(
    ctx: Context,
    WithRejection(Json(body), _): WithRejection<Json<Lookup>, Error>,
) -> Result<Json<Existing>, Error> {
    let email = api::parse::<user::Email>(&body.email)?;
    let user = ctx
        .service()
        .execute(query::user::ByEmail::by(&email))
        .map_err(AsError::into_error)
        .await?
        .ok_or(UserError::NotFound)?;
    Ok(Json(user.into()))
}

/// Greets administrators, checking their access.
///
/// # Errors
///
/// With `AUTHENTICATION_REQUIRED` or `FORBIDDEN` if not an administrator.
#[expect(
    clippy::unused_async,
    reason = "`async` is required to match signature"
)]
pub async fn admin_only(_: Authorized<AdminOnly>) -> Json<Message> {
    Json(Message::new("Bienvenue administrateur !"))
}

impl AsError for command::update_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Hashing(_) => None,
            Self::UserNotExists(_) => Some(UserError::NotFound.into()),
            Self::EmailOccupied(_) => Some(UserError::DuplicateIdentity.into()),
        }
    }
}

impl AsError for command::delete_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(UserError::NotFound.into()),
        }
    }
}

define_error! {
    enum UserError {
        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "User not found"]
        NotFound,

        #[code = "DUPLICATE_IDENTITY"]
        #[status = CONFLICT]
        #[message = "Email is already registered"]
        DuplicateIdentity,
    }
}
