//! [`Category`]-related definitions.

use axum::{extract::Path, http::StatusCode, Json};
use axum_extra::extract::WithRejection;
use futures::TryFutureExt as _;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, category},
    query, Query as _,
};
use tracing as log;

use crate::{
    api::{self, Message},
    define_error,
    gate::{AdminOnly, Authorized},
    AsError, Context, Error,
};

/// Category of the menu as exposed by the API.
#[derive(Clone, Debug, Serialize)]
pub struct Category {
    /// ID of this [`Category`].
    pub id_categorie: i32,

    /// Name of this [`Category`].
    pub nom: String,
}

impl From<domain::Category> for Category {
    fn from(category: domain::Category) -> Self {
        Self {
            id_categorie: category.id.into(),
            nom: category.name.to_string(),
        }
    }
}

/// Lists all the categories in order of their IDs.
#[tracing::instrument(skip_all)]
pub async fn list(ctx: Context) -> Result<Json<Vec<Category>>, Error> {
    let categories = ctx
        .service()
        .execute(query::categories::All::by(()))
        .map_err(AsError::into_error)
        .await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// Body of [`create`] and [`update`] requests.
#[derive(Debug, Deserialize)]
pub struct Naming {
    /// Name of the category.
    pub nom: String,
}

/// Creates a new category.
///
/// # Errors
///
/// With `BAD_REQUEST` if the name is invalid.
#[tracing::instrument(skip_all, fields(category.name = %body.nom))]
pub async fn create(
    ctx: Context,
    Authorized { session, .. }: Authorized<AdminOnly>,
    WithRejection(Json(body), _): WithRejection<Json<Naming>, Error>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let category = ctx
        .service()
        .execute(command::CreateCategory {
            name: api::parse(&body.nom)?,
        })
        .await
        .map_err(AsError::into_error)?;

    log::info!(
        category.id = %category.id,
        by = %session.user_id,
        "category created",
    );

    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Renames a category.
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - the name is invalid;
/// - `NOT_FOUND` - no category with such ID.
#[tracing::instrument(skip_all, fields(category.id = id))]
pub async fn update(
    ctx: Context,
    _: Authorized<AdminOnly>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, Error>,
    WithRejection(Json(body), _): WithRejection<Json<Naming>, Error>,
) -> Result<Json<Category>, Error> {
    let category = ctx
        .service()
        .execute(command::UpdateCategory {
            id: category::Id::from(id),
            name: api::parse(&body.nom)?,
        })
        .await
        .map_err(AsError::into_error)?;
    Ok(Json(category.into()))
}

/// Deletes a category having no dishes.
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - no category with such ID;
/// - `CATEGORY_IN_USE` - some dishes still belong to the category.
#[tracing::instrument(skip_all, fields(category.id = id))]
pub async fn delete(
    ctx: Context,
    Authorized { session, .. }: Authorized<AdminOnly>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, Error>,
) -> Result<Json<Message>, Error> {
    ctx.service()
        .execute(command::DeleteCategory {
            id: category::Id::from(id),
        })
        .await
        .map_err(AsError::into_error)?;

    log::info!(by = %session.user_id, "category deleted");

    Ok(Json(Message::new("Catégorie supprimée")))
}

impl AsError for command::create_category::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::update_category::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CategoryNotExists(_) => Some(CategoryError::NotFound.into()),
        }
    }
}

impl AsError for command::delete_category::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CategoryNotExists(_) => Some(CategoryError::NotFound.into()),
            Self::CategoryInUse(_) => Some(CategoryError::InUse.into()),
        }
    }
}

define_error! {
    enum CategoryError {
        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Category not found"]
        NotFound,

        #[code = "CATEGORY_IN_USE"]
        #[status = CONFLICT]
        #[message = "Category still has dishes"]
        InUse,
    }
}
