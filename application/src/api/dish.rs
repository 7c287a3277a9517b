//! [`Dish`]-related definitions.

use axum::{
    extract::{Path, Query as QueryString},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use futures::TryFutureExt as _;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, category, dish},
    query, Query as _,
};
use tracing as log;
use uuid::Uuid;

use crate::{
    api::{self, Message},
    define_error,
    gate::{Authorized, Kitchen},
    AsError, Context, Error,
};

/// Dish of the menu as exposed by the API.
#[derive(Clone, Debug, Serialize)]
pub struct Dish {
    /// ID of this [`Dish`].
    pub id: Uuid,

    /// Name of this [`Dish`].
    pub nom: String,

    /// Description of this [`Dish`], if any.
    pub description: Option<String>,

    /// Price of this [`Dish`] in euros.
    #[serde(with = "rust_decimal::serde::float")]
    pub prix: Decimal,

    /// URL of this [`Dish`] picture, if any.
    pub image_url: Option<String>,

    /// ID of the category this [`Dish`] belongs to.
    pub id_categorie: i32,

    /// When this [`Dish`] was created.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: dish::CreationDateTime,

    /// When this [`Dish`] was last modified.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub updated_at: dish::ModificationDateTime,
}

impl From<domain::Dish> for Dish {
    fn from(dish: domain::Dish) -> Self {
        Self {
            id: dish.id.into(),
            nom: dish.name.to_string(),
            description: dish.description.as_ref().map(ToString::to_string),
            prix: dish.price.into(),
            image_url: dish.image_url.as_ref().map(ToString::to_string),
            id_categorie: dish.category_id.into(),
            created_at: dish.created_at,
            updated_at: dish.updated_at,
        }
    }
}

/// Query string of a [`list`] request.
#[derive(Debug, Default, Deserialize)]
pub struct ListFilter {
    /// ID of the category to list the dishes of.
    pub id_categorie: Option<i32>,
}

/// Lists the dishes of the menu, optionally of a single category.
#[tracing::instrument(skip_all)]
pub async fn list(
    ctx: Context,
    WithRejection(QueryString(filter), _): WithRejection<
        QueryString<ListFilter>,
        Error,
    >,
) -> Result<Json<Vec<Dish>>, Error> {
    let dishes = ctx
        .service()
        .execute(query::dishes::List::by(dish::Filter {
            category_id: filter.id_categorie.map(category::Id::from),
        }))
        .map_err(AsError::into_error)
        .await?;
    Ok(Json(dishes.into_iter().map(Into::into).collect()))
}

/// Returns a single dish.
///
/// # Errors
///
/// With `NOT_FOUND` if there is no dish with such ID.
#[tracing::instrument(skip_all, fields(dish.id = %id))]
pub async fn get(
    ctx: Context,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<Json<Dish>, Error> {
    let dish = ctx
        .service()
        .execute(query::dish::ById::by(dish::Id::from(id)))
        .map_err(AsError::into_error)
        .await?
        .ok_or(DishError::NotFound)?;
    Ok(Json(dish.into()))
}

/// Body of a [`create`] request.
#[derive(Debug, Deserialize)]
pub struct NewDish {
    /// Name of the new dish.
    pub nom: String,

    /// Description of the new dish.
    pub description: Option<String>,

    /// Price of the new dish, either a JSON number or a string.
    pub prix: Decimal,

    /// URL of the new dish picture.
    pub image_url: Option<String>,

    /// ID of the category of the new dish.
    pub id_categorie: i32,
}

/// Adds a new dish to the menu.
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - invalid fields;
/// - `UNKNOWN_CATEGORY` - no category with the provided ID.
#[tracing::instrument(skip_all, fields(dish.name = %body.nom))]
pub async fn create(
    ctx: Context,
    Authorized { session, .. }: Authorized<Kitchen>,
    WithRejection(Json(body), _): WithRejection<Json<NewDish>, Error>,
) -> Result<(StatusCode, Json<Dish>), Error> {
    let NewDish {
        nom,
        description,
        prix,
        image_url,
        id_categorie,
    } = body;

    let dish = ctx
        .service()
        .execute(command::CreateDish {
            name: api::parse(&nom)?,
            description: description
                .as_deref()
                .map(describe)
                .transpose()?
                .flatten(),
            price: dish::Price::new(prix)
                .ok_or_else(|| Error::bad_request("invalid `prix`"))?,
            image_url: image_url
                .as_deref()
                .map(image)
                .transpose()?,
            category_id: id_categorie.into(),
        })
        .await
        .map_err(AsError::into_error)?;

    log::info!(dish.id = %dish.id, by = %session.user_id, "dish created");

    Ok((StatusCode::CREATED, Json(dish.into())))
}

/// Body of an [`update`] request.
///
/// Absent fields are left untouched, and `null` removes an optional one.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DishPatch {
    /// New name.
    pub nom: Option<String>,

    /// New description.
    #[serde(deserialize_with = "api::present")]
    pub description: Option<Option<String>>,

    /// New price.
    pub prix: Option<Decimal>,

    /// New picture URL.
    #[serde(deserialize_with = "api::present")]
    pub image_url: Option<Option<String>>,

    /// New category ID.
    pub id_categorie: Option<i32>,
}

/// Response of a successful [`update`].
#[derive(Debug, Serialize)]
pub struct Updated {
    /// Human-readable text.
    pub message: &'static str,

    /// Updated [`Dish`].
    pub plat: Dish,
}

/// Updates the provided fields of a dish.
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - invalid fields;
/// - `NOT_FOUND` - no dish with such ID;
/// - `UNKNOWN_CATEGORY` - no category with the provided ID.
#[tracing::instrument(skip_all, fields(dish.id = %id))]
pub async fn update(
    ctx: Context,
    Authorized { session, .. }: Authorized<Kitchen>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(body), _): WithRejection<Json<DishPatch>, Error>,
) -> Result<Json<Updated>, Error> {
    let DishPatch {
        nom,
        description,
        prix,
        image_url,
        id_categorie,
    } = body;

    let image_url = image_url
        .map(|u| u.as_deref().map(image).transpose())
        .transpose()?;
    let dish = ctx
        .service()
        .execute(command::UpdateDish {
            id: id.into(),
            name: nom.as_deref().map(api::parse).transpose()?,
            description: description
                .map(|d| {
                    d.as_deref().map(describe).transpose().map(Option::flatten)
                })
                .transpose()?,
            price: prix
                .map(|p| {
                    dish::Price::new(p)
                        .ok_or_else(|| Error::bad_request("invalid `prix`"))
                })
                .transpose()?,
            image_url,
            category_id: id_categorie.map(Into::into),
        })
        .await
        .map_err(AsError::into_error)?;

    log::info!(by = %session.user_id, "dish updated");

    Ok(Json(Updated {
        message: "Plat mis à jour avec succès.",
        plat: dish.into(),
    }))
}

/// Removes a dish from the menu permanently.
///
/// # Errors
///
/// With `NOT_FOUND` if there is no dish with such ID.
#[tracing::instrument(skip_all, fields(dish.id = %id))]
pub async fn delete(
    ctx: Context,
    Authorized { session, .. }: Authorized<Kitchen>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<Json<Message>, Error> {
    ctx.service()
        .execute(command::DeleteDish { id: id.into() })
        .await
        .map_err(AsError::into_error)?;

    log::info!(by = %session.user_id, "dish deleted");

    Ok(Json(Message::new("Plat supprimé avec succès.")))
}

/// Validates the provided description `text`, treating a blank one as
/// absent.
fn describe(text: &str) -> Result<Option<dish::Description>, Error> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    api::validate(text, |v| dish::Description::new(v), "description").map(Some)
}

/// Validates the provided picture `url`.
fn image(url: &str) -> Result<dish::ImageUrl, Error> {
    api::validate(url, |v| dish::ImageUrl::new(v), "image_url")
}

impl AsError for command::create_dish::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UnknownCategory(_) => Some(DishError::UnknownCategory.into()),
        }
    }
}

impl AsError for command::update_dish::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::DishNotExists(_) => Some(DishError::NotFound.into()),
            Self::UnknownCategory(_) => Some(DishError::UnknownCategory.into()),
        }
    }
}

impl AsError for command::delete_dish::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::DishNotExists(_) => Some(DishError::NotFound.into()),
        }
    }
}

define_error! {
    enum DishError {
        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Dish not found"]
        NotFound,

        #[code = "UNKNOWN_CATEGORY"]
        #[status = BAD_REQUEST]
        #[message = "Selected category doesn't exist"]
        UnknownCategory,
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use super::{describe, DishPatch, NewDish};

    #[test]
    fn accepts_price_as_number_or_string() {
        let number: NewDish = serde_json::from_str(
            r#"{"nom":"Tartare","prix":14.5,"id_categorie":2}"#,
        )
        .unwrap();
        let string: NewDish = serde_json::from_str(
            r#"{"nom":"Tartare","prix":"14.50","id_categorie":2}"#,
        )
        .unwrap();

        assert_eq!(number.prix.normalize(), Decimal::new(145, 1));
        assert_eq!(string.prix.normalize(), Decimal::new(145, 1));
    }

    #[test]
    fn patch_tells_removal_from_absence() {
        let patch: DishPatch =
            serde_json::from_str(r#"{"description":null,"prix":"9"}"#)
                .unwrap();

        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.image_url, None);
        assert_eq!(patch.prix, Some(Decimal::new(9, 0)));
        assert!(patch.nom.is_none());
    }

    #[test]
    fn rejects_overlong_description() {
        let err = describe(&"a".repeat(2049)).unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);

        assert!(describe(&"a".repeat(2048)).unwrap().is_some());
        assert!(describe("  ").unwrap().is_none());
    }
}
