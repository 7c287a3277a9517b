//! [`Command`] for updating a [`Dish`].

use common::{
    operations::{By, Commit, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::dish::{Description, ImageUrl, Name, Price};
use crate::{
    domain::{category, dish, Category, Dish},
    infra::{
        database,
        documents::{self, Document},
        Database, DocumentStore,
    },
    Service,
};

use super::Command;

/// [`Command`] for updating a [`Dish`].
///
/// Only the provided fields are changed. The whole updated [`Dish`] is
/// merged into its [`DocumentStore`] copy once committed, so a previously
/// missed mirror write heals on the next update.
#[derive(Clone, Debug, Default)]
pub struct UpdateDish {
    /// ID of the [`Dish`] to update.
    pub id: dish::Id,

    /// New [`Name`] of the [`Dish`].
    pub name: Option<dish::Name>,

    /// New [`Description`] of the [`Dish`], [`Some`]`(`[`None`]`)` removes
    /// it.
    pub description: Option<Option<dish::Description>>,

    /// New [`Price`] of the [`Dish`].
    pub price: Option<dish::Price>,

    /// New [`ImageUrl`] of the [`Dish`], [`Some`]`(`[`None`]`)` removes it.
    pub image_url: Option<Option<dish::ImageUrl>>,

    /// ID of the new [`Category`] of the [`Dish`].
    pub category_id: Option<category::Id>,
}

impl<Db, Docs> Command<UpdateDish> for Service<Db, Docs>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Dish>, dish::Id>>,
            Ok = Option<Dish>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Category>, category::Id>>,
            Ok = Option<Category>,
            Err = Traced<database::Error>,
        > + Database<Update<Dish>, Ok = bool, Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
    Docs: DocumentStore<Update<Document>, Err = Traced<documents::Error>>,
{
    type Ok = Dish;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateDish) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateDish {
            id,
            name,
            description,
            price,
            image_url,
            category_id,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut dish = tx
            .execute(Select(By::<Option<Dish>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::DishNotExists(id))
            .map_err(tracerr::wrap!())?;

        if let Some(category_id) = category_id {
            if category_id != dish.category_id {
                let by = By::<Option<Category>, _>::new(category_id);
                let category = tx
                    .execute(Select(by))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                if category.is_none() {
                    return Err(tracerr::new!(E::UnknownCategory(category_id)));
                }
                dish.category_id = category_id;
            }
        }
        if let Some(name) = name {
            dish.name = name;
        }
        if let Some(description) = description {
            dish.description = description;
        }
        if let Some(price) = price {
            dish.price = price;
        }
        if let Some(image_url) = image_url {
            dish.image_url = image_url;
        }
        dish.updated_at = DateTime::now().coerce();

        let updated = tx.execute(Update(dish.clone())).await;
        if let Err(e) = &updated {
            let constraint = database::constraint::DISH_CATEGORY;
            if e.as_ref().is_foreign_key_violation(constraint) {
                return Err(tracerr::new!(E::UnknownCategory(
                    dish.category_id
                )));
            }
        }
        if !updated.map_err(tracerr::map_from_and_wrap!(=> E))? {
            return Err(tracerr::new!(E::DishNotExists(id)));
        }
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let doc = Document::from(&dish);
        let key = doc.key.clone();
        self.mirror(Update(doc), &key).await;

        Ok(dish)
    }
}

/// Error of [`UpdateDish`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Dish`] doesn't exist.
    #[display("`Dish(id: {_0})` does not exist")]
    #[from(ignore)]
    DishNotExists(#[error(not(source))] dish::Id),

    /// [`Category`] with the provided ID doesn't exist.
    #[display("`Category(id: {_0})` does not exist")]
    #[from(ignore)]
    UnknownCategory(#[error(not(source))] category::Id),
}
