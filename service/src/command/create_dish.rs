//! [`Command`] for creating a new [`Dish`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted, Update},
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

/// [`Command`] for creating a new [`Dish`].
///
/// The [`Dish`] is mirrored into the [`DocumentStore`] only once it has been
/// committed to the [`Database`]. Mirroring failure doesn't fail the
/// [`Command`].
#[derive(Clone, Debug)]
pub struct CreateDish {
    /// [`Name`] of a new [`Dish`].
    pub name: dish::Name,

    /// [`Description`] of a new [`Dish`].
    pub description: Option<dish::Description>,

    /// [`Price`] of a new [`Dish`].
    pub price: dish::Price,

    /// [`ImageUrl`] of a new [`Dish`].
    pub image_url: Option<dish::ImageUrl>,

    /// ID of the [`Category`] of a new [`Dish`].
    pub category_id: category::Id,
}

impl<Db, Docs> Command<CreateDish> for Service<Db, Docs>
where
    Db: Database<
            Select<By<Option<Category>, category::Id>>,
            Ok = Option<Category>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Dish>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Docs: DocumentStore<Update<Document>, Err = Traced<documents::Error>>,
{
    type Ok = Dish;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateDish) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateDish {
            name,
            description,
            price,
            image_url,
            category_id,
        } = cmd;

        let category = self
            .database()
            .execute(Select(By::new(category_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if category.is_none() {
            return Err(tracerr::new!(E::UnknownCategory(category_id)));
        }

        let now = DateTime::now();
        let dish = Dish {
            id: dish::Id::new(),
            name,
            description,
            price,
            image_url,
            category_id,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let inserted = tx.execute(Insert(dish.clone())).await;
        if let Err(e) = &inserted {
            let constraint = database::constraint::DISH_CATEGORY;
            if e.as_ref().is_foreign_key_violation(constraint) {
                return Err(tracerr::new!(E::UnknownCategory(category_id)));
            }
        }
        inserted
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let doc = Document::from(&dish);
        let key = doc.key.clone();
        self.mirror(Update(doc), &key).await;

        Ok(dish)
    }
}

/// Error of [`CreateDish`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Category`] with the provided ID doesn't exist.
    #[display("`Category(id: {_0})` does not exist")]
    #[from(ignore)]
    UnknownCategory(#[error(not(source))] category::Id),
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use crate::{
        command::{create_dish::ExecutionError, Command as _, CreateDish},
        domain::{category, dish},
        infra::documents::Document,
    };

    fn cmd(category_id: i32) -> CreateDish {
        CreateDish {
            name: dish::Name::new("Crème brûlée").unwrap(),
            description: dish::Description::new("Vanille de Madagascar"),
            price: dish::Price::new(Decimal::new(750, 2)).unwrap(),
            image_url: None,
            category_id: category::Id::from(category_id),
        }
    }

    #[tokio::test]
    async fn writes_primary_then_mirror() {
        let (svc, db, docs) = crate::spec::in_memory();

        let dish = svc.execute(cmd(3)).await.unwrap();

        assert_eq!(db.state().dishes.len(), 1);
        let mirrored = docs.get(&Document::dish_key(dish.id)).unwrap();
        assert_eq!(mirrored["nom"], "Crème brûlée");
        assert_eq!(mirrored["id_categorie"], 3);
    }

    #[tokio::test]
    async fn succeeds_when_mirror_fails() {
        let (svc, db, docs) = crate::spec::in_memory();
        docs.set_unavailable(true);

        let dish = svc.execute(cmd(3)).await.unwrap();

        assert_eq!(db.state().dishes[0].id, dish.id);
        docs.set_unavailable(false);
        assert!(docs.get(&Document::dish_key(dish.id)).is_none());
    }

    #[tokio::test]
    async fn fails_when_primary_fails() {
        let (svc, db, docs) = crate::spec::in_memory();
        db.set_unavailable(true);

        let err = svc.execute(cmd(3)).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Db(_)));
        db.set_unavailable(false);
        assert!(db.state().dishes.is_empty());
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_category() {
        let (svc, db, _) = crate::spec::in_memory();

        let err = svc.execute(cmd(42)).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UnknownCategory(_)));
        assert!(db.state().dishes.is_empty());
    }
}
