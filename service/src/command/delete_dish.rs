//! [`Command`] for deleting a [`Dish`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{dish, Dish},
    infra::{
        database,
        documents::{self, Document},
        Database, DocumentStore,
    },
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Dish`].
///
/// The [`DocumentStore`] copy is removed only after the [`Database`] row is,
/// and failing to remove it doesn't fail the [`Command`].
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteDish {
    /// ID of the [`Dish`] to delete.
    pub id: dish::Id,
}

impl<Db, Docs> Command<DeleteDish> for Service<Db, Docs>
where
    Db: Database<
        Delete<By<Dish, dish::Id>>,
        Ok = bool,
        Err = Traced<database::Error>,
    >,
    Docs: DocumentStore<
        Delete<documents::Key>,
        Err = Traced<documents::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteDish) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteDish { id } = cmd;

        let deleted = self
            .database()
            .execute(Delete(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !deleted {
            return Err(tracerr::new!(E::DishNotExists(id)));
        }

        let key = Document::dish_key(id);
        self.mirror(Delete(key.clone()), &key).await;

        Ok(())
    }
}

/// Error of [`DeleteDish`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Dish`] doesn't exist.
    #[display("`Dish(id: {_0})` does not exist")]
    #[from(ignore)]
    DishNotExists(#[error(not(source))] dish::Id),
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use crate::{
        command::{Command as _, CreateDish, DeleteDish},
        domain::{category, dish},
        infra::documents::Document,
    };

    #[tokio::test]
    async fn deletes_even_when_mirror_fails() {
        let (svc, db, docs) = crate::spec::in_memory();
        let dish = svc
            .execute(CreateDish {
                name: dish::Name::new("Citronnade").unwrap(),
                description: None,
                price: dish::Price::new(Decimal::new(4, 0)).unwrap(),
                image_url: None,
                category_id: category::Id::from(4),
            })
            .await
            .unwrap();
        docs.set_unavailable(true);

        svc.execute(DeleteDish { id: dish.id }).await.unwrap();

        assert!(db.state().dishes.is_empty());
        docs.set_unavailable(false);
        assert!(docs.get(&Document::dish_key(dish.id)).is_some());
    }
}
