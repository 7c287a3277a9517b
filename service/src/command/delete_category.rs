//! [`Command`] for deleting a [`Category`].

use common::operations::{By, Delete, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{category, dish, Category, Dish},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Category`].
///
/// A [`Category`] still referenced by any [`Dish`] cannot be deleted.
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteCategory {
    /// ID of the [`Category`] to delete.
    pub id: category::Id,
}

impl<Db, Docs> Command<DeleteCategory> for Service<Db, Docs>
where
    Db: Database<
            Select<By<Vec<Dish>, dish::Filter>>,
            Ok = Vec<Dish>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Category, category::Id>>,
            Ok = bool,
            Err = Traced<database::Error>,
        >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteCategory,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteCategory { id } = cmd;

        let dishes = self
            .database()
            .execute(Select(By::new(dish::Filter {
                category_id: Some(id),
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !dishes.is_empty() {
            return Err(tracerr::new!(E::CategoryInUse(id)));
        }

        let deleted = self.database().execute(Delete(By::new(id))).await;
        if let Err(e) = &deleted {
            let constraint = database::constraint::DISH_CATEGORY;
            if e.as_ref().is_foreign_key_violation(constraint) {
                return Err(tracerr::new!(E::CategoryInUse(id)));
            }
        }
        if !deleted.map_err(tracerr::map_from_and_wrap!(=> E))? {
            return Err(tracerr::new!(E::CategoryNotExists(id)));
        }
        Ok(())
    }
}

/// Error of [`DeleteCategory`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Category`] doesn't exist.
    #[display("`Category(id: {_0})` does not exist")]
    #[from(ignore)]
    CategoryNotExists(#[error(not(source))] category::Id),

    /// [`Category`] is still referenced by some [`Dish`]es.
    #[display("`Category(id: {_0})` still has dishes")]
    #[from(ignore)]
    CategoryInUse(#[error(not(source))] category::Id),
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use crate::{
        command::{
            delete_category::ExecutionError, Command as _, CreateCategory,
            CreateDish, DeleteCategory,
        },
        domain::{category, dish},
    };

    #[tokio::test]
    async fn deletes_unused_category() {
        let (svc, db, _) = crate::spec::in_memory();
        let category = svc
            .execute(CreateCategory {
                name: category::Name::new("Fromages").unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(i32::from(category.id), 5);

        svc.execute(DeleteCategory { id: category.id })
            .await
            .unwrap();

        assert_eq!(db.state().categories.len(), 4);
    }

    #[tokio::test]
    async fn keeps_category_in_use() {
        let (svc, db, _) = crate::spec::in_memory();
        _ = svc
            .execute(CreateDish {
                name: dish::Name::new("Mousse au chocolat").unwrap(),
                description: None,
                price: dish::Price::new(Decimal::new(650, 2)).unwrap(),
                image_url: None,
                category_id: category::Id::from(3),
            })
            .await
            .unwrap();

        let err = svc
            .execute(DeleteCategory {
                id: category::Id::from(3),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::CategoryInUse(_)));
        assert_eq!(db.state().categories.len(), 4);
    }

    #[tokio::test]
    async fn fails_for_unknown_category() {
        let (svc, _, _) = crate::spec::in_memory();

        let err = svc
            .execute(DeleteCategory {
                id: category::Id::from(77),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::CategoryNotExists(_),
        ));
    }
}
