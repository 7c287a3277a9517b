//! [`Query`] definition.

pub mod categories;
pub mod category;
pub mod dish;
pub mod dishes;
pub mod user;
pub mod users;

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    infra::{database, Database},
    Service,
};

/// [`Query`] of the [`Service`].
pub use common::Handler as Query;

/// [`Query`] [`Select`]ing a `T`ype from a [`Database`].
#[derive(Clone, Copy, Debug)]
#[expect(clippy::module_name_repetitions, reason = "more readable")]
pub struct DatabaseQuery<T>(T);

impl<W, B> DatabaseQuery<By<W, B>> {
    /// Creates a new [`DatabaseQuery`] selecting a `W` by the provided `B`.
    #[must_use]
    pub fn by(by: B) -> Self {
        Self(By::new(by))
    }
}

impl<Db, Docs, W, B> Query<DatabaseQuery<By<W, B>>> for Service<Db, Docs>
where
    Db: Database<Select<By<W, B>>, Ok = W, Err = Traced<database::Error>>,
{
    type Ok = W;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        DatabaseQuery(by): DatabaseQuery<By<W, B>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Select(by))
            .await
            .map_err(tracerr::wrap!())
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{Command as _, CreateCategory},
        domain::category,
        query::{categories, category as by_id, Query as _},
    };

    #[tokio::test]
    async fn lists_seeded_categories_in_order() {
        let (svc, _, _) = crate::spec::in_memory();
        _ = svc
            .execute(CreateCategory {
                name: category::Name::new("Apéritif").unwrap(),
            })
            .await
            .unwrap();

        let names = svc
            .execute(categories::All::by(()))
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name.to_string())
            .collect::<Vec<_>>();

        assert_eq!(names, ["Entrée", "Plat", "Dessert", "Boisson", "Apéritif"]);
    }

    #[tokio::test]
    async fn finds_category_by_id() {
        let (svc, _, _) = crate::spec::in_memory();

        let found = svc
            .execute(by_id::ById::by(category::Id::from(2)))
            .await
            .unwrap()
            .unwrap();
        let missing = svc
            .execute(by_id::ById::by(category::Id::from(20)))
            .await
            .unwrap();

        assert_eq!(found.name.as_ref(), "Plat");
        assert!(missing.is_none());
    }
}
