//! [`Command`] for creating a new [`Category`].

use common::operations::{By, Insert};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::category::Name;
use crate::{
    domain::{category, Category},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Category`].
#[derive(Clone, Debug, From)]
pub struct CreateCategory {
    /// [`Name`] of a new [`Category`].
    pub name: category::Name,
}

impl<Db, Docs> Command<CreateCategory> for Service<Db, Docs>
where
    Db: Database<
        Insert<By<Category, category::Name>>,
        Ok = Category,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Category;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateCategory,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        self.database()
            .execute(Insert(By::new(cmd.name)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`CreateCategory`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
