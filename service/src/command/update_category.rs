//! [`Command`] for renaming a [`Category`].

use common::operations::Update;
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

/// [`Command`] for renaming a [`Category`].
#[derive(Clone, Debug)]
pub struct UpdateCategory {
    /// ID of the [`Category`] to rename.
    pub id: category::Id,

    /// New [`Name`] of the [`Category`].
    pub name: category::Name,
}

impl<Db, Docs> Command<UpdateCategory> for Service<Db, Docs>
where
    Db: Database<Update<Category>, Ok = bool, Err = Traced<database::Error>>,
{
    type Ok = Category;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateCategory,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateCategory { id, name } = cmd;

        let category = Category { id, name };
        let updated = self
            .database()
            .execute(Update(category.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !updated {
            return Err(tracerr::new!(E::CategoryNotExists(id)));
        }
        Ok(category)
    }
}

/// Error of [`UpdateCategory`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Category`] doesn't exist.
    #[display("`Category(id: {_0})` does not exist")]
    #[from(ignore)]
    CategoryNotExists(#[error(not(source))] category::Id),
}
