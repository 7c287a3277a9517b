//! Postgres [`Database`] implementation.

pub mod client;
pub mod connection;
mod impls;

use deadpool_postgres::Runtime;
use derive_more::{Deref, Display, Error as StdError, From};
use tokio_postgres::{error::SqlState, NoTls};
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use refinery::embed_migrations;

pub use self::{
    client::{NonTx, Tx},
    connection::Connection,
};

pub use deadpool_postgres::Config;

/// Postgres [`Database`] client.
#[derive(Clone, Debug, Deref)]
pub struct Postgres<T = NonTx>(T);

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// No connection is established until the first operation.
    ///
    /// # Errors
    ///
    /// If the provided [`Config`] is invalid.
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self(NonTx::new(pool)))
    }
}

/// Postgres database [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// [`Connection`] error.
    #[display("`Connection` error: {_0}")]
    Connection(connection::Error),

    /// Error of creating a new [`connection::Pool`].
    #[display("Failed to create a new `connection::Pool`: {_0}")]
    PoolCreationError(connection::PoolCreationError),

    /// [`connection::Pool`] error.
    #[display("`connection::Pool` error: {_0}")]
    PoolError(connection::PoolError),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint
    /// (or of any one, if [`None`]).
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::Connection(e) => {
                e.code() == Some(&SqlState::UNIQUE_VIOLATION)
                    && constraint.map_or(true, |c| {
                        e.as_db_error().and_then(|e| e.constraint()) == Some(c)
                    })
            }
            Self::PoolError(..) | Self::PoolCreationError(..) => false,
        }
    }

    /// Checks if the error is a foreign key violation of the specified
    /// constraint.
    #[must_use]
    pub fn is_foreign_key_violation(&self, constraint: &str) -> bool {
        match self {
            Self::Connection(e) => {
                e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION)
                    && e.as_db_error().and_then(|e| e.constraint())
                        == Some(constraint)
            }
            Self::PoolError(..) | Self::PoolCreationError(..) => false,
        }
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Commit, Select, Transact};

    use crate::{
        domain::Category,
        infra::{database::constraint, Database as _},
    };

    use super::{Config, Postgres};

    /// Creates a new [`Postgres`] client pointing at a closed port.
    fn unreachable_server() -> Postgres {
        let mut conf = Config::new();
        conf.host = Some("127.0.0.1".into());
        conf.port = Some(1);
        conf.user = Some("nobody".into());
        conf.dbname = Some("nowhere".into());
        Postgres::new(&conf).unwrap()
    }

    fn all_categories() -> Select<By<Vec<Category>, ()>> {
        Select(By::new(()))
    }

    #[tokio::test]
    async fn untouched_transaction_needs_no_connection() {
        let db = unreachable_server();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Commit).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_server_fails_both_clients() {
        let db = unreachable_server();

        let err = db.execute(all_categories()).await.unwrap_err();
        assert!(!err.as_ref().is_unique_violation(constraint::USER_EMAIL));

        let tx = db.execute(Transact).await.unwrap();
        let err = tx.execute(all_categories()).await.unwrap_err();
        assert!(
            !err.as_ref().is_foreign_key_violation(constraint::DISH_CATEGORY)
        );
    }
}
