//! Infrastructure layer.

pub mod database;
pub mod documents;

pub use self::{
    database::Database,
    documents::{DocumentStore, Documents},
};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
