//! [`Database`]-related implementations.

#[cfg(any(test, feature = "testing"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Names of the [`Database`] constraints the domain logic relies on.
pub mod constraint {
    /// Case-insensitive uniqueness of a [`User`]'s email.
    ///
    /// [`User`]: crate::domain::User
    pub const USER_EMAIL: &str = "users_email_key";

    /// Reference from a [`Dish`] to its [`Category`].
    ///
    /// [`Category`]: crate::domain::Category
    /// [`Dish`]: crate::domain::Dish
    pub const DISH_CATEGORY: &str = "dishes_category_id_fkey";
}

/// Operation upon the authoritative relational database.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),

    #[cfg(any(test, feature = "testing"))]
    /// [`memory::Memory`] failure injected by a test.
    #[display("in-memory database is unavailable")]
    Unavailable,
}

impl Error {
    /// Checks whether this [`Error`] is a violation of the specified unique
    /// constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: &str) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(Some(constraint)),
            #[cfg(any(test, feature = "testing"))]
            Self::Unavailable => {
                _ = constraint;
                false
            }
        }
    }

    /// Checks whether this [`Error`] is a violation of the specified foreign
    /// key constraint.
    #[must_use]
    pub fn is_foreign_key_violation(&self, constraint: &str) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_foreign_key_violation(constraint),
            #[cfg(any(test, feature = "testing"))]
            Self::Unavailable => {
                _ = constraint;
                false
            }
        }
    }
}
