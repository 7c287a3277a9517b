//! [`Query`] collection related to a single [`Category`].

use common::operations::By;

use crate::domain::{category, Category};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Category`] by its [`category::Id`].
pub type ById = DatabaseQuery<By<Option<Category>, category::Id>>;
