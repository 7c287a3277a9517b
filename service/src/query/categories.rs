//! [`Query`] collection related to the multiple [`Category`]s.

use common::operations::By;

use crate::domain::Category;
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries all the [`Category`]s ordered by their IDs.
pub type All = DatabaseQuery<By<Vec<Category>, ()>>;
