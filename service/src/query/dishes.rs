//! [`Query`] collection related to the multiple [`Dish`]es.

use common::operations::By;

use crate::domain::{dish, Dish};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a list of [`Dish`]es matching the [`dish::Filter`].
pub type List = DatabaseQuery<By<Vec<Dish>, dish::Filter>>;
