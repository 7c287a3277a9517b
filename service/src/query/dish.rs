//! [`Query`] collection related to a single [`Dish`].

use common::operations::By;

use crate::domain::{dish, Dish};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Dish`] by its [`dish::Id`].
pub type ById = DatabaseQuery<By<Option<Dish>, dish::Id>>;
