//! Domain definitions.

pub mod category;
pub mod dish;
pub mod user;

pub use self::{category::Category, dish::Dish, user::User};
