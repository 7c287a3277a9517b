//! [`Command`] definition.

pub mod authorize_user_session;
pub mod create_category;
pub mod create_dish;
pub mod create_user;
pub mod create_user_session;
pub mod delete_category;
pub mod delete_dish;
pub mod delete_user;
pub mod register_user;
pub mod update_category;
pub mod update_dish;
pub mod update_user;
pub mod update_user_password;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession,
    create_category::CreateCategory, create_dish::CreateDish,
    create_user::CreateUser, create_user_session::CreateUserSession,
    delete_category::DeleteCategory, delete_dish::DeleteDish,
    delete_user::DeleteUser, register_user::RegisterUser,
    update_category::UpdateCategory, update_dish::UpdateDish,
    update_user::UpdateUser, update_user_password::UpdateUserPassword,
};
