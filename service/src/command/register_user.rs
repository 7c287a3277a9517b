//! [`Command`] for a self-registration of a new [`User`].

use secrecy::SecretBox;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name, Password, Phone, Role};
use crate::{
    domain::{user, User},
    Service,
};

use super::{create_user, Command, CreateUser};

pub use super::create_user::ExecutionError;

/// [`Command`] for a self-registration of a new [`User`].
///
/// Unlike [`CreateUser`], the [`Role`] is never chosen by the caller: the
/// requested one is only logged and the default [`Role`] is granted.
#[derive(Debug)]
pub struct RegisterUser {
    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// First [`Name`] of a new [`User`].
    pub first_name: user::Name,

    /// Last [`Name`] of a new [`User`].
    pub last_name: Option<user::Name>,

    /// [`Phone`] of a new [`User`].
    pub phone: Option<user::Phone>,

    /// Raw [`Role`] requested by the registering client, if any.
    pub requested_role: Option<String>,
}

impl<Db, Docs> Command<RegisterUser> for Service<Db, Docs>
where
    Self: Command<
        CreateUser,
        Ok = User,
        Err = Traced<create_user::ExecutionError>,
    >,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RegisterUser) -> Result<Self::Ok, Self::Err> {
        let RegisterUser {
            email,
            password,
            first_name,
            last_name,
            phone,
            requested_role,
        } = cmd;

        self.execute(CreateUser {
            email,
            password,
            first_name,
            last_name,
            phone,
            role: user::Role::for_registration(requested_role.as_deref()),
        })
        .await
        .map_err(tracerr::wrap!())
    }
}
