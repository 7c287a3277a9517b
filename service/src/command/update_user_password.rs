//! [`Command`] for updating a [`user::Password`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Password, Role};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`user::Password`] by its owner.
///
/// The [`Role`] and any other data of the [`User`] stay untouched.
#[derive(Debug)]
pub struct UpdateUserPassword {
    /// ID of the [`User`] which [`Password`] should be updated.
    pub user_id: user::Id,

    /// New [`Password`] of the [`User`].
    pub new_password: SecretBox<user::Password>,

    /// Old [`Password`] of the [`User`].
    pub old_password: SecretBox<user::Password>,
}

impl<Db, Docs> Command<UpdateUserPassword> for Service<Db, Docs>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = bool, Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateUserPassword,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserPassword {
            user_id,
            new_password,
            old_password,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        if !user.password_hash.verify(old_password.expose_secret()) {
            return Err(tracerr::new!(E::WrongPassword));
        }

        user.password_hash =
            user::PasswordHash::new(new_password.expose_secret())
                .map_err(tracerr::from_and_wrap!(=> E))?;
        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`UpdateUserPassword`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Password`] hashing failed.
    #[display("Failed to hash password: {_0}")]
    Hashing(user::HashingError),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// Wrong old [`Password`] provided.
    #[display("Wrong old password")]
    WrongPassword,
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::{
            update_user_password::ExecutionError, Command as _, CreateUser,
            UpdateUserPassword,
        },
        domain::user::{self, Role},
    };

    fn secret(password: &str) -> SecretBox<user::Password> {
        SecretBox::new(Box::new(user::Password::new(password).unwrap()))
    }

    #[tokio::test]
    async fn changes_password_keeping_role() {
        let (svc, _, _) = crate::spec::in_memory();
        let user = svc
            .execute(CreateUser {
                email: user::Email::new("avis@example.com").unwrap(),
                password: secret("first-one"),
                first_name: user::Name::new("Nina").unwrap(),
                last_name: None,
                phone: None,
                role: Role::ResponsableAvis,
            })
            .await
            .unwrap();

        let updated = svc
            .execute(UpdateUserPassword {
                user_id: user.id,
                new_password: secret("second-one"),
                old_password: secret("first-one"),
            })
            .await
            .unwrap();

        assert_eq!(updated.role, Role::ResponsableAvis);
        assert!(updated
            .password_hash
            .verify(&user::Password::new("second-one").unwrap()));
        assert!(!updated
            .password_hash
            .verify(&user::Password::new("first-one").unwrap()));
    }

    #[tokio::test]
    async fn rejects_wrong_old_password() {
        let (svc, _, _) = crate::spec::in_memory();
        let user = svc
            .execute(CreateUser {
                email: user::Email::new("avis@example.com").unwrap(),
                password: secret("first-one"),
                first_name: user::Name::new("Nina").unwrap(),
                last_name: None,
                phone: None,
                role: Role::ResponsableAvis,
            })
            .await
            .unwrap();

        let err = svc
            .execute(UpdateUserPassword {
                user_id: user.id,
                new_password: secret("second-one"),
                old_password: secret("not-this-one"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::WrongPassword));
    }
}
