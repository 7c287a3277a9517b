//! [`Command`] for updating a [`User`] by an administrator.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name, Password, Phone, Role};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`User`] by an administrator.
///
/// Only the provided fields are changed.
#[derive(Debug, Default)]
pub struct UpdateUser {
    /// ID of the [`User`] to update.
    pub id: user::Id,

    /// New [`Email`] of the [`User`].
    pub email: Option<user::Email>,

    /// New [`Password`] of the [`User`].
    pub password: Option<SecretBox<user::Password>>,

    /// New first [`Name`] of the [`User`].
    pub first_name: Option<user::Name>,

    /// New last [`Name`] of the [`User`], [`Some`]`(`[`None`]`)` removes it.
    pub last_name: Option<Option<user::Name>>,

    /// New [`Phone`] of the [`User`], [`Some`]`(`[`None`]`)` removes it.
    pub phone: Option<Option<user::Phone>>,

    /// New [`Role`] of the [`User`].
    pub role: Option<user::Role>,
}

impl<Db, Docs> Command<UpdateUser> for Service<Db, Docs>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'e> Database<
            Select<By<Option<User>, &'e user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = bool, Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUser {
            id,
            email,
            password,
            first_name,
            last_name,
            phone,
            role,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(id))
            .map_err(tracerr::wrap!())?;

        if let Some(email) = email {
            if email != user.email {
                let occupant = tx
                    .execute(Select(By::new(&email)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                if occupant.is_some_and(|u| u.id != id) {
                    return Err(tracerr::new!(E::EmailOccupied(email)));
                }
                user.email = email;
            }
        }
        if let Some(password) = password {
            user.password_hash =
                user::PasswordHash::new(password.expose_secret())
                    .map_err(tracerr::from_and_wrap!(=> E))?;
        }
        if let Some(first_name) = first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            user.last_name = last_name;
        }
        if let Some(phone) = phone {
            user.phone = phone;
        }
        if let Some(role) = role {
            user.role = role;
        }

        let updated = tx.execute(Update(user.clone())).await;
        if let Err(e) = &updated {
            let constraint = database::constraint::USER_EMAIL;
            if e.as_ref().is_unique_violation(constraint) {
                return Err(tracerr::new!(E::EmailOccupied(user.email)));
            }
        }
        if !updated.map_err(tracerr::map_from_and_wrap!(=> E))? {
            return Err(tracerr::new!(E::UserNotExists(id)));
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`UpdateUser`] [`Command`] execution.
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

    /// [`Email`] is already occupied by another [`User`].
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::{
            update_user::ExecutionError, Command as _, CreateUser, UpdateUser,
        },
        domain::user::{self, Role, User},
    };

    async fn create(svc: &crate::spec::InMemory, email: &str) -> User {
        svc.execute(CreateUser {
            email: user::Email::new(email).unwrap(),
            password: SecretBox::new(Box::new(
                user::Password::new("secret42").unwrap(),
            )),
            first_name: user::Name::new("Julie").unwrap(),
            last_name: None,
            phone: user::Phone::new("0612345678"),
            role: Role::Employe,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn updates_provided_fields_only() {
        let (svc, _, _) = crate::spec::in_memory();
        let user = create(&svc, "julie@example.com").await;

        let updated = svc
            .execute(UpdateUser {
                id: user.id,
                role: Some(Role::ResponsableSalle),
                phone: Some(None),
                ..UpdateUser::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.role, Role::ResponsableSalle);
        assert_eq!(updated.phone, None);
        assert_eq!(updated.email, user.email);
        assert_eq!(updated.first_name, user.first_name);
        assert_eq!(updated.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn rejects_occupied_email() {
        let (svc, _, _) = crate::spec::in_memory();
        _ = create(&svc, "julie@example.com").await;
        let other = create(&svc, "paul@example.com").await;

        let err = svc
            .execute(UpdateUser {
                id: other.id,
                email: user::Email::new("JULIE@example.com"),
                ..UpdateUser::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
    }

    #[tokio::test]
    async fn fails_for_unknown_user() {
        let (svc, _, _) = crate::spec::in_memory();

        let err = svc
            .execute(UpdateUser {
                id: user::Id::new(),
                ..UpdateUser::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }
}
