//! [`Command`] for creating a new [`User`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
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

/// [`Command`] for creating a new [`User`].
#[derive(Debug)]
pub struct CreateUser {
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

    /// [`Role`] of a new [`User`].
    pub role: user::Role,
}

impl<Db, Docs> Command<CreateUser> for Service<Db, Docs>
where
    Db: for<'e> Database<
            Select<By<Option<User>, &'e user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            email,
            password,
            first_name,
            last_name,
            phone,
            role,
        } = cmd;

        let existing = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let user = User {
            id: user::Id::new(),
            password_hash: user::PasswordHash::new(password.expose_secret())
                .map_err(tracerr::from_and_wrap!(=> E))?,
            email,
            first_name,
            last_name,
            phone,
            role,
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        // The unique index catches creations racing with the check above.
        let inserted = tx.execute(Insert(user.clone())).await;
        if let Err(e) = &inserted {
            let constraint = database::constraint::USER_EMAIL;
            if e.as_ref().is_unique_violation(constraint) {
                return Err(tracerr::new!(E::EmailOccupied(user.email)));
            }
        }
        inserted
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Password`] hashing failed.
    #[display("Failed to hash password: {_0}")]
    Hashing(user::HashingError),

    /// [`Email`] is already occupied by another [`User`].
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::{create_user::ExecutionError, Command as _, CreateUser},
        domain::user::{self, Role},
    };

    fn cmd(email: &str) -> CreateUser {
        CreateUser {
            email: user::Email::new(email).unwrap(),
            password: SecretBox::new(Box::new(
                user::Password::new("secret42").unwrap(),
            )),
            first_name: user::Name::new("Marie").unwrap(),
            last_name: None,
            phone: None,
            role: Role::MaitreHotel,
        }
    }

    #[tokio::test]
    async fn creates_user_with_hashed_password() {
        let (svc, db, _) = crate::spec::in_memory();

        let user = svc.execute(cmd("marie@example.com")).await.unwrap();

        assert_eq!(user.role, Role::MaitreHotel);
        assert!(user
            .password_hash
            .verify(&user::Password::new("secret42").unwrap()));
        assert_eq!(db.state().users.len(), 1);
    }

    #[tokio::test]
    async fn rejects_occupied_email_in_any_case() {
        let (svc, db, _) = crate::spec::in_memory();
        _ = svc.execute(cmd("marie@example.com")).await.unwrap();

        let err = svc.execute(cmd("MARIE@Example.com")).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
        assert_eq!(db.state().users.len(), 1);
    }
}
