//! [`Command`] for authorizing a [`Session`].

use derive_more::{Display, Error, From};
use jsonwebtoken::{Algorithm, Validation};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::user::{session, Session},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`Session`].
///
/// Verification is stateless: the [`Session`] is trusted if and only if its
/// [`session::Token`] is signed with the configured key and hasn't expired
/// yet. Neither the [`User`] nor its role are looked up again, so a token
/// stays valid until it expires, even after the [`User`] changes or
/// logs out.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl AuthorizeUserSession {
    /// Returns the [`Validation`] rules every [`session::Token`] must pass.
    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

impl<Db, Docs> Command<AuthorizeUserSession> for Service<Db, Docs> {
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        Ok(jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &AuthorizeUserSession::validation(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims)
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`jsonwebtoken`] decoding error, including an expired or forged
    /// [`session::Token`].
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::{
        command::{AuthorizeUserSession, Command as _},
        domain::user::{self, session, Role, Session},
        Service,
    };

    fn token(svc: &Service<(), ()>, session: &Session) -> session::Token {
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            session,
            &svc.config().jwt_encoding_key,
        )
        .unwrap();
        token.parse().unwrap()
    }

    fn session(issued_at: DateTime, ttl: Duration) -> Session {
        Session {
            user_id: user::Id::new(),
            role: Role::ChefCuisine,
            email: user::Email::new("chef@example.com").unwrap(),
            name: user::Name::new("Chef").unwrap(),
            issued_at: issued_at.coerce(),
            expires_at: (issued_at + ttl).coerce(),
        }
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let svc = Service::new(crate::spec::config(), (), ());
        let session = session(DateTime::now(), Duration::from_secs(60));

        let authorized = svc
            .execute(AuthorizeUserSession {
                token: token(&svc, &session),
            })
            .await
            .unwrap();

        assert_eq!(authorized.user_id, session.user_id);
        assert_eq!(authorized.role, Role::ChefCuisine);
        assert_eq!(authorized.email, session.email);
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let svc = Service::new(crate::spec::config(), (), ());
        let session = session(
            DateTime::now() - Duration::from_secs(120),
            Duration::from_secs(60),
        );

        let res = svc
            .execute(AuthorizeUserSession {
                token: token(&svc, &session),
            })
            .await;

        assert!(res.is_err(), "expired token accepted");
    }

    #[tokio::test]
    async fn rejects_foreign_signature() {
        let svc = Service::new(crate::spec::config(), (), ());
        let session = session(DateTime::now(), Duration::from_secs(60));
        let forged = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &session,
            &jsonwebtoken::EncodingKey::from_secret(b"not-the-secret"),
        )
        .unwrap();

        let res = svc
            .execute(AuthorizeUserSession {
                token: forged.parse().unwrap(),
            })
            .await;

        assert!(res.is_err(), "forged token accepted");
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let svc = Service::new(crate::spec::config(), (), ());

        let res = svc
            .execute(AuthorizeUserSession {
                token: "definitely.not.jwt".parse().unwrap(),
            })
            .await;

        assert!(res.is_err());
    }
}
