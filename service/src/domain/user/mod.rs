//! [`User`] definitions.

pub mod role;
pub mod session;

use std::{str::FromStr, sync::LazyLock};

use argon2::{
    password_hash::{
        self, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Argon2,
};
#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::{role::Role, session::Session};

/// Person working in the restaurant and having access to the back-office.
///
/// This is the credential record: it's keyed by a case-insensitive [`Email`]
/// and must never be exposed as is, since it holds the [`PasswordHash`].
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Email`] of this [`User`], used as a login.
    pub email: Email,

    /// [`PasswordHash`] of this [`User`].
    pub password_hash: PasswordHash,

    /// First [`Name`] of this [`User`], used as a display name.
    pub first_name: Name,

    /// Last [`Name`] of this [`User`], if any.
    pub last_name: Option<Name>,

    /// [`Phone`] of this [`User`], if any.
    pub phone: Option<Phone>,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    derive_more::FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Name (first or last) of a [`User`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize,
)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    ///
    /// Surrounding whitespace is trimmed.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let name = name.as_ref().trim();
        Self::check(name).then(|| Self(name.to_owned()))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: &str) -> bool {
        (2..=100).contains(&name.chars().count())
            && !name.chars().any(char::is_control)
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Email address of a [`User`].
///
/// Always stored in lowercase, so the comparison is case-insensitive.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Creates a new normalized [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl AsRef<str>) -> Option<Self> {
        let address = address.as_ref().trim().to_lowercase();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: &str) -> bool {
        /// Regular expression checking [`Email`] format: a local part and a
        /// dotted domain without whitespace, single `@`.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^\s@]{1,64}@[^\s@.]+(\.[^\s@.]+)+$")
                .expect("valid regex")
        });

        address.len() <= 254 && REGEX.is_match(address)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Password of a [`User`].
#[derive(Clone, Debug, Display, Eq, From, PartialEq)]
#[from(&str, String)]
pub struct Password(String);

impl Password {
    /// Creates a new [`Password`] if the given `password` is valid.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Checks whether the given `password` is a valid [`Password`].
    fn check(password: &str) -> bool {
        (6..=128).contains(&password.chars().count())
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Salted [Argon2] hash of a [`User`]'s [`Password`] in a [PHC] format.
///
/// [Argon2]: https://en.wikipedia.org/wiki/Argon2
/// [PHC]: https://github.com/P-H-C/phc-string-format
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes the given [`Password`] with a fresh random salt.
    ///
    /// # Errors
    ///
    /// If the system random generator is unavailable, or hashing fails.
    pub fn new(password: &Password) -> Result<Self, HashingError> {
        let mut salt = [0u8; 16];
        getrandom::getrandom(&mut salt).map_err(HashingError::Random)?;
        let salt =
            SaltString::encode_b64(&salt).map_err(HashingError::Hashing)?;
        Argon2::default()
            .hash_password(password.0.as_bytes(), &salt)
            .map(|phc| Self(phc.to_string()))
            .map_err(HashingError::Hashing)
    }

    /// Verifies the given [`Password`] against this [`PasswordHash`].
    ///
    /// Comparison is performed in constant time. Malformed hashes never
    /// match.
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        password_hash::PasswordHash::new(&self.0).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.0.as_bytes(), &parsed)
                .is_ok()
        })
    }

    /// Returns a [`PasswordHash`] belonging to no [`User`].
    ///
    /// Verifying against it costs as much as against a real one, so a login
    /// of a missing [`User`] takes as long as a login with a wrong
    /// [`Password`]. [`None`] only if hashing is unavailable at all.
    #[must_use]
    pub fn decoy() -> Option<&'static Self> {
        /// Lazily hashed [`PasswordHash::decoy()`].
        static DECOY: LazyLock<Option<PasswordHash>> = LazyLock::new(|| {
            Password::new(DECOY_PASSWORD)
                .and_then(|p| PasswordHash::new(&p).ok())
        });

        DECOY.as_ref()
    }
}

/// [`Password`] hashed into the [`PasswordHash::decoy()`].
const DECOY_PASSWORD: &str = "no-user-has-this-password";

/// Error of creating a [`PasswordHash`].
#[derive(Clone, Copy, Debug, Display, derive_more::Error)]
pub enum HashingError {
    /// Failed to obtain random salt.
    #[display("failed to generate salt: {_0}")]
    Random(#[error(not(source))] getrandom::Error),

    /// Failed to compute the hash.
    #[display("failed to hash password: {_0}")]
    Hashing(#[error(not(source))] password_hash::Error),
}

/// Phone number of a [`User`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize,
)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Creates a new [`Phone`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl AsRef<str>) -> Option<Self> {
        let number = number.as_ref().trim();
        Self::check(number).then(|| Self(number.to_owned()))
    }

    /// Checks whether the given `number` is a valid [`Phone`].
    fn check(number: &str) -> bool {
        /// Regular expression checking [`Phone`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\+?[0-9][0-9 .\-]{5,18}[0-9]$").expect("valid regex")
        });

        number.len() <= 20 && REGEX.is_match(number)
    }
}

impl FromStr for Phone {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Phone`")
    }
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;
