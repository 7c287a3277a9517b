//! [`Dish`] definitions.

use std::str::FromStr;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::category;

/// Dish on the restaurant menu.
#[derive(Clone, Debug)]
pub struct Dish {
    /// ID of this [`Dish`].
    pub id: Id,

    /// [`Name`] of this [`Dish`].
    pub name: Name,

    /// [`Description`] of this [`Dish`], if any.
    pub description: Option<Description>,

    /// [`Price`] of this [`Dish`].
    pub price: Price,

    /// [`ImageUrl`] of this [`Dish`] picture, if any.
    pub image_url: Option<ImageUrl>,

    /// ID of the [`Category`] this [`Dish`] belongs to.
    ///
    /// [`Category`]: crate::domain::Category
    pub category_id: category::Id,

    /// [`DateTime`] when this [`Dish`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Dish`] was last modified.
    pub updated_at: ModificationDateTime,
}

/// ID of a [`Dish`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    derive_more::FromStr,
    Hash,
    Into,
    PartialEq,
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

/// Name of a [`Dish`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let name = name.as_ref().trim();
        (!name.is_empty() && name.chars().count() <= 128)
            .then(|| Self(name.to_owned()))
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Description of a [`Dish`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    ///
    /// Blank text is not a [`Description`].
    #[must_use]
    pub fn new(text: impl AsRef<str>) -> Option<Self> {
        let text = text.as_ref().trim();
        (!text.is_empty() && text.chars().count() <= 2048)
            .then(|| Self(text.to_owned()))
    }
}

/// Price of a [`Dish`] in euros.
#[derive(Clone, Copy, Debug, Display, Eq, Into, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Price(Decimal);

impl Price {
    /// Creates a new [`Price`] if the given `amount` is positive, has at most
    /// eight integral digits and no more than two fractional ones (cents).
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        let amount = amount.normalize();
        let limit = Decimal::new(100_000_000, 0);
        (amount > Decimal::ZERO && amount < limit && amount.scale() <= 2)
            .then_some(Self(amount))
    }
}

impl FromStr for Price {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `Price`")
    }
}

/// URL (or uploaded file name) of a [`Dish`] picture.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct ImageUrl(String);

impl ImageUrl {
    /// Creates a new [`ImageUrl`] if the given `url` is valid.
    #[must_use]
    pub fn new(url: impl AsRef<str>) -> Option<Self> {
        let url = url.as_ref().trim();
        (!url.is_empty()
            && url.len() <= 512
            && !url.chars().any(char::is_whitespace))
        .then(|| Self(url.to_owned()))
    }
}

/// Filter of a [`Dish`]es list.
#[derive(Clone, Copy, Debug, Default)]
pub struct Filter {
    /// Only [`Dish`]es of this [`Category`] are listed, if specified.
    ///
    /// [`Category`]: crate::domain::Category
    pub category_id: Option<category::Id>,
}

/// [`DateTime`] when a [`Dish`] was created.
pub type CreationDateTime = DateTimeOf<(Dish, unit::Creation)>;

/// [`DateTime`] when a [`Dish`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Dish, unit::Modification)>;

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use super::{ImageUrl, Price};

    #[test]
    fn parses_price() {
        assert_eq!("12.50".parse::<Price>().unwrap().to_string(), "12.5");
        assert_eq!("9".parse::<Price>().unwrap().to_string(), "9");

        assert!("0".parse::<Price>().is_err());
        assert!("-3.00".parse::<Price>().is_err());
        assert!("1.999".parse::<Price>().is_err());
        assert!("cheap".parse::<Price>().is_err());
    }

    #[test]
    fn price_fits_storage() {
        assert!(Price::new(Decimal::new(9_999_999_999, 2)).is_some());
        assert!("99999999.99".parse::<Price>().is_ok());

        assert!(Price::new(Decimal::new(100_000_000, 0)).is_none());
        assert!(Price::new(Decimal::new(1_000_000_000, 0)).is_none());
        assert!("100000000.00".parse::<Price>().is_err());
    }

    #[test]
    fn validates_image_url() {
        assert!(ImageUrl::new("1712-tartare.jpg").is_some());
        assert!(ImageUrl::new("https://cdn.example.com/a.png").is_some());
        assert!(ImageUrl::new("  ").is_none());
        assert!(ImageUrl::new("my photo.jpg").is_none());
    }
}
