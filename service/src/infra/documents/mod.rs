//! [`DocumentStore`]-related implementations.
//!
//! The document store is a secondary, best-effort copy of some records for
//! clients reading them directly. It's never authoritative: the relational
//! [`Database`] always is.

#[cfg(test)]
pub(crate) mod memory;

use std::time::Duration;

use common::operations::{Delete, Update};
use derive_more::{Display, Error as StdError, From};
use rust_decimal::{prelude::ToPrimitive as _, Decimal};
use serde_json::{json, Map, Value};
use tracerr::Traced;
use url::Url;

#[cfg(doc)]
use crate::infra::Database;
use crate::domain::Dish;

/// Operation upon the secondary document store.
pub use common::Handler as DocumentStore;

/// Key of a [`Document`] in a [`DocumentStore`].
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
#[display("{collection}/{id}")]
pub struct Key {
    /// Name of the collection the [`Document`] belongs to.
    pub collection: &'static str,

    /// ID of the [`Document`] in its collection.
    pub id: String,
}

/// Document stored in a [`DocumentStore`].
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// [`Key`] of this [`Document`].
    pub key: Key,

    /// Fields of this [`Document`].
    ///
    /// Writing a [`Document`] merges these fields into the stored ones.
    pub fields: Map<String, Value>,
}

impl Document {
    /// Collection mirroring [`Dish`]es.
    pub const DISHES: &'static str = "plats";

    /// Returns the [`Key`] of the [`Document`] mirroring the provided
    /// [`Dish`].
    #[must_use]
    pub fn dish_key(id: impl ToString) -> Key {
        Key {
            collection: Self::DISHES,
            id: id.to_string(),
        }
    }
}

impl From<&Dish> for Document {
    fn from(dish: &Dish) -> Self {
        let fields = [
            ("nom", json!(dish.name.as_ref())),
            (
                "description",
                json!(dish.description.as_ref().map(AsRef::<str>::as_ref)),
            ),
            ("prix", json!(Decimal::from(dish.price).to_f64())),
            (
                "image_url",
                json!(dish.image_url.as_ref().map(AsRef::<str>::as_ref)),
            ),
            ("id_categorie", json!(i32::from(dish.category_id))),
            ("updatedAt", json!(dish.updated_at.to_rfc3339())),
        ];
        Self {
            key: Self::dish_key(dish.id),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect(),
        }
    }
}

/// [`Documents`] configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Base [`Url`] of the document store HTTP API.
    ///
    /// [`None`] disables mirroring completely.
    pub base_url: Option<Url>,

    /// Timeout of a single request to the document store.
    pub timeout: Duration,
}

/// HTTP [`DocumentStore`] client.
///
/// Documents are addressed as `{base_url}/{collection}/{id}`: `PUT` merges
/// the JSON fields into the stored document (creating it if absent), and
/// `DELETE` removes it.
#[derive(Clone, Debug)]
pub struct Documents {
    /// HTTP client to perform requests with.
    client: reqwest::Client,

    /// Base [`Url`] of the store, if enabled.
    base_url: Option<Url>,
}

impl Documents {
    /// Creates a new [`Documents`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If the configured base [`Url`] cannot be a base, or the HTTP client
    /// fails to initialize.
    pub fn new(conf: Config) -> Result<Self, Traced<Error>> {
        if conf.base_url.as_ref().is_some_and(Url::cannot_be_a_base) {
            return Err(tracerr::new!(Error::InvalidBaseUrl));
        }
        let mut client = reqwest::Client::builder();
        if !conf.timeout.is_zero() {
            client = client.timeout(conf.timeout);
        }
        Ok(Self {
            client: client
                .build()
                .map_err(tracerr::from_and_wrap!(=> Error))?,
            base_url: conf.base_url,
        })
    }

    /// Indicates whether this [`Documents`] store is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    /// Returns the [`Url`] of the [`Document`] under the provided [`Key`], if
    /// this store is enabled.
    fn url(&self, key: &Key) -> Option<Url> {
        let mut url = self.base_url.clone()?;
        _ = url
            .path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(key.collection)
            .push(&key.id);
        Some(url)
    }
}

impl DocumentStore<Update<Document>> for Documents {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(doc): Update<Document>,
    ) -> Result<Self::Ok, Self::Err> {
        let Some(url) = self.url(&doc.key) else {
            tracing::debug!(key = %doc.key, "document store disabled, skipped");
            return Ok(());
        };
        self.client
            .put(url)
            .json(&doc.fields)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map(drop)
    }
}

impl DocumentStore<Delete<Key>> for Documents {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Delete(key): Delete<Key>,
    ) -> Result<Self::Ok, Self::Err> {
        let Some(url) = self.url(&key) else {
            tracing::debug!(%key, "document store disabled, skipped");
            return Ok(());
        };
        self.client
            .delete(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map(drop)
    }
}

/// [`DocumentStore`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Configured base [`Url`] cannot have path segments appended.
    #[display("document store base URL cannot be a base")]
    InvalidBaseUrl,

    /// HTTP request failed or was answered with an error status.
    #[display("document store request failed: {_0}")]
    Request(reqwest::Error),

    #[cfg(test)]
    /// [`memory::Memory`] failure injected by a test.
    #[display("in-memory document store is unavailable")]
    Unavailable,
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;
    use rust_decimal::Decimal;

    use crate::domain::{category, dish, Dish};

    use super::{Config, Document, Documents};

    fn dish() -> Dish {
        let now = DateTime::now();
        Dish {
            id: dish::Id::new(),
            name: dish::Name::new("Tartare de boeuf").unwrap(),
            description: None,
            price: dish::Price::new(Decimal::new(1850, 2)).unwrap(),
            image_url: dish::ImageUrl::new("tartare.jpg"),
            category_id: category::Id::from(2),
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    #[test]
    fn maps_dish_fields() {
        let dish = dish();

        let doc = Document::from(&dish);

        assert_eq!(doc.key.collection, "plats");
        assert_eq!(doc.key.id, dish.id.to_string());
        assert_eq!(doc.fields["nom"], "Tartare de boeuf");
        assert_eq!(doc.fields["prix"], 18.5);
        assert_eq!(doc.fields["id_categorie"], 2);
        assert!(doc.fields["description"].is_null());
        assert_eq!(doc.fields["image_url"], "tartare.jpg");
    }

    #[test]
    fn builds_document_url() {
        let docs = Documents::new(Config {
            base_url: Some("http://docs.local/v1/".parse().unwrap()),
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        let url = docs.url(&Document::dish_key("42")).unwrap();

        assert_eq!(url.as_str(), "http://docs.local/v1/plats/42");
    }

    #[test]
    fn disabled_without_base_url() {
        let docs = Documents::new(Config::default()).unwrap();

        assert!(!docs.is_enabled());
        assert!(docs.url(&Document::dish_key("42")).is_none());
    }

    #[test]
    fn rejects_non_base_url() {
        let conf = Config {
            base_url: Some("mailto:docs@example.com".parse().unwrap()),
            timeout: Duration::ZERO,
        };

        assert!(Documents::new(conf).is_err());
    }
}
