//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;

use std::time::Duration;

use derive_more::Debug;
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use infra::Database;
use infra::{documents, DocumentStore};

pub use self::{command::Command, query::Query};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] encoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_encoding_key: jsonwebtoken::EncodingKey,

    /// [JWT] decoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// Fixed lifetime of a [`domain::user::Session`].
    pub session_ttl: Duration,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Docs = infra::Documents> {
    /// Configuration of this [`Service`].
    config: Config,

    /// Authoritative [`Database`] of this [`Service`].
    database: Db,

    /// Secondary [`DocumentStore`] of this [`Service`].
    documents: Docs,
}

impl<Db, Docs> Service<Db, Docs> {
    /// Creates a new [`Service`] with the provided parameters.
    #[must_use]
    pub const fn new(config: Config, database: Db, documents: Docs) -> Self {
        Self {
            config,
            database,
            documents,
        }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub const fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`DocumentStore`] of this [`Service`].
    #[must_use]
    pub const fn documents(&self) -> &Docs {
        &self.documents
    }

    /// Mirrors the provided operation into the [`DocumentStore`].
    ///
    /// This is the second phase of a dual write, so it must only be called
    /// once the authoritative [`Database`] write has been committed. It never
    /// fails: an error is logged at `WARN` and swallowed, leaving the mirror
    /// stale until the next write of the same record. The primary write is
    /// never rolled back.
    pub(crate) async fn mirror<Op>(&self, op: Op, key: &documents::Key)
    where
        Docs: DocumentStore<Op, Err = Traced<documents::Error>>,
    {
        if let Err(e) = self.documents.execute(op).await {
            log::warn!(%key, "failed to mirror document: {e}");
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use crate::{
        infra::{database, documents},
        Config, Service,
    };

    /// [`Service`] backed by in-memory storages.
    pub(crate) type InMemory =
        Service<database::memory::Memory, documents::memory::Memory>;

    /// Returns a [`Config`] with a fixed secret and 24 hours sessions.
    pub(crate) fn config() -> Config {
        let secret = b"test-secret-of-enough-length";
        Config {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(secret),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
            session_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Creates a new [`InMemory`] [`Service`] along with handles to its
    /// storages.
    pub(crate) fn in_memory() -> (
        InMemory,
        database::memory::Memory,
        documents::memory::Memory,
    ) {
        let db = database::memory::Memory::seeded();
        let docs = documents::memory::Memory::default();
        (Service::new(config(), db.clone(), docs.clone()), db, docs)
    }
}
