//! In-memory [`DocumentStore`] used by tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use common::operations::{Delete, Update};
use serde_json::{Map, Value};
use tracerr::Traced;

use super::{Document, DocumentStore, Error, Key};

/// In-memory [`DocumentStore`].
#[derive(Clone, Debug, Default)]
pub(crate) struct Memory {
    /// Stored documents.
    docs: Arc<Mutex<HashMap<Key, Map<String, Value>>>>,

    /// Whether every operation should fail with [`Error::Unavailable`].
    unavailable: Arc<AtomicBool>,
}

impl Memory {
    /// Makes every following operation fail (or succeed again).
    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the fields of the stored document under the provided [`Key`].
    pub(crate) fn get(&self, key: &Key) -> Option<Map<String, Value>> {
        self.docs.lock().unwrap().get(key).cloned()
    }

    /// Indicates whether no documents are stored.
    pub(crate) fn is_empty(&self) -> bool {
        self.docs.lock().unwrap().is_empty()
    }

    /// Fails if this [`Memory`] store is made unavailable.
    fn check(&self) -> Result<(), Traced<Error>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(tracerr::new!(Error::Unavailable));
        }
        Ok(())
    }
}

impl DocumentStore<Update<Document>> for Memory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(doc): Update<Document>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        self.docs
            .lock()
            .unwrap()
            .entry(doc.key)
            .or_default()
            .extend(doc.fields);
        Ok(())
    }
}

impl DocumentStore<Delete<Key>> for Memory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Delete(key): Delete<Key>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        _ = self.docs.lock().unwrap().remove(&key);
        Ok(())
    }
}
