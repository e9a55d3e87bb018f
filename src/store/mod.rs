//! Persistence for recipient records.
//!
//! The service talks to a [`RecipientStore`]; production runs against
//! MongoDB and the tests (or `STORE=memory`) run against an in-process
//! vector.

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::error::{Error, Result};
use crate::schemas::{Recipient, RecipientId};

mod memory;
mod mongo;

pub use memory::MemoryRecipientStore;
pub use mongo::MongoRecipientStore;

#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Every recipient, in the store's natural order.
    async fn list(&self) -> Result<Vec<Recipient>>;

    /// Looks a recipient up by id. A malformed id is an error, an unknown
    /// one is `Ok(None)`.
    async fn find(&self, id: &str) -> Result<Option<Recipient>>;

    async fn insert(&self, recipient: &Recipient) -> Result<()>;

    /// Replaces the stored record carrying the same id.
    async fn save(&self, recipient: &Recipient) -> Result<()>;
}

/// A fresh identifier in the store's format.
pub fn new_id() -> RecipientId {
    ObjectId::new().to_hex()
}

pub(crate) fn parse_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|source| Error::InvalidId {
        id: id.to_string(),
        source,
    })
}
