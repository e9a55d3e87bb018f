use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{parse_id, RecipientStore};
use crate::error::{Error, Result};
use crate::schemas::Recipient;

/// Keeps recipients in insertion order, applying the same id rules as the
/// MongoDB store.
#[derive(Debug, Default)]
pub struct MemoryRecipientStore {
    recipients: RwLock<Vec<Recipient>>,
}

impl MemoryRecipientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipientStore for MemoryRecipientStore {
    async fn list(&self) -> Result<Vec<Recipient>> {
        Ok(self.recipients.read().await.clone())
    }

    async fn find(&self, id: &str) -> Result<Option<Recipient>> {
        parse_id(id)?;
        let recipients = self.recipients.read().await;
        Ok(recipients.iter().find(|r| r.id == id).cloned())
    }

    async fn insert(&self, recipient: &Recipient) -> Result<()> {
        parse_id(&recipient.id)?;
        self.recipients.write().await.push(recipient.clone());
        Ok(())
    }

    async fn save(&self, recipient: &Recipient) -> Result<()> {
        let mut recipients = self.recipients.write().await;
        match recipients.iter_mut().find(|r| r.id == recipient.id) {
            Some(stored) => {
                *stored = recipient.clone();
                Ok(())
            }
            None => Err(Error::NotFound),
        }
    }
}
