use async_trait::async_trait;
use bson::{doc, oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{options::ClientOptions, Client, Collection, Database};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::{parse_id, RecipientStore};
use crate::error::{Error, Result};
use crate::schemas::Recipient;

const COLLECTION_NAME: &str = "recipients";
const FALLBACK_DATABASE: &str = "test";

/// Shape of a recipient as persisted in MongoDB. Amounts are stored as
/// doubles, the way documents written by the earlier Node service look.
///
/// `receivedAmount` is exact only up to 2^53. A non-finite stored value
/// (the earlier service could persist `NaN`) reads back as 0 with a warning.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecipientDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bank_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ifsc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_amount: Option<f64>,
    #[serde(default)]
    received_amount: f64,
    #[serde(default)]
    photo: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
    #[serde(rename = "__v", default)]
    version: i32,
}

impl TryFrom<&Recipient> for RecipientDocument {
    type Error = Error;

    fn try_from(recipient: &Recipient) -> Result<Self> {
        Ok(Self {
            id: parse_id(&recipient.id)?,
            name: recipient.name.clone(),
            address: recipient.address.clone(),
            reason: recipient.reason.clone(),
            contact_number: recipient.contact_number.clone(),
            bank_account: recipient.bank_account.clone(),
            ifsc: recipient.ifsc.clone(),
            target_amount: recipient.target_amount,
            received_amount: recipient.received_amount as f64,
            photo: recipient.photo_path.clone(),
            created_at: recipient.created_at,
            updated_at: recipient.updated_at,
            version: 0,
        })
    }
}

impl From<RecipientDocument> for Recipient {
    fn from(document: RecipientDocument) -> Self {
        let received = received_amount(&document);
        Self {
            id: document.id.to_hex(),
            name: document.name,
            address: document.address,
            reason: document.reason,
            contact_number: document.contact_number,
            bank_account: document.bank_account,
            ifsc: document.ifsc,
            target_amount: document.target_amount,
            received_amount: received,
            photo_path: document.photo,
            created_at: document.created_at,
            updated_at: document.updated_at,
        }
    }
}

#[derive(Clone, Debug)]
struct Connection {
    database: Database,
    recipients: Collection<RecipientDocument>,
}

/// MongoDB-backed store.
///
/// Construction never fails: a URI that can't be parsed leaves the store
/// disconnected and every operation reports [`Error::StoreUnavailable`].
#[derive(Clone, Debug)]
pub struct MongoRecipientStore {
    connection: std::result::Result<Connection, String>,
}

impl MongoRecipientStore {
    pub async fn connect(uri: &str) -> Self {
        let connection = match Self::open(uri).await {
            Ok(connection) => Ok(connection),
            Err(err) => {
                error!("MongoDB connection error: {err}");
                Err(err.to_string())
            }
        };
        Self { connection }
    }

    async fn open(uri: &str) -> Result<Connection> {
        let options = ClientOptions::parse(uri).await?;
        let database_name = database_name(&options);
        let client = Client::with_options(options)?;
        let database = client.database(&database_name);
        debug!(database = %database_name, "using MongoDB database");
        Ok(Connection {
            recipients: database.collection(COLLECTION_NAME),
            database,
        })
    }

    /// Round-trips a `ping` to the server. The driver connects lazily, so
    /// this is the first point where an unreachable server shows up.
    pub async fn ping(&self) -> Result<()> {
        self.connection()?
            .database
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .map_err(|reason| Error::StoreUnavailable(reason.clone()))
    }

    fn recipients(&self) -> Result<&Collection<RecipientDocument>> {
        Ok(&self.connection()?.recipients)
    }
}

fn received_amount(document: &RecipientDocument) -> i64 {
    let stored = document.received_amount;
    if !stored.is_finite() {
        warn!(id = %document.id, "non-finite receivedAmount {stored}, reading it as 0");
        return 0;
    }
    stored as i64
}

fn database_name(options: &ClientOptions) -> String {
    options
        .default_database
        .clone()
        .unwrap_or_else(|| FALLBACK_DATABASE.to_string())
}

#[async_trait]
impl RecipientStore for MongoRecipientStore {
    async fn list(&self) -> Result<Vec<Recipient>> {
        let documents: Vec<RecipientDocument> = self
            .recipients()?
            .find(None, None)
            .await?
            .try_collect()
            .await?;
        Ok(documents.into_iter().map(Recipient::from).collect())
    }

    async fn find(&self, id: &str) -> Result<Option<Recipient>> {
        let oid = parse_id(id)?;
        let document = self
            .recipients()?
            .find_one(doc! { "_id": oid }, None)
            .await?;
        Ok(document.map(Recipient::from))
    }

    async fn insert(&self, recipient: &Recipient) -> Result<()> {
        let document = RecipientDocument::try_from(recipient)?;
        self.recipients()?.insert_one(&document, None).await?;
        Ok(())
    }

    async fn save(&self, recipient: &Recipient) -> Result<()> {
        let document = RecipientDocument::try_from(recipient)?;
        let result = self
            .recipients()?
            .replace_one(doc! { "_id": document.id }, &document, None)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::now;
    use crate::store::new_id;

    fn recipient() -> Recipient {
        let at = now();
        Recipient {
            id: new_id(),
            name: Some("Ravi".to_string()),
            address: Some("12 Lake Road".to_string()),
            reason: None,
            contact_number: None,
            bank_account: Some("000123".to_string()),
            ifsc: None,
            target_amount: Some(5000.0),
            received_amount: 250,
            photo_path: Some("uploads/1700000000000-ravi.png".to_string()),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_document_round_trip_through_bson() {
        let original = recipient();
        let document = RecipientDocument::try_from(&original).unwrap();
        let bson = bson::to_document(&document).unwrap();

        assert!(bson.get_object_id("_id").is_ok());
        assert!(bson.get_datetime("createdAt").is_ok());
        assert_eq!(bson.get_f64("receivedAmount").unwrap(), 250.0);
        assert_eq!(bson.get_str("photo").unwrap(), "uploads/1700000000000-ravi.png");
        assert_eq!(bson.get_i32("__v").unwrap(), 0);
        assert!(!bson.contains_key("reason"));

        let decoded: RecipientDocument = bson::from_document(bson).unwrap();
        assert_eq!(Recipient::from(decoded), original);
    }

    #[test]
    fn test_integer_amounts_from_older_documents_are_read() {
        let at = bson::DateTime::now();
        let stored = doc! {
            "_id": ObjectId::new(),
            "name": "Meera",
            "targetAmount": 1000,
            "receivedAmount": 40_i64,
            "photo": null,
            "createdAt": at,
            "updatedAt": at,
        };
        let decoded: RecipientDocument = bson::from_document(stored).unwrap();
        let recipient = Recipient::from(decoded);
        assert_eq!(recipient.target_amount, Some(1000.0));
        assert_eq!(recipient.received_amount, 40);
        assert_eq!(recipient.photo_path, None);
    }

    #[test]
    fn test_non_finite_received_amount_reads_as_zero() {
        let at = bson::DateTime::now();
        let stored = doc! {
            "_id": ObjectId::new(),
            "receivedAmount": f64::NAN,
            "createdAt": at,
            "updatedAt": at,
        };
        let decoded: RecipientDocument = bson::from_document(stored).unwrap();
        assert_eq!(Recipient::from(decoded).received_amount, 0);
    }

    #[test]
    fn test_malformed_id_cannot_become_a_document() {
        let mut bad = recipient();
        bad.id = "bogus".to_string();
        assert!(matches!(
            RecipientDocument::try_from(&bad),
            Err(Error::InvalidId { .. })
        ));
    }

    #[tokio::test]
    async fn test_database_name_comes_from_uri() {
        let options = ClientOptions::parse("mongodb://localhost:27017/ekzaria")
            .await
            .unwrap();
        assert_eq!(database_name(&options), "ekzaria");

        let options = ClientOptions::parse("mongodb://localhost:27017")
            .await
            .unwrap();
        assert_eq!(database_name(&options), FALLBACK_DATABASE);
    }

    #[tokio::test]
    async fn test_unparseable_uri_leaves_store_unavailable() {
        let store = MongoRecipientStore::connect("definitely not a uri").await;
        assert!(matches!(store.list().await, Err(Error::StoreUnavailable(_))));
        assert!(matches!(
            store.find(&new_id()).await,
            Err(Error::StoreUnavailable(_))
        ));
        assert!(matches!(store.ping().await, Err(Error::StoreUnavailable(_))));
    }
}
