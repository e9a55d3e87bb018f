use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Hex form of the store-assigned object id.
pub type RecipientId = String;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    #[serde(rename = "_id")]
    pub id: RecipientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifsc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<f64>,
    #[serde(default)]
    pub received_amount: i64,
    #[serde(rename = "photo", default)]
    pub photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Text fields accepted by the create operation, as sent in the form.
///
/// Everything stays a raw string here; coercion happens when the
/// recipient is built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecipientForm {
    pub name: Option<String>,
    pub address: Option<String>,
    pub reason: Option<String>,
    pub contact_number: Option<String>,
    pub bank_account: Option<String>,
    pub ifsc: Option<String>,
    pub target_amount: Option<String>,
}

impl RecipientForm {
    /// Stores a form field by its wire name. Returns false for fields the
    /// form doesn't know about.
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "address" => &mut self.address,
            "reason" => &mut self.reason,
            "contactNumber" => &mut self.contact_number,
            "bankAccount" => &mut self.bank_account,
            "ifsc" => &mut self.ifsc,
            "targetAmount" => &mut self.target_amount,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

/// Current time at the precision the store keeps (milliseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
