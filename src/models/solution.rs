use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A product/service line offered by a provider (e.g. residential rooftop
/// kits). Reviews may attach here instead of directly to the provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Solution {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub provider_id: ObjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
