use mongodb::bson::{oid::ObjectId, DateTime};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Criterion;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Provider {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub cnpj: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Aggregate block served on profile pages, recomputed on every read from
/// the approved reviews reachable from the provider or solution.
#[derive(Debug, Serialize, JsonSchema)]
pub struct RatingSummary {
    pub overall_rating: f64,
    /// Always carries all 13 criterion keys; 0.0 where no review scored one.
    pub criteria_averages: BTreeMap<Criterion, f64>,
    pub review_count: usize,
}
