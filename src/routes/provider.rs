use log::error;
use mongodb::bson::{doc, oid::ObjectId, Document};
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::models::{Provider, RatingSummary, Review, ReviewStatus, Solution};
use crate::services::aggregation;
use crate::utils::{ApiError, ApiResponse};

// Aggregation reads never degrade to a zero score on datastore trouble;
// callers get a 503 and decide what to show.
async fn fetch_approved_reviews(db: &DbConn, filter: Document) -> Result<Vec<Review>, ApiError> {
    let mut cursor = db
        .collection::<Review>("reviews")
        .find(filter, None)
        .await
        .map_err(|e| {
            error!("aggregation read failed: {}", e);
            ApiError::aggregation_unavailable()
        })?;

    let mut reviews = Vec::new();
    while cursor.advance().await.map_err(|e| {
        error!("aggregation cursor failed: {}", e);
        ApiError::aggregation_unavailable()
    })? {
        let review = cursor.deserialize_current().map_err(|e| {
            error!("aggregation deserialization failed: {}", e);
            ApiError::aggregation_unavailable()
        })?;
        reviews.push(review);
    }

    Ok(reviews)
}

/// Profile-page aggregate for a provider. Recomputed from the reviews
/// collection on every call: the union of direct reviews and reviews on the
/// provider's solutions, deduplicated by id, approved only.
#[openapi(tag = "Provider")]
#[get("/providers/<provider_id>/rating-summary")]
pub async fn get_provider_rating_summary(
    db: &State<DbConn>,
    provider_id: String,
) -> Result<Json<ApiResponse<RatingSummary>>, ApiError> {
    let provider_oid = ObjectId::parse_str(&provider_id)
        .map_err(|_| ApiError::bad_request("Invalid provider ID"))?;

    db.collection::<Provider>("providers")
        .find_one(doc! { "_id": provider_oid }, None)
        .await
        .map_err(|e| {
            error!("provider lookup failed: {}", e);
            ApiError::aggregation_unavailable()
        })?
        .ok_or_else(|| ApiError::not_found("Provider not found"))?;

    let mut cursor = db
        .collection::<Solution>("solutions")
        .find(doc! { "provider_id": provider_oid }, None)
        .await
        .map_err(|e| {
            error!("solution lookup failed: {}", e);
            ApiError::aggregation_unavailable()
        })?;

    let mut solution_ids = Vec::new();
    while cursor.advance().await.map_err(|e| {
        error!("solution cursor failed: {}", e);
        ApiError::aggregation_unavailable()
    })? {
        let solution = cursor.deserialize_current().map_err(|e| {
            error!("solution deserialization failed: {}", e);
            ApiError::aggregation_unavailable()
        })?;
        if let Some(id) = solution.id {
            solution_ids.push(id);
        }
    }

    let direct = fetch_approved_reviews(
        db.inner(),
        doc! {
            "provider_id": provider_oid,
            "status": ReviewStatus::Approved.as_str(),
        },
    )
    .await?;

    let via_solutions = if solution_ids.is_empty() {
        Vec::new()
    } else {
        fetch_approved_reviews(
            db.inner(),
            doc! {
                "solution_id": { "$in": solution_ids },
                "status": ReviewStatus::Approved.as_str(),
            },
        )
        .await?
    };

    let merged = aggregation::merge_review_paths(&direct, &via_solutions);

    Ok(Json(ApiResponse::success(RatingSummary {
        overall_rating: aggregation::average_rating(&merged),
        criteria_averages: aggregation::criteria_averages(&merged),
        review_count: merged.len(),
    })))
}

/// Same aggregate shape scoped to a single solution's approved reviews.
#[openapi(tag = "Provider")]
#[get("/solutions/<solution_id>/rating-summary")]
pub async fn get_solution_rating_summary(
    db: &State<DbConn>,
    solution_id: String,
) -> Result<Json<ApiResponse<RatingSummary>>, ApiError> {
    let solution_oid = ObjectId::parse_str(&solution_id)
        .map_err(|_| ApiError::bad_request("Invalid solution ID"))?;

    db.collection::<Solution>("solutions")
        .find_one(doc! { "_id": solution_oid }, None)
        .await
        .map_err(|e| {
            error!("solution lookup failed: {}", e);
            ApiError::aggregation_unavailable()
        })?
        .ok_or_else(|| ApiError::not_found("Solution not found"))?;

    let reviews = fetch_approved_reviews(
        db.inner(),
        doc! {
            "solution_id": solution_oid,
            "status": ReviewStatus::Approved.as_str(),
        },
    )
    .await?;

    Ok(Json(ApiResponse::success(RatingSummary {
        overall_rating: aggregation::average_rating(&reviews),
        criteria_averages: aggregation::criteria_averages(&reviews),
        review_count: reviews.len(),
    })))
}
