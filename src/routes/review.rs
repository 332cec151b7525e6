use log::info;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::FindOptions;
use rocket::State;
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::config::Config;
use crate::db::DbConn;
use crate::guards::ModeratorGuard;
use crate::models::{
    CreateReviewDto, Provider, Review, ReviewListQuery, ReviewStatus, Solution,
    UpdateReviewFeaturedDto, UpdateReviewStatusDto,
};
use crate::services::{moderation, validator};
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Review")]
#[post("/reviews", data = "<dto>")]
pub async fn create_review(
    db: &State<DbConn>,
    dto: Json<CreateReviewDto>,
) -> Result<Created<Json<ApiResponse<serde_json::Value>>>, ApiError> {
    let provider_id = ObjectId::parse_str(&dto.provider_id)
        .map_err(|_| ApiError::bad_request("Invalid provider ID"))?;
    let user_id = ObjectId::parse_str(&dto.user_id)
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    // Check if provider exists
    db.collection::<Provider>("providers")
        .find_one(doc! { "_id": provider_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Provider not found"))?;

    // A review attaches to either the provider itself or one of its solutions
    let solution_id = match &dto.solution_id {
        Some(raw) => {
            let solution_id = ObjectId::parse_str(raw)
                .map_err(|_| ApiError::bad_request("Invalid solution ID"))?;

            let solution = db
                .collection::<Solution>("solutions")
                .find_one(doc! { "_id": solution_id }, None)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
                .ok_or_else(|| ApiError::not_found("Solution not found"))?;

            if solution.provider_id != provider_id {
                return Err(ApiError::not_found("Solution not found for this provider"));
            }

            Some(solution_id)
        }
        None => None,
    };

    let validated = validator::validate(&dto, Config::min_comment_length())
        .map_err(ApiError::unprocessable)?;

    let review = Review {
        id: None,
        provider_id,
        solution_id,
        user_id,
        overall_score: validated.overall_score,
        criteria_scores: validated
            .criteria_scores
            .iter()
            .map(|(criterion, score)| (criterion.as_str().to_string(), *score))
            .collect(),
        title: validated.title,
        comment: validated.comment,
        status: ReviewStatus::Pending,
        featured: false,
        moderated_by: None,
        moderated_at: None,
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    let result = db
        .collection::<Review>("reviews")
        .insert_one(&review, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create review: {}", e)))?;

    let review_id = result
        .inserted_id
        .as_object_id()
        .map(|id| id.to_hex())
        .unwrap_or_default();

    info!("review {} submitted for provider {}", review_id, provider_id.to_hex());

    Ok(
        Created::new(format!("/api/v1/reviews/{}", review_id)).body(Json(
            ApiResponse::success_with_message(
                "Review submitted for moderation".to_string(),
                serde_json::json!({
                    "review_id": review_id,
                    "review": review,
                }),
            ),
        )),
    )
}

#[openapi(tag = "Review")]
#[get("/reviews?<query..>")]
pub async fn list_reviews(
    db: &State<DbConn>,
    moderator: Option<ModeratorGuard>,
    query: ReviewListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per = query.per.unwrap_or(20).clamp(1, 100);
    let skip = (page - 1) * per;

    let mut filter = doc! {};

    if let Some(ref raw) = query.provider_id {
        let provider_id = ObjectId::parse_str(raw)
            .map_err(|_| ApiError::bad_request("Invalid provider ID"))?;
        filter.insert("provider_id", provider_id);
    }

    if let Some(ref raw) = query.solution_id {
        let solution_id = ObjectId::parse_str(raw)
            .map_err(|_| ApiError::bad_request("Invalid solution ID"))?;
        filter.insert("solution_id", solution_id);
    }

    // Public listings only ever see approved reviews
    match query.status.as_deref() {
        None => {
            filter.insert("status", ReviewStatus::Approved.as_str());
        }
        Some("all") => {
            if moderator.is_none() {
                return Err(ApiError::unauthorized(
                    "Moderator token required to list non-approved reviews",
                ));
            }
        }
        Some(raw) => {
            let status = ReviewStatus::parse(raw)
                .ok_or_else(|| ApiError::bad_request("Invalid status filter"))?;
            if status != ReviewStatus::Approved && moderator.is_none() {
                return Err(ApiError::unauthorized(
                    "Moderator token required to list non-approved reviews",
                ));
            }
            filter.insert("status", status.as_str());
        }
    }

    if let Some(min_rating) = query.min_rating {
        filter.insert("overall_score", doc! { "$gte": min_rating });
    }

    // Ties broken by _id so pagination stays deterministic
    let sort = match query.sort.as_deref() {
        None | Some("created_at") => doc! { "created_at": -1, "_id": 1 },
        Some("rating") => doc! { "overall_score": -1, "_id": 1 },
        Some(_) => return Err(ApiError::bad_request("Invalid sort key")),
    };

    let find_options = FindOptions::builder()
        .skip(skip as u64)
        .limit(per)
        .sort(sort)
        .build();

    let mut cursor = db
        .collection::<Review>("reviews")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut reviews = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let review = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        reviews.push(review);
    }

    let total = db
        .collection::<Review>("reviews")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "reviews": reviews,
        "meta": {
            "page": page,
            "per": per,
            "total": total,
            "pages": (total as f64 / per as f64).ceil() as i64,
        }
    }))))
}

#[openapi(tag = "Moderation")]
#[patch("/reviews/<review_id>/status", data = "<dto>")]
pub async fn update_review_status(
    db: &State<DbConn>,
    moderator: ModeratorGuard,
    review_id: String,
    dto: Json<UpdateReviewStatusDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&review_id)
        .map_err(|_| ApiError::bad_request("Invalid review ID"))?;

    let mut review = db
        .collection::<Review>("reviews")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    let next = moderation::apply(review.status, dto.action)
        .map_err(|e| ApiError::conflict(e.to_string()))?;

    // Aggregates are recomputed on read, so a status change is a single
    // document update with nothing else to refresh.
    let now = DateTime::now();
    db.collection::<Review>("reviews")
        .update_one(
            doc! { "_id": object_id },
            doc! {
                "$set": {
                    "status": next.as_str(),
                    "moderated_by": moderator.moderator_id,
                    "moderated_at": now,
                    "updated_at": now,
                }
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update review: {}", e)))?;

    info!(
        "review {} moved to {} by moderator {}",
        review_id,
        next.as_str(),
        moderator.moderator_id.to_hex()
    );

    review.status = next;
    review.moderated_by = Some(moderator.moderator_id);
    review.moderated_at = Some(now);
    review.updated_at = now;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "review": review,
    }))))
}

#[openapi(tag = "Moderation")]
#[patch("/reviews/<review_id>/featured", data = "<dto>")]
pub async fn update_review_featured(
    db: &State<DbConn>,
    moderator: ModeratorGuard,
    review_id: String,
    dto: Json<UpdateReviewFeaturedDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&review_id)
        .map_err(|_| ApiError::bad_request("Invalid review ID"))?;

    let mut review = db
        .collection::<Review>("reviews")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    let now = DateTime::now();
    db.collection::<Review>("reviews")
        .update_one(
            doc! { "_id": object_id },
            doc! {
                "$set": {
                    "featured": dto.featured,
                    "updated_at": now,
                }
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update review: {}", e)))?;

    info!(
        "review {} featured={} by moderator {}",
        review_id,
        dto.featured,
        moderator.moderator_id.to_hex()
    );

    review.featured = dto.featured;
    review.updated_at = now;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "review": review,
    }))))
}
