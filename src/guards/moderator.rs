use rocket::request::{self, FromRequest, Request, Outcome};
use rocket::http::Status;
use mongodb::bson::oid::ObjectId;

// === OpenAPI (compatible with rocket_okapi 0.8.0 / 0.8.1) ===
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

use crate::services::jwt::MODERATOR_ROLE;

/// JWT guard for moderation routes; only tokens carrying the moderator
/// role pass.
pub struct ModeratorGuard {
    pub moderator_id: ObjectId,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ModeratorGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = req.headers().get_one("Authorization");

        match token {
            Some(token) => {
                let token = token.trim_start_matches("Bearer ");

                match crate::services::JwtService::verify_token(token) {
                    Ok(claims) if claims.role == MODERATOR_ROLE => {
                        match ObjectId::parse_str(&claims.sub) {
                            Ok(moderator_id) => Outcome::Success(ModeratorGuard { moderator_id }),
                            Err(_) => Outcome::Error((Status::Unauthorized, ())),
                        }
                    }
                    Ok(_) => Outcome::Error((Status::Forbidden, ())),
                    Err(_) => Outcome::Error((Status::Unauthorized, ())),
                }
            }
            None => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}

/// === OpenAPI Integration (Fallback for older versions) ===
/// Keeps OpenAPI generation working even without new traits.
impl<'a> OpenApiFromRequest<'a> for ModeratorGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        // The guard doesn't contribute any special header/parameter for docs
        Ok(RequestHeaderInput::None)
    }
}
