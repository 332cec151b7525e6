use mongodb::bson::{oid::ObjectId, DateTime};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The 13 quality criteria a review may score independently, keyed on the
/// wire and in storage by their snake_case names (`tempo_atuacao`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    TempoAtuacao,
    ConfiabilidadeJuridica,
    QualidadePainel,
    QualidadeInversor,
    QualidadeInstalacao,
    PosVenda,
    Atendimento,
    Preco,
    PrazoEntrega,
    Garantia,
    Transparencia,
    EquipeTecnica,
    Monitoramento,
}

impl Criterion {
    pub const ALL: [Criterion; 13] = [
        Criterion::TempoAtuacao,
        Criterion::ConfiabilidadeJuridica,
        Criterion::QualidadePainel,
        Criterion::QualidadeInversor,
        Criterion::QualidadeInstalacao,
        Criterion::PosVenda,
        Criterion::Atendimento,
        Criterion::Preco,
        Criterion::PrazoEntrega,
        Criterion::Garantia,
        Criterion::Transparencia,
        Criterion::EquipeTecnica,
        Criterion::Monitoramento,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::TempoAtuacao => "tempo_atuacao",
            Criterion::ConfiabilidadeJuridica => "confiabilidade_juridica",
            Criterion::QualidadePainel => "qualidade_painel",
            Criterion::QualidadeInversor => "qualidade_inversor",
            Criterion::QualidadeInstalacao => "qualidade_instalacao",
            Criterion::PosVenda => "pos_venda",
            Criterion::Atendimento => "atendimento",
            Criterion::Preco => "preco",
            Criterion::PrazoEntrega => "prazo_entrega",
            Criterion::Garantia => "garantia",
            Criterion::Transparencia => "transparencia",
            Criterion::EquipeTecnica => "equipe_tecnica",
            Criterion::Monitoramento => "monitoramento",
        }
    }

    pub fn parse(key: &str) -> Option<Criterion> {
        Criterion::ALL.iter().find(|c| c.as_str() == key).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Hidden,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Hidden => "hidden",
        }
    }

    pub fn parse(value: &str) -> Option<ReviewStatus> {
        match value {
            "pending" => Some(ReviewStatus::Pending),
            "approved" => Some(ReviewStatus::Approved),
            "rejected" => Some(ReviewStatus::Rejected),
            "hidden" => Some(ReviewStatus::Hidden),
            _ => None,
        }
    }
}

/// Moderator verb applied to a review via `PATCH /reviews/<id>/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
    Hide,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Owning provider; denormalized here even when the review is attached
    /// to one of the provider's solutions.
    pub provider_id: ObjectId,
    /// Set when the review's direct parent is a solution of the provider.
    pub solution_id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub overall_score: f64, // 1.0-5.0, two decimals
    pub criteria_scores: HashMap<String, i32>,
    pub title: Option<String>,
    pub comment: String,
    pub status: ReviewStatus,
    pub featured: bool,
    pub moderated_by: Option<ObjectId>,
    pub moderated_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Review {
    pub fn score_for(&self, criterion: Criterion) -> Option<i32> {
        self.criteria_scores.get(criterion.as_str()).copied()
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateReviewDto {
    pub provider_id: String,
    pub user_id: String,
    pub solution_id: Option<String>,
    pub overall_score: Option<f64>,
    pub title: Option<String>,
    pub comment: String,
    pub criteria_scores: Option<HashMap<String, i32>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateReviewStatusDto {
    pub action: ModerationAction,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateReviewFeaturedDto {
    pub featured: bool,
}

#[derive(Debug, FromForm, Deserialize, JsonSchema)]
pub struct ReviewListQuery {
    pub provider_id: Option<String>,
    pub solution_id: Option<String>,
    /// One of the four statuses, or "all". Anything but "approved" needs a
    /// moderator token.
    pub status: Option<String>,
    pub min_rating: Option<f64>,
    /// "created_at" (default) or "rating", both descending.
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub per: Option<i64>,
}
