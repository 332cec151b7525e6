use rocket_okapi::okapi::schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{CreateReviewDto, Criterion};
use crate::services::aggregation::{mean, round_stored, stored_scores_match};

pub const MAX_COMMENT_LENGTH: usize = 2000;
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MIN_CRITERION_SCORE: i32 = 1;
pub const MAX_CRITERION_SCORE: i32 = 5;

/// One rejected field, surfaced verbatim in the 422 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A submission that passed every check; `overall_score` is already the
/// stored (two-decimal) value, derived from the criteria when present.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedReview {
    pub overall_score: f64,
    pub criteria_scores: BTreeMap<Criterion, i32>,
    pub title: Option<String>,
    pub comment: String,
}

/// Checks a raw key/score pair list against the closed criterion set.
/// Unknown keys, duplicated keys and out-of-range scores each produce their
/// own field error.
pub fn parse_criteria<S: AsRef<str>>(
    pairs: &[(S, i32)],
) -> Result<BTreeMap<Criterion, i32>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut criteria = BTreeMap::new();

    for (key, score) in pairs {
        let key = key.as_ref();
        let criterion = match Criterion::parse(key) {
            Some(c) => c,
            None => {
                errors.push(ValidationError::new(
                    format!("criteria_scores.{}", key),
                    "unknown criterion",
                ));
                continue;
            }
        };
        if !(MIN_CRITERION_SCORE..=MAX_CRITERION_SCORE).contains(score) {
            errors.push(ValidationError::new(
                format!("criteria_scores.{}", key),
                format!("score must be between {} and {}", MIN_CRITERION_SCORE, MAX_CRITERION_SCORE),
            ));
            continue;
        }
        if criteria.insert(criterion, *score).is_some() {
            errors.push(ValidationError::new(
                format!("criteria_scores.{}", key),
                "criterion scored more than once",
            ));
        }
    }

    if errors.is_empty() { Ok(criteria) } else { Err(errors) }
}

/// Resolves the stored overall score. With criteria present the server
/// derives it and a client-supplied value must agree after rounding; with
/// no criteria the client value is required and range-checked.
pub fn resolve_overall_score(
    client_score: Option<f64>,
    criteria: &BTreeMap<Criterion, i32>,
) -> Result<f64, ValidationError> {
    if criteria.is_empty() {
        return match client_score {
            Some(score) if (1.0..=5.0).contains(&score) => Ok(round_stored(score)),
            Some(_) => Err(ValidationError::new(
                "overall_score",
                "must be between 1.0 and 5.0",
            )),
            None => Err(ValidationError::new(
                "overall_score",
                "required when criteria_scores is missing",
            )),
        };
    }

    let derived = round_stored(
        mean(criteria.values().map(|&v| f64::from(v))).unwrap_or_default(),
    );
    match client_score {
        Some(score) if !stored_scores_match(round_stored(score), derived) => {
            Err(ValidationError::new(
                "overall_score",
                "does not match the average of criteria_scores",
            ))
        }
        _ => Ok(derived),
    }
}

/// Pure submission validation: no datastore access, no side effects. All
/// field errors are collected rather than failing on the first.
pub fn validate(
    dto: &CreateReviewDto,
    min_comment_length: usize,
) -> Result<ValidatedReview, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let comment = dto.comment.trim();
    let comment_length = comment.chars().count();
    if comment_length < min_comment_length {
        errors.push(ValidationError::new(
            "comment",
            format!("must be at least {} characters", min_comment_length),
        ));
    } else if comment_length > MAX_COMMENT_LENGTH {
        errors.push(ValidationError::new(
            "comment",
            format!("must be at most {} characters", MAX_COMMENT_LENGTH),
        ));
    }

    let title = dto
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    if let Some(ref t) = title {
        if t.chars().count() > MAX_TITLE_LENGTH {
            errors.push(ValidationError::new(
                "title",
                format!("must be at most {} characters", MAX_TITLE_LENGTH),
            ));
        }
    }

    let pairs: Vec<(&str, i32)> = dto
        .criteria_scores
        .iter()
        .flat_map(|scores| scores.iter().map(|(k, v)| (k.as_str(), *v)))
        .collect();
    let criteria = match parse_criteria(&pairs) {
        Ok(criteria) => Some(criteria),
        Err(mut criteria_errors) => {
            errors.append(&mut criteria_errors);
            None
        }
    };

    let overall_score = criteria.as_ref().and_then(|criteria| {
        match resolve_overall_score(dto.overall_score, criteria) {
            Ok(score) => Some(score),
            Err(error) => {
                errors.push(error);
                None
            }
        }
    });

    match (criteria, overall_score) {
        (Some(criteria_scores), Some(overall_score)) if errors.is_empty() => Ok(ValidatedReview {
            overall_score,
            criteria_scores,
            title,
            comment: comment.to_string(),
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MIN_COMMENT: usize = 30;

    fn dto(comment: &str, overall: Option<f64>, criteria: &[(&str, i32)]) -> CreateReviewDto {
        CreateReviewDto {
            provider_id: "65b2f0a1c3d4e5f6a7b8c9d0".to_string(),
            user_id: "65b2f0a1c3d4e5f6a7b8c9d1".to_string(),
            solution_id: None,
            overall_score: overall,
            title: None,
            comment: comment.to_string(),
            criteria_scores: if criteria.is_empty() {
                None
            } else {
                Some(
                    criteria
                        .iter()
                        .map(|(k, v)| (k.to_string(), *v))
                        .collect::<HashMap<_, _>>(),
                )
            },
        }
    }

    fn long_comment() -> String {
        "a instalação foi rápida e o suporte respondeu tudo".to_string()
    }

    #[test]
    fn accepts_a_complete_submission() {
        let dto = dto(&long_comment(), None, &[("tempo_atuacao", 5), ("qualidade_painel", 4)]);
        let validated = validate(&dto, MIN_COMMENT).unwrap();
        assert_eq!(validated.overall_score, 4.5);
        assert_eq!(validated.criteria_scores.len(), 2);
        assert_eq!(validated.criteria_scores[&Criterion::TempoAtuacao], 5);
    }

    #[test]
    fn derives_overall_score_with_two_decimal_rounding() {
        // (5 + 4 + 4) / 3 = 4.333... -> 4.33
        let dto = dto(
            &long_comment(),
            None,
            &[("tempo_atuacao", 5), ("qualidade_painel", 4), ("pos_venda", 4)],
        );
        assert_eq!(validate(&dto, MIN_COMMENT).unwrap().overall_score, 4.33);
    }

    #[test]
    fn rejects_client_score_that_disagrees_with_criteria() {
        let dto = dto(&long_comment(), Some(5.0), &[("tempo_atuacao", 5), ("qualidade_painel", 4)]);
        let errors = validate(&dto, MIN_COMMENT).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "overall_score");
    }

    #[test]
    fn accepts_client_score_that_matches_derivation() {
        let dto = dto(&long_comment(), Some(4.5), &[("tempo_atuacao", 5), ("qualidade_painel", 4)]);
        assert_eq!(validate(&dto, MIN_COMMENT).unwrap().overall_score, 4.5);
    }

    #[test]
    fn requires_overall_score_without_criteria() {
        let dto = dto(&long_comment(), None, &[]);
        let errors = validate(&dto, MIN_COMMENT).unwrap_err();
        assert_eq!(errors[0].field, "overall_score");

        let dto = self::dto(&long_comment(), Some(3.8), &[]);
        assert_eq!(validate(&dto, MIN_COMMENT).unwrap().overall_score, 3.8);
    }

    #[test]
    fn rejects_overall_score_out_of_range() {
        for score in [0.9, 5.1, -1.0] {
            let dto = dto(&long_comment(), Some(score), &[]);
            let errors = validate(&dto, MIN_COMMENT).unwrap_err();
            assert_eq!(errors[0].field, "overall_score");
        }
    }

    #[test]
    fn rejects_short_and_oversized_comments() {
        let errors = validate(&dto("curto demais", Some(4.0), &[]), MIN_COMMENT).unwrap_err();
        assert_eq!(errors[0].field, "comment");

        let oversized = "x".repeat(MAX_COMMENT_LENGTH + 1);
        let errors = validate(&dto(&oversized, Some(4.0), &[]), MIN_COMMENT).unwrap_err();
        assert_eq!(errors[0].field, "comment");
    }

    #[test]
    fn comment_minimum_is_configurable() {
        let dto = dto("instalacao dentro do prazo", Some(4.0), &[]);
        assert!(validate(&dto, 80).is_err());
        assert!(validate(&dto, 10).is_ok());
    }

    #[test]
    fn rejects_unknown_criterion_keys() {
        let dto = dto(&long_comment(), None, &[("tempo_atuacao", 5), ("painel_solar", 4)]);
        let errors = validate(&dto, MIN_COMMENT).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "criteria_scores.painel_solar");
    }

    #[test]
    fn rejects_criterion_scores_out_of_range() {
        let dto = dto(&long_comment(), None, &[("tempo_atuacao", 0)]);
        assert!(validate(&dto, MIN_COMMENT).is_err());
        let dto = self::dto(&long_comment(), None, &[("tempo_atuacao", 6)]);
        assert!(validate(&dto, MIN_COMMENT).is_err());
    }

    #[test]
    fn rejects_duplicated_criterion_pairs() {
        // The JSON object form cannot carry duplicates, but other entry
        // surfaces hand us pair lists.
        let errors = parse_criteria(&[("tempo_atuacao", 5), ("tempo_atuacao", 3)]).unwrap_err();
        assert_eq!(errors[0].field, "criteria_scores.tempo_atuacao");
        assert_eq!(errors[0].message, "criterion scored more than once");
    }

    #[test]
    fn rejects_oversized_title() {
        let mut dto = dto(&long_comment(), Some(4.0), &[]);
        dto.title = Some("t".repeat(MAX_TITLE_LENGTH + 1));
        let errors = validate(&dto, MIN_COMMENT).unwrap_err();
        assert_eq!(errors[0].field, "title");
    }

    #[test]
    fn collects_every_field_error() {
        let dto = dto("curto", Some(9.0), &[("painel_solar", 2)]);
        let errors = validate(&dto, MIN_COMMENT).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"comment"));
        assert!(fields.contains(&"criteria_scores.painel_solar"));
    }
}
