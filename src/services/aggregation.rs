use mongodb::bson::oid::ObjectId;
use std::collections::{BTreeMap, HashSet};

use crate::models::{Criterion, Review, ReviewStatus};

/// Every aggregate over an empty set reports this instead of erroring or
/// going null; the UI contract expects a plain number for "no reviews yet".
pub const EMPTY_SET_SCORE: f64 = 0.0;

/// Rounding applied to a review's stored overall score (two decimals).
pub fn round_stored(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounding applied to every displayed aggregate (one decimal).
pub fn round_display(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Two stored scores are the same once both sit on the 0.01 grid.
pub fn stored_scores_match(a: f64, b: f64) -> bool {
    (a * 100.0).round() as i64 == (b * 100.0).round() as i64
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 { None } else { Some(sum / count as f64) }
}

fn approved(reviews: &[Review]) -> impl Iterator<Item = &Review> {
    reviews.iter().filter(|r| r.status == ReviewStatus::Approved)
}

/// Mean of the approved reviews' overall scores, display-rounded.
pub fn average_rating(reviews: &[Review]) -> f64 {
    mean(approved(reviews).map(|r| r.overall_score))
        .map(round_display)
        .unwrap_or(EMPTY_SET_SCORE)
}

/// Per-criterion averages over the approved reviews. Each criterion averages
/// only the reviews that scored it; a review that omitted a criterion does
/// not contribute a zero for it. All 13 keys are always present.
pub fn criteria_averages(reviews: &[Review]) -> BTreeMap<Criterion, f64> {
    Criterion::ALL
        .iter()
        .map(|&criterion| {
            let average = mean(
                approved(reviews)
                    .filter_map(|r| r.score_for(criterion))
                    .map(f64::from),
            )
            .map(round_display)
            .unwrap_or(EMPTY_SET_SCORE);
            (criterion, average)
        })
        .collect()
}

/// Union of the two fetch paths (direct provider reviews and reviews owned
/// by the provider's solutions), deduplicated by review id so a row
/// reachable through both never counts twice.
pub fn merge_review_paths(direct: &[Review], via_solutions: &[Review]) -> Vec<Review> {
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut merged = Vec::with_capacity(direct.len() + via_solutions.len());
    for review in direct.iter().chain(via_solutions.iter()) {
        if let Some(id) = review.id {
            if !seen.insert(id) {
                continue;
            }
        }
        merged.push(review.clone());
    }
    merged
}

/// Provider-level rollup: the displayed rating over both fetch paths.
pub fn rollup_rating(direct: &[Review], via_solutions: &[Review]) -> f64 {
    average_rating(&merge_review_paths(direct, via_solutions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::DateTime;
    use std::collections::HashMap;

    fn review(status: ReviewStatus, overall: f64, criteria: &[(Criterion, i32)]) -> Review {
        Review {
            id: Some(ObjectId::new()),
            provider_id: ObjectId::new(),
            solution_id: None,
            user_id: ObjectId::new(),
            overall_score: overall,
            criteria_scores: criteria
                .iter()
                .map(|(c, v)| (c.as_str().to_string(), *v))
                .collect::<HashMap<_, _>>(),
            title: None,
            comment: "instalaram em duas semanas, equipe atenciosa".to_string(),
            status,
            featured: false,
            moderated_by: None,
            moderated_at: None,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    #[test]
    fn average_rating_over_empty_set_is_zero() {
        assert_eq!(average_rating(&[]), EMPTY_SET_SCORE);
        let pending = review(ReviewStatus::Pending, 5.0, &[]);
        assert_eq!(average_rating(&[pending]), EMPTY_SET_SCORE);
    }

    #[test]
    fn average_rating_skips_non_approved() {
        let reviews = vec![
            review(ReviewStatus::Approved, 5.0, &[]),
            review(ReviewStatus::Approved, 3.0, &[]),
            review(ReviewStatus::Rejected, 1.0, &[]),
            review(ReviewStatus::Hidden, 1.0, &[]),
            review(ReviewStatus::Pending, 1.0, &[]),
        ];
        assert_eq!(average_rating(&reviews), 4.0);

        // Excluding the non-approved rows up front must not change anything.
        let approved_only: Vec<Review> = reviews
            .iter()
            .filter(|r| r.status == ReviewStatus::Approved)
            .cloned()
            .collect();
        assert_eq!(average_rating(&approved_only), average_rating(&reviews));
    }

    #[test]
    fn criteria_averages_report_zero_for_unscored_keys() {
        let reviews = vec![review(
            ReviewStatus::Approved,
            4.0,
            &[(Criterion::TempoAtuacao, 5), (Criterion::QualidadePainel, 3)],
        )];
        let averages = criteria_averages(&reviews);
        assert_eq!(averages.len(), 13);
        assert_eq!(averages[&Criterion::TempoAtuacao], 5.0);
        assert_eq!(averages[&Criterion::QualidadePainel], 3.0);
        for criterion in Criterion::ALL {
            if criterion != Criterion::TempoAtuacao && criterion != Criterion::QualidadePainel {
                assert_eq!(averages[&criterion], EMPTY_SET_SCORE, "{}", criterion.as_str());
            }
        }
    }

    #[test]
    fn omitted_criterion_does_not_drag_the_average() {
        let reviews = vec![
            review(ReviewStatus::Approved, 5.0, &[(Criterion::PosVenda, 5)]),
            review(ReviewStatus::Approved, 4.0, &[(Criterion::Garantia, 4)]),
        ];
        // Only one review scored pos_venda, so its average is that score.
        assert_eq!(criteria_averages(&reviews)[&Criterion::PosVenda], 5.0);
    }

    #[test]
    fn criteria_averages_ignore_non_approved_rows() {
        let reviews = vec![
            review(ReviewStatus::Approved, 4.0, &[(Criterion::Preco, 4)]),
            review(ReviewStatus::Rejected, 1.0, &[(Criterion::Preco, 1)]),
        ];
        assert_eq!(criteria_averages(&reviews)[&Criterion::Preco], 4.0);
    }

    #[test]
    fn display_rounding_is_one_decimal() {
        let reviews = vec![
            review(ReviewStatus::Approved, 5.0, &[]),
            review(ReviewStatus::Approved, 4.0, &[]),
            review(ReviewStatus::Approved, 4.0, &[]),
        ];
        // 13/3 = 4.333... -> 4.3
        assert_eq!(average_rating(&reviews), 4.3);
    }

    #[test]
    fn stored_rounding_is_two_decimals() {
        assert_eq!(round_stored(4.333333), 4.33);
        assert_eq!(round_stored(4.336), 4.34);
        assert!(stored_scores_match(4.33, 4.3301));
        assert!(!stored_scores_match(4.33, 4.34));
    }

    #[test]
    fn both_roundings_recompute_from_stored_criteria() {
        // (5 + 4 + 4) / 3 = 4.333... stored as 4.33, displayed as 4.3.
        let review = review(
            ReviewStatus::Approved,
            4.33,
            &[
                (Criterion::TempoAtuacao, 5),
                (Criterion::QualidadePainel, 4),
                (Criterion::PosVenda, 4),
            ],
        );
        let recomputed = mean(review.criteria_scores.values().map(|&v| f64::from(v))).unwrap();
        assert_eq!(round_stored(recomputed), review.overall_score);
        assert_eq!(round_display(recomputed), 4.3);
        assert_eq!(average_rating(&[review]), 4.3);
    }

    #[test]
    fn rollup_matches_solution_scenario() {
        // Provider with one solution carrying two approved reviews, 5.0 and 3.0.
        let via_solutions = vec![
            review(ReviewStatus::Approved, 5.0, &[]),
            review(ReviewStatus::Approved, 3.0, &[]),
        ];
        assert_eq!(rollup_rating(&[], &via_solutions), 4.0);
    }

    #[test]
    fn rollup_deduplicates_reviews_reachable_through_both_paths() {
        let shared = review(ReviewStatus::Approved, 5.0, &[]);
        let direct_only = review(ReviewStatus::Approved, 1.0, &[]);
        let direct = vec![direct_only, shared.clone()];
        let via_solutions = vec![shared];
        // 5.0 counted once: (1.0 + 5.0) / 2, not (1.0 + 5.0 + 5.0) / 3.
        assert_eq!(rollup_rating(&direct, &via_solutions), 3.0);
        assert_eq!(merge_review_paths(&direct, &via_solutions).len(), 2);
    }

    #[test]
    fn empty_solution_contributes_nothing() {
        let direct = vec![review(ReviewStatus::Approved, 4.0, &[])];
        assert_eq!(rollup_rating(&direct, &[]), 4.0);
        assert_eq!(rollup_rating(&[], &[]), EMPTY_SET_SCORE);
    }
}
