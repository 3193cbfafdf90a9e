/**
 * Resolve a quiz makeup into per-period candidate lists.
 *
 * For every period, each configured range is intersected with each category's types
 * and club/set restrictions. Combinations that leave nothing behind are reported,
 * since they are likely to make quotas impossible later on, but they do not stop the
 * run.
 */
use serde::Serialize;
use tracing::warn;

use super::bank::{QuestionBank, QuestionId};
use super::distribution::Distribution;
use super::makeup::QuizMakeup;


/// A (period, category) pair with no eligible questions after filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentWarning {
    pub period: String,
    pub category: String,
    /// Questions of the category's types within the period's ranges.
    pub matching_type: usize,
    /// How many of those passed the club and set restrictions.
    pub eligible: usize,
}


#[derive(Debug, Clone, PartialEq)]
pub struct PeriodContent {
    pub name: String,
    pub fraction: f64,
    /// Candidate rows in bank order, without duplicates.
    pub ids: Vec<QuestionId>,
    /// Eligible candidates per category, aligned with the distribution.
    pub per_category: Vec<usize>,
}


#[derive(Debug, Clone, PartialEq)]
pub struct ContentPools {
    pub periods: Vec<PeriodContent>,
    pub warnings: Vec<ContentWarning>,
}


pub fn resolve_content(
    bank: &QuestionBank, makeup: &QuizMakeup, distribution: &Distribution
) -> ContentPools {
    let mut periods = Vec::with_capacity(makeup.periods.len());
    let mut warnings = Vec::new();

    for period in makeup.periods.iter() {
        let in_range: Vec<(QuestionId, _)> = bank.filter(|q| period.contains(q)).collect();

        let mut selected = vec![false; bank.len()];
        let mut per_category = Vec::with_capacity(distribution.len());
        if distribution.is_quota_free() {
            for (id, _) in in_range.iter() {
                selected[id.0] = true;
            }
        } else {
            for category in distribution.categories.iter() {
                let mut matching_type = 0;
                let mut eligible = 0;
                for (id, q) in in_range.iter() {
                    if category.matches_type(&q.kind) {
                        matching_type += 1;
                        if category.admits(q) {
                            eligible += 1;
                            selected[id.0] = true;
                        }
                    }
                }
                per_category.push(eligible);

                if eligible == 0 {
                    warn!(
                        "\"{}\" has {} {} question(s); {} pass limits. This may result \
                         in having to regenerate quizzes.",
                        period.name, matching_type, category.id, eligible
                    );
                    warnings.push(ContentWarning {
                        period: period.name.clone(),
                        category: category.id.clone(),
                        matching_type,
                        eligible,
                    });
                }
            }
        }

        let ids = selected.iter()
            .enumerate()
            .filter(|(_, &chosen)| chosen)
            .map(|(i, _)| QuestionId(i))
            .collect();
        periods.push(PeriodContent {
            name: period.name.clone(),
            fraction: period.fraction,
            ids,
            per_category,
        });
    }

    ContentPools { periods, warnings }
}
