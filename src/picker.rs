/**
 * The question picker: draws one question at a time from a period pool.
 *
 * A pick has two stages. First a category is drawn, weighted by how far each category
 * is from its quota (its minimum while minimums are unmet, its maximum afterwards).
 * Then a row of that category is drawn uniformly from the pool, avoiding rows already
 * used in the run and verse locations already in the quiz. When that leaves nothing,
 * the picker falls back first to used rows and then to repeated verse locations, and
 * marks the pick as a repeat.
 */
use std::collections::HashSet;

use rand::distributions::Distribution as RandDistribution;
use rand::distributions::WeightedIndex;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::bank::{QuestionBank, QuestionId};
use super::counter::{count_by_category, CategoryCounts};
use super::distribution::Distribution;
use super::pool::RunState;


/// One question placed into a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick {
    pub id: QuestionId,
    /// Index of the period pool the row was drawn from.
    pub period: usize,
    /// The category drawn for this pick, or `None` when quotas are disabled.
    pub category: Option<usize>,
    pub repeat: bool,
}


#[derive(Debug, Clone, Copy)]
pub struct PickRequest<'r> {
    /// Draw from this category instead of choosing one by weight.
    pub category: Option<usize>,
    /// Rows already picked into the block being filled.
    pub quiz: &'r [Pick],
    /// Rows from earlier blocks of the same quiz. Their verse locations are avoided
    /// but they do not count towards the quotas.
    pub prior: &'r [Pick],
    /// Counts carried in from earlier blocks, added to the counts of `quiz`.
    pub counts: Option<&'r CategoryCounts>,
    /// Weight every category by its maximum even while minimums are unmet.
    pub loosen: bool,
}


impl<'r> PickRequest<'r> {
    pub fn new(quiz: &'r [Pick]) -> Self {
        PickRequest { category: None, quiz, prior: &[], counts: None, loosen: false }
    }
}


/// How far the picker had to relax its exclusions to find a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Fresh,
    /// Rows used earlier in the run are allowed.
    Used,
    /// Verse locations already in the quiz are allowed.
    AnyVerse,
}


pub struct QuestionPicker<'a> {
    bank: &'a QuestionBank,
    distribution: &'a Distribution,
}


impl<'a> QuestionPicker<'a> {
    pub fn new(bank: &'a QuestionBank, distribution: &'a Distribution) -> Self {
        QuestionPicker { bank, distribution }
    }

    /// Pick one question from the pool of `period`, mark it used, and return it.
    ///
    /// Return `None`, leaving `state` untouched, if the chosen category has no row left
    /// that is not already in the quiz. Callers are expected to retry.
    pub fn pick<R: Rng>(
        &self, state: &mut RunState, period: usize, request: &PickRequest, rng: &mut R
    ) -> Option<Pick> {
        let category = if self.distribution.is_quota_free() {
            None
        } else {
            match request.category {
                Some(category) => Some(category),
                None => Some(self.choose_category(state, period, request, rng)),
            }
        };

        let (candidates, tier) = self.candidates(state, period, category, request);
        let id = match candidates.choose(rng) {
            Some(id) => *id,
            None => {
                debug!(
                    "no {} question survived this pick",
                    category.map_or("", |c| self.distribution.get(c).id.as_str())
                );
                return None;
            },
        };

        let repeat = tier > Tier::Fresh || state.is_repeat(id);
        if tier > Tier::Fresh {
            debug!("{} is a repeat ({:?})", self.bank.get(id).bcv, tier);
        }
        state.mark_used(id);
        Some(Pick { id, period, category, repeat })
    }

    /// Category counts for `request`: rows of the current block plus carried counts.
    pub fn counts(&self, request: &PickRequest) -> CategoryCounts {
        let mut counts = count_by_category(
            request.quiz.iter().map(|p| self.bank.get(p.id)), self.distribution
        );
        if let Some(carried) = request.counts {
            counts += carried;
        }
        counts
    }

    /// Category weights for the next pick, aligned with the distribution.
    pub fn weights(&self, request: &PickRequest) -> Vec<usize> {
        let counts = self.counts(request);
        let categories = &self.distribution.categories;
        let minimums_met = request.loosen
            || categories.iter().enumerate().all(|(i, c)| counts.get(i) >= c.min);

        categories.iter()
            .enumerate()
            .map(|(i, c)| {
                let target = if minimums_met { c.max } else { c.min };
                target.saturating_sub(counts.get(i))
            })
            .collect()
    }

    fn choose_category<R: Rng>(
        &self, state: &RunState, period: usize, request: &PickRequest, rng: &mut R
    ) -> usize {
        let mut weights = self.weights(request);
        let mut open: Vec<usize> = (0..weights.len()).collect();
        if request.loosen {
            // Loosened draws skip categories with no candidates left.
            open.retain(|&c| !self.candidates(state, period, Some(c), request).0.is_empty());
            for (c, weight) in weights.iter_mut().enumerate() {
                if !open.contains(&c) {
                    *weight = 0;
                }
            }
            if open.is_empty() {
                open = (0..weights.len()).collect();
            }
        }
        debug!("category weights: {:?}", weights);

        let index = match WeightedIndex::new(&weights) {
            Ok(weighted) => weighted.sample(rng),
            Err(_) => open[rng.gen_range(0..open.len())],
        };
        debug!("picked category {}", self.distribution.get(index).id);
        index
    }

    fn candidates(
        &self, state: &RunState, period: usize, category: Option<usize>, request: &PickRequest
    ) -> (Vec<QuestionId>, Tier) {
        let taken: HashSet<QuestionId> = request.quiz.iter()
            .chain(request.prior.iter())
            .map(|p| p.id)
            .collect();
        let verses: HashSet<&str> = request.quiz.iter()
            .chain(request.prior.iter())
            .map(|p| self.bank.get(p.id).bcv.as_str())
            .collect();

        let of_category: Vec<(QuestionId, bool)> = state.period(period).entries.iter()
            .filter(|e| !taken.contains(&e.id))
            .filter(|e| match category {
                Some(c) => self.distribution.get(c).admits(self.bank.get(e.id)),
                None => true,
            })
            .map(|e| (e.id, e.used))
            .collect();

        let new_verse = |id: &QuestionId| !verses.contains(self.bank.get(*id).bcv.as_str());

        let fresh: Vec<QuestionId> = of_category.iter()
            .filter(|(id, used)| !used && new_verse(id))
            .map(|(id, _)| *id)
            .collect();
        if !fresh.is_empty() {
            return (fresh, Tier::Fresh);
        }

        let used: Vec<QuestionId> = of_category.iter()
            .filter(|(id, _)| new_verse(id))
            .map(|(id, _)| *id)
            .collect();
        if !used.is_empty() {
            return (used, Tier::Used);
        }

        (of_category.into_iter().map(|(id, _)| id).collect(), Tier::AnyVerse)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::bank::Question;
    use crate::content::resolve_content;
    use crate::distribution::{Category, QuizStyle};
    use crate::makeup::QuizMakeup;

    fn two_categories() -> Distribution {
        Distribution::new(QuizStyle::Custom, vec![
            Category::new("int", "Interrogative", (2, 4), &["int"]),
            Category::new("ft", "Finish", (1, 2), &["ft"]),
        ]).unwrap()
    }

    fn setup(questions: Vec<Question>, distribution: &Distribution) -> (QuestionBank, RunState) {
        let bank = QuestionBank::new(questions);
        let makeup = QuizMakeup::everything(&bank);
        let state = RunState::new(&resolve_content(&bank, &makeup, distribution));
        (bank, state)
    }

    #[test]
    fn weights_follow_minimums_then_maximums() {
        let dist = two_categories();
        let (bank, _) = setup(vec![
            Question::new("Acts", 1, 1, "int"),
            Question::new("Acts", 1, 2, "ft"),
        ], &dist);
        let picker = QuestionPicker::new(&bank, &dist);

        assert_eq!(picker.weights(&PickRequest::new(&[])), vec![2, 1]);

        let quiz = [
            Pick { id: QuestionId(0), period: 0, category: Some(0), repeat: false },
            Pick { id: QuestionId(1), period: 0, category: Some(1), repeat: false },
        ];
        // int is still below its minimum, so only int has weight.
        assert_eq!(picker.weights(&PickRequest::new(&quiz)), vec![1, 0]);

        let loosened = PickRequest { loosen: true, ..PickRequest::new(&quiz) };
        assert_eq!(picker.weights(&loosened), vec![3, 1]);
    }

    #[test]
    fn carried_counts_are_added() {
        let dist = two_categories();
        let (bank, _) = setup(vec![
            Question::new("Acts", 1, 1, "int"),
            Question::new("Acts", 1, 2, "int"),
            Question::new("Acts", 1, 3, "ft"),
        ], &dist);
        let picker = QuestionPicker::new(&bank, &dist);
        let earlier = count_by_category(bank.iter().map(|(_, q)| q), &dist);

        let request = PickRequest { counts: Some(&earlier), ..PickRequest::new(&[]) };
        assert_eq!(picker.weights(&request), vec![2, 1]);

        let quiz = [Pick { id: QuestionId(0), period: 0, category: Some(0), repeat: false }];
        let request = PickRequest { counts: Some(&earlier), ..PickRequest::new(&quiz) };
        assert_eq!(picker.weights(&request), vec![1, 1]);
    }

    #[test]
    fn full_categories_fall_back_to_uniform_choice() {
        let dist = two_categories();
        let questions: Vec<Question> = (1..=8)
            .map(|v| Question::new("Acts", 1, v, if v <= 6 { "int" } else { "ft" }))
            .collect();
        let (bank, mut state) = setup(questions, &dist);
        let picker = QuestionPicker::new(&bank, &dist);
        let mut rng = StdRng::seed_from_u64(7);

        let mut quiz = Vec::new();
        for _ in 0..6 {
            let pick = picker.pick(&mut state, 0, &PickRequest::new(&quiz), &mut rng).unwrap();
            quiz.push(pick);
        }
        assert_eq!(picker.weights(&PickRequest::new(&quiz)), vec![0, 0]);

        // Only int rows are left, so only int draws can succeed.
        let mut extra = None;
        for _ in 0..50 {
            extra = picker.pick(&mut state, 0, &PickRequest::new(&quiz), &mut rng);
            if extra.is_some() {
                break;
            }
        }
        assert_eq!(extra.map(|p| p.category), Some(Some(0)));
    }

    #[test]
    fn picks_mark_rows_used_and_avoid_quiz_verses() {
        let dist = two_categories();
        let (bank, mut state) = setup(vec![
            Question::new("Acts", 1, 1, "int"),
            Question::new("Acts", 1, 1, "ft"),
            Question::new("Acts", 1, 2, "ft"),
        ], &dist);
        let picker = QuestionPicker::new(&bank, &dist);
        let mut rng = StdRng::seed_from_u64(1);

        let first = picker.pick(
            &mut state, 0, &PickRequest { category: Some(0), ..PickRequest::new(&[]) }, &mut rng
        ).unwrap();
        assert_eq!(first.id, QuestionId(0));
        assert!(state.is_used(first.id));

        let quiz = [first];
        let second = picker.pick(
            &mut state, 0, &PickRequest { category: Some(1), ..PickRequest::new(&quiz) }, &mut rng
        ).unwrap();
        assert_eq!(second.id, QuestionId(2));
        assert!(!second.repeat);
    }

    #[test]
    fn single_verse_category_repeats_with_flag() {
        let dist = two_categories();
        let (bank, mut state) = setup(vec![
            Question::new("Acts", 1, 1, "ft"),
            Question::new("Acts", 1, 1, "ft"),
            Question::new("Acts", 1, 2, "int"),
        ], &dist);
        let picker = QuestionPicker::new(&bank, &dist);
        let mut rng = StdRng::seed_from_u64(3);

        let first = picker.pick(&mut state, 0, &forced(1, &[]), &mut rng).unwrap();
        assert!(!first.repeat);
        let quiz = [first];
        let second = picker.pick(&mut state, 0, &forced(1, &quiz), &mut rng).unwrap();
        assert!(second.repeat);
        assert_ne!(first.id, second.id);

        // Both rows are in the quiz now, so a third pick has nothing left.
        let quiz = [first, second];
        assert_eq!(picker.pick(&mut state, 0, &forced(1, &quiz), &mut rng), None);
    }

    fn forced(category: usize, quiz: &[Pick]) -> PickRequest {
        PickRequest { category: Some(category), ..PickRequest::new(quiz) }
    }

    #[test]
    fn used_rows_are_reused_across_quizzes() {
        let dist = two_categories();
        let (bank, mut state) = setup(vec![
            Question::new("Acts", 1, 1, "ft"),
            Question::new("Acts", 1, 2, "int"),
        ], &dist);
        let picker = QuestionPicker::new(&bank, &dist);
        let mut rng = StdRng::seed_from_u64(3);
        let request = PickRequest { category: Some(1), ..PickRequest::new(&[]) };

        let first = picker.pick(&mut state, 0, &request, &mut rng).unwrap();
        assert!(!first.repeat);
        // A new quiz: the only ft row was used by the previous one.
        let again = picker.pick(&mut state, 0, &request, &mut rng).unwrap();
        assert_eq!(again.id, first.id);
        assert!(again.repeat);
    }

    #[test]
    fn loosened_draws_skip_exhausted_categories() {
        let dist = two_categories();
        let mut questions: Vec<Question> = (1..=5)
            .map(|v| Question::new("Acts", 1, v, "int"))
            .collect();
        questions.push(Question::new("Acts", 1, 9, "ft"));
        let (bank, mut state) = setup(questions, &dist);
        let picker = QuestionPicker::new(&bank, &dist);
        let mut rng = StdRng::seed_from_u64(12);

        let mut quiz = vec![Pick { id: QuestionId(5), period: 0, category: Some(1), repeat: false }];
        for _ in 0..4 {
            let request = PickRequest { loosen: true, ..PickRequest::new(&quiz) };
            let pick = picker.pick(&mut state, 0, &request, &mut rng).unwrap();
            assert_eq!(pick.category, Some(0));
            quiz.push(pick);
        }
    }

    #[test]
    fn quota_free_picks_any_row() {
        let dist = Distribution::builtin(QuizStyle::Custom);
        let (bank, mut state) = setup(vec![
            Question::new("Acts", 1, 1, "weird"),
            Question::new("Acts", 1, 2, "other"),
        ], &dist);
        let picker = QuestionPicker::new(&bank, &dist);
        let mut rng = StdRng::seed_from_u64(11);

        let first = picker.pick(&mut state, 0, &PickRequest::new(&[]), &mut rng).unwrap();
        assert_eq!(first.category, None);
        let quiz = [first];
        let second = picker.pick(&mut state, 0, &PickRequest::new(&quiz), &mut rng).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn same_seed_same_picks() {
        let dist = Distribution::builtin(QuizStyle::Epistle);
        let questions: Vec<Question> = (1..=40)
            .map(|v| Question::new("Romans", 1 + v / 10, v, ["int", "cr", "ft", "ma", "q"][v as usize % 5]))
            .collect();

        let run = |seed| {
            let (bank, mut state) = setup(questions.clone(), &dist);
            let picker = QuestionPicker::new(&bank, &dist);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut quiz = Vec::new();
            for _ in 0..15 {
                if let Some(pick) = picker.pick(&mut state, 0, &PickRequest::new(&quiz), &mut rng) {
                    quiz.push(pick);
                }
            }
            quiz
        };
        assert_eq!(run(42), run(42));
    }
}
