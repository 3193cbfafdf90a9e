/**
 * Spare questions of each category, drawn from what the quizzes left behind, for use
 * when a question has to be thrown out during a live event.
 */
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use super::assembler::{QuizRow, STRICT_BUDGET};
use super::bank::QuestionBank;
use super::common::Block;
use super::distribution::Distribution;
use super::picker::{Pick, PickRequest, QuestionPicker};
use super::pool::RunState;


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraQuestions {
    pub category: String,
    pub label: String,
    pub types: Vec<String>,
    pub rows: Vec<QuizRow>,
}


pub struct ExtraPool<'a> {
    bank: &'a QuestionBank,
    distribution: &'a Distribution,
    picker: QuestionPicker<'a>,
}


impl<'a> ExtraPool<'a> {
    pub fn new(bank: &'a QuestionBank, distribution: &'a Distribution) -> Self {
        ExtraPool { bank, distribution, picker: QuestionPicker::new(bank, distribution) }
    }

    /// `xtra` extra questions for every category, in distribution order.
    pub fn draw_all<R: Rng>(
        &self, xtra: usize, state: &mut RunState, rng: &mut R
    ) -> Vec<ExtraQuestions> {
        (0..self.distribution.len())
            .map(|category| self.draw(category, xtra, state, rng))
            .collect()
    }

    /// Draw up to `xtra` questions of `category`, spread over the periods by fraction.
    /// Falls short only if the category runs out of rows entirely.
    pub fn draw<R: Rng>(
        &self, category: usize, xtra: usize, state: &mut RunState, rng: &mut R
    ) -> ExtraQuestions {
        let wanted = self.distribution.get(category);
        info!("picking {} extra {} questions", xtra, wanted.id);

        let mut picks = Vec::with_capacity(xtra);
        for period in 0..state.len() {
            if picks.len() >= xtra {
                break;
            }
            let share = (xtra as f64 * state.period(period).fraction) as usize + 1;
            let target = share.min(xtra - picks.len());
            self.fill(category, period, target, &mut picks, state, rng);
        }
        // Periods that ran dry leave their share to the others.
        for period in 0..state.len() {
            if picks.len() >= xtra {
                break;
            }
            let short = xtra - picks.len();
            self.fill(category, period, short, &mut picks, state, rng);
        }
        if picks.len() < xtra {
            warn!("only {} of {} extra {} questions available", picks.len(), xtra, wanted.id);
        }

        let rows = picks.iter()
            .enumerate()
            .map(|(i, pick)| {
                QuizRow::new(self.bank, state, pick, (i + 1).to_string(), Block::Extra)
            })
            .collect();
        ExtraQuestions {
            category: wanted.id.clone(),
            label: wanted.label.clone(),
            types: wanted.types.clone(),
            rows,
        }
    }

    /// Add up to `target` picks of `category` from `period`.
    fn fill<R: Rng>(
        &self, category: usize, period: usize, target: usize, picks: &mut Vec<Pick>,
        state: &mut RunState, rng: &mut R,
    ) {
        let start = picks.len();
        let mut attempts = 0;
        while picks.len() - start < target && attempts < STRICT_BUDGET * target {
            attempts += 1;
            let request = PickRequest {
                category: Some(category),
                ..PickRequest::new(&picks[..])
            };
            if let Some(pick) = self.picker.pick(state, period, &request, rng) {
                picks.push(pick);
            }
        }
    }
}
