/**
 * The quiz assembler: fills the main, supplemental and overtime blocks of a quiz from
 * the period pools, then labels and merges them.
 *
 * Every block is filled period by period. A period keeps drawing until it has
 * contributed its share of the block; if that takes more than a few attempts per
 * question the quota cannot be met from the content, which is an error unless loose
 * mode lets the block relax its minimums.
 */
use std::fs;
use std::path::Path;

use rand::distributions::Distribution as RandDistribution;
use rand::distributions::WeightedIndex;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::bank::{Question, QuestionBank, QuestionId};
use super::common::{Block, QuizError, Result};
use super::counter::CategoryCounts;
use super::distribution::{Distribution, QuizStyle};
use super::extra::ExtraQuestions;
use super::labels::QuizFormat;
use super::picker::{Pick, PickRequest, QuestionPicker};
use super::pool::RunState;


/// Attempts allowed per question still needed before a block gives up (or loosens).
pub const STRICT_BUDGET: usize = 3;
/// Attempts allowed per question once a block has been loosened.
pub const LOOSE_BUDGET: usize = 10;


/// A labelled question in a quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizRow {
    pub qn: String,
    pub block: Block,
    pub period: String,
    pub row: QuestionId,
    /// A copy of the bank row. Its flags gain `R` when the pick was a repeat.
    #[serde(flatten)]
    pub question: Question,
}


impl QuizRow {
    pub fn new(
        bank: &QuestionBank, state: &RunState, pick: &Pick, qn: String, block: Block
    ) -> Self {
        let mut question = bank.get(pick.id).clone();
        if pick.repeat && !question.flags.contains('R') {
            question.flags.push('R');
        }
        QuizRow {
            qn,
            block,
            period: state.period(pick.period).name.clone(),
            row: pick.id,
            question,
        }
    }

    pub fn is_repeat(&self) -> bool {
        self.question.flags.contains('R')
    }
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quiz {
    pub number: usize,
    pub rows: Vec<QuizRow>,
    /// True if any block of this quiz had its minimums relaxed.
    pub loose: bool,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodStats {
    pub name: String,
    pub main: usize,
    pub supplemental: usize,
    pub overtime: usize,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizStats {
    pub quiz: usize,
    /// Category counts of the main block alone.
    pub main: CategoryCounts,
    /// Category counts of the main and supplemental blocks together.
    pub cumulative: CategoryCounts,
    pub periods: Vec<PeriodStats>,
    pub loose: bool,
}


/// Everything one generation run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Packet {
    pub quiz_type: QuizStyle,
    pub distribution: Distribution,
    pub quizzes: Vec<Quiz>,
    pub extra_questions: Vec<ExtraQuestions>,
    pub stats: Vec<QuizStats>,
    /// True if any quiz was loosened.
    pub loose: bool,
    pub seed: Option<u64>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}


impl Packet {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}


/// One block being filled: what it is filled against and what it holds so far.
struct BlockFill<'p> {
    block: Block,
    quiz: usize,
    /// Picks of earlier blocks in this quiz.
    prior: &'p [Pick],
    counts: Option<&'p CategoryCounts>,
    /// Size of the block; filling stops here even if a period is short of its share.
    cap: usize,
    picks: Vec<Pick>,
    /// Once set, every remaining draw of the block is loosened.
    loosen: bool,
}


impl<'p> BlockFill<'p> {
    fn new(block: Block, quiz: usize, cap: usize) -> Self {
        BlockFill {
            block,
            quiz,
            prior: &[],
            counts: None,
            cap,
            picks: Vec::with_capacity(cap),
            loosen: false,
        }
    }
}


pub struct QuizAssembler<'a> {
    bank: &'a QuestionBank,
    distribution: &'a Distribution,
    format: &'a QuizFormat,
    picker: QuestionPicker<'a>,
    scramble: bool,
    loose: bool,
}


impl<'a> QuizAssembler<'a> {
    pub fn new(
        bank: &'a QuestionBank, distribution: &'a Distribution, format: &'a QuizFormat
    ) -> Self {
        QuizAssembler {
            bank,
            distribution,
            format,
            picker: QuestionPicker::new(bank, distribution),
            scramble: true,
            loose: false,
        }
    }

    /// Shuffle the main and supplemental blocks instead of keeping them grouped by
    /// period.
    pub fn scramble(mut self, scramble: bool) -> Self {
        self.scramble = scramble;
        self
    }

    pub fn loose(mut self, loose: bool) -> Self {
        self.loose = loose;
        self
    }

    /// Assemble quiz number `number` from `state`, marking every picked row as used.
    pub fn assemble<R: Rng>(
        &self, number: usize, state: &mut RunState, rng: &mut R
    ) -> Result<(Quiz, QuizStats)> {
        info!("generating quiz {}", number);
        let mut main_fill = BlockFill::new(Block::Main, number, self.format.main);
        for period in 0..state.len() {
            let target = (self.format.main as f64 * state.period(period).fraction) as usize;
            info!("picking {} main questions from \"{}\"", target, state.period(period).name);
            self.fill_period(state, period, target, &mut main_fill, rng)?;
        }
        let mut loosened = main_fill.loosen;
        let mut main = main_fill.picks;
        if self.scramble {
            main.shuffle(rng);
        }
        let main_counts = self.picker.counts(&PickRequest::new(&main));
        debug!("main block counts: {:?}", main_counts);

        let mut supplemental = {
            let mut fill = BlockFill {
                prior: &main,
                counts: Some(&main_counts),
                ..BlockFill::new(Block::Supplemental, number, self.format.supplemental)
            };
            for period in 0..state.len() {
                if fill.picks.len() >= self.format.supplemental {
                    break;
                }
                let share = self.format.supplemental as f64 * state.period(period).fraction;
                let target = share as usize + 1;
                info!(
                    "picking {} supplemental questions from \"{}\"",
                    target, state.period(period).name
                );
                self.fill_period(state, period, target, &mut fill, rng)?;
            }
            loosened |= fill.loosen;
            fill.picks
        };
        supplemental.truncate(self.format.supplemental);
        if self.scramble {
            supplemental.shuffle(rng);
        }

        let mut earlier = main.clone();
        earlier.extend(supplemental.iter().cloned());
        let overtime = self.fill_overtime(number, state, &earlier, &mut loosened, rng)?;

        let mut cumulative = main_counts.clone();
        cumulative += &self.picker.counts(&PickRequest::new(&supplemental));

        for pick in main.iter().chain(supplemental.iter()).chain(overtime.iter()) {
            if pick.repeat {
                let bcv = self.bank.get(pick.id).bcv.clone();
                state.mark_repeat(self.bank, &bcv);
            }
        }

        let stats = QuizStats {
            quiz: number,
            main: main_counts,
            cumulative,
            periods: state.periods()
                .enumerate()
                .map(|(i, p)| PeriodStats {
                    name: p.name.clone(),
                    main: main.iter().filter(|pick| pick.period == i).count(),
                    supplemental: supplemental.iter().filter(|pick| pick.period == i).count(),
                    overtime: overtime.iter().filter(|pick| pick.period == i).count(),
                })
                .collect(),
            loose: loosened,
        };

        let rows = self.reassemble(state, &main, &supplemental, &overtime);
        if loosened {
            warn!("quiz {} needed its quotas loosened", number);
        }
        Ok((Quiz { number, rows, loose: loosened }, stats))
    }

    /// Draw until `period` has added `target` picks to the block, or the block is full.
    /// A block that loosens stays loosened for its remaining periods.
    fn fill_period<R: Rng>(
        &self, state: &mut RunState, period: usize, target: usize, fill: &mut BlockFill,
        rng: &mut R,
    ) -> Result<()> {
        let start = fill.picks.len();
        let mut attempts = 0;

        while fill.picks.len() - start < target && fill.picks.len() < fill.cap {
            attempts += 1;
            if !fill.loosen && attempts > STRICT_BUDGET * target {
                if !self.loose {
                    return Err(self.unsatisfiable(fill.quiz, fill.block, state, period));
                }
                warn!(
                    "quiz {}: loosening {} quotas for \"{}\"",
                    fill.quiz, fill.block, state.period(period).name
                );
                fill.loosen = true;
                attempts = 1;
            } else if fill.loosen && attempts > LOOSE_BUDGET * target {
                return Err(self.unsatisfiable(fill.quiz, fill.block, state, period));
            }

            let request = PickRequest {
                category: None,
                quiz: &fill.picks[..],
                prior: fill.prior,
                counts: fill.counts,
                loosen: fill.loosen,
            };
            if let Some(pick) = self.picker.pick(state, period, &request, rng) {
                fill.picks.push(pick);
            }
            debug!("{} block: {} questions (attempt {})", fill.block, fill.picks.len(), attempts);
        }
        Ok(())
    }

    /// One pick per overtime slot, each from its own category where the distribution
    /// has enough of them.
    fn fill_overtime<R: Rng>(
        &self, number: usize, state: &mut RunState, earlier: &[Pick], loosened: &mut bool,
        rng: &mut R,
    ) -> Result<Vec<Pick>> {
        let slots = self.format.overtime;
        let mut overtime = Vec::with_capacity(slots);
        if slots == 0 {
            return Ok(overtime);
        }

        let categories: Vec<Option<usize>> = if self.distribution.is_quota_free() {
            vec![None; slots]
        } else {
            let mut order: Vec<usize> = (0..self.distribution.len()).collect();
            order.shuffle(rng);
            order.into_iter().cycle().take(slots).map(Some).collect()
        };
        let fractions: Vec<f64> = state.periods().map(|p| p.fraction).collect();
        let periods: Vec<usize> = (0..slots).map(|_| draw_period(&fractions, rng)).collect();

        for (category, first_period) in categories.into_iter().zip(periods) {
            let mut period = first_period;
            let mut picked = None;
            for attempt in 0..STRICT_BUDGET {
                if attempt > 0 {
                    period = draw_period(&fractions, rng);
                }
                let request = PickRequest {
                    category,
                    quiz: &overtime,
                    prior: earlier,
                    counts: None,
                    loosen: false,
                };
                picked = self.picker.pick(state, period, &request, rng);
                if picked.is_some() {
                    break;
                }
            }

            if picked.is_none() {
                if !self.loose {
                    return Err(self.unsatisfiable(number, Block::Overtime, state, period));
                }
                warn!("quiz {}: overtime slot falls back to any category", number);
                *loosened = true;
                for _ in 0..LOOSE_BUDGET {
                    let request = PickRequest {
                        category: None,
                        quiz: &overtime,
                        prior: earlier,
                        counts: None,
                        loosen: true,
                    };
                    picked = self.picker.pick(state, period, &request, rng);
                    if picked.is_some() {
                        break;
                    }
                    period = draw_period(&fractions, rng);
                }
                if picked.is_none() {
                    return Err(self.unsatisfiable(number, Block::Overtime, state, period));
                }
            }

            overtime.extend(picked);
        }
        Ok(overtime)
    }

    fn reassemble(
        &self, state: &RunState, main: &[Pick], supplemental: &[Pick], overtime: &[Pick]
    ) -> Vec<QuizRow> {
        let main_labels = self.format.main_labels(main.len());
        let supplemental_labels = self.format.supplemental_labels(main.len(), supplemental.len());
        let overtime_labels = self.format.overtime_labels(
            main.len() + supplemental.len(), overtime.len()
        );

        let blocks = [
            (Block::Main, main, main_labels),
            (Block::Supplemental, supplemental, supplemental_labels),
            (Block::Overtime, overtime, overtime_labels),
        ];
        let mut rows = Vec::with_capacity(self.format.total());
        for (block, picks, labels) in blocks.iter() {
            for (pick, qn) in picks.iter().zip(labels.iter()) {
                rows.push(QuizRow::new(self.bank, state, pick, qn.clone(), *block));
            }
        }
        // Stable, so a format without a reading order keeps the blocks concatenated.
        rows.sort_by_key(|row| self.format.position(&row.qn));
        rows
    }

    fn unsatisfiable(
        &self, quiz: usize, block: Block, state: &RunState, period: usize
    ) -> QuizError {
        QuizError::DistributionUnsatisfiable {
            quiz,
            block,
            period: state.period(period).name.clone(),
        }
    }
}


/// Draw a period index weighted by fraction. Uniform if every fraction is zero.
pub fn draw_period<R: Rng>(fractions: &[f64], rng: &mut R) -> usize {
    match WeightedIndex::new(fractions) {
        Ok(weighted) => weighted.sample(rng),
        Err(_) => rng.gen_range(0..fractions.len()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    use crate::content::resolve_content;
    use crate::distribution::QuizStyle;
    use crate::makeup::{ContentRange, Period, QuizMakeup};

    /// Two periods of Romans with `per_type` questions of each epistle type per chapter.
    fn romans(per_type: i64) -> (QuestionBank, QuizMakeup) {
        let mut questions = Vec::new();
        for chapter in 1..=6 {
            for (t, kind) in ["int", "cr", "ft", "ma", "q"].iter().enumerate() {
                for n in 0..per_type {
                    let verse = t as i64 * per_type + n + 1;
                    questions.push(Question::new("Romans", chapter, verse, kind));
                }
            }
        }
        let bank = QuestionBank::new(questions);
        let chapters = |list: Vec<i64>| {
            vec![ContentRange::Chapters { book: String::from("Romans"), chapters: list }]
        };
        let makeup = QuizMakeup::new(vec![
            Period::new("past", 0.5, chapters(vec![1, 2, 3])),
            Period::new("current", 0.5, chapters(vec![4, 5, 6])),
        ]).unwrap();
        (bank, makeup)
    }

    #[test]
    fn assembles_standard_quiz() {
        let (bank, makeup) = romans(4);
        let epistle = Distribution::builtin(QuizStyle::Epistle);
        let format = QuizFormat::standard();
        let mut state = RunState::new(&resolve_content(&bank, &makeup, &epistle));
        let assembler = QuizAssembler::new(&bank, &epistle, &format);
        let mut rng = StdRng::seed_from_u64(2020);

        let (quiz, stats) = assembler.assemble(1, &mut state, &mut rng).unwrap();
        assert_eq!(quiz.rows.len(), 33);
        assert!(!quiz.loose);
        assert_eq!(quiz.rows[15].qn, "16");
        assert_eq!(quiz.rows[16].qn, "16A");
        assert_eq!(quiz.rows[32].qn, "23");

        for (i, category) in epistle.categories.iter().enumerate() {
            let count = stats.main.get(i);
            assert!(category.min <= count && count <= category.max, "{}: {}", category.id, count);
        }
        assert_eq!(stats.main.total(), 20);
        assert_eq!(stats.cumulative.total(), 30);
        assert_eq!(stats.periods[0].main, 10);
        assert_eq!(stats.periods[1].main, 10);
        assert_eq!(stats.periods.iter().map(|p| p.supplemental).sum::<usize>(), 10);

        let ids: HashSet<QuestionId> = quiz.rows.iter().map(|r| r.row).collect();
        assert_eq!(ids.len(), 33);
        let verses: HashSet<&str> = quiz.rows.iter().map(|r| r.question.bcv.as_str()).collect();
        assert_eq!(verses.len(), 33);
    }

    #[test]
    fn later_quizzes_avoid_used_rows() {
        let (bank, makeup) = romans(20);
        let epistle = Distribution::builtin(QuizStyle::Epistle);
        let format = QuizFormat::standard();
        let mut state = RunState::new(&resolve_content(&bank, &makeup, &epistle));
        let assembler = QuizAssembler::new(&bank, &epistle, &format);
        let mut rng = StdRng::seed_from_u64(5);

        let (first, _) = assembler.assemble(1, &mut state, &mut rng).unwrap();
        let (second, _) = assembler.assemble(2, &mut state, &mut rng).unwrap();
        let first_ids: HashSet<QuestionId> = first.rows.iter().map(|r| r.row).collect();
        let fresh = second.rows.iter().filter(|r| !first_ids.contains(&r.row)).count();
        assert_eq!(fresh, second.rows.len());
        assert!(second.rows.iter().all(|r| !r.is_repeat()));
    }

    #[test]
    fn in_order_keeps_periods_grouped() {
        let (bank, makeup) = romans(4);
        let epistle = Distribution::builtin(QuizStyle::Epistle);
        let format = QuizFormat::standard();
        let mut state = RunState::new(&resolve_content(&bank, &makeup, &epistle));
        let assembler = QuizAssembler::new(&bank, &epistle, &format).scramble(false);
        let mut rng = StdRng::seed_from_u64(9);

        let (quiz, _) = assembler.assemble(1, &mut state, &mut rng).unwrap();
        let main: Vec<&str> = quiz.rows.iter()
            .filter(|r| r.block == Block::Main)
            .map(|r| r.period.as_str())
            .collect();
        assert!(main[..10].iter().all(|p| *p == "past"));
        assert!(main[10..].iter().all(|p| *p == "current"));
    }

    #[test]
    fn custom_format_concatenates_blocks() {
        let (bank, makeup) = romans(2);
        let custom = Distribution::builtin(QuizStyle::Custom);
        let format = QuizFormat::custom(24);
        let mut state = RunState::new(&resolve_content(&bank, &makeup, &custom));
        let assembler = QuizAssembler::new(&bank, &custom, &format);
        let mut rng = StdRng::seed_from_u64(1);

        let (quiz, stats) = assembler.assemble(1, &mut state, &mut rng).unwrap();
        let labels: Vec<String> = quiz.rows.iter().map(|r| r.qn.clone()).collect();
        let expected: Vec<String> = (1..=24).map(|n| n.to_string()).collect();
        assert_eq!(labels, expected);
        assert!(quiz.rows.iter().all(|r| r.block != Block::Overtime));
        assert_eq!(stats.main.total(), 0);
    }

    #[test]
    fn loosened_block_stays_loose_for_later_periods() {
        let mut questions = Vec::new();
        for chapter in 1..=2 {
            for (t, kind) in ["int", "cr", "ma", "q"].iter().enumerate() {
                for n in 0..20 {
                    questions.push(Question::new("Romans", chapter, t as i64 * 20 + n + 1, kind));
                }
            }
        }
        let bank = QuestionBank::new(questions);
        let chapter = |c: i64| {
            vec![ContentRange::Chapters { book: String::from("Romans"), chapters: vec![c] }]
        };
        let makeup = QuizMakeup::new(vec![
            Period::new("past", 0.5, chapter(1)),
            Period::new("current", 0.5, chapter(2)),
        ]).unwrap();
        let epistle = Distribution::builtin(QuizStyle::Epistle);
        let format = QuizFormat::standard();
        let mut state = RunState::new(&resolve_content(&bank, &makeup, &epistle));
        let mut rng = StdRng::seed_from_u64(6);
        let mut fill = BlockFill::new(Block::Main, 1, 30);

        // Without ft rows the minimums cannot be met, so the first period loosens.
        let loose = QuizAssembler::new(&bank, &epistle, &format).loose(true);
        loose.fill_period(&mut state, 0, 20, &mut fill, &mut rng).unwrap();
        assert!(fill.loosen);
        assert_eq!(fill.picks.len(), 20);

        // A strict assembler would fail here unless the block is still loosened.
        let strict = QuizAssembler::new(&bank, &epistle, &format);
        strict.fill_period(&mut state, 1, 4, &mut fill, &mut rng).unwrap();
        assert_eq!(fill.picks.len(), 24);
        assert!(fill.picks[20..].iter().all(|p| p.period == 1));
    }

    #[test]
    fn draw_period_respects_zero_fractions() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..20 {
            assert_eq!(draw_period(&[0.0, 1.0], &mut rng), 1);
        }
        let index = draw_period(&[0.0, 0.0], &mut rng);
        assert!(index < 2);
    }
}
