/**
 * The mutable state of one generation run: a pool of candidate rows per period, each
 * carrying `used` and `repeat` markers.
 *
 * The bank itself is never touched. A run starts from a fresh `RunState` and threads it
 * by mutable reference through every quiz of the batch, so later quizzes see what
 * earlier ones consumed.
 */
use super::bank::{QuestionBank, QuestionId};
use super::content::ContentPools;


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    pub id: QuestionId,
    pub used: bool,
    /// Set once any row with this entry's BCV has been picked as a repeat.
    pub repeat: bool,
}


#[derive(Debug, Clone, PartialEq)]
pub struct PeriodPool {
    pub name: String,
    pub fraction: f64,
    pub entries: Vec<PoolEntry>,
}


impl PeriodPool {
    pub fn remaining(&self) -> usize {
        self.entries.iter().filter(|e| !e.used).count()
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    periods: Vec<PeriodPool>,
}


impl RunState {
    pub fn new(content: &ContentPools) -> Self {
        let periods = content.periods.iter()
            .map(|period| PeriodPool {
                name: period.name.clone(),
                fraction: period.fraction,
                entries: period.ids.iter()
                    .map(|id| PoolEntry { id: *id, used: false, repeat: false })
                    .collect(),
            })
            .collect();
        RunState { periods }
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn period(&self, index: usize) -> &PeriodPool {
        &self.periods[index]
    }

    pub fn periods(&self) -> impl Iterator<Item = &PeriodPool> {
        self.periods.iter()
    }

    /// Mark `id` as used in every period that holds it.
    pub fn mark_used(&mut self, id: QuestionId) {
        for period in self.periods.iter_mut() {
            for entry in period.entries.iter_mut().filter(|e| e.id == id) {
                entry.used = true;
            }
        }
    }

    /// Flag every entry sharing the verse location `bcv` as a repeat.
    pub fn mark_repeat(&mut self, bank: &QuestionBank, bcv: &str) {
        for period in self.periods.iter_mut() {
            for entry in period.entries.iter_mut() {
                if bank.get(entry.id).bcv == bcv {
                    entry.repeat = true;
                }
            }
        }
    }

    pub fn is_used(&self, id: QuestionId) -> bool {
        self.entries_for(id).any(|e| e.used)
    }

    pub fn is_repeat(&self, id: QuestionId) -> bool {
        self.entries_for(id).any(|e| e.repeat)
    }

    fn entries_for(&self, id: QuestionId) -> impl Iterator<Item = &PoolEntry> {
        self.periods.iter()
            .flat_map(|p| p.entries.iter())
            .filter(move |e| e.id == id)
    }
}
