/**
 * Quiz formats: how many questions each block holds, what the questions are labelled,
 * and the order blocks are merged in.
 *
 * The standard format has 20 main questions labelled `1`..`20`, ten supplemental
 * questions paired as `16A`..`20B`, and overtime questions `21`..`23`, merged in
 * reading order (`16`, `16A`, `16B`, `17`, ...).
 */
use serde::Serialize;

use super::common::{QuizError, Result};


pub const MAIN_QUESTIONS: usize = 20;


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelTemplate {
    /// Labels of the supplemental block. `None` continues the main block's numbering.
    pub supplemental: Option<Vec<String>>,
    /// Labels of the overtime block. `None` continues the numbering.
    pub overtime: Option<Vec<String>>,
    /// Reading order of all labels. `None` concatenates the blocks.
    pub order: Option<Vec<String>>,
}


impl LabelTemplate {
    pub fn standard() -> Self {
        let mut supplemental = Vec::new();
        for n in 16..=20 {
            supplemental.push(format!("{}A", n));
            supplemental.push(format!("{}B", n));
        }
        let overtime: Vec<String> = (21..=23).map(|n| n.to_string()).collect();

        let mut order = Vec::new();
        for n in 1..=20 {
            order.push(n.to_string());
            if n >= 16 {
                order.push(format!("{}A", n));
                order.push(format!("{}B", n));
            }
        }
        order.extend(overtime.iter().cloned());

        LabelTemplate {
            supplemental: Some(supplemental),
            overtime: Some(overtime),
            order: Some(order),
        }
    }

    pub fn sequential() -> Self {
        LabelTemplate { supplemental: None, overtime: None, order: None }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizFormat {
    pub main: usize,
    pub supplemental: usize,
    pub overtime: usize,
    pub labels: LabelTemplate,
}


impl QuizFormat {
    pub fn standard() -> Self {
        QuizFormat::from_template(MAIN_QUESTIONS, LabelTemplate::standard())
    }

    /// `nquestion` questions in total, with no overtime and plain numbering.
    pub fn custom(nquestion: usize) -> Self {
        let main = nquestion.min(MAIN_QUESTIONS);
        QuizFormat {
            main,
            supplemental: nquestion - main,
            overtime: 0,
            labels: LabelTemplate::sequential(),
        }
    }

    /// A format whose supplemental and overtime sizes are given by `labels`.
    pub fn from_template(main: usize, labels: LabelTemplate) -> Self {
        QuizFormat {
            main,
            supplemental: labels.supplemental.as_ref().map_or(0, |l| l.len()),
            overtime: labels.overtime.as_ref().map_or(0, |l| l.len()),
            labels,
        }
    }

    pub fn total(&self) -> usize {
        self.main + self.supplemental + self.overtime
    }

    pub fn main_labels(&self, count: usize) -> Vec<String> {
        (1..=count).map(|n| n.to_string()).collect()
    }

    /// Labels for a supplemental block of `count` rows following `main` main rows.
    pub fn supplemental_labels(&self, main: usize, count: usize) -> Vec<String> {
        match &self.labels.supplemental {
            Some(labels) => labels.iter().take(count).cloned().collect(),
            None => (main + 1..=main + count).map(|n| n.to_string()).collect(),
        }
    }

    pub fn overtime_labels(&self, before: usize, count: usize) -> Vec<String> {
        match &self.labels.overtime {
            Some(labels) => labels.iter().take(count).cloned().collect(),
            None => (before + 1..=before + count).map(|n| n.to_string()).collect(),
        }
    }

    /// Position of `label` in the reading order. Labels missing from the order sort
    /// after every listed one, keeping their block order.
    pub fn position(&self, label: &str) -> usize {
        match &self.labels.order {
            Some(order) => order.iter().position(|l| l == label).unwrap_or(order.len()),
            None => 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.main == 0 {
            return Err(QuizError::Configuration(String::from("quizzes need at least one question")));
        }
        if let Some(order) = &self.labels.order {
            let mut expected = self.main_labels(self.main);
            expected.extend(self.supplemental_labels(self.main, self.supplemental));
            expected.extend(self.overtime_labels(self.main + self.supplemental, self.overtime));
            for label in expected.iter() {
                if !order.contains(label) {
                    return Err(QuizError::Configuration(format!(
                        "label '{}' is missing from the label order", label
                    )));
                }
            }
        }
        Ok(())
    }
}
