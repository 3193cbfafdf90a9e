/**
 * Question categories and the quota distributions built from them.
 *
 * A category groups several raw type tags (e.g. `cr`, `cvr`, `crma`) under one
 * inclusive count range. The situational category is matched by type prefix rather
 * than by tag membership, since its tags come in many numbered variants.
 */
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::bank::{canonical_type, is_eligible, Question};
use super::common::{QuizError, Result};


const SITUATIONAL: &str = "sit";


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: String,
    pub label: String,
    pub min: usize,
    pub max: usize,
    pub types: Vec<String>,
    /// Allowed club tags. `None` admits every club.
    pub limit: Option<Vec<String>>,
    /// Allowed set tags. `None` admits every set.
    pub set: Option<Vec<String>>,
}


impl Category {
    pub fn new(id: &str, label: &str, range: (usize, usize), types: &[&str]) -> Self {
        Category {
            id: String::from(id),
            label: String::from(label),
            min: range.0,
            max: range.1,
            types: types.iter().map(|t| canonical_type(t)).collect(),
            limit: None,
            set: None,
        }
    }

    pub fn matches_type(&self, kind: &str) -> bool {
        if self.id == SITUATIONAL {
            kind.starts_with(SITUATIONAL)
        } else {
            self.types.iter().any(|t| t == kind)
        }
    }

    /// Return `true` if `q` has one of this category's types and passes its club and
    /// set restrictions.
    pub fn admits(&self, q: &Question) -> bool {
        self.matches_type(&q.kind)
            && is_eligible(q, self.limit.as_deref(), self.set.as_deref())
    }

    fn validate(&self) -> Result<()> {
        if self.min > self.max {
            return Err(QuizError::Configuration(format!(
                "category '{}' has minimum {} above maximum {}", self.id, self.min, self.max
            )));
        }
        if self.types.is_empty() && self.id != SITUATIONAL {
            return Err(QuizError::Configuration(format!(
                "category '{}' has no question types", self.id
            )));
        }
        Ok(())
    }
}


/// The built-in quiz styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizStyle {
    Epistle,
    Gospel,
    /// No built-in quotas; categories, if any, come from configuration.
    Custom,
}


impl FromStr for QuizStyle {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "epistle" => Ok(QuizStyle::Epistle),
            "gospel" => Ok(QuizStyle::Gospel),
            "custom" => Ok(QuizStyle::Custom),
            _ => Err(QuizError::Configuration(format!(
                "quiz type is epistle/gospel/custom, not \"{}\"", s
            ))),
        }
    }
}


impl fmt::Display for QuizStyle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            QuizStyle::Epistle => write!(f, "epistle"),
            QuizStyle::Gospel => write!(f, "gospel"),
            QuizStyle::Custom => write!(f, "custom"),
        }
    }
}


/// Changes to a category requested before generation. Fields left as `None` keep
/// their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryOverride {
    pub range: Option<(usize, usize)>,
    pub limit: Option<Vec<String>>,
    pub set: Option<Vec<String>>,
    pub types: Option<Vec<String>>,
    pub label: Option<String>,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub style: QuizStyle,
    pub categories: Vec<Category>,
}


impl Distribution {
    pub fn builtin(style: QuizStyle) -> Self {
        let categories = match style {
            QuizStyle::Epistle => vec![
                Category::new("int", "Interrogative", (9, 16), &["int"]),
                Category::new("cr", "Chapter Reference", (3, 7), &["cr", "cvr", "cvrma", "crma"]),
                Category::new("ft", "Finish-The-Verse", (3, 4), &["ft", "f2v", "ftv", "ftn"]),
                Category::new("ma", "Multiple Answer", (1, 2), &["ma"]),
                Category::new("q", "Quote", (3, 4), &["q", "q2"]),
            ],
            QuizStyle::Gospel => vec![
                Category::new("int", "Interrogative", (8, 14), &["int"]),
                Category::new("cr", "Chapter Reference", (3, 6), &["cr", "cvr", "cvrma", "crma"]),
                Category::new("ft", "Finish-The-Verse", (3, 4), &["ft", "f2v", "ftv", "ftn"]),
                Category::new("ma", "Multiple Answer", (1, 2), &["ma"]),
                Category::new("q", "Quote", (2, 3), &["q", "q2"]),
                Category::new("sit", "Situational", (2, 4), &["sit"]),
            ],
            QuizStyle::Custom => Vec::new(),
        };
        Distribution { style, categories }
    }

    pub fn new(style: QuizStyle, categories: Vec<Category>) -> Result<Self> {
        let distribution = Distribution { style, categories };
        distribution.validate()?;
        Ok(distribution)
    }

    /// With no categories there are no quotas and every row is a candidate.
    pub fn is_quota_free(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.id == id)
    }

    pub fn get(&self, index: usize) -> &Category {
        &self.categories[index]
    }

    /// Apply `change` to the category `id`. In custom mode an unknown id defines a
    /// new category, which then needs both a range and its types.
    pub fn apply_override(&mut self, id: &str, change: &CategoryOverride) -> Result<()> {
        let index = match self.index_of(id) {
            Some(index) => index,
            None if self.style == QuizStyle::Custom => {
                let range = change.range.ok_or_else(|| QuizError::Configuration(format!(
                    "custom category '{}' needs a range", id
                )))?;
                self.categories.push(Category {
                    id: String::from(id),
                    label: id.to_uppercase(),
                    min: range.0,
                    max: range.1,
                    types: vec![canonical_type(id)],
                    limit: None,
                    set: None,
                });
                self.categories.len() - 1
            },
            None => {
                return Err(QuizError::Configuration(format!(
                    "no category '{}' in the {} distribution", id, self.style
                )));
            },
        };

        let category = &mut self.categories[index];
        if let Some((min, max)) = change.range {
            category.min = min;
            category.max = max;
        }
        if let Some(limit) = &change.limit {
            category.limit = Some(limit.clone());
        }
        if let Some(set) = &change.set {
            category.set = Some(set.clone());
        }
        if let Some(types) = &change.types {
            category.types = types.iter().map(|t| canonical_type(t)).collect();
        }
        if let Some(label) = &change.label {
            category.label = label.clone();
        }
        category.validate()
    }

    pub fn validate(&self) -> Result<()> {
        for (i, category) in self.categories.iter().enumerate() {
            category.validate()?;
            if self.categories[..i].iter().any(|c| c.id == category.id) {
                return Err(QuizError::Configuration(format!(
                    "category '{}' is defined twice", category.id
                )));
            }
        }
        Ok(())
    }
}
