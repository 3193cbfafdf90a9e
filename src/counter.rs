/**
 * Per-category question counts.
 */
use std::ops::AddAssign;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::bank::Question;
use super::distribution::Distribution;


/// Counts aligned with the categories of the distribution that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryCounts {
    ids: Vec<String>,
    counts: Vec<usize>,
}


impl CategoryCounts {
    pub fn zero(distribution: &Distribution) -> Self {
        CategoryCounts {
            ids: distribution.categories.iter().map(|c| c.id.clone()).collect(),
            counts: vec![0; distribution.len()],
        }
    }

    pub fn get(&self, index: usize) -> usize {
        self.counts[index]
    }

    pub fn by_id(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|i| i == id).map(|index| self.counts[index])
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.ids.iter().map(|id| id.as_str()).zip(self.counts.iter().cloned())
    }
}


impl<'a> AddAssign<&'a CategoryCounts> for CategoryCounts {
    fn add_assign(&mut self, other: &'a CategoryCounts) {
        for (count, extra) in self.counts.iter_mut().zip(other.counts.iter()) {
            *count += extra;
        }
    }
}


impl Serialize for CategoryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.ids.len()))?;
        for (id, count) in self.iter() {
            map.serialize_entry(id, &count)?;
        }
        map.end()
    }
}


/// Count how many of `rows` fall in each category of `distribution`. A row counts
/// towards every category whose types it matches.
pub fn count_by_category<'a, I>(rows: I, distribution: &Distribution) -> CategoryCounts
where
    I: IntoIterator<Item = &'a Question>,
{
    let mut counts = CategoryCounts::zero(distribution);
    for q in rows {
        for (i, category) in distribution.categories.iter().enumerate() {
            if category.matches_type(&q.kind) {
                counts.counts[i] += 1;
            }
        }
    }
    counts
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::QuizStyle;

    #[test]
    fn counts_each_category() {
        let gospel = Distribution::builtin(QuizStyle::Gospel);
        let rows = vec![
            Question::new("Matthew", 1, 1, "int"),
            Question::new("Matthew", 1, 2, "int"),
            Question::new("Matthew", 1, 3, "CVRMA"),
            Question::new("Matthew", 1, 4, "sit3"),
            Question::new("Matthew", 1, 5, "q2"),
            Question::new("Matthew", 1, 6, "unknown"),
        ];
        let counts = count_by_category(rows.iter(), &gospel);
        assert_eq!(counts.by_id("int"), Some(2));
        assert_eq!(counts.by_id("cr"), Some(1));
        assert_eq!(counts.by_id("ft"), Some(0));
        assert_eq!(counts.by_id("q"), Some(1));
        assert_eq!(counts.by_id("sit"), Some(1));
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn counting_is_repeatable() {
        let epistle = Distribution::builtin(QuizStyle::Epistle);
        let rows = vec![Question::new("Romans", 1, 1, "ft"), Question::new("Romans", 1, 2, "ma")];
        assert_eq!(count_by_category(&rows, &epistle), count_by_category(&rows, &epistle));
    }

    #[test]
    fn counts_can_be_accumulated() {
        let epistle = Distribution::builtin(QuizStyle::Epistle);
        let first = vec![Question::new("Romans", 1, 1, "int")];
        let second = vec![Question::new("Romans", 1, 2, "int"), Question::new("Romans", 1, 3, "q")];
        let mut counts = count_by_category(&first, &epistle);
        counts += &count_by_category(&second, &epistle);
        assert_eq!(counts.by_id("int"), Some(2));
        assert_eq!(counts.by_id("q"), Some(1));
        assert_eq!(counts.get(0), 2);
    }

    #[test]
    fn empty_rows_count_zero() {
        let epistle = Distribution::builtin(QuizStyle::Epistle);
        let counts = count_by_category(Vec::<&Question>::new(), &epistle);
        assert_eq!(counts.total(), 0);
        assert_eq!(counts.iter().count(), 5);
    }
}
