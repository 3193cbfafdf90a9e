/**
 * The quiz makeup: which content each period covers and what share of every quiz it
 * contributes.
 *
 * Content is written as text such as `Matthew 1-4,6` (whole chapters) or
 * `1 Peter 1:1-2:10` (an inclusive verse interval).
 */
use std::str::FromStr;

use serde::Serialize;

use super::bank::{Question, QuestionBank};
use super::common::{QuizError, Result};


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentRange {
    Chapters { book: String, chapters: Vec<i64> },
    /// Inclusive interval of (chapter, verse) locations within one book.
    Verses { book: String, start: (i64, i64), end: (i64, i64) },
}


impl ContentRange {
    pub fn contains(&self, q: &Question) -> bool {
        match self {
            ContentRange::Chapters { book, chapters } => {
                q.book == *book && chapters.contains(&q.chapter)
            },
            ContentRange::Verses { book, start, end } => {
                let location = (q.chapter, q.verse);
                q.book == *book && *start <= location && location <= *end
            },
        }
    }

    /// Parse one content entry. A comma list of verse intervals yields several
    /// ranges; a chapter list yields one.
    pub fn parse_list(s: &str) -> Result<Vec<ContentRange>> {
        let s = s.trim();
        // The chapter/verse part is the trailing run of digits and separators.
        let split = s.char_indices()
            .rev()
            .take_while(|&(_, c)| c.is_ascii_digit() || c.is_whitespace() || ":-,".contains(c))
            .last()
            .map(|(i, _)| i)
            .unwrap_or_else(|| s.len());
        let book = s[..split].trim();
        let ranges = s[split..].trim();
        if book.is_empty() || ranges.is_empty() {
            return Err(bad_range(s));
        }

        if ranges.contains(':') {
            let mut verses = Vec::new();
            for interval in ranges.split(',').map(str::trim).filter(|i| !i.is_empty()) {
                let (start, end) = match interval.find('-') {
                    Some(dash) => (&interval[..dash], &interval[dash + 1..]),
                    None => (interval, interval),
                };
                let start = parse_location(start).ok_or_else(|| bad_range(s))?;
                let end = parse_location(end).ok_or_else(|| bad_range(s))?;
                if end < start {
                    return Err(bad_range(s));
                }
                verses.push(ContentRange::Verses { book: String::from(book), start, end });
            }
            Ok(verses)
        } else {
            let chapters = parse_chapter_list(ranges).ok_or_else(|| bad_range(s))?;
            Ok(vec![ContentRange::Chapters { book: String::from(book), chapters }])
        }
    }
}


impl FromStr for ContentRange {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self> {
        let mut ranges = ContentRange::parse_list(s)?;
        if ranges.len() != 1 {
            return Err(bad_range(s));
        }
        Ok(ranges.remove(0))
    }
}


fn bad_range(s: &str) -> QuizError {
    QuizError::Configuration(format!("cannot parse content range '{}'", s))
}


fn parse_location(s: &str) -> Option<(i64, i64)> {
    let colon = s.find(':')?;
    let chapter = s[..colon].trim().parse().ok()?;
    let verse = s[colon + 1..].trim().parse().ok()?;
    Some((chapter, verse))
}


/// Parse `1-3,5` into `[1, 2, 3, 5]`.
fn parse_chapter_list(s: &str) -> Option<Vec<i64>> {
    let mut chapters = Vec::new();
    for item in s.split(',').map(str::trim).filter(|i| !i.is_empty()) {
        if let Some(dash) = item.find('-') {
            let lo: i64 = item[..dash].trim().parse().ok()?;
            let hi: i64 = item[dash + 1..].trim().parse().ok()?;
            if hi < lo {
                return None;
            }
            chapters.extend(lo..=hi);
        } else {
            chapters.push(item.parse().ok()?);
        }
    }
    if chapters.is_empty() {
        None
    } else {
        Some(chapters)
    }
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Period {
    pub name: String,
    /// Share of each quiz drawn from this period.
    pub fraction: f64,
    pub content: Vec<ContentRange>,
}


impl Period {
    pub fn new(name: &str, fraction: f64, content: Vec<ContentRange>) -> Self {
        Period { name: String::from(name), fraction, content }
    }

    pub fn contains(&self, q: &Question) -> bool {
        self.content.iter().any(|range| range.contains(q))
    }
}


/// Periods in the order they were configured. Quizzes are filled period by period
/// in this order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizMakeup {
    pub periods: Vec<Period>,
}


impl QuizMakeup {
    pub fn new(periods: Vec<Period>) -> Result<Self> {
        let makeup = QuizMakeup { periods };
        makeup.validate()?;
        Ok(makeup)
    }

    /// A single `current` period covering every chapter in the bank.
    pub fn everything(bank: &QuestionBank) -> Self {
        let content = bank.books()
            .into_iter()
            .map(|(book, chapters)| ContentRange::Chapters { book, chapters })
            .collect();
        QuizMakeup { periods: vec![Period::new("current", 1.0, content)] }
    }

    pub fn validate(&self) -> Result<()> {
        if self.periods.is_empty() {
            return Err(QuizError::Configuration(String::from("quiz makeup has no periods")));
        }
        for (i, period) in self.periods.iter().enumerate() {
            if !period.fraction.is_finite() || period.fraction < 0.0 || period.fraction > 1.0 {
                return Err(QuizError::Configuration(format!(
                    "period '{}' has fraction {} outside [0, 1]", period.name, period.fraction
                )));
            }
            if self.periods[..i].iter().any(|p| p.name == period.name) {
                return Err(QuizError::Configuration(format!(
                    "period '{}' is listed twice", period.name
                )));
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_parse_chapter_lists() {
        let ranges = ContentRange::parse_list("Matthew 1-3,5").unwrap();
        assert_eq!(ranges, vec![ContentRange::Chapters {
            book: s("Matthew"), chapters: vec![1, 2, 3, 5],
        }]);

        let range: ContentRange = "1 Peter 2".parse().unwrap();
        assert_eq!(range, ContentRange::Chapters { book: s("1 Peter"), chapters: vec![2] });
    }

    #[test]
    fn can_parse_verse_intervals() {
        let ranges = ContentRange::parse_list("Romans 1:1-2:10, 3:5-3:9").unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0], ContentRange::Verses {
            book: s("Romans"), start: (1, 1), end: (2, 10),
        });
        assert_eq!(ranges[1], ContentRange::Verses {
            book: s("Romans"), start: (3, 5), end: (3, 9),
        });
    }

    #[test]
    fn rejects_malformed_ranges() {
        assert!(ContentRange::parse_list("Matthew").is_err());
        assert!(ContentRange::parse_list("Matthew 4-2").is_err());
        assert!(ContentRange::parse_list("Matthew 2:1-1:1").is_err());
        assert!(ContentRange::parse_list("Matthew x").is_err());
    }

    #[test]
    fn verse_interval_spans_chapters() {
        let range: ContentRange = "Romans 1:30-2:2".parse().unwrap();
        assert!(range.contains(&Question::new("Romans", 1, 31, "int")));
        assert!(range.contains(&Question::new("Romans", 2, 2, "int")));
        assert!(!range.contains(&Question::new("Romans", 2, 3, "int")));
        assert!(!range.contains(&Question::new("Romans", 1, 29, "int")));
        assert!(!range.contains(&Question::new("James", 1, 31, "int")));
    }

    #[test]
    fn makeup_validation() {
        let good = QuizMakeup::new(vec![
            Period::new("past", 0.5, Vec::new()),
            Period::new("current", 0.5, Vec::new()),
        ]);
        assert!(good.is_ok());

        assert!(QuizMakeup::new(Vec::new()).is_err());
        assert!(QuizMakeup::new(vec![Period::new("past", 1.5, Vec::new())]).is_err());
        assert!(QuizMakeup::new(vec![
            Period::new("past", 0.5, Vec::new()),
            Period::new("past", 0.5, Vec::new()),
        ]).is_err());
    }

    #[test]
    fn default_makeup_covers_the_bank() {
        let bank = QuestionBank::new(vec![
            Question::new("Acts", 2, 1, "int"),
            Question::new("Acts", 1, 1, "int"),
            Question::new("James", 1, 1, "q"),
        ]);
        let makeup = QuizMakeup::everything(&bank);
        assert_eq!(makeup.periods.len(), 1);
        assert_eq!(makeup.periods[0].name, "current");
        assert_eq!(makeup.periods[0].fraction, 1.0);
        assert!(bank.iter().all(|(_, q)| makeup.periods[0].contains(q)));
    }

    fn s(mystr: &str) -> String {
        String::from(mystr)
    }
}
