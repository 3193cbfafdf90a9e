/**
 * The question bank: an immutable table of questions keyed by their position, plus
 * loaders for JSON record exports and SQLite tables.
 *
 * Rows are never modified once loaded. Everything that changes during a run (used
 * markers, repeat markers) lives in `pool::RunState`.
 */
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use super::common::{QuizError, Result};


/// Index of a question within its bank. Two pool entries with the same id are the
/// same row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QuestionId(pub usize);


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub book: String,
    pub chapter: i64,
    pub verse: i64,
    pub verse_end: Option<i64>,
    /// Canonical lower-cased type tag, e.g. `int` or `cvrma`.
    #[serde(rename = "type")]
    pub kind: String,
    pub question: String,
    pub answer: String,
    /// Eligibility tag such as `150` or `300`; empty when the verse is in no club.
    pub club: String,
    pub set: String,
    pub question_keywords: Vec<String>,
    pub answer_keywords: Vec<String>,
    /// Flags carried in from the source table. Run-time markers are added on output.
    pub flags: String,
    /// Book-chapter-verse key. Identifies a verse location, not a question.
    pub bcv: String,
}


impl Question {
    /// Return a new question with the given location and type and placeholder text.
    pub fn new(book: &str, chapter: i64, verse: i64, kind: &str) -> Self {
        Question {
            book: String::from(book),
            chapter,
            verse,
            verse_end: None,
            kind: canonical_type(kind),
            question: format!("{} question on {} {}:{}", kind, book, chapter, verse),
            answer: String::from("answer"),
            club: String::new(),
            set: String::new(),
            question_keywords: Vec::new(),
            answer_keywords: Vec::new(),
            flags: String::new(),
            bcv: make_bcv(book, chapter, verse),
        }
    }

    /// Human-readable verse reference, e.g. `Matthew 5:3-4`.
    pub fn reference(&self) -> String {
        match self.verse_end {
            Some(end) if end != self.verse => {
                format!("{} {}:{}-{}", self.book, self.chapter, self.verse, end)
            },
            _ => format!("{} {}:{}", self.book, self.chapter, self.verse),
        }
    }
}


pub fn make_bcv(book: &str, chapter: i64, verse: i64) -> String {
    format!("{}_{}_{}", book, chapter, verse)
}


/// Lower-case, trim and NFC-normalize a raw type tag.
pub fn canonical_type(raw: &str) -> String {
    raw.trim().to_lowercase().nfc().collect::<String>()
}


#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
}


impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        QuestionBank { questions }
    }

    /// Load a bank from a file, choosing the format by extension: `.db`, `.sqlite`
    /// and `.sqlite3` are read as SQLite, anything else as JSON records.
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "db" | "sqlite" | "sqlite3" => {
                let connection = Connection::open(path)?;
                QuestionBank::from_sqlite(&connection)
            },
            _ => {
                let data = fs::read_to_string(path)?;
                QuestionBank::from_json(&data)
            },
        }
    }

    /// Parse a JSON array of records, one object per question.
    pub fn from_json(data: &str) -> Result<Self> {
        let records: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_str(data)?;

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let mut row = RawRow::new();
            for (key, value) in record {
                row.insert(key.trim().to_uppercase(), Cell::from_json(value));
            }
            rows.push(row);
        }
        QuestionBank::from_rows(rows)
    }

    /// Read every row of the `questions` table.
    pub fn from_sqlite(connection: &Connection) -> Result<Self> {
        let mut stmt = connection.prepare("SELECT * FROM questions")?;
        let names: Vec<String> = stmt.column_names()
            .iter()
            .map(|name| name.trim().to_uppercase())
            .collect();

        let mut rows = Vec::new();
        let mut result = stmt.query([])?;
        while let Some(sql_row) = result.next()? {
            let mut row = RawRow::new();
            for (i, name) in names.iter().enumerate() {
                let value: SqlValue = sql_row.get(i)?;
                row.insert(name.clone(), Cell::from_sql(value));
            }
            rows.push(row);
        }
        QuestionBank::from_rows(rows)
    }

    fn from_rows(rows: Vec<RawRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(QuizError::Load { row: None, message: String::from("no questions") });
        }

        let mut questions = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            questions.push(question_from_row(i + 1, row)?);
        }
        Ok(QuestionBank { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: QuestionId) -> &Question {
        &self.questions[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &Question)> {
        self.questions.iter().enumerate().map(|(i, q)| (QuestionId(i), q))
    }

    /// Lazy view of the questions satisfying `predicate`.
    pub fn filter<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = (QuestionId, &'a Question)>
    where
        P: Fn(&Question) -> bool + 'a,
    {
        self.iter().filter(move |&(_, q)| predicate(q))
    }

    /// Questions whose type tag is one of `tags`.
    pub fn with_types<'a>(
        &'a self, tags: &'a [String]
    ) -> impl Iterator<Item = (QuestionId, &'a Question)> {
        self.filter(move |q| tags.iter().any(|t| *t == q.kind))
    }

    /// Questions whose club and set tags fall within the given allowances. `None`
    /// means unrestricted.
    pub fn eligible<'a>(
        &'a self, clubs: Option<&'a [String]>, sets: Option<&'a [String]>
    ) -> impl Iterator<Item = (QuestionId, &'a Question)> {
        self.filter(move |q| is_eligible(q, clubs, sets))
    }

    /// Every book in the bank, in order of first appearance, with its chapters in
    /// ascending order.
    pub fn books(&self) -> Vec<(String, Vec<i64>)> {
        let mut books: Vec<(String, Vec<i64>)> = Vec::new();
        for q in self.questions.iter() {
            let index = match books.iter().position(|(b, _)| *b == q.book) {
                Some(index) => index,
                None => {
                    books.push((q.book.clone(), Vec::new()));
                    books.len() - 1
                },
            };
            let chapters = &mut books[index].1;
            if !chapters.contains(&q.chapter) {
                chapters.push(q.chapter);
            }
        }
        for (_, chapters) in books.iter_mut() {
            chapters.sort();
        }
        books
    }
}


pub fn is_eligible(q: &Question, clubs: Option<&[String]>, sets: Option<&[String]>) -> bool {
    clubs.map_or(true, |clubs| clubs.contains(&q.club))
        && sets.map_or(true, |sets| sets.contains(&q.set))
}


/// One untyped cell from a JSON record or a SQLite row.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

type RawRow = HashMap<String, Cell>;


impl Cell {
    fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Null,
            serde_json::Value::Bool(b) => Cell::Int(b as i64),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Cell::Int(i)
                } else {
                    Cell::Real(n.as_f64().unwrap_or(f64::NAN))
                }
            },
            serde_json::Value::String(s) => Cell::Text(s),
            other => Cell::Text(other.to_string()),
        }
    }

    fn from_sql(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Cell::Null,
            SqlValue::Integer(i) => Cell::Int(i),
            SqlValue::Real(r) => Cell::Real(r),
            SqlValue::Text(s) => Cell::Text(s),
            SqlValue::Blob(b) => Cell::Text(String::from_utf8_lossy(&b).into_owned()),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Real(r) => r.is_nan(),
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Int(_) => false,
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::Real(r) if r.is_finite() && r.fract() == 0.0 => Some(*r as i64),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>().ok()
                        .filter(|r| r.is_finite() && r.fract() == 0.0)
                        .map(|r| r as i64)
                })
            },
            _ => None,
        }
    }

    /// Text form of the cell; integral floats lose their `.0`.
    fn as_text(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Int(i) => i.to_string(),
            Cell::Real(r) if r.is_nan() => String::new(),
            Cell::Real(r) if r.fract() == 0.0 => format!("{}", *r as i64),
            Cell::Real(r) => r.to_string(),
            // Spreadsheet exports carry non-breaking spaces.
            Cell::Text(s) => s.replace('\u{a0}', " ").trim().to_string(),
        }
    }
}


fn lookup<'a>(row: &'a RawRow, names: &[&str]) -> Option<&'a Cell> {
    names.iter().filter_map(|name| row.get(*name)).next()
}


fn required<'a>(row: &'a RawRow, names: &[&str]) -> Result<&'a Cell> {
    lookup(row, names).ok_or_else(|| QuizError::MissingColumn(names[0].to_string()))
}


fn required_int(lineno: usize, row: &RawRow, names: &[&str]) -> Result<i64> {
    let cell = required(row, names)?;
    cell.as_int().ok_or_else(|| QuizError::Load {
        row: Some(lineno),
        message: format!("{} value {:?} is not an integer", names[0], cell),
    })
}


fn optional_text(row: &RawRow, names: &[&str]) -> String {
    lookup(row, names).map(|c| c.as_text()).unwrap_or_default()
}


fn split_keywords(s: &str) -> Vec<String> {
    s.split(',').map(|w| w.trim().to_string()).filter(|w| !w.is_empty()).collect()
}


fn question_from_row(lineno: usize, row: &RawRow) -> Result<Question> {
    let book = required(row, &["BK", "BOOK"])?.as_text();
    let chapter = required_int(lineno, row, &["CH", "CHAPTER"])?;
    let verse = required_int(lineno, row, &["VS", "VERSE"])?;
    let kind = canonical_type(&required(row, &["TYPE"])?.as_text());
    let question = required(row, &["QUESTION"])?.as_text();
    let answer = required(row, &["ANSWER"])?.as_text();

    if book.is_empty() {
        return Err(QuizError::Load { row: Some(lineno), message: String::from("empty book") });
    }
    if kind.is_empty() {
        return Err(QuizError::Load { row: Some(lineno), message: String::from("empty type") });
    }

    let verse_end = match lookup(row, &["VE", "VERSE_END"]) {
        Some(cell) if !cell.is_blank() => {
            Some(cell.as_int().ok_or_else(|| QuizError::Load {
                row: Some(lineno),
                message: format!("VE value {:?} is not an integer", cell),
            })?)
        },
        _ => None,
    };

    let bcv = match lookup(row, &["BCV"]) {
        Some(cell) if !cell.is_blank() => cell.as_text(),
        _ => make_bcv(&book, chapter, verse),
    };

    Ok(Question {
        chapter,
        verse,
        verse_end,
        kind,
        question,
        answer,
        club: optional_text(row, &["CLUB", "GROUP"]),
        set: optional_text(row, &["SET"]),
        question_keywords: split_keywords(&optional_text(row, &["QKEYWORDS"])),
        answer_keywords: split_keywords(&optional_text(row, &["AKEYWORDS"])),
        flags: optional_text(row, &["FLAGS"]),
        bcv,
        book,
    })
}
