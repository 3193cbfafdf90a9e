/**
 * Terminal rendering of packets and content counts.
 *
 * Output goes to any `io::Write` so that the same code prints to the terminal and to a
 * buffer in tests.
 */
use std::io::Write;

use colored::*;

use super::assembler::{Packet, QuizRow, QuizStats};
use super::common::{QuizError, Result};
use super::content::ContentPools;
use super::distribution::Distribution;


#[macro_export]
macro_rules! my_writeln {
    ($out:expr) => (
        writeln!($out).map_err(QuizError::Io)
    );
    ($out:expr, $($arg:tt)*) => (
        writeln!($out, $($arg)*).map_err(QuizError::Io)
    );
}

#[macro_export]
macro_rules! my_write {
    ($out:expr, $($arg:tt)*) => (
        write!($out, $($arg)*).map_err(QuizError::Io)
    );
}


const LABEL_WIDTH: usize = 5;
const TYPE_WIDTH: usize = 7;


pub struct RenderOptions {
    pub title: String,
    /// Total line width, including the label and type columns.
    pub width: usize,
}


impl RenderOptions {
    /// Options for printing to the current terminal.
    pub fn for_terminal(title: &str) -> Self {
        RenderOptions { title: String::from(title), width: textwrap::termwidth() }
    }
}


pub fn render_packet<W: Write>(out: &mut W, packet: &Packet, options: &RenderOptions) -> Result<()> {
    let mut title = options.title.clone();
    if packet.loose {
        title.push_str(" (loose)");
    }
    my_writeln!(out, "{}", title.bold())?;
    if let Some(seed) = packet.seed {
        my_writeln!(out, "seed {}", seed)?;
    }
    if packet.loose {
        my_writeln!(
            out,
            "{}",
            "Some quizzes could not meet every minimum and were generated with loosened quotas."
                .yellow()
        )?;
    }

    for (quiz, stats) in packet.quizzes.iter().zip(packet.stats.iter()) {
        my_writeln!(out)?;
        let heading = if quiz.loose {
            format!("Quiz {} (loose)", quiz.number)
        } else {
            format!("Quiz {}", quiz.number)
        };
        my_writeln!(out, "{}", heading.cyan().bold())?;
        for row in quiz.rows.iter() {
            render_row(out, row, options.width)?;
        }
        if let Some(summary) = distribution_summary(&packet.distribution, stats) {
            my_writeln!(out, "{}", summary.white())?;
        }
    }

    if !packet.extra_questions.is_empty() {
        my_writeln!(out)?;
        my_writeln!(out, "{}", "Extra Questions".cyan().bold())?;
        for extra in packet.extra_questions.iter() {
            my_writeln!(out)?;
            let heading = format!("{} ({})", extra.label, extra.types.join(", "));
            my_writeln!(out, "{}", heading.bold())?;
            for row in extra.rows.iter() {
                render_row(out, row, options.width)?;
            }
        }
    }
    Ok(())
}


/// One row as
///
///    12  INT    Q: Who ...
///               A: The ...
///               Matthew 5:3 (150) repeat
fn render_row<W: Write>(out: &mut W, row: &QuizRow, width: usize) -> Result<()> {
    let q = &row.question;
    let indent = " ".repeat(LABEL_WIDTH + 2 + TYPE_WIDTH);
    let text_width = width.saturating_sub(indent.len() + 3).max(20);

    let mut lines = textwrap::wrap_iter(&q.question, text_width);
    let first = lines.next().map(|l| l.into_owned()).unwrap_or_default();
    my_writeln!(
        out,
        "{}  {:<width$}Q: {}",
        format!("{:>width$}", row.qn, width = LABEL_WIDTH).bold(),
        q.kind.to_uppercase(),
        emphasize(&first, &q.question_keywords),
        width = TYPE_WIDTH
    )?;
    for line in lines {
        my_writeln!(out, "{}   {}", indent, emphasize(&line, &q.question_keywords))?;
    }

    for (i, line) in textwrap::wrap_iter(&q.answer, text_width).enumerate() {
        let prefix = if i == 0 { "A: " } else { "   " };
        my_writeln!(out, "{}{}{}", indent, prefix, emphasize(&line, &q.answer_keywords))?;
    }

    let mut reference = q.reference();
    if !q.club.is_empty() {
        reference.push_str(&format!(" ({})", q.club));
    }
    my_write!(out, "{}{}", indent, reference.dimmed())?;
    if row.is_repeat() {
        my_write!(out, " {}", "repeat".red())?;
    }
    my_writeln!(out)
}


/// Bold every word of `line` that matches one of `keywords`, ignoring case and
/// surrounding punctuation.
pub fn emphasize(line: &str, keywords: &[String]) -> String {
    if keywords.is_empty() {
        return String::from(line);
    }
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    line.split(' ')
        .map(|word| {
            let bare = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if !bare.is_empty() && keywords.contains(&bare) {
                word.bold().to_string()
            } else {
                String::from(word)
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}


/// `INT:10-12 (req: 8-14), CR:4-6 (req: 3-6), ...`: the main block count, then the
/// count with the supplemental block, then the required range. `None` without quotas.
pub fn distribution_summary(distribution: &Distribution, stats: &QuizStats) -> Option<String> {
    if distribution.is_quota_free() {
        return None;
    }
    let parts: Vec<String> = distribution.categories.iter()
        .map(|c| {
            format!(
                "{}:{}-{} (req: {}-{})",
                c.id.to_uppercase(),
                stats.main.by_id(&c.id).unwrap_or(0),
                stats.cumulative.by_id(&c.id).unwrap_or(0),
                c.min,
                c.max
            )
        })
        .collect();
    Some(parts.join(", "))
}


/// Candidate counts per period and category, with empty combinations highlighted.
pub fn render_content<W: Write>(
    out: &mut W, content: &ContentPools, distribution: &Distribution
) -> Result<()> {
    for period in content.periods.iter() {
        my_writeln!(
            out,
            "{} ({:.0}%): {} questions",
            period.name.bold(),
            period.fraction * 100.0,
            period.ids.len()
        )?;
        for (category, count) in distribution.categories.iter().zip(period.per_category.iter()) {
            let count_text = format!("{:>5}", count);
            let count_text = if *count == 0 { count_text.red() } else { count_text.normal() };
            my_writeln!(out, "  {:<6}{}  {}", category.id, count_text, category.label)?;
        }
    }
    Ok(())
}
