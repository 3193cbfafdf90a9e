/**
 * Definitions of data structures used by several modules, such as `QuizError` and the
 * various structs that hold command-line arguments.
 */
use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use structopt::StructOpt;
use thiserror::Error;


pub type Result<T> = ::std::result::Result<T, QuizError>;


/// The three ordered question blocks of a quiz, plus the packet's extra questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Block {
    Main,
    Supplemental,
    Overtime,
    /// Spare questions drawn after every quiz of the packet.
    Extra,
}


impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Block::Main => write!(f, "main"),
            Block::Supplemental => write!(f, "supplemental"),
            Block::Overtime => write!(f, "overtime"),
            Block::Extra => write!(f, "extra"),
        }
    }
}


#[derive(Debug, Error)]
pub enum QuizError {
    /// For bank rows that cannot be turned into questions.
    #[error("could not load question bank{}: {message}", row_suffix(.row))]
    Load { row: Option<usize>, message: String },
    #[error("question bank is missing required column '{0}'")]
    MissingColumn(String),
    /// Invalid quiz type, unsupported options, malformed ranges and the like.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A block could not be filled within its retry budget.
    #[error(
        "cannot generate enough {block} questions for quiz {quiz} from period '{period}' \
         to meet the distribution; consider widening the chapter ranges, rerunning with \
         a different seed, or enabling loose mode"
    )]
    DistributionUnsatisfiable { quiz: usize, block: Block, period: String },
    #[error("could not parse JSON ({0})")]
    Json(#[from] serde_json::Error),
    #[error("could not parse TOML ({0})")]
    Toml(#[from] toml::de::Error),
    #[error("SQLite error ({0})")]
    Sql(#[from] rusqlite::Error),
    #[error("IO error ({0})")]
    Io(#[from] io::Error),
}


fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(row) => format!(" (row {})", row),
        None => String::new(),
    }
}


pub fn is_broken_pipe(e: &QuizError) -> bool {
    if let QuizError::Io(e) = e {
        if let io::ErrorKind::BrokenPipe = e.kind() {
            return true;
        }
    }
    false
}


/// Holds the command-line configuration for the application.
#[derive(StructOpt)]
#[structopt(name = "quizpacket", about = "Generate quiz packets from a question bank.")]
pub struct Options {
    /// Do not emit colorized output.
    #[structopt(long = "no-color")]
    pub no_color: bool,
    /// Log every pick.
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Generate a packet of quizzes.
    #[structopt(name = "generate")]
    Generate(GenerateOptions),
    /// Count the candidate questions per period and category.
    #[structopt(name = "count")]
    Count(CountOptions),
}

/// These options are shared between the `generate` and `count` subcommands.
#[derive(StructOpt)]
pub struct SourceOptions {
    /// Question bank (JSON records, or a SQLite database).
    #[structopt(short = "b", long = "bank", parse(from_os_str))]
    pub bank: PathBuf,
    /// Packet configuration in TOML.
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    pub config: Option<PathBuf>,
}

#[derive(StructOpt)]
pub struct GenerateOptions {
    #[structopt(flatten)]
    pub source: SourceOptions,
    /// Seed for the random number generator.
    #[structopt(long = "seed")]
    pub seed: Option<u64>,
    /// Number of quizzes in the packet.
    #[structopt(short = "n", long = "nquiz")]
    pub nquiz: Option<usize>,
    /// Number of extra questions per category.
    #[structopt(short = "x", long = "xtra")]
    pub xtra: Option<usize>,
    /// Relax minimum quotas when content runs short.
    #[structopt(long = "loose")]
    pub loose: bool,
    /// Keep questions grouped by period instead of scrambling them.
    #[structopt(long = "in-order")]
    pub in_order: bool,
    /// Also write the packet as JSON to this file.
    #[structopt(long = "json", parse(from_os_str))]
    pub json: Option<PathBuf>,
    /// Title printed above the packet.
    #[structopt(long = "title", default_value = "CM&A Bible Quizzes")]
    pub title: String,
}

#[derive(StructOpt)]
pub struct CountOptions {
    #[structopt(flatten)]
    pub source: SourceOptions,
}
