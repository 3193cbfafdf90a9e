/**
 * Generate packets of quizzes from a question bank.
 *
 * Each quiz is drawn at random from the bank so that every question category lands
 * within its count range, each study period contributes its share, and no verse is
 * asked twice in one quiz unless the content runs out. Given the same seed, bank and
 * configuration, generation is reproducible.
 */
#[macro_use]
pub mod render;

pub mod assembler;
pub mod bank;
pub mod common;
pub mod config;
pub mod content;
pub mod counter;
pub mod distribution;
pub mod extra;
pub mod labels;
pub mod logging;
pub mod makeup;
pub mod picker;
pub mod pool;

pub use assembler::{Packet, Quiz, QuizAssembler, QuizRow, QuizStats};
pub use bank::{Question, QuestionBank, QuestionId};
pub use common::{Block, QuizError, Result};
pub use config::{GeneratorConfig, QuizGenerator};
pub use content::{resolve_content, ContentPools, ContentWarning};
pub use counter::{count_by_category, CategoryCounts};
pub use distribution::{Category, CategoryOverride, Distribution, QuizStyle};
pub use extra::{ExtraPool, ExtraQuestions};
pub use labels::{LabelTemplate, QuizFormat};
pub use makeup::{ContentRange, Period, QuizMakeup};
pub use picker::{Pick, PickRequest, QuestionPicker};
pub use pool::RunState;
