/**
 * Generator configuration, read from TOML or built in code, and the `QuizGenerator`
 * that runs a whole batch from it.
 *
 * A configuration file looks like this; every key is optional:
 *
 *   quiz_type = "gospel"
 *   nquiz = 6
 *   xtra = 5
 *   loose = false
 *
 *   [[period]]
 *   name = "current"
 *   fraction = 1.0
 *   content = ["Matthew 5-7"]
 *
 *   [categories.q]
 *   range = [2, 3]
 *   limit = ["150", "300"]
 */
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::assembler::{Packet, QuizAssembler};
use super::bank::QuestionBank;
use super::common::{QuizError, Result};
use super::content::{resolve_content, ContentPools, ContentWarning};
use super::distribution::{CategoryOverride, Distribution, QuizStyle};
use super::extra::ExtraPool;
use super::labels::{LabelTemplate, QuizFormat, MAIN_QUESTIONS};
use super::makeup::{ContentRange, Period, QuizMakeup};
use super::pool::RunState;


pub const DEFAULT_NQUIZ: usize = 1;
pub const DEFAULT_XTRA: usize = 5;
pub const DEFAULT_NQUESTION: usize = 30;


#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    quiz_type: Option<String>,
    nquiz: Option<usize>,
    xtra: Option<usize>,
    nquestion: Option<usize>,
    scramble_period: Option<bool>,
    loose: Option<bool>,
    rules2013: Option<bool>,
    seed: Option<u64>,
    #[serde(default)]
    period: Vec<RawPeriod>,
    #[serde(default)]
    categories: BTreeMap<String, RawCategory>,
    labels: Option<RawLabels>,
}


#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPeriod {
    name: String,
    fraction: f64,
    #[serde(default)]
    content: Vec<String>,
}


#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCategory {
    range: Option<(usize, usize)>,
    limit: Option<Vec<String>>,
    set: Option<Vec<String>>,
    types: Option<Vec<String>>,
    label: Option<String>,
}


#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLabels {
    supplemental: Option<Vec<String>>,
    overtime: Option<Vec<String>>,
    order: Option<Vec<String>>,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratorConfig {
    pub distribution: Distribution,
    /// `None` covers the whole bank with a single `current` period.
    pub makeup: Option<QuizMakeup>,
    pub format: QuizFormat,
    pub nquiz: usize,
    pub xtra: usize,
    pub scramble_period: bool,
    pub loose: bool,
    pub seed: Option<u64>,
}


impl GeneratorConfig {
    pub fn new(style: QuizStyle) -> Self {
        let format = match style {
            QuizStyle::Custom => QuizFormat::custom(DEFAULT_NQUESTION),
            _ => QuizFormat::standard(),
        };
        GeneratorConfig {
            distribution: Distribution::builtin(style),
            makeup: None,
            format,
            nquiz: DEFAULT_NQUIZ,
            xtra: DEFAULT_XTRA,
            scramble_period: true,
            loose: false,
            seed: None,
        }
    }

    pub fn style(&self) -> QuizStyle {
        self.distribution.style
    }

    /// Set the number of questions per quiz. Only custom quizzes have a free size; the
    /// standard formats ignore this.
    pub fn with_nquestion(mut self, nquestion: usize) -> Self {
        if self.style() == QuizStyle::Custom {
            self.format = QuizFormat::custom(nquestion);
        }
        self
    }

    pub fn with_makeup(mut self, makeup: QuizMakeup) -> Self {
        self.makeup = Some(makeup);
        self
    }

    pub fn override_category(mut self, id: &str, change: &CategoryOverride) -> Result<Self> {
        self.distribution.apply_override(id, change)?;
        Ok(self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        GeneratorConfig::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text)?;
        GeneratorConfig::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        if raw.rules2013.unwrap_or(false) {
            return Err(QuizError::Configuration(String::from("rules2013 is not supported")));
        }

        let style = match &raw.quiz_type {
            Some(name) => name.parse()?,
            None => QuizStyle::Epistle,
        };
        let mut config = GeneratorConfig::new(style)
            .with_nquestion(raw.nquestion.unwrap_or(DEFAULT_NQUESTION));

        if let Some(labels) = raw.labels {
            if style == QuizStyle::Custom {
                return Err(QuizError::Configuration(String::from(
                    "custom quizzes are numbered sequentially and take no [labels]"
                )));
            }
            let standard = LabelTemplate::standard();
            let template = LabelTemplate {
                supplemental: labels.supplemental.or(standard.supplemental),
                overtime: labels.overtime.or(standard.overtime),
                order: labels.order.or(standard.order),
            };
            config.format = QuizFormat::from_template(MAIN_QUESTIONS, template);
        }

        for (id, category) in raw.categories {
            let change = CategoryOverride {
                range: category.range,
                limit: category.limit,
                set: category.set,
                types: category.types,
                label: category.label,
            };
            config.distribution.apply_override(&id, &change)?;
        }

        if !raw.period.is_empty() {
            let mut periods = Vec::with_capacity(raw.period.len());
            for period in raw.period {
                let mut content = Vec::new();
                for text in period.content.iter() {
                    content.extend(ContentRange::parse_list(text)?);
                }
                periods.push(Period::new(&period.name, period.fraction, content));
            }
            config.makeup = Some(QuizMakeup::new(periods)?);
        }

        if let Some(nquiz) = raw.nquiz {
            config.nquiz = nquiz;
        }
        if let Some(xtra) = raw.xtra {
            config.xtra = xtra;
        }
        if let Some(scramble) = raw.scramble_period {
            config.scramble_period = scramble;
        }
        if let Some(loose) = raw.loose {
            config.loose = loose;
        }
        config.seed = raw.seed;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.distribution.validate()?;
        self.format.validate()?;
        if let Some(makeup) = &self.makeup {
            makeup.validate()?;
        }
        Ok(())
    }
}


/// A bank and a configuration, with the content already resolved into period pools.
pub struct QuizGenerator {
    bank: QuestionBank,
    config: GeneratorConfig,
    makeup: QuizMakeup,
    content: ContentPools,
}


impl QuizGenerator {
    pub fn new(bank: QuestionBank, config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let makeup = match &config.makeup {
            Some(makeup) => makeup.clone(),
            None => QuizMakeup::everything(&bank),
        };
        let content = resolve_content(&bank, &makeup, &config.distribution);
        Ok(QuizGenerator { bank, config, makeup, content })
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn makeup(&self) -> &QuizMakeup {
        &self.makeup
    }

    pub fn content(&self) -> &ContentPools {
        &self.content
    }

    pub fn warnings(&self) -> &[ContentWarning] {
        &self.content.warnings
    }

    /// Generate a packet with a generator seeded from `seed`.
    pub fn generate_seeded(&self, seed: u64) -> Result<Packet> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut packet = self.generate(&mut rng)?;
        packet.seed = Some(seed);
        Ok(packet)
    }

    /// Generate `nquiz` quizzes from one shared pool, then the extra questions.
    ///
    /// Nothing is returned if any quiz fails: a run either produces the whole packet or
    /// an error.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Result<Packet> {
        let config = &self.config;
        let mut state = RunState::new(&self.content);
        let assembler = QuizAssembler::new(&self.bank, &config.distribution, &config.format)
            .scramble(config.scramble_period)
            .loose(config.loose);

        let mut quizzes = Vec::with_capacity(config.nquiz);
        let mut stats = Vec::with_capacity(config.nquiz);
        for number in 1..=config.nquiz {
            let (quiz, quiz_stats) = assembler.assemble(number, &mut state, rng)?;
            quizzes.push(quiz);
            stats.push(quiz_stats);
        }

        let extra_questions = ExtraPool::new(&self.bank, &config.distribution)
            .draw_all(config.xtra, &mut state, rng);

        let loose = quizzes.iter().any(|q| q.loose);
        info!("generated {} quizzes{}", quizzes.len(), if loose { " (loose)" } else { "" });
        Ok(Packet {
            quiz_type: config.style(),
            distribution: config.distribution.clone(),
            quizzes,
            extra_questions,
            stats,
            loose,
            seed: None,
            generated_at: chrono::Utc::now(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_read_full_config() {
        let text = r#"
            quiz_type = "gospel"
            nquiz = 4
            xtra = 3
            scramble_period = false
            loose = true
            seed = 17

            [[period]]
            name = "past"
            fraction = 0.5
            content = ["Matthew 1-4,6", "Matthew 5:1-5:20"]

            [[period]]
            name = "current"
            fraction = 0.5
            content = ["Matthew 7-8"]

            [categories.q]
            limit = ["150", "300"]
            set = ["Local"]
            range = [2, 3]
        "#;
        let config = GeneratorConfig::from_toml(text).unwrap();
        assert_eq!(config.style(), QuizStyle::Gospel);
        assert_eq!(config.nquiz, 4);
        assert_eq!(config.xtra, 3);
        assert!(!config.scramble_period);
        assert!(config.loose);
        assert_eq!(config.seed, Some(17));
        assert_eq!(config.format, QuizFormat::standard());

        let makeup = config.makeup.unwrap();
        assert_eq!(makeup.periods.len(), 2);
        assert_eq!(makeup.periods[0].content.len(), 2);

        let q = config.distribution.get(config.distribution.index_of("q").unwrap());
        assert_eq!(q.limit, Some(vec![s("150"), s("300")]));
        assert_eq!(q.set, Some(vec![s("Local")]));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = GeneratorConfig::from_toml("").unwrap();
        assert_eq!(config.style(), QuizStyle::Epistle);
        assert_eq!(config.nquiz, DEFAULT_NQUIZ);
        assert_eq!(config.xtra, DEFAULT_XTRA);
        assert!(config.scramble_period);
        assert!(!config.loose);
        assert_eq!(config.makeup, None);
    }

    #[test]
    fn rejects_bad_configs() {
        let cases = [
            "quiz_type = \"letters\"",
            "rules2013 = true",
            "[categories.zz]\nrange = [1, 2]",
            "[categories.int]\nrange = [5, 1]",
            "[[period]]\nname = \"past\"\nfraction = 2.0",
            "[[period]]\nname = \"past\"\nfraction = 0.5\ncontent = [\"Matthew\"]",
            "quiz_type = \"custom\"\nnquestion = 0",
            "quiz_type = \"custom\"\n[labels]\novertime = [\"21\"]",
            "colour = \"blue\"",
        ];
        for case in cases.iter() {
            assert!(GeneratorConfig::from_toml(case).is_err(), "accepted: {}", case);
        }
    }

    #[test]
    fn rules2013_is_a_configuration_error() {
        match GeneratorConfig::from_toml("rules2013 = true") {
            Err(QuizError::Configuration(message)) => assert!(message.contains("rules2013")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn custom_config_defines_categories_and_size() {
        let text = r#"
            quiz_type = "custom"
            nquestion = 25

            [categories.int]
            types = ["int"]
            label = "Interrogative"
            range = [10, 25]
        "#;
        let config = GeneratorConfig::from_toml(text).unwrap();
        assert_eq!(config.format, QuizFormat::custom(25));
        assert_eq!(config.distribution.len(), 1);
        assert_eq!(config.distribution.get(0).label, "Interrogative");
    }

    #[test]
    fn label_overrides_change_block_sizes() {
        let text = r#"
            [labels]
            overtime = ["21", "22"]
        "#;
        let config = GeneratorConfig::from_toml(text).unwrap();
        assert_eq!(config.format.overtime, 2);
        assert_eq!(config.format.supplemental, 10);
    }

    fn s(mystr: &str) -> String {
        String::from(mystr)
    }
}
