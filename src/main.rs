/**
 * Generate quiz packets from the command line.
 */
use std::io;
use std::io::Write;

use colored::*;
use structopt::StructOpt;

use quizpacket::common::{self, Command, CountOptions, GenerateOptions, Options, SourceOptions};
use quizpacket::render::{self, RenderOptions};
use quizpacket::{logging, my_writeln};
use quizpacket::{GeneratorConfig, QuestionBank, QuizError, QuizGenerator, QuizStyle, Result};


fn main() {
    let options = Options::from_args();

    if options.no_color {
        colored::control::set_override(false);
    }
    logging::init(options.verbose);

    let result = match options.cmd {
        Command::Generate(options) => {
            main_generate(options)
        },
        Command::Count(options) => {
            main_count(options)
        },
    };

    if let Err(e) = result {
        if !common::is_broken_pipe(&e) {
            eprintln!("{}: {}", "Error".red(), e);
            ::std::process::exit(2);
        }
    }
}


/// The main function for the `generate` subcommand.
pub fn main_generate(options: GenerateOptions) -> Result<()> {
    let (bank, mut config) = load_source(&options.source)?;

    if let Some(nquiz) = options.nquiz {
        config.nquiz = nquiz;
    }
    if let Some(xtra) = options.xtra {
        config.xtra = xtra;
    }
    if options.loose {
        config.loose = true;
    }
    if options.in_order {
        config.scramble_period = false;
    }
    // Always run from a known seed so that any packet can be regenerated.
    let seed = options.seed.or(config.seed).unwrap_or_else(rand::random);

    let generator = QuizGenerator::new(bank, config)?;
    let packet = generator.generate_seeded(seed)?;

    if let Some(path) = &options.json {
        packet.save_json(path)?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    render::render_packet(&mut out, &packet, &RenderOptions::for_terminal(&options.title))
}


/// The main function for the `count` subcommand.
pub fn main_count(options: CountOptions) -> Result<()> {
    let (bank, config) = load_source(&options.source)?;
    let generator = QuizGenerator::new(bank, config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    my_writeln!(out, "{} questions in the bank", generator.bank().len())?;
    render::render_content(&mut out, generator.content(), &generator.config().distribution)?;

    let warnings = generator.warnings().len();
    if warnings > 0 {
        my_writeln!(
            out,
            "{}",
            format!("{} period/category combination(s) have no questions", warnings).red()
        )?;
    }
    Ok(())
}


fn load_source(source: &SourceOptions) -> Result<(QuestionBank, GeneratorConfig)> {
    let bank = QuestionBank::load(&source.bank)?;
    let config = match &source.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::new(QuizStyle::Epistle),
    };
    Ok((bank, config))
}
