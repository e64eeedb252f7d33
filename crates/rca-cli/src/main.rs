//! RCA CLI - generate coverage-maximizing CA rule sequences.
//!
//! Run `rca generate` for a sequence, `rca families` to inspect the
//! grammar's candidate pools.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

use rca_automaton::{
    GeneratorConfig, InitialStrategy, RuleClass, RuleGrammar, SequenceAnalyzer,
    SequenceGenerator, TracingObserver, EXTENDED_MIN_WIDTH,
};

/// RCA: greedy rule-sequence generation over a class-transition grammar.
#[derive(Parser, Debug)]
#[command(
    name = "rca",
    author,
    version,
    about = "Generate coverage-maximizing CA rule sequences",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a rule sequence.
    Generate {
        /// Start class (I..VI).
        #[arg(short, long, default_value = "III")]
        class: String,

        /// Number of cells in the state vector.
        #[arg(short, long, default_value_t = 8)]
        width: usize,

        /// Bits per cell.
        #[arg(short, long, default_value_t = 1)]
        bits: u8,

        /// Initial-state strategy: alternating, class_based, diverse or random.
        #[arg(short, long, default_value = "class_based")]
        strategy: String,

        /// Enable the nonlinear rule families and scoring profile.
        #[arg(short, long)]
        nonlinear: bool,

        /// Maximum sequence length (auto-derived when omitted).
        #[arg(short, long)]
        max_length: Option<usize>,

        /// RNG seed.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Emit the run and its summary as JSON instead of text.
        #[arg(short, long)]
        json: bool,
    },

    /// List the rule families and per-class candidate pools.
    Families {
        /// State width used to decide extended-rule eligibility.
        #[arg(short, long, default_value_t = 8)]
        width: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Generate {
            class,
            width,
            bits,
            strategy,
            nonlinear,
            max_length,
            seed,
            json,
        } => {
            let class: RuleClass = class.parse()?;
            let strategy: InitialStrategy = strategy.parse()?;

            let mut config = if nonlinear {
                GeneratorConfig::nonlinear(width)
            } else {
                GeneratorConfig::linear(width)
            };
            config.bits_per_cell = bits;
            config.seed = seed;

            let mut generator = SequenceGenerator::new(config)?;
            if !cli.quiet {
                let interval = if cli.verbose {
                    10
                } else if generator.full_coverage() {
                    50
                } else {
                    100
                };
                generator = generator.with_observer(Box::new(TracingObserver::new(interval)));
            }

            let run = generator.generate(class, max_length, strategy)?;
            let summary = SequenceAnalyzer::new().analyze(&run.sequence, generator.tracker());

            if json {
                let payload = serde_json::json!({
                    "run": run,
                    "summary": summary,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("sequence ({} rules):", run.sequence.len());
                println!("  {:?}", run.sequence);
                println!("termination: {:?}", run.termination);
                println!(
                    "coverage: {:.4} ({} states visited)",
                    run.coverage, run.visited_states
                );
                println!(
                    "rule diversity: {:.3} ({} unique rules)",
                    summary.rule_diversity, summary.unique_rules
                );
                if nonlinear {
                    println!("nonlinear fraction: {:.3}", summary.nonlinear_fraction);
                }
            }
        }

        Commands::Families { width } => {
            let grammar = RuleGrammar::new();
            for class in RuleClass::ALL {
                let linear = grammar.candidates_for_class(class);
                let expanded = grammar.expanded_candidates(class, width);
                println!("class {}:", class);
                println!("  elementary candidates: {:?}", linear);
                println!(
                    "  nonlinear additions:   {:?}",
                    &expanded[linear.len()..]
                );
                println!("  terminal rules:        {:?}", grammar.terminal_rules_of(class));
            }
            if width < EXTENDED_MIN_WIDTH {
                println!(
                    "(extended-neighborhood rules need width >= {})",
                    EXTENDED_MIN_WIDTH
                );
            }
        }
    }

    Ok(())
}
