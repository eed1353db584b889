use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use globalbridge::config::Config;
use globalbridge::db::SqliteStore;
use globalbridge::export::{self, ImportReport};
use globalbridge::models::*;
use globalbridge::program::Program;
use globalbridge::render;

#[derive(Parser)]
#[command(name = "globalbridge")]
#[command(about = "Mentor/mentee exchange program: roster, matching and activity records")]
struct Cli {
    /// Directory holding the program data (overrides GLOBALBRIDGE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a participant (Korean speakers mentor, English speakers are mentees)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        major: String,
        /// Korean or English
        #[arg(long)]
        language: String,
        /// 1 to 4
        #[arg(long, allow_negative_numbers = true)]
        grade: i64,
    },
    /// List all participants in registration order
    Participants,
    /// List mentors
    Mentors,
    /// List mentees
    Mentees,
    /// Pair unmatched mentors and mentees in registration order
    AutoMatch,
    /// Pair a specific mentor with a specific mentee
    Match {
        /// Mentor student id
        #[arg(long)]
        mentor: Option<String>,
        /// Mentee student id
        #[arg(long)]
        mentee: Option<String>,
    },
    /// Dissolve a pair and drop its activities
    Unmatch { pair_key: String },
    /// List current pairs
    Pairs,
    /// Record and review pair activities
    #[command(subcommand)]
    Activity(ActivityCommand),
    /// Write a plain-text export
    Export {
        dataset: Dataset,
        /// Output file (defaults to <data-dir>/<dataset>.txt)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Read a plain-text export back in
    Import {
        dataset: Dataset,
        /// Input file (defaults to <data-dir>/<dataset>.txt)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ActivityCommand {
    /// Record an activity for a pair, timestamped now
    Add {
        pair_key: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        location: String,
    },
    /// Show activities for one pair, or for every pair
    List { pair_key: Option<String> },
    /// Mark an activity as completed
    Complete {
        pair_key: String,
        /// 0-based index as shown by `activity list`
        index: usize,
        /// Mark as in progress again instead
        #[arg(long)]
        undo: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Dataset {
    Participants,
    Matches,
    Activities,
}

impl Dataset {
    fn default_path(self, config: &Config) -> PathBuf {
        match self {
            Self::Participants => config.participants_export_path(),
            Self::Matches => config.matches_export_path(),
            Self::Activities => config.activities_export_path(),
        }
    }
}

/// Logs go to stderr so stdout only carries command output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "globalbridge=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_report(report: &ImportReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }
    println!("Imported {} record(s).", report.imported);
    for skipped in &report.skipped {
        println!("  line {}: {}", skipped.line, skipped.reason);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::resolve(cli.data_dir)?;
    let store = SqliteStore::new(config.store_path());
    let mut program = Program::open(store)
        .with_context(|| format!("Failed to load {}", config.store_path().display()))?;
    let json = cli.json;

    match cli.command {
        Commands::Register {
            name,
            student_id,
            major,
            language,
            grade,
        } => {
            let participant = program.register(RegisterParticipantInput {
                name,
                student_id,
                major,
                language,
                grade,
            })?;
            if json {
                print_json(&participant)?;
            } else {
                let role = if participant.is_mentor() { "mentor" } else { "mentee" };
                println!("Registered {} as {}.", participant, role);
            }
        }
        Commands::Participants => {
            let all: Vec<&Participant> = program.participants().iter().collect();
            if json {
                print_json(&all)?;
            } else {
                print!("{}", render::render_roster("Participants", &all));
            }
        }
        Commands::Mentors => {
            let mentors = program.mentors();
            if json {
                print_json(&mentors)?;
            } else {
                print!("{}", render::render_roster("Mentors", &mentors));
            }
        }
        Commands::Mentees => {
            let mentees = program.mentees();
            if json {
                print_json(&mentees)?;
            } else {
                print!("{}", render::render_roster("Mentees", &mentees));
            }
        }
        Commands::AutoMatch => {
            let pairs = program.auto_match()?;
            if json {
                print_json(&pairs)?;
            } else {
                println!("{} pair(s) matched.", pairs.len());
                for pair in &pairs {
                    println!("  {}  {}", pair.key(), pair);
                }
            }
        }
        Commands::Match { mentor, mentee } => {
            let pair = program.manual_match(mentor.as_deref(), mentee.as_deref())?;
            if json {
                print_json(&pair)?;
            } else {
                println!("Matched {}  {}", pair.key(), pair);
            }
        }
        Commands::Unmatch { pair_key } => {
            let pair = program.unmatch(&pair_key)?;
            if json {
                print_json(&pair)?;
            } else {
                println!("Dissolved {}  {}", pair_key, pair);
            }
        }
        Commands::Pairs => {
            let pairs: Vec<&Pair> = program.pairs().collect();
            if json {
                print_json(&pairs)?;
            } else {
                print!("{}", render::render_pairs(pairs));
            }
        }
        Commands::Activity(command) => run_activity(&mut program, command, json)?,
        Commands::Export { dataset, file } => {
            let path = file.unwrap_or_else(|| dataset.default_path(&config));
            let state = program.state();
            let contents = match dataset {
                Dataset::Participants => export::render_participants(state.participants()),
                Dataset::Matches => export::render_matches(state.pairs()),
                Dataset::Activities => export::render_activities(state),
            };
            export::write_export(&path, &contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        Commands::Import { dataset, file } => {
            let path = file.unwrap_or_else(|| dataset.default_path(&config));
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let report = match dataset {
                Dataset::Participants => program.import_participants(&text)?,
                Dataset::Matches => program.import_matches(&text)?,
                Dataset::Activities => program.import_activities(&text)?,
            };
            print_report(&report, json)?;
        }
    }

    Ok(())
}

fn run_activity(
    program: &mut Program<SqliteStore>,
    command: ActivityCommand,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        ActivityCommand::Add {
            pair_key,
            content,
            location,
        } => {
            let activity =
                program.record_activity(&pair_key, RecordActivityInput { content, location })?;
            if json {
                print_json(&activity)?;
            } else {
                println!("Recorded for {}: {}", pair_key, activity);
            }
        }
        ActivityCommand::List { pair_key: Some(key) } => {
            let pair = program
                .pair(&key)
                .ok_or_else(|| anyhow::anyhow!("No pair with key {}", key))?;
            let activities = program.activities_for(&key);
            if json {
                print_json(activities)?;
            } else {
                print!("{}", render::render_pair_activities(pair, activities));
            }
        }
        ActivityCommand::List { pair_key: None } => {
            if json {
                let ledger: Vec<_> = program
                    .state()
                    .ledger()
                    .map(|(pair, activities)| (pair.key(), activities))
                    .collect();
                print_json(&ledger)?;
            } else {
                print!("{}", render::render_history(program.state()));
            }
        }
        ActivityCommand::Complete {
            pair_key,
            index,
            undo,
        } => {
            let activity = program.set_activity_completed(&pair_key, index, !undo)?;
            if json {
                print_json(&activity)?;
            } else {
                println!("Updated {} #{}: {}", pair_key, index, activity);
            }
        }
    }
    Ok(())
}
