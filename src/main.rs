use clap::{Parser, Subcommand};
use std::path::PathBuf;

use campori_score::club::NewClub;
use campori_score::config::{self, EventConfig};
use campori_score::identity::{Actor, Role};
use campori_score::output;
use campori_score::scoring::{CriterionAddress, ScoreRecord};
use campori_score::store::JsonStore;
use campori_score::workflow::{Evaluation, SubmitOutcome};
use campori_score::ScoreError;

const EXIT_SUCCESS: i32 = 0;
const EXIT_PERMISSION: i32 = 1;
const EXIT_STORAGE: i32 = 2;
const EXIT_LOCKED: i32 = 3;
const EXIT_CONFIG: i32 = 4;
const EXIT_NOT_FOUND: i32 = 5;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the built-in event configuration to the config path
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Register a club
    Register {
        id: String,
        name: String,
        #[arg(long, default_value = "")]
        region: String,
        #[arg(long, default_value_t = 0)]
        members: u32,
    },
    /// Standings, best total first (default if no subcommand)
    List {
        /// Tab-separated output for scripting
        #[arg(long)]
        tsv: bool,
    },
    /// Club detail with every deduction
    Show { club: String },
    /// Evaluate one criterion (category.key[.sub_key]); locks it unless the value is 0
    Submit {
        club: String,
        address: String,
        value: f64,
    },
    /// Record occurrences of a demerit
    Demerit {
        club: String,
        key: String,
        #[arg(default_value_t = 1)]
        occurrences: u32,
    },
    /// Open a supervisor edit session
    EditBegin { club: String },
    /// Apply a revised score record (JSON) and close the edit session
    EditCommit { club: String, record: PathBuf },
    /// Close the edit session without changes
    EditCancel { club: String },
    /// Release every lock for a club
    UnlockAll { club: String },
    /// Recompute cached totals and classifications for every club
    Reclassify,
    /// Reclassify and report stored values the catalog rejects
    Validate,
    /// Report cached totals that disagree with the records, without fixing them
    Audit,
    /// Return a club to its pre-event state
    Reset { club: String },
    /// Reset every club
    ResetAll,
    /// Delete a club
    Remove { club: String },
    /// Show a club's activity log
    History { club: String },
}

#[derive(Parser, Debug)]
#[command(name = "campori-score")]
#[command(about = "Scout club scoring for camping events", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/campori-score/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to club database (defaults to ~/.config/campori-score/clubs.json)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Acting user id, recorded in locks and history
    #[arg(short, long, global = true, default_value = "admin")]
    user: String,

    /// Acting role: admin, staff, director, secretary, regional
    #[arg(short, long, global = true, default_value = "admin")]
    role: Role,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(err: &ScoreError) -> i32 {
    match err {
        ScoreError::Permission { .. } => EXIT_PERMISSION,
        ScoreError::Storage(_) => EXIT_STORAGE,
        ScoreError::AlreadyLocked { .. } => EXIT_LOCKED,
        ScoreError::Validation { .. }
        | ScoreError::InvalidRequest(_)
        | ScoreError::InvalidScore { .. } => EXIT_CONFIG,
        ScoreError::NotFound(_) => EXIT_NOT_FOUND,
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let command = cli.command.unwrap_or(Commands::List { tsv: false });

    if let Commands::Init { force } = command {
        let path = cli.config.unwrap_or_else(config::get_config_path);
        if let Err(e) = config::write_config(&path, &EventConfig::default(), force) {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
        println!("Wrote default event configuration to {}", path.display());
        std::process::exit(EXIT_SUCCESS);
    }

    let event = match config::load_config(cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Validate the event configuration at startup
    if let Err(errors) = config::validate_config(&event) {
        eprintln!("Event config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let store_path = cli
        .store
        .or_else(|| event.store.as_ref().map(PathBuf::from))
        .unwrap_or_else(config::get_store_path);
    tracing::debug!("Using club database at {}", store_path.display());

    let eval = Evaluation::new(event, JsonStore::new(store_path));
    let actor = Actor::new(cli.user, cli.role);

    match run(&eval, &actor, command) {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

fn run(eval: &Evaluation<JsonStore>, actor: &Actor, command: Commands) -> campori_score::Result<()> {
    let use_colors = output::should_use_colors();
    let tiers = &eval.config().tiers;

    match command {
        Commands::Init { .. } => {}
        Commands::Register {
            id,
            name,
            region,
            members,
        } => {
            let club = eval.register_club(
                NewClub {
                    id,
                    name,
                    region,
                    members,
                },
                actor,
            )?;
            println!(
                "Registered {} ({}) at {}",
                club.name,
                club.id,
                output::format_points(club.total_score)
            );
        }
        Commands::List { tsv } => {
            let clubs = eval.list_clubs()?;
            if tsv {
                println!("{}", output::format_tsv(&clubs));
            } else {
                println!("{}", output::format_club_table(&clubs, tiers, use_colors));
            }
        }
        Commands::Show { club } => {
            let details = eval.get_club(&club)?;
            let result = eval.score_breakdown(&club)?;
            println!(
                "{}",
                output::format_club_detail(&details, &result, tiers, use_colors)
            );
        }
        Commands::Submit {
            club,
            address,
            value,
        } => {
            let address: CriterionAddress = address.parse()?;
            match eval.submit_criterion_score(&club, &address, value, actor)? {
                SubmitOutcome::Locked(entry) => println!(
                    "Locked {} at {} by {}",
                    entry.address,
                    output::format_points(entry.score),
                    entry.evaluator
                ),
                SubmitOutcome::RecordedUnevaluated => {
                    println!("Recorded 0 for {}; criterion left unevaluated", address)
                }
                SubmitOutcome::DemeritUpdated { total } => {
                    println!("Demerit updated, total {}", output::format_points(total))
                }
            }
        }
        Commands::Demerit {
            club,
            key,
            occurrences,
        } => {
            let total = eval.record_demerit(&club, &key, occurrences, actor)?;
            println!("Recorded {} x{}, total {}", key, occurrences, output::format_points(total));
        }
        Commands::EditBegin { club } => {
            let session = eval.enter_supervisor_edit_mode(&club, actor)?;
            println!(
                "Edit session open for {}: {} criteria released",
                club,
                session.previously_locked.len()
            );
        }
        Commands::EditCommit { club, record } => {
            let content = std::fs::read_to_string(&record).map_err(|e| {
                ScoreError::invalid(format!("cannot read {}: {}", record.display(), e))
            })?;
            let revised: ScoreRecord = serde_json::from_str(&content).map_err(|e| {
                ScoreError::invalid(format!("invalid score record in {}: {}", record.display(), e))
            })?;
            let report = eval.commit_supervisor_edits(&club, &revised, actor)?;
            println!("{}", output::format_relock_report(&report));
        }
        Commands::EditCancel { club } => {
            let restored = eval.cancel_supervisor_edits(&club, actor)?;
            println!("Edit session cancelled, {} locks restored", restored);
        }
        Commands::UnlockAll { club } => {
            let count = eval.unlock_all(&club, actor)?;
            println!("Unlocked {} criteria for {}", count, club);
        }
        Commands::Reclassify => {
            let summary = eval.reclassify_all_clubs(actor)?;
            println!("{}", output::format_batch_summary("Reclassify", &summary, use_colors));
        }
        Commands::Validate => {
            let summary = eval.validate_all_classifications(actor)?;
            println!("{}", output::format_batch_summary("Validate", &summary, use_colors));
        }
        Commands::Audit => {
            let report = eval.audit_all_classifications()?;
            println!("{}", output::format_audit(&report));
        }
        Commands::Reset { club } => {
            eval.reset_club(&club, actor)?;
            println!("Reset {}", club);
        }
        Commands::ResetAll => {
            let summary = eval.reset_all_clubs(actor)?;
            println!("{}", output::format_batch_summary("Reset", &summary, use_colors));
        }
        Commands::Remove { club } => {
            let removed = eval.remove_club(&club, actor)?;
            println!("Removed {} ({})", removed.name, removed.id);
        }
        Commands::History { club } => {
            let entries = eval.history(&club)?;
            println!(
                "{}",
                output::format_history(&entries, chrono::Utc::now(), use_colors)
            );
        }
    }
    Ok(())
}
