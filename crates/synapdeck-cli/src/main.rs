//! Synapdeck CLI
//!
//! Command-line collaborator surface for the scheduling engine: author
//! cards and relationships, pull the day's due set, submit graded
//! reviews, and run the retrievability recompute.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use synapdeck_core::prelude::*;
use synapdeck_core::recompute::RecomputeStatus;

mod store;

use store::CardStore;

/// Synapdeck - relationship-aware FSRS scheduler
#[derive(Parser)]
#[command(name = "synapdeck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "FSRS spaced-repetition scheduler with peer and prerequisite relationships")]
struct Cli {
    /// Path to the card store (defaults to the platform data directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a card to a deck
    Add {
        /// Deck name
        deck: String,
        /// Front field content
        front: String,
        /// Back field content
        back: String,
        /// Card format label
        #[arg(long, default_value = "One-Way")]
        format: String,
    },

    /// Show the cards due for review right now
    Due,

    /// Submit a graded review for a card
    Review {
        /// Card id
        card: CardId,
        /// Grade: 1=again, 2=hard, 3=good, 4=easy
        grade: i32,
    },

    /// Refresh every card's retrievability and report aggregates
    Recompute,

    /// Show retrievability statistics per deck
    Stats,

    /// Relate two cards
    Relate {
        /// Source card id (the prerequisite, for --kind prereq)
        source: CardId,
        /// Target card id (the dependent, for --kind prereq)
        target: CardId,
        /// Relationship kind: peer or prereq
        #[arg(long, default_value = "peer")]
        kind: String,
    },

    /// Remove a relationship between two cards
    Unrelate {
        /// Source card id
        source: CardId,
        /// Target card id
        target: CardId,
        /// Relationship kind: peer or prereq
        #[arg(long, default_value = "peer")]
        kind: String,
    },

    /// Suspend a card (excluded from review until resumed)
    Suspend {
        /// Card id
        card: CardId,
    },

    /// Resume a suspended card
    Resume {
        /// Card id
        card: CardId,
    },

    /// List all cards
    List {
        /// Only show cards from this deck
        #[arg(long)]
        deck: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = CardStore::open(cli.store)?;

    match cli.command {
        Commands::Add {
            deck,
            front,
            back,
            format,
        } => run_add(&store, deck, front, back, format),
        Commands::Due => run_due(&store),
        Commands::Review { card, grade } => run_review(&store, card, grade),
        Commands::Recompute => run_recompute(&store),
        Commands::Stats => run_stats(&store),
        Commands::Relate {
            source,
            target,
            kind,
        } => run_relate(&store, source, target, &kind, true),
        Commands::Unrelate {
            source,
            target,
            kind,
        } => run_relate(&store, source, target, &kind, false),
        Commands::Suspend { card } => run_suspend(&store, card, true),
        Commands::Resume { card } => run_suspend(&store, card, false),
        Commands::List { deck } => run_list(&store, deck),
    }
}

/// Add a card
fn run_add(
    store: &CardStore,
    deck: String,
    front: String,
    back: String,
    format: String,
) -> anyhow::Result<()> {
    let mut engine = store.load()?;
    let id = engine.add_card(
        &deck,
        format,
        vec!["Front".into(), "Back".into()],
        vec![front, back],
        Utc::now(),
    );
    store.save(engine)?;
    println!("{} card {} to deck {}", "Added".green().bold(), id, deck.cyan());
    Ok(())
}

/// Show the due set
fn run_due(store: &CardStore) -> anyhow::Result<()> {
    let mut engine = store.load()?;
    let due = engine.due_cards(Utc::now());
    let count = due.entries.len();
    // Peer burial mutates card state, so the set must be persisted with it
    store.save(engine)?;

    println!("{}", "=== Due for Review ===".cyan().bold());
    if due.entries.is_empty() {
        println!("{}", "Nothing due. Come back later.".dimmed());
        return Ok(());
    }
    for entry in &due.entries {
        println!(
            "  {} {} {}",
            format!("#{}", entry.card_id).white().bold(),
            entry.deck.cyan(),
            format!("(due {})", entry.due_at.format("%Y-%m-%d %H:%M")).dimmed()
        );
    }
    println!();
    println!("{}: {}", "Total".white().bold(), count);
    if !due.peer_buried.is_empty() {
        println!(
            "{}: {:?}",
            "Buried for today (peer reviewed)".yellow(),
            due.peer_buried
        );
    }
    Ok(())
}

/// Submit a review
fn run_review(store: &CardStore, card: CardId, grade: i32) -> anyhow::Result<()> {
    let mut engine = store.load()?;
    let receipt = engine.submit_review(card, grade, Utc::now())?;
    store.save(engine)?;

    let grade_label = match receipt.grade {
        Grade::Again => "again".red(),
        Grade::Hard => "hard".yellow(),
        Grade::Good => "good".green(),
        Grade::Easy => "easy".bright_green(),
    };
    println!(
        "{} card {} as {}",
        "Reviewed".green().bold(),
        receipt.card_id,
        grade_label.bold()
    );
    println!(
        "  next due {} ({} days)",
        receipt.due_at.format("%Y-%m-%d %H:%M").to_string().cyan(),
        format!("{:.1}", receipt.interval_days).white().bold()
    );
    println!(
        "  stability {:.2}  difficulty {:.2}  retrievability at review {:.0}%",
        receipt.stability,
        receipt.difficulty,
        receipt.retrievability_at_review * 100.0
    );
    if receipt.lapsed {
        println!("{}", "  lapsed".red());
        if !receipt.buried_dependents.is_empty() {
            println!(
                "  {} {:?}",
                "dependents buried for tomorrow:".yellow(),
                receipt.buried_dependents
            );
        }
    }
    Ok(())
}

/// Run the recompute job
fn run_recompute(store: &CardStore) -> anyhow::Result<()> {
    let mut engine = store.load()?;
    let report = engine.trigger_recompute(Utc::now());
    store.save(engine)?;

    match report.status {
        RecomputeStatus::Skipped => {
            println!("{}", "Recompute already running, skipped.".yellow());
            return Ok(());
        }
        RecomputeStatus::Completed => {
            println!(
                "{} {} cards in {}ms ({} errors)",
                "Recomputed".green().bold(),
                report.cards_processed,
                report.duration_ms,
                report.errors
            );
        }
    }
    print_stats(&report.stats);
    Ok(())
}

/// Show statistics
fn run_stats(store: &CardStore) -> anyhow::Result<()> {
    let engine = store.load()?;
    println!("{}", "=== Synapdeck Statistics ===".cyan().bold());
    print_stats(&engine.statistics());
    Ok(())
}

fn print_stats(stats: &synapdeck_core::RetrievabilityStats) {
    let overall = &stats.overall;
    println!();
    println!("{}: {}", "Reviewed Cards".white().bold(), overall.count);
    if overall.count == 0 {
        return;
    }
    println!(
        "{}: {:.1}% (min {:.1}%, max {:.1}%, sd {:.3})",
        "Mean Retrievability".white().bold(),
        overall.mean * 100.0,
        overall.min * 100.0,
        overall.max * 100.0,
        overall.std_dev
    );
    println!(
        "{}: {} below 50%, {} below 80%, {} above 90%",
        "Spread".white().bold(),
        overall.below_50,
        overall.below_80,
        overall.above_90
    );
    if !stats.per_deck.is_empty() {
        println!();
        println!("{}", "Per deck:".white().bold());
        for (deck, agg) in &stats.per_deck {
            println!(
                "  {}: {} cards, mean {:.1}%",
                deck.cyan(),
                agg.count,
                agg.mean * 100.0
            );
        }
    }
}

/// Add or remove a relationship edge
fn run_relate(
    store: &CardStore,
    source: CardId,
    target: CardId,
    kind: &str,
    add: bool,
) -> anyhow::Result<()> {
    let kind = parse_kind(kind)?;
    let mut engine = store.load()?;
    if add {
        engine.relate(source, target, kind)?;
    } else {
        engine.unrelate(source, target, kind)?;
    }
    store.save(engine)?;

    let verb = if add { "Related" } else { "Unrelated" };
    match kind {
        RelationKind::Peer => {
            println!("{} {} <-> {} as peers", verb.green().bold(), source, target);
        }
        RelationKind::Prereq => {
            println!(
                "{} {} -> {} (prerequisite -> dependent)",
                verb.green().bold(),
                source,
                target
            );
        }
    }
    Ok(())
}

fn parse_kind(kind: &str) -> anyhow::Result<RelationKind> {
    match kind {
        "peer" => Ok(RelationKind::Peer),
        "prereq" => Ok(RelationKind::Prereq),
        other => anyhow::bail!("unknown relationship kind: {other} (expected peer or prereq)"),
    }
}

/// Suspend or resume a card
fn run_suspend(store: &CardStore, card: CardId, suspend: bool) -> anyhow::Result<()> {
    let mut engine = store.load()?;
    if suspend {
        engine.suspend(card)?;
        println!("{} card {}", "Suspended".yellow().bold(), card);
    } else {
        engine.resume(card)?;
        println!("{} card {}", "Resumed".green().bold(), card);
    }
    store.save(engine)?;
    Ok(())
}

/// List cards
fn run_list(store: &CardStore, deck: Option<String>) -> anyhow::Result<()> {
    let engine = store.load()?;
    let mut cards: Vec<&Card> = engine
        .cards()
        .iter()
        .filter(|c| deck.as_deref().is_none_or(|d| c.deck == d))
        .collect();
    cards.sort_unstable_by_key(|c| c.id);

    if cards.is_empty() {
        println!("{}", "No cards found.".dimmed());
        return Ok(());
    }
    for card in cards {
        let phase = match card.phase {
            CardPhase::New => "new".blue(),
            CardPhase::Learning => "learning".yellow(),
            CardPhase::Review => "review".green(),
            CardPhase::Suspended => "suspended".red(),
        };
        println!(
            "  {} {} [{}] due {}  r {:.0}%",
            format!("#{}", card.id).white().bold(),
            card.deck.cyan(),
            phase,
            card.due_at.format("%Y-%m-%d"),
            card.retrievability * 100.0
        );
    }
    Ok(())
}
