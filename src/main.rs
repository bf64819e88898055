use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use mtg_hand_sim::card::KeywordSet;
use mtg_hand_sim::config::{SimulationConfig, MAX_COMBO_WINDOW};
use mtg_hand_sim::rng::SimRng;
use mtg_hand_sim::simulation::analyze::exact_keepable_rate;
use mtg_hand_sim::simulation::sweep::{sweep_combo_windows, WindowSweepPoint};
use mtg_hand_sim::simulation::{
    par_run_basic_simulation, par_run_combo_simulation, parse_deck_file, run_basic_simulation,
    run_combo_simulation, DecklistLineError, ParsedDecklist, SimulationResult,
};
use serde::Serialize;
use std::fmt::Display;

#[derive(Parser)]
#[command(name = "mtg-hand-sim")]
#[command(about = "MTG opening hand and combo probability simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with simulation settings (command line flags take precedence)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Args)]
struct HandArgs {
    /// Decklist file, one "4 Lightning Bolt" entry per line
    #[arg(short, long, default_value = "deck.txt")]
    deck: String,

    /// Minimum lands in a keepable hand
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=7))]
    min_lands: Option<u8>,

    /// Maximum lands in a keepable hand
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=7))]
    max_lands: Option<u8>,

    /// Land card names, comma separated
    #[arg(short, long)]
    lands: Option<String>,

    /// Number of simulated hands
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..=100_000))]
    trials: Option<u32>,

    /// Seed for random number generator (for reproducibility)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Spread trials across all cores
    #[arg(short, long)]
    parallel: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl HandArgs {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(min) = self.min_lands {
            config.min_lands = min as usize;
        }
        if let Some(max) = self.max_lands {
            config.max_lands = max as usize;
        }
        if let Some(lands) = &self.lands {
            config.land_keywords = lands.clone();
        }
        if let Some(trials) = self.trials {
            config.trials = trials as usize;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.parallel |= self.parallel;
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the keepable opening hand rate
    Keep {
        #[command(flatten)]
        hand: HandArgs,
    },

    /// Estimate keepable hand and combo rates from the same shuffles
    Combo {
        #[command(flatten)]
        hand: HandArgs,

        /// Combo card names, comma separated
        #[arg(short = 'k', long)]
        combo: Option<String>,

        /// Look for the combo in the first X cards
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=20))]
        window: Option<u8>,
    },

    /// Combo rate for every window size from 1 to --max-window
    Sweep {
        #[command(flatten)]
        hand: HandArgs,

        /// Combo card names, comma separated
        #[arg(short = 'k', long)]
        combo: Option<String>,

        /// Largest window size to test
        #[arg(
            short,
            long,
            default_value = "20",
            value_parser = clap::value_parser!(u8).range(1..=20)
        )]
        max_window: u8,
    },
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    deck_file: &'a str,
    deck_size: usize,
    parse_errors: &'a [DecklistLineError],
    seed: u64,
    settings: &'a SimulationConfig,
    exact_keepable_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a SimulationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sweep: Option<&'a [WindowSweepPoint]>,
}

fn or_exit<T, E: Display>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("✗ {}: {}", context, e);
            std::process::exit(1);
        }
    }
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let config = or_exit(
                SimulationConfig::from_file(path),
                &format!("Failed to load config '{}'", path),
            );
            info!("Loaded settings from {}", path);
            config
        }
        None => SimulationConfig::default(),
    };

    match cli.command {
        Commands::Keep { hand } => {
            hand.apply(&mut config);
            run_keep(&config, &hand);
        }
        Commands::Combo {
            hand,
            combo,
            window,
        } => {
            hand.apply(&mut config);
            if let Some(combo) = combo {
                config.combo_keywords = combo;
            }
            if let Some(window) = window {
                config.combo_window = window as usize;
            }
            run_combo(&config, &hand);
        }
        Commands::Sweep {
            hand,
            combo,
            max_window,
        } => {
            hand.apply(&mut config);
            if let Some(combo) = combo {
                config.combo_keywords = combo;
            }
            run_sweep(&config, &hand, max_window as usize);
        }
    }
}

fn load_deck(deck_file: &str) -> ParsedDecklist {
    let parsed = or_exit(
        parse_deck_file(deck_file),
        &format!("Failed to read deck file '{}'", deck_file),
    );
    if parsed.has_errors() {
        eprintln!(
            "! Skipped {} invalid decklist line(s) in '{}'",
            parsed.errors.len(),
            deck_file
        );
    }
    parsed
}

fn print_header(
    title: &str,
    deck_file: &str,
    parsed: &ParsedDecklist,
    config: &SimulationConfig,
    seed: u64,
) {
    println!("\n=== {} ===\n", title);
    println!("Deck: {} ({} cards)", deck_file, parsed.deck.len());
    println!("Land keywords: {}", KeywordSet::parse(&config.land_keywords));
    println!("Keepable: {}-{} lands", config.min_lands, config.max_lands);
    println!("Trials: {}", config.trials);
    println!("Seed: {}", seed);
    println!();
}

fn print_result(result: &SimulationResult, exact: f64) {
    println!("=== Results ===\n");
    println!(
        "Keepable hands: {:.2}% ({}/{})",
        result.keepable_rate * 100.0,
        result.keepable_count,
        result.trials
    );
    println!("Exact (hypergeometric): {:.2}%", exact * 100.0);
    println!("Average lands in hand: {:.2}", result.average_lands());

    if let Some(combo) = &result.combo {
        println!(
            "Combo present in first {} cards: {:.2}% ({}/{})",
            combo.window_size,
            combo.rate * 100.0,
            combo.hits,
            result.trials
        );
    }

    println!("\nLand distribution:");
    for (lands, count) in result.land_histogram.iter().enumerate() {
        let pct = *count as f64 / result.trials as f64 * 100.0;
        let bar = "█".repeat((pct / 2.0) as usize);
        println!("  {} lands: {:5.1}% {} ({})", lands, pct, bar, count);
    }
}

fn print_json(report: &Report) {
    println!("{}", or_exit(serde_json::to_string_pretty(report), "Failed to encode report"));
}

fn run_keep(config: &SimulationConfig, args: &HandArgs) {
    let parsed = load_deck(&args.deck);
    let params = or_exit(config.simulation_params(), "Invalid settings");
    let mut rng = SimRng::new(config.seed);
    let seed = rng.seed();

    let start = std::time::Instant::now();
    let result = if config.parallel {
        par_run_basic_simulation(&parsed.deck, &params, seed)
    } else {
        run_basic_simulation(&parsed.deck, &params, &mut rng)
    };
    let result = or_exit(result, "Simulation failed");
    let elapsed = start.elapsed();

    let exact = exact_keepable_rate(
        &parsed.deck,
        &params.land_keywords,
        params.min_lands,
        params.max_lands,
    );

    if args.json {
        print_json(&Report {
            generated_at: chrono::Local::now().to_rfc3339(),
            deck_file: &args.deck,
            deck_size: parsed.deck.len(),
            parse_errors: &parsed.errors,
            seed,
            settings: config,
            exact_keepable_rate: exact,
            result: Some(&result),
            sweep: None,
        });
        return;
    }

    print_header("MTG Hand Simulator", &args.deck, &parsed, config, seed);
    print_result(&result, exact);
    println!(
        "\nSimulation completed in {:.2?} ({:.0} hands/sec)",
        elapsed,
        result.trials as f64 / elapsed.as_secs_f64()
    );
}

fn run_combo(config: &SimulationConfig, args: &HandArgs) {
    let parsed = load_deck(&args.deck);
    let params = or_exit(config.simulation_params(), "Invalid settings");
    let combo = or_exit(config.combo_params(), "Invalid settings");
    let mut rng = SimRng::new(config.seed);
    let seed = rng.seed();

    let start = std::time::Instant::now();
    let result = if config.parallel {
        par_run_combo_simulation(&parsed.deck, &params, &combo, seed)
    } else {
        run_combo_simulation(&parsed.deck, &params, &combo, &mut rng)
    };
    let result = or_exit(result, "Simulation failed");
    let elapsed = start.elapsed();

    let exact = exact_keepable_rate(
        &parsed.deck,
        &params.land_keywords,
        params.min_lands,
        params.max_lands,
    );

    if args.json {
        print_json(&Report {
            generated_at: chrono::Local::now().to_rfc3339(),
            deck_file: &args.deck,
            deck_size: parsed.deck.len(),
            parse_errors: &parsed.errors,
            seed,
            settings: config,
            exact_keepable_rate: exact,
            result: Some(&result),
            sweep: None,
        });
        return;
    }

    print_header("MTG Combo Simulator", &args.deck, &parsed, config, seed);
    println!("Combo keywords: {}", combo.combo_keywords);
    println!("Combo window: first {} cards\n", combo.window_size);
    print_result(&result, exact);
    println!(
        "\nSimulation completed in {:.2?} ({:.0} shuffles/sec)",
        elapsed,
        result.trials as f64 / elapsed.as_secs_f64()
    );
}

fn run_sweep(config: &SimulationConfig, args: &HandArgs, max_window: usize) {
    let parsed = load_deck(&args.deck);
    let params = or_exit(config.simulation_params(), "Invalid settings");
    let combo_keywords = KeywordSet::parse(&config.combo_keywords);
    let max_window = max_window.min(MAX_COMBO_WINDOW).min(parsed.deck.len()).max(1);
    let seed = SimRng::new(config.seed).seed();

    let progress = if args.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(max_window as u64)
    };
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} windows ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let start = std::time::Instant::now();
    let points = sweep_combo_windows(&parsed.deck, &params, &combo_keywords, max_window, seed, |_| {
        progress.inc(1)
    });
    progress.finish_and_clear();
    let points = or_exit(points, "Sweep failed");
    let elapsed = start.elapsed();

    let exact = exact_keepable_rate(
        &parsed.deck,
        &params.land_keywords,
        params.min_lands,
        params.max_lands,
    );

    if args.json {
        print_json(&Report {
            generated_at: chrono::Local::now().to_rfc3339(),
            deck_file: &args.deck,
            deck_size: parsed.deck.len(),
            parse_errors: &parsed.errors,
            seed,
            settings: config,
            exact_keepable_rate: exact,
            result: None,
            sweep: Some(&points),
        });
        return;
    }

    print_header("MTG Combo Window Sweep", &args.deck, &parsed, config, seed);
    println!("Combo keywords: {}\n", combo_keywords);
    println!("{:<8} {:>8}", "Window", "Combo");
    println!("{:-<60}", "");
    for point in &points {
        let pct = point.combo_rate * 100.0;
        let bar = "█".repeat((pct / 2.0) as usize);
        println!("{:<8} {:>7.2}% {}", point.window_size, pct, bar);
    }
    if let Some(first) = points.first() {
        println!(
            "\nKeepable hands: {:.2}% (exact {:.2}%)",
            first.keepable_rate * 100.0,
            exact * 100.0
        );
    }
    println!("\nSweep completed in {:.2?}", elapsed);
}
