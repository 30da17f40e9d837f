use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;
use train_core::coach::DayOverview;
use train_core::feedback::{Feedback, NoWakeLock};
use train_core::micro_break::{BreakStep, MicroBreak};
use train_core::mobility::{MobilityState, MobilityStep};
use train_core::progression::{compare, Comparison};
use train_core::schedule::{date_key, parse_date_key};
use train_core::session::Flash;
use train_core::timer::SystemClock;
use train_core::*;

#[derive(Parser)]
#[command(name = "traindaily")]
#[command(about = "Daily push/pull/legs workout coach", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as if today were this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    date: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's workout and targets (default)
    Today,

    /// Run today's workout
    Start {
        /// Auto-complete (for testing) - log every target and skip every rest
        #[arg(long)]
        auto: bool,
    },

    /// Run the rest-day mobility routine
    Mobility {
        /// Auto-complete (for testing) - skip through every drill
        #[arg(long)]
        auto: bool,
    },

    /// Take a short micro-break drill (next in the rotation by default)
    Break {
        /// Run this drill of the rotation instead, leaving the rotation as is
        #[arg(long)]
        index: Option<usize>,

        /// Auto-complete (for testing) - end the drill immediately
        #[arg(long)]
        auto: bool,
    },

    /// List recent sessions
    History {
        /// Number of sessions to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Export all sessions to CSV
    Export {
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    train_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let today = match &cli.date {
        Some(raw) => parse_date_key(raw)?,
        None => chrono::Local::now().date_naive(),
    };

    let errors = default_catalog().validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Catalog("Invalid catalog".into()));
    }

    let storage = FileStorage::new(&data_dir);
    tracing::debug!("Using data directory {:?}", data_dir);

    match cli.command.unwrap_or(Commands::Today) {
        Commands::Today => cmd_today(storage, config, today).await,
        Commands::Start { auto } => cmd_start(storage, config, today, auto).await,
        Commands::Mobility { auto } => cmd_mobility(storage, config, today, auto).await,
        Commands::Break { index, auto } => cmd_break(storage, config, index, auto).await,
        Commands::History { limit } => cmd_history(storage, limit).await,
        Commands::Export { out } => cmd_export(storage, out).await,
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_today(storage: FileStorage, config: Config, today: NaiveDate) -> Result<()> {
    let mut coach = Coach::new(config, storage)?;
    coach.refresh().await;
    let overview = coach.overview(today).await;
    display_overview(&overview);
    Ok(())
}

async fn cmd_start(
    storage: FileStorage,
    mut config: Config,
    today: NaiveDate,
    auto: bool,
) -> Result<()> {
    if auto {
        // Nobody is watching: no feedback delays
        config.session.settle_millis = 0;
        config.session.flash_millis = 0;
        config.session.transition_seconds = 0;
    }

    let mut coach = Coach::with_collaborators(
        config,
        storage,
        Box::new(TerminalFeedback),
        Box::new(NoWakeLock),
        Box::new(SystemClock),
    )?;
    coach.refresh().await;

    match coach.start(today) {
        StartOutcome::Started => {}
        StartOutcome::RestDay => {
            println!("{} is a rest day. Try `traindaily mobility`.", date_key(today));
            return Ok(());
        }
        StartOutcome::Busy => {
            println!("A session is already running.");
            return Ok(());
        }
    }

    if let Some(plan) = coach.machine().plan() {
        println!("\n╭─────────────────────────────────────────╮");
        println!(
            "│  {} DAY · WEEK {} · {} SETS",
            plan.workout_type.as_str().to_uppercase(),
            plan.week_number,
            plan.sets_per_exercise
        );
        println!("╰─────────────────────────────────────────╯");
    }

    if auto {
        run_auto(&mut coach);
    } else {
        run_interactive(&mut coach).await?;
    }

    if !coach.has_pending() {
        return Ok(());
    }
    match coach.persist_pending().await {
        SaveStatus::Saved => {
            println!("\n✓ Session saved for {}", date_key(today));
            Ok(())
        }
        SaveStatus::Failed(msg) => {
            eprintln!("\n✗ Session complete but could not be saved: {}", msg);
            Err(Error::Storage(msg.clone()))
        }
        SaveStatus::Idle | SaveStatus::Pending => Ok(()),
    }
}

async fn cmd_mobility(
    storage: FileStorage,
    config: Config,
    today: NaiveDate,
    auto: bool,
) -> Result<()> {
    let mut coach = Coach::new(config, storage)?;
    let total = coach.catalog().mobility_total_seconds();
    println!(
        "\nMOBILITY · {} drills · {} min",
        coach.catalog().mobility.len(),
        total / 60
    );

    let _ = coach.start_mobility(today);
    if auto {
        while coach.mobility().state() == MobilityState::Active {
            display_drill(&coach);
            let _ = coach.mobility_skip();
        }
    } else {
        run_mobility_interactive(&mut coach).await?;
    }

    if !coach.has_pending() {
        return Ok(());
    }
    match coach.persist_pending().await {
        SaveStatus::Saved => {
            println!("\n✓ Mobility done for {}", date_key(today));
            Ok(())
        }
        SaveStatus::Failed(msg) => Err(Error::Storage(msg.clone())),
        SaveStatus::Idle | SaveStatus::Pending => Ok(()),
    }
}

async fn cmd_break(
    storage: FileStorage,
    config: Config,
    index: Option<usize>,
    auto: bool,
) -> Result<()> {
    let speed = config.session.timer_speed;
    let coach = Coach::new(config, storage)?;
    let drill = match index {
        Some(index) => coach.catalog().next_micro_break(index).cloned(),
        None => coach.take_micro_break().await,
    };
    let Some(drill) = drill else {
        println!("No micro-break drills in the catalog.");
        return Ok(());
    };

    println!("\nMICRO-BREAK · {} · {}s", drill.name, drill.seconds);
    println!("  {}", drill.instruction);
    if let Some(demo) = &drill.demo_ref {
        println!("  {}", demo);
    }

    let mut micro_break = MicroBreak::new(drill, speed, Box::new(TerminalFeedback));
    let now = chrono::Utc::now();
    let _ = micro_break.start(now);
    if auto {
        let _ = micro_break.skip(now);
        return Ok(());
    }
    run_break_interactive(&mut micro_break).await;
    Ok(())
}

async fn cmd_history(storage: FileStorage, limit: usize) -> Result<()> {
    let history = storage.load_history().await?;
    if history.is_empty() {
        println!("No sessions logged yet.");
        return Ok(());
    }

    for (date, record) in history.iter().rev().take(limit) {
        let workout = record.workout_type.map_or("?", |t| t.as_str());
        println!(
            "{}  {:<5} week {:<2}  {} sets",
            date_key(date),
            workout,
            record.week_number,
            record.total_sets()
        );
        for (key, values) in &record.sets {
            let name = default_catalog().get(key).map_or(key.as_str(), |e| e.name.as_str());
            println!("    {:<28} {:?}", name, values);
        }
    }
    Ok(())
}

async fn cmd_export(storage: FileStorage, out: PathBuf) -> Result<()> {
    let history = storage.load_history().await?;
    let rows = tokio::task::spawn_blocking(move || {
        train_core::export::export_history_csv(&history, &out).map(|rows| (rows, out))
    })
    .await
    .map_err(|e| Error::Other(format!("export task failed: {}", e)))?;

    let (rows, out) = rows?;
    println!("✓ Exported {} sets to {}", rows, out.display());
    Ok(())
}

// ============================================================================
// Session loops
// ============================================================================

/// Log every target and skip every rest until the session ends
fn run_auto(coach: &mut Coach<FileStorage>) {
    loop {
        match coach.state() {
            WorkoutState::Exercising => {
                let Some(target) = coach.machine().current_target() else {
                    let _ = coach.quit();
                    return;
                };
                display_set_prompt(coach);
                let _ = coach.log_set(target);
            }
            WorkoutState::Resting => {
                let _ = coach.skip();
            }
            WorkoutState::Transitioning => {
                let _ = coach.finish_transition();
            }
            WorkoutState::Complete | WorkoutState::Idle => return,
        }
    }
}

async fn run_interactive(coach: &mut Coach<FileStorage>) -> Result<()> {
    let mut lines = stdin_lines();
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
    let mut shown = None;

    loop {
        let state = coach.state();
        if matches!(state, WorkoutState::Complete | WorkoutState::Idle) {
            return Ok(());
        }
        let position = (state, coach.machine().exercise_index(), coach.machine().set_index());
        if shown != Some(position) {
            render(coach);
            shown = Some(position);
        }

        tokio::select! {
            _ = ticker.tick() => {
                let _ = coach.tick();
                if coach.state() == WorkoutState::Resting {
                    render_rest_line(coach);
                }
            }
            line = lines.recv() => {
                let Some(input) = line else {
                    println!("\nInput closed. Session abandoned; nothing was saved.");
                    let _ = coach.quit();
                    return Ok(());
                };
                if handle_input(coach, input.trim()) == Control::Quit {
                    println!("Session abandoned; nothing was saved.");
                    return Ok(());
                }
                // A repeated position after an undo must re-render
                if matches!(coach.state(), WorkoutState::Exercising) {
                    shown = None;
                }
            }
        }
    }
}

/// Stdin lines from a detached reader thread; the channel closes at EOF
///
/// A blocking read cannot be cancelled, so it must not hold up runtime
/// shutdown once the session ends.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[derive(PartialEq, Eq)]
enum Control {
    Continue,
    Quit,
}

fn handle_input(coach: &mut Coach<FileStorage>, input: &str) -> Control {
    if input.eq_ignore_ascii_case("q") {
        let _ = coach.quit();
        return Control::Quit;
    }
    if input.eq_ignore_ascii_case("u") {
        if coach.undo() == Step::Applied {
            println!("↶ Set removed");
        } else {
            println!("Nothing to undo.");
        }
        return Control::Continue;
    }

    match coach.state() {
        WorkoutState::Exercising => match input.parse::<u32>() {
            Ok(value) => {
                let previous = coach.previous_for_current_set();
                let _ = coach.log_set(value);
                display_logged(coach, value, previous);
            }
            Err(_) => println!("Enter the number you completed, or 'q' to quit."),
        },
        WorkoutState::Resting => match input.to_lowercase().as_str() {
            "p" => {
                if coach.machine().is_paused() {
                    let _ = coach.resume();
                    println!("▶ Resumed");
                } else {
                    let _ = coach.pause();
                    println!("⏸ Paused");
                }
            }
            "s" => {
                let _ = coach.skip();
            }
            _ => println!("During rest: 'p' pause/resume, 's' skip, 'u' undo, 'q' quit."),
        },
        WorkoutState::Transitioning => {
            let _ = coach.finish_transition();
        }
        WorkoutState::Idle | WorkoutState::Complete => {}
    }
    Control::Continue
}

async fn run_mobility_interactive(coach: &mut Coach<FileStorage>) -> Result<()> {
    let mut lines = stdin_lines();
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
    let mut shown = None;

    println!("'p' pause/resume, 's' next, 'q' quit");
    while coach.mobility().state() == MobilityState::Active {
        let position = (coach.mobility().index(), coach.mobility().side());
        if shown != Some(position) {
            display_drill(coach);
            shown = Some(position);
        }

        tokio::select! {
            _ = ticker.tick() => {
                let _ = coach.mobility_tick();
            }
            line = lines.recv() => {
                let input = line.unwrap_or_else(|| "q".to_string());
                match input.trim().to_lowercase().as_str() {
                    "q" => {
                        let _ = coach.mobility_quit();
                        println!("Mobility stopped.");
                        return Ok(());
                    }
                    "s" => {
                        if let MobilityStep::Completed { .. } = coach.mobility_skip() {
                            return Ok(());
                        }
                    }
                    "p" => {
                        if coach.mobility().is_paused() {
                            let _ = coach.mobility_resume();
                        } else {
                            let _ = coach.mobility_pause();
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

async fn run_break_interactive(micro_break: &mut MicroBreak) {
    let mut lines = stdin_lines();
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));

    println!("'p' pause/resume, 's' done, 'q' quit");
    while !micro_break.is_done() {
        tokio::select! {
            _ = ticker.tick() => {
                let now = chrono::Utc::now();
                if micro_break.tick(now) == BreakStep::Done {
                    return;
                }
                if let Some(left) = micro_break.seconds_left(now) {
                    let marker = if micro_break.is_paused() { " (paused)" } else { "" };
                    print!("\r  {:>3}s{}   ", left, marker);
                    let _ = io::stdout().flush();
                }
            }
            line = lines.recv() => {
                let input = line.unwrap_or_else(|| "q".to_string());
                let now = chrono::Utc::now();
                match input.trim().to_lowercase().as_str() {
                    "q" => {
                        println!("Break stopped.");
                        return;
                    }
                    "s" => {
                        let _ = micro_break.skip(now);
                    }
                    "p" => {
                        if micro_break.is_paused() {
                            let _ = micro_break.resume(now);
                        } else {
                            let _ = micro_break.pause(now);
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

// ============================================================================
// Display
// ============================================================================

fn display_overview(overview: &DayOverview) {
    println!("\n╭─────────────────────────────────────────╮");
    println!(
        "│  {} · {}",
        date_key(overview.date),
        overview.workout_type.as_str().to_uppercase()
    );
    println!("╰─────────────────────────────────────────╯");
    println!(
        "  Week {} · {}/{} this week · streak {}",
        overview.week_number,
        overview.week_progress.completed,
        overview.week_progress.total,
        overview.streak
    );
    if let Some(diff) = overview.weekly.vs_last_week {
        println!("  {:+} sessions vs last week", diff);
    }
    println!();

    if !overview.workout_type.is_training() {
        println!("  Rest day.");
        if overview.mobility_done {
            println!("  ✓ Mobility done");
        } else {
            println!("  Mobility routine available: `traindaily mobility`");
        }
        if let Some(next) = overview.next_training_day {
            println!("  Next training day: {}", date_key(next));
        }
        return;
    }

    if overview.done {
        println!("  ✓ Done for today");
        println!();
    }

    for target in &overview.exercises {
        let unit = target.exercise.unit.label();
        let targets: Vec<String> = target.targets.iter().map(|t| t.to_string()).collect();
        print!("  {:<28} {} {}", target.exercise.name, targets.join(" / "), unit);
        if let Some(previous) = &target.previous {
            print!("   (last: {:?})", previous);
        }
        if target.increase_difficulty {
            print!("   ↑ try a harder variation");
        }
        println!();
    }
    println!();
}

fn display_set_prompt(coach: &Coach<FileStorage>) {
    let snapshot = coach.snapshot();
    let Some(exercise) = snapshot.current_exercise else {
        return;
    };
    println!(
        "  {} · set {}/{} · target {} {}",
        exercise.name,
        snapshot.set_index + 1,
        snapshot.sets_per_exercise,
        snapshot.current_target.unwrap_or_default(),
        exercise.unit.label()
    );
}

fn render(coach: &Coach<FileStorage>) {
    let snapshot = coach.snapshot();
    match snapshot.state {
        WorkoutState::Exercising => {
            println!();
            if let Some(exercise) = &snapshot.current_exercise {
                println!(
                    "[{}/{}] {}",
                    snapshot.exercise_index + 1,
                    snapshot.exercise_count,
                    exercise.name
                );
                if !exercise.instruction.is_empty() {
                    println!("  {}", exercise.instruction);
                }
            }
            display_set_prompt(coach);
            if let Some(previous) = coach.previous_for_current_set() {
                println!("  last time: {}", previous);
            }
            print!("> ");
            let _ = io::stdout().flush();
        }
        WorkoutState::Resting => {
            println!("  Rest · 'p' pause · 's' skip · 'u' undo");
        }
        WorkoutState::Transitioning => {
            println!("\nNEXT UP: {} (Enter to continue)", snapshot.next_exercise_name);
        }
        WorkoutState::Complete | WorkoutState::Idle => {}
    }
}

fn render_rest_line(coach: &Coach<FileStorage>) {
    let snapshot = coach.snapshot();
    let Some(left) = snapshot.seconds_left else {
        return;
    };
    let marker = if snapshot.paused { " (paused)" } else { "" };
    print!("\r  {:>3}s{}   ", left, marker);
    let _ = io::stdout().flush();
}

fn display_logged(coach: &Coach<FileStorage>, value: u32, previous: Option<u32>) {
    let verdict = match coach.machine().flash() {
        Some(Flash::Hit) => "✓",
        Some(Flash::Miss) => "·",
        None => "",
    };
    let trend = match compare(value, previous) {
        Comparison::Improved { previous } => format!(" ↑ from {}", previous),
        Comparison::Decreased { previous } => format!(" ↓ from {}", previous),
        Comparison::Same { .. } => " = last time".to_string(),
        Comparison::None => String::new(),
    };
    println!("  {} {}{}", verdict, value, trend);
}

fn display_drill(coach: &Coach<FileStorage>) {
    let flow = coach.mobility();
    let Some(drill) = flow.current() else {
        return;
    };
    let side = flow
        .side()
        .map(|s| format!(" ({})", s.label()))
        .unwrap_or_default();
    println!(
        "\n[{}/{}] {}{} · {}s",
        flow.index() + 1,
        flow.drills().len(),
        drill.name,
        side,
        drill.seconds
    );
    println!("  {}", drill.instruction);
}

/// Cues as terminal output; the bell stands in for audio
struct TerminalFeedback;

impl Feedback for TerminalFeedback {
    fn on_countdown_tick(&self, seconds_left: u32) {
        print!("\x07");
        let _ = io::stdout().flush();
        tracing::trace!("countdown {}", seconds_left);
    }

    fn on_rest_complete(&self) {
        println!("\n  Rest over.");
    }

    fn on_session_complete(&self) {
        println!("\n✓ WORKOUT COMPLETE");
    }

    fn on_break_start(&self) {
        print!("\x07");
        let _ = io::stdout().flush();
    }

    fn on_break_done(&self) {
        println!("\n✓ Break done");
    }
}
