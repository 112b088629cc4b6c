use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

mod app;
mod calendar;
mod catalog;
mod dates;
mod grouping;
mod history;
mod layout;
mod logging;
mod models;
mod storage;
mod ui;

use app::App;
use catalog::CatalogClient;
use models::SetTarget;
use storage::{LogStore, ThemePreference};

#[derive(Debug, Parser)]
#[command(name = "liftlog", version, about = "Workout plans, set logging and a calendar history")]
struct Cli {
    /// Path of the JSON store
    #[arg(long, global = true, env = "LIFTLOG_STORE")]
    store: Option<PathBuf>,

    /// Pin "today" (YYYY-MM-DD) for the calendar
    #[arg(long, global = true, value_parser = dates::parse_date)]
    today: Option<NaiveDate>,

    /// Write logs here instead of ~/.liftlog.log
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Browse the calendar history (default)
    History,
    /// Manage workout plans
    #[command(subcommand)]
    Plan(PlanCommand),
    /// Manage the exercises of a plan
    #[command(subcommand)]
    Exercise(ExerciseCommand),
    /// Record a finished set
    Log(LogArgs),
    /// Print this year's activity per month
    Calendar,
    /// List exercises from the remote catalog
    Catalog {
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum PlanCommand {
    Add { name: String },
    List,
    Remove { id: u64 },
}

#[derive(Debug, Subcommand)]
enum ExerciseCommand {
    Add {
        plan_id: u64,
        name: String,
        /// Target set as REPSxKG, e.g. 10x60 (repeatable)
        #[arg(long = "set", value_parser = parse_set_target)]
        sets: Vec<SetTarget>,
    },
}

#[derive(Debug, Args)]
struct LogArgs {
    plan_id: u64,
    exercise_id: u64,
    #[arg(long)]
    reps: u32,
    #[arg(long, default_value_t = 0.0)]
    weight: f64,
    /// Finish time as RFC 3339; defaults to now
    #[arg(long, value_parser = parse_finished_at)]
    at: Option<DateTime<Local>>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(path) = cli.log_file.clone().or_else(storage::default_log_path) {
        if let Err(err) = logging::init(&path, cli.verbose) {
            eprintln!("Logging disabled: {err}");
        }
    }

    let store_path = match cli.store.clone() {
        Some(path) => path,
        None => storage::default_store_path()?,
    };

    match cli.command {
        None | Some(Command::History) => run_history(store_path, cli.today),
        Some(Command::Plan(command)) => run_plan(store_path, command),
        Some(Command::Exercise(command)) => run_exercise(store_path, command),
        Some(Command::Log(args)) => run_log(store_path, args),
        Some(Command::Calendar) => run_calendar(store_path, cli.today),
        Some(Command::Catalog { url }) => run_catalog(url),
    }
}

fn run_history(store_path: PathBuf, today: Option<NaiveDate>) -> Result<(), Box<dyn Error>> {
    let store = Arc::new(LogStore::open(&store_path)?);
    let theme = storage::read_theme().unwrap_or(ThemePreference::Terminal);

    let mut stdout = std::io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(store, today, theme);
    let result = event_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    loop {
        app.tick();
        terminal.draw(|frame| ui::draw(frame, app))?;

        if app.should_quit {
            return Ok(());
        }

        if event::poll(Duration::from_millis(120))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key_event(key);
                }
            }
        }
    }
}

fn run_plan(store_path: PathBuf, command: PlanCommand) -> Result<(), Box<dyn Error>> {
    let mut store = LogStore::open(&store_path)?;
    match command {
        PlanCommand::Add { name } => {
            let id = store.add_plan(&name);
            store.save()?;
            println!("Created plan {id}: {}", name.trim());
        }
        PlanCommand::List => {
            if store.plans().is_empty() {
                println!("No plans yet. Create one with `liftlog plan add <name>`.");
            }
            for plan in store.plans() {
                println!("{:>4}  {}", plan.id, plan.name);
                for exercise in &plan.exercises {
                    let sets = exercise
                        .sets
                        .iter()
                        .map(|set| format!("{}x{}", set.reps, grouping::format_weight(set.weight_kg)))
                        .collect::<Vec<_>>()
                        .join(" ");
                    println!("      {:>4}  {}  {}", exercise.exercise_id, exercise.name, sets);
                }
            }
        }
        PlanCommand::Remove { id } => {
            let plan = store.remove_plan(id)?;
            store.save()?;
            println!("Removed plan {}: {}", plan.id, plan.name);
        }
    }
    Ok(())
}

fn run_exercise(store_path: PathBuf, command: ExerciseCommand) -> Result<(), Box<dyn Error>> {
    let mut store = LogStore::open(&store_path)?;
    match command {
        ExerciseCommand::Add {
            plan_id,
            name,
            sets,
        } => {
            let id = store.add_exercise(plan_id, &name, sets)?;
            store.save()?;
            println!("Added exercise {id} to plan {plan_id}: {}", name.trim());
        }
    }
    Ok(())
}

fn run_log(store_path: PathBuf, args: LogArgs) -> Result<(), Box<dyn Error>> {
    let mut store = LogStore::open(&store_path)?;
    let finished_at = args.at.unwrap_or_else(Local::now);
    let id = store.log_set(
        args.plan_id,
        args.exercise_id,
        args.reps,
        args.weight,
        finished_at.timestamp_millis(),
    )?;
    store.save()?;
    tracing::info!(id, plan = args.plan_id, exercise = args.exercise_id, "logged set");
    println!(
        "Logged {}×{}kg at {}",
        args.reps,
        grouping::format_weight(args.weight),
        finished_at.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

fn run_calendar(store_path: PathBuf, today: Option<NaiveDate>) -> Result<(), Box<dyn Error>> {
    let store = LogStore::open(&store_path)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let months = calendar::build_year_calendar_batched(today, &Local, &store)?;

    for month in &months {
        let active_days = month
            .daily_data_list
            .iter()
            .filter(|day| day.has_activity())
            .count();
        let sets: usize = month
            .daily_data_list
            .iter()
            .map(|day| day.exercise_activity_count)
            .sum();
        let strip: String = month
            .daily_data_list
            .iter()
            .map(|day| match (day.is_future_date, day.has_activity()) {
                (true, _) => ' ',
                (false, true) => '●',
                (false, false) => '·',
            })
            .collect();
        println!("{:<15} {strip:<31}  {active_days:>2} days  {sets:>4} sets", month.label());
    }
    println!("{} sets logged in total", store.logs().len());
    Ok(())
}

fn run_catalog(url: Option<String>) -> Result<(), Box<dyn Error>> {
    let url = url.unwrap_or_else(storage::read_catalog_url);
    let client = CatalogClient::new(url)?;
    let mut exercises = client.fetch_exercises()?;
    exercises.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    for exercise in exercises {
        match exercise.category {
            Some(category) => println!("{:>5}  {}  ({category})", exercise.id, exercise.name),
            None => println!("{:>5}  {}", exercise.id, exercise.name),
        }
    }
    Ok(())
}

fn parse_set_target(value: &str) -> Result<SetTarget, String> {
    let (reps, weight) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "Use REPSxKG, e.g. 10x60.".to_string())?;
    let reps = reps
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("Invalid rep count: {reps}"))?;
    let weight_kg = weight
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Invalid weight: {weight}"))?;
    if weight_kg < 0.0 || !weight_kg.is_finite() {
        return Err(format!("Invalid weight: {weight}"));
    }
    Ok(SetTarget { reps, weight_kg })
}

fn parse_finished_at(value: &str) -> Result<DateTime<Local>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|value| value.with_timezone(&Local))
        .map_err(|_| "Invalid timestamp. Use RFC 3339, e.g. 2024-06-15T18:30:00+02:00.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_set_targets() {
        let set = parse_set_target("10x62.5").unwrap();
        assert_eq!(set.reps, 10);
        assert!((set.weight_kg - 62.5).abs() < f64::EPSILON);
        assert!(parse_set_target("10").is_err());
        assert!(parse_set_target("tenx5").is_err());
        assert!(parse_set_target("5x-1").is_err());
    }

    #[test]
    fn parses_log_command() {
        let cli = Cli::try_parse_from([
            "liftlog",
            "log",
            "1",
            "2",
            "--reps",
            "8",
            "--weight",
            "70",
            "--at",
            "2024-06-15T18:30:00Z",
        ])
        .unwrap();
        let Some(Command::Log(args)) = cli.command else {
            panic!("expected log command");
        };
        assert_eq!(args.reps, 8);
        assert_eq!(args.at.unwrap().timestamp_millis(), 1_718_476_200_000);
    }

    #[test]
    fn calendar_command_parses() {
        let cli = Cli::try_parse_from(["liftlog", "calendar", "--today", "2024-02-29"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Calendar)));
    }

    #[test]
    fn today_flag_is_global() {
        let cli = Cli::try_parse_from(["liftlog", "history", "--today", "2024-06-15"]).unwrap();
        assert_eq!(cli.today, NaiveDate::from_ymd_opt(2024, 6, 15));
    }
}
