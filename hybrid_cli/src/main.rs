use clap::{Parser, Subcommand};
use hybrid_core::config::ProgramConfig;
use hybrid_core::drive::{AuthorizationSurface, DriveSync, HttpUploader, SurfaceStatus};
use hybrid_core::timer::format_remaining;
use hybrid_core::*;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hybrid")]
#[command(about = "Hybrid Master 51 workout tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the standard one
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the dashboard for the selected week and day (default)
    Show,

    /// Select a week (1-26, 0 clears the selection)
    Week { week: u32 },

    /// Move to the next week
    Next,

    /// Move to the previous week
    Prev,

    /// Switch day (sunday, tuesday, friday)
    Day { day: Day },

    /// Mark a set done, or undone if already done
    Toggle { exercise: usize, series: u32 },

    /// Finish the session: advance to the next week and save
    Finish,

    /// Save now
    Save,

    /// Export the full state as JSON
    ExportJson { path: Option<PathBuf> },

    /// Export the program as CSV
    ExportCsv { path: Option<PathBuf> },

    /// Replace the saved state with an exported JSON file
    Import { path: PathBuf },

    /// Back up the state to Google Drive
    SyncDrive,

    /// Run the built-in self-test
    Selftest,

    /// Run a rest timer in the foreground until it completes
    Timer {
        /// Exercise index in the current session
        #[arg(required_unless_present = "global")]
        exercise: Option<usize>,

        /// Run the global timer instead
        #[arg(long, conflicts_with = "exercise")]
        global: bool,
    },

    /// Show stats for the selected week
    Stats,

    /// Interactive session with live timers
    Shell,
}

/// Commands only available inside the shell
#[derive(Parser)]
#[command(no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    #[command(flatten)]
    Common(Commands),

    /// Start an exercise's rest timer
    Start { exercise: usize },

    /// Pause an exercise's rest timer
    Pause { exercise: usize },

    /// Reset an exercise's rest timer
    Reset { exercise: usize },

    /// Control the global timer (start, pause, reset)
    Global { action: String },

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

const DEFAULT_JSON_EXPORT: &str = "hybrid_master_51_export.json";
const DEFAULT_CSV_EXPORT: &str = "hybrid_master_51.csv";

struct App {
    tracker: Tracker<FileStore>,
    config: Config,
    drive: Option<DriveSync<HttpUploader>>,
}

fn main() -> ExitCode {
    // Initialize logging
    hybrid_core::logging::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("⚠ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    let mut app = App::open(config, &data_dir)?;
    match cli.command.unwrap_or(Commands::Show) {
        Commands::Shell => cmd_shell(&mut app),
        command => {
            let mut stdin = None;
            execute(&mut app, command, &mut stdin)
        }
    }
}

impl App {
    fn open(config: Config, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;

        let generated;
        let program = if config.program == ProgramConfig::default() {
            Program::standard()
        } else {
            generated = Program::generate(&config.program);
            &generated
        };
        let problems = program.validate();
        if !problems.is_empty() {
            for problem in &problems {
                eprintln!("  - {}", problem);
            }
            return Err(Error::State("generated program is invalid".into()));
        }

        let gateway = Gateway::new(FileStore::new(data_dir), &config.storage);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let timers = TimerRegistry::new(clock, &config.timers);
        let tracker = Tracker::open(gateway, timers, program);

        Ok(Self {
            tracker,
            config,
            drive: None,
        })
    }

    /// Persist after a navigation command so the next invocation sees it
    fn persist(&mut self) -> Result<()> {
        self.tracker.save().map(|_| ())
    }
}

fn execute(app: &mut App, command: Commands, stdin: &mut Option<StdinLines>) -> Result<()> {
    match command {
        Commands::Show => {
            println!("{}", DashboardView::build(&mut app.tracker));
            Ok(())
        }
        Commands::Week { week } => {
            let selected = app.tracker.select_week(week);
            app.persist()?;
            if selected == 0 {
                println!("✓ Week selection cleared");
            } else {
                println!("✓ Week {} selected", selected);
            }
            Ok(())
        }
        Commands::Next => cmd_navigate(app, Tracker::advance_week),
        Commands::Prev => cmd_navigate(app, Tracker::retreat_week),
        Commands::Day { day } => {
            app.tracker.change_day(day)?;
            app.persist()?;
            println!("✓ {} selected", day);
            Ok(())
        }
        Commands::Toggle { exercise, series } => cmd_toggle(app, exercise, series),
        Commands::Finish => {
            let (change, _) = app.tracker.finish_session()?;
            println!("✓ Session saved");
            println!("  {}", change);
            Ok(())
        }
        Commands::Save => {
            let receipt = app.tracker.save()?;
            println!(
                "✓ Saved at {}",
                receipt.saved_at.with_timezone(&chrono::Local).format("%H:%M:%S")
            );
            Ok(())
        }
        Commands::ExportJson { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_JSON_EXPORT));
            write_export(&path, &app.tracker.export_json()?)
        }
        Commands::ExportCsv { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_EXPORT));
            write_export(&path, &app.tracker.export_csv()?)
        }
        Commands::Import { path } => {
            let bytes = std::fs::read(&path)?;
            app.tracker.import(&bytes)?;
            println!("✓ Imported {}", path.display());
            let state = app.tracker.state();
            println!(
                "  {} weeks, week {} selected",
                state.weeks.len(),
                state.selected_week
            );
            Ok(())
        }
        Commands::SyncDrive => cmd_sync_drive(app, stdin),
        Commands::Selftest => {
            let report = selftest::run(&mut app.tracker);
            println!("{}", report);
            if report.passed() {
                Ok(())
            } else {
                Err(Error::Other(format!(
                    "self-test found {} problem(s)",
                    report.failures().count()
                )))
            }
        }
        Commands::Timer { exercise, global } => cmd_timer(app, exercise, global),
        Commands::Stats => {
            let stats = app.tracker.stats();
            println!("Week {}", app.tracker.state().selected_week);
            println!("  Volume:         {} kg·rep", stats.volume_kg);
            println!("  Completed sets: {}", stats.completed_sets);
            match stats.average_target_rpe {
                Some(rpe) => println!("  Average RPE:    {:.1}", rpe),
                None => println!("  Average RPE:    -"),
            }
            println!();
            print!("{}", app.tracker.volume_chart().render(30));
            Ok(())
        }
        Commands::Shell => {
            println!("Already in the shell.");
            Ok(())
        }
    }
}

fn cmd_navigate(
    app: &mut App,
    step: fn(&mut Tracker<FileStore>) -> WeekChange,
) -> Result<()> {
    match step(&mut app.tracker) {
        WeekChange::Moved(week) => {
            app.persist()?;
            println!("✓ Week {} selected", week);
        }
        refused => println!("{}", refused),
    }
    Ok(())
}

fn cmd_toggle(app: &mut App, exercise: usize, series: u32) -> Result<()> {
    let key = app.tracker.key_for(exercise, series)?;
    match app.tracker.toggle_set(exercise, series) {
        Ok(entry) => {
            let mark = if entry.completed { "done" } else { "not done" };
            println!("✓ {} marked {}", key, mark);
            Ok(())
        }
        Err(e @ Error::Storage(_)) => {
            eprintln!("⚠ Change kept in memory but not saved");
            Err(e)
        }
        Err(e) => Err(e),
    }
}

fn write_export(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    println!("✓ Exported to {}", path.display());
    Ok(())
}

fn cmd_timer(app: &mut App, exercise: Option<usize>, global: bool) -> Result<()> {
    let tracker = &mut app.tracker;
    match exercise {
        Some(index) if !global => tracker.start_timer(index),
        _ => tracker.start_global_timer(),
    }

    let clock = Arc::clone(tracker.timers().clock());
    let tick = tracker.timers().tick();
    loop {
        let events = tracker.poll_timers();
        let remaining = match exercise {
            Some(index) if !global => tracker.timer_remaining(index),
            _ => tracker
                .timers()
                .global()
                .map(|g| g.countdown().remaining())
                .unwrap_or_default(),
        };
        print!("\r  {}  ", format_remaining(remaining));
        io::stdout().flush()?;

        if !events.is_empty() {
            println!();
            for event in events {
                println!("🔔 {}", event);
            }
            return Ok(());
        }
        clock.sleep(tick);
    }
}

fn cmd_sync_drive(app: &mut App, stdin: &mut Option<StdinLines>) -> Result<()> {
    if !app.config.drive.is_enabled() {
        return Err(Error::Config(
            "Drive backup is not configured: set [drive] client_id in the config file".into(),
        ));
    }

    let snapshot = app.tracker.backup_snapshot()?;
    let mut drive = match app.drive.take() {
        Some(drive) => drive,
        None => DriveSync::new(app.config.drive.clone(), HttpUploader::new()?),
    };

    let lines = stdin.get_or_insert_with(StdinLines::spawn);
    let mut surface = TerminalSurface { lines };
    let clock = Arc::clone(app.tracker.timers().clock());
    let result = drive.backup(&snapshot, &mut surface, clock.as_ref());
    app.drive = Some(drive);

    let file_id = result?;
    println!("✓ Backed up to Drive (file id {})", file_id);
    Ok(())
}

// ============================================================================
// Terminal input
// ============================================================================

/// Lines of stdin read on a background thread; `None` marks end of input
struct StdinLines {
    rx: Receiver<Option<String>>,
}

impl StdinLines {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Some(line)).is_err() {
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = tx.send(None);
        });
        Self { rx }
    }
}

/// Consent flow completed in the user's browser; the redirect URL is pasted
/// back into the terminal, an empty line cancels
struct TerminalSurface<'a> {
    lines: &'a StdinLines,
}

impl AuthorizationSurface for TerminalSurface<'_> {
    fn open(&mut self, url: &str) -> bool {
        let launched = open::that(url).is_ok();
        if !launched && !io::stdin().is_terminal() {
            return false;
        }
        println!("Authorize Drive access in your browser:");
        println!("  {}", url);
        println!("Paste the URL you were redirected to (empty line to cancel):");
        true
    }

    fn poll(&mut self) -> SurfaceStatus {
        match self.lines.rx.try_recv() {
            Ok(Some(line)) if line.trim().is_empty() => SurfaceStatus::Closed,
            Ok(Some(line)) => SurfaceStatus::Redirected(line.trim().to_string()),
            Ok(None) | Err(TryRecvError::Disconnected) => SurfaceStatus::Closed,
            Err(TryRecvError::Empty) => SurfaceStatus::Pending,
        }
    }

    fn close(&mut self) {}
}

// ============================================================================
// Shell
// ============================================================================

fn cmd_shell(app: &mut App) -> Result<()> {
    println!("Hybrid Master 51 shell. Type 'help' for commands, 'quit' to leave.");
    let mut stdin = Some(StdinLines::spawn());
    let tick = app.tracker.timers().tick();

    prompt()?;
    loop {
        let received = match &stdin {
            Some(lines) => lines.rx.recv_timeout(tick),
            None => return Ok(()),
        };

        for event in app.tracker.poll_timers() {
            println!("\n🔔 {}", event);
            prompt()?;
        }

        let line = match received {
            Ok(Some(line)) => line,
            Ok(None) | Err(RecvTimeoutError::Disconnected) => return Ok(()),
            Err(RecvTimeoutError::Timeout) => continue,
        };

        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            prompt()?;
            continue;
        }

        match ShellLine::try_parse_from(words.iter().copied()) {
            Ok(ShellLine {
                command: ShellCommand::Quit,
            }) => return Ok(()),
            Ok(ShellLine { command }) => {
                if let Err(e) = execute_shell(app, command, &mut stdin) {
                    eprintln!("⚠ {}", e);
                }
            }
            Err(e) => {
                let _ = e.print();
            }
        }
        prompt()?;
    }
}

fn execute_shell(
    app: &mut App,
    command: ShellCommand,
    stdin: &mut Option<StdinLines>,
) -> Result<()> {
    let command = match command {
        ShellCommand::Common(command) => return execute(app, command, stdin),
        other => other,
    };

    let tracker = &mut app.tracker;
    match &command {
        ShellCommand::Start { exercise } => tracker.start_timer(*exercise),
        ShellCommand::Pause { exercise } => tracker.pause_timer(*exercise),
        ShellCommand::Reset { exercise } => tracker.reset_timer(*exercise),
        ShellCommand::Global { action } => match action.as_str() {
            "start" => tracker.start_global_timer(),
            "pause" => tracker.pause_global_timer(),
            "reset" => tracker.reset_global_timer(),
            other => {
                return Err(Error::Other(format!(
                    "unknown global timer action '{}' (start, pause, reset)",
                    other
                )))
            }
        },
        ShellCommand::Common(_) | ShellCommand::Quit => return Ok(()),
    }

    match command_exercise(&command) {
        Some(index) => println!(
            "  Exercise {} rest: {}",
            index,
            format_remaining(tracker.timer_remaining(index))
        ),
        None => {
            let remaining = tracker
                .timers()
                .global()
                .map(|g| g.countdown().remaining())
                .unwrap_or_default();
            println!("  Global: {}", format_remaining(remaining));
        }
    }
    Ok(())
}

fn command_exercise(command: &ShellCommand) -> Option<usize> {
    match command {
        ShellCommand::Start { exercise }
        | ShellCommand::Pause { exercise }
        | ShellCommand::Reset { exercise } => Some(*exercise),
        _ => None,
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}
