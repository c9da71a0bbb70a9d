//! `roverbyte` – RoverByte Command Line Interface
//!
//! This binary drives the control core against the simulated robot dog.  It:
//!
//! 1. Checks for `~/.roverbyte/config.toml`; runs a **First-Run Wizard** when
//!    the file is absent.
//! 2. Builds a [`RobotController`] and starts its drain, speech and sensor
//!    loops.
//! 3. Drops the user into an **interactive REPL** with slash-commands
//!    (`/do`, `/now`, `/status`, `/touch`, `/help`, ...).
//! 4. Intercepts **Ctrl-C** to flush the queue and park the robot safely.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};

use rover_hal::SimDog;
use rover_kernel::ActionCatalog;
use rover_runtime::{Drivers, RobotController};
use rover_types::Posture;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the level, ROVER_LOG_FORMAT=json switches to JSON and
    // OTEL_EXPORTER_OTLP_ENDPOINT enables span export.
    let _guard = rover_runtime::init_tracing("roverbyte");

    print_banner();

    // ── First-Run Wizard ──────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => run_first_run_wizard(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    // ── Control core ──────────────────────────────────────────────────────
    let dog = Arc::new(SimDog::new());
    let controller = match ActionCatalog::standard().and_then(|catalog| {
        RobotController::new(Drivers::sim(dog.clone()), catalog, cfg.robot.clone())
    }) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!(error = %e, "failed to build controller");
            println!("{}: {}", "Startup error".red(), e);
            std::process::exit(1);
        }
    };
    if let Err(e) = controller.start() {
        println!("{}: {}", "Startup error".red(), e);
        std::process::exit(1);
    }
    println!(
        "  RoverByte is up, resting in posture {}.",
        controller.posture().to_string().bold()
    );

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let ctl_for_ctrlc = controller.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – initiating graceful shutdown …".yellow().bold());

        shutdown_clone.store(true, Ordering::SeqCst);
        let dropped = ctl_for_ctrlc.flush();
        println!("{}", format!("  ✓ {dropped} queued action(s) discarded.").green());
        ctl_for_ctrlc.shutdown();
        println!("{}", "  ✓ Motors stopped. Exiting RoverByte.".green());
        std::process::exit(0);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    println!();
    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(&controller, &dog, &cfg, shutdown);
    controller.shutdown();
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║     RoverByte First-Run Wizard       ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up RoverByte.\n");

    let mut cfg = config::Config::default();

    // Starting posture
    println!("  Which posture is the robot in when it powers up?");
    println!("    1) Lying down  (default)");
    println!("    2) Sitting");
    println!("    3) Standing");
    let choice = prompt_line("  Enter choice [1]: ", "1");
    cfg.robot.initial_posture = match choice.trim() {
        "2" => Posture::Sit,
        "3" => Posture::Stand,
        _ => Posture::Lie,
    };

    // Sensors
    let touch = prompt_line("  React to head touches? [Y/n]: ", "y");
    cfg.robot.sensors.touch_enabled = config::parse_flag(&touch).unwrap_or(true);
    let motion = prompt_line("  React to being picked up? [Y/n]: ", "y");
    cfg.robot.sensors.motion_enabled = config::parse_flag(&motion).unwrap_or(true);

    // Ad hoc workers
    let workers = prompt_line(
        &format!(
            "  Concurrent ad hoc actions [{}]: ",
            cfg.robot.dispatch.adhoc_workers
        ),
        &cfg.robot.dispatch.adhoc_workers.to_string(),
    );
    if let Ok(n) = workers.trim().parse::<usize>()
        && n > 0
    {
        cfg.robot.dispatch.adhoc_workers = n;
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"    ____                        ____        __       "#.bold().cyan());
    println!("{}", r#"   / __ \____ _   _____  _____/ __ )__  __/ /____   "#.bold().cyan());
    println!("{}", r#"  / /_/ / __ \ | / / _ \/ ___/ __  / / / / __/ _ \  "#.bold().cyan());
    println!("{}", r#" / _, _/ /_/ / |/ /  __/ /  / /_/ / /_/ / /_/  __/  "#.bold().cyan());
    println!("{}", r#"/_/ |_|\____/|___/\___/_/  /_____/\__, /\__/\___/   "#.bold().cyan());
    println!("{}", r#"                                 /____/             "#.bold().cyan());
    println!();
    println!("  {} {}",
        "RoverByte".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Robot dog control core");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
