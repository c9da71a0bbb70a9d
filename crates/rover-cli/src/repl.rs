//! REPL – Read-Eval-Print Loop for the RoverByte interactive shell.
//!
//! Supported slash-commands:
//!   /help            – show this list
//!   /do a, b, ...    – queue a batch of actions
//!   /now <action>    – run one action on the ad hoc pool
//!   /say <file>      – load an audio clip for the speech loop
//!   /flush           – discard queued actions
//!   /mode <m>        – standby | thinking | running
//!   /status          – print the controller status as JSON
//!   /actions         – list known actions
//!   /touch [L|R|LS|RS] – simulate a touch on the head pad
//!   /lift            – simulate being picked up and put down
//!   /wake            – run the wake-up routine
//!   /quit | /exit    – gracefully exit the CLI
//!
//! Anything else is treated as a reply from the assistant: a direct voice
//! command runs at once, otherwise bracketed actions are queued and the rest
//! is printed as speech.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rover_hal::SimDog;
use rover_runtime::{RobotController, VoiceCommands, into_batch, parse_response};
use rover_types::{AudioHandle, QueueMode, TouchState};

use crate::config::Config;

const WAKE_TIMEOUT: Duration = Duration::from_secs(60);

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Do(Vec<String>),
    Now(String),
    Say(String),
    Flush,
    Mode(QueueMode),
    Status,
    Actions,
    Touch(TouchState),
    Lift,
    Wake,
    Quit,
    Chat(String),
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if !line.starts_with('/') {
        return Command::Chat(line.to_string());
    }
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (line, ""),
    };

    match cmd {
        "/help" => Command::Help,
        "/do" => {
            let names: Vec<String> = arg
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if names.is_empty() {
                Command::Invalid("usage: /do <action>[, <action> ...]".to_string())
            } else {
                Command::Do(names)
            }
        }
        "/now" if !arg.is_empty() => Command::Now(arg.to_string()),
        "/now" => Command::Invalid("usage: /now <action>".to_string()),
        "/say" if !arg.is_empty() => Command::Say(arg.to_string()),
        "/say" => Command::Invalid("usage: /say <audio file>".to_string()),
        "/flush" => Command::Flush,
        "/mode" => match arg {
            "standby" => Command::Mode(QueueMode::Standby),
            "thinking" | "think" => Command::Mode(QueueMode::Thinking),
            "running" | "run" => Command::Mode(QueueMode::RunningBatch),
            _ => Command::Invalid("usage: /mode standby|thinking|running".to_string()),
        },
        "/status" => Command::Status,
        "/actions" => Command::Actions,
        "/touch" if arg.is_empty() => Command::Touch(TouchState::Left),
        "/touch" => match arg.to_ascii_uppercase().parse::<TouchState>() {
            Ok(state) => Command::Touch(state),
            Err(e) => Command::Invalid(e.to_string()),
        },
        "/lift" => Command::Lift,
        "/wake" => Command::Wake,
        "/quit" | "/exit" => Command::Quit,
        other => Command::Invalid(format!("Unknown command: '{other}'")),
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(ctl: &RobotController, dog: &SimDog, cfg: &Config, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let voice = VoiceCommands::standard();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "rover>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Command::Help => cmd_help(),
            Command::Do(names) => {
                let n = ctl.execute_actions(names);
                println!("  {} {} action(s) queued", "✓".green(), n);
            }
            Command::Now(name) => cmd_now(ctl, &name),
            Command::Say(path) => {
                if let Some(old) = ctl.speak(AudioHandle::new(&path)) {
                    println!("  {} replaced unplayed clip {}", "!".yellow(), old);
                }
            }
            Command::Flush => {
                let n = ctl.flush();
                println!("  {} {} queued action(s) discarded", "✓".green(), n);
            }
            Command::Mode(mode) => {
                ctl.set_mode(mode);
                println!("  mode: {}", mode.to_string().yellow());
            }
            Command::Status => match serde_json::to_string_pretty(&ctl.status()) {
                Ok(json) => println!("{json}"),
                Err(e) => println!("{}: {}", "Status error".red(), e),
            },
            Command::Actions => {
                println!("{}", "Known actions".bold().underline());
                for name in ctl.catalog().names() {
                    println!("  • {name}");
                }
            }
            Command::Touch(state) => {
                dog.push_touch(state);
                println!("  {} touch {:?} sent to the sensor driver", "✓".green(), state);
            }
            Command::Lift => cmd_lift(ctl, dog),
            Command::Wake => cmd_wake(ctl, cfg),
            Command::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Command::Chat(text) => cmd_chat(ctl, &voice, &text),
            Command::Invalid(msg) => {
                println!(
                    "{} Type {} for available commands.",
                    msg.red(),
                    "/help".bold()
                );
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "RoverByte Commands".bold().underline());
    println!("  {}  – queue a batch of actions", "/do a, b".bold().cyan());
    println!("  {}  – run one action right away", "/now <a>".bold().cyan());
    println!("  {}  – load an audio clip", "/say <f>".bold().cyan());
    println!("  {}    – discard queued actions", "/flush".bold().cyan());
    println!("  {} – standby | thinking | running", "/mode <m>".bold().cyan());
    println!("  {}   – controller status (JSON)", "/status".bold().cyan());
    println!("  {}  – list known actions", "/actions".bold().cyan());
    println!("  {}    – simulate a head touch", "/touch".bold().cyan());
    println!("  {}     – simulate a pick-up", "/lift".bold().cyan());
    println!("  {}     – run the wake-up routine", "/wake".bold().cyan());
    println!("  {}  – exit the CLI", "/quit  /exit".bold().cyan());
    println!("  Any other text is handled like an assistant reply.");
    println!();
}

fn cmd_now(ctl: &RobotController, name: &str) {
    match ctl.execute_action(name).and_then(|task| task.wait()) {
        Ok(()) => println!("  {} {}", "✓".green(), name.bold()),
        Err(e) => println!("  {} {}", "✗".red(), e),
    }
}

fn cmd_lift(ctl: &RobotController, dog: &SimDog) {
    let sensors = &ctl.config().sensors;
    let held = sensors.lift_threshold.saturating_add(5_000);
    let samples = sensors.lift_hold_samples as usize + 1;
    dog.push_accel(std::iter::repeat_n(held, samples));
    dog.push_accel([sensors.rest_threshold.saturating_sub(1_000)]);
    println!("  {} pick-up and set-down sent to the sensor driver", "✓".green());
}

fn cmd_wake(ctl: &RobotController, cfg: &Config) {
    let n = ctl.execute_actions(cfg.wake_routine.iter().cloned());
    println!("  Waking up ({n} actions) …");
    if ctl.wait_for_actions(WAKE_TIMEOUT) {
        println!("  {} RoverByte is awake ({}).", "✓".green(), ctl.posture());
    } else {
        println!("  {} wake routine still running", "!".yellow());
    }
}

fn cmd_chat(ctl: &RobotController, voice: &VoiceCommands, text: &str) {
    if let Some(action) = voice.resolve(text) {
        ctl.execute_actions([action]);
        println!("  {} {}", "→".cyan(), action.bold());
        return;
    }

    let parts = parse_response(text);
    // No speech synthesiser is attached; print the lines instead.
    let batch = into_batch(parts, |line| {
        println!("  {} {}", "rover:".magenta().bold(), line);
        None
    });
    if !batch.is_empty() {
        let n = ctl.perform(&batch);
        println!("  {} {} action(s) queued", "✓".green(), n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(parse_command("  sit down please "), Command::Chat("sit down please".into()));
    }

    #[test]
    fn do_splits_on_commas() {
        assert_eq!(
            parse_command("/do sit, bark ,wag_tail"),
            Command::Do(vec!["sit".into(), "bark".into(), "wag_tail".into()])
        );
        assert!(matches!(parse_command("/do"), Command::Invalid(_)));
    }

    #[test]
    fn now_keeps_multi_word_names() {
        assert_eq!(parse_command("/now high five"), Command::Now("high five".into()));
        assert!(matches!(parse_command("/now"), Command::Invalid(_)));
    }

    #[test]
    fn mode_and_touch_arguments() {
        assert_eq!(parse_command("/mode think"), Command::Mode(QueueMode::Thinking));
        assert!(matches!(parse_command("/mode asleep"), Command::Invalid(_)));
        assert_eq!(parse_command("/touch"), Command::Touch(TouchState::Left));
        assert_eq!(parse_command("/touch rs"), Command::Touch(TouchState::RightSlide));
        assert!(matches!(parse_command("/touch X"), Command::Invalid(_)));
    }

    #[test]
    fn unknown_slash_command() {
        assert_eq!(
            parse_command("/dance"),
            Command::Invalid("Unknown command: '/dance'".into())
        );
        assert_eq!(parse_command("/exit"), Command::Quit);
    }
}
