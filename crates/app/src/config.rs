use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use quiz_core::model::QuizId;
use services::SessionSettings;

pub const DEFAULT_QUIZ_FILE: &str = "quizzes/sample.json";
const DEFAULT_USER: &str = "learner";
const DEFAULT_TICK_MS: u64 = 1_000;
const DEFAULT_GRADING_DELAY_MS: u64 = 500;

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    EmptyValue { flag: &'static str },
    InvalidQuizId { raw: String },
    InvalidMillis { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::EmptyValue { flag } => write!(f, "{flag} must not be empty"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw}"),
            ArgsError::InvalidMillis { flag, raw } => {
                write!(f, "invalid {flag} value: {raw} (expected milliseconds)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    List,
    Play,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "list" => Some(Self::List),
            "play" => Some(Self::Play),
            _ => None,
        }
    }
}

/// Everything the binary needs, resolved from flags first and environment second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub command: Command,
    pub quiz_file: PathBuf,
    /// `None` plays the first quiz in the file.
    pub quiz_id: Option<QuizId>,
    pub user: String,
    pub tick_period: Duration,
    pub grading_delay: Duration,
    pub log_json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Help,
    Run(AppConfig),
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown or malformed arguments.
    pub fn from_process() -> Result<Invocation, ArgsError> {
        Self::parse(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    /// Parse `args` (without the program name), reading fallbacks through `env`.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown or malformed arguments. Malformed
    /// environment values are ignored in favour of the defaults.
    pub fn parse<I, E>(args: I, env: E) -> Result<Invocation, ArgsError>
    where
        I: IntoIterator<Item = String>,
        E: Fn(&str) -> Option<String>,
    {
        let mut args = args.into_iter().peekable();

        // No subcommand means play.
        let first = args.peek().cloned();
        let command = match first.as_deref() {
            None => Command::Play,
            Some("--help" | "-h" | "help") => return Ok(Invocation::Help),
            Some(flag) if flag.starts_with("--") => Command::Play,
            Some(other) => {
                let command = Command::from_arg(other)
                    .ok_or_else(|| ArgsError::UnknownCommand(other.to_string()))?;
                args.next();
                command
            }
        };

        let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());
        let mut config = Self {
            command,
            quiz_file: non_empty("QUIZ_FILE").map_or_else(|| DEFAULT_QUIZ_FILE.into(), PathBuf::from),
            quiz_id: non_empty("QUIZ_ID").and_then(|value| value.parse().ok()),
            user: non_empty("QUIZ_USER").unwrap_or_else(|| DEFAULT_USER.into()),
            tick_period: Duration::from_millis(
                non_empty("QUIZ_TICK_MS")
                    .and_then(|value| parse_millis(&value))
                    .unwrap_or(DEFAULT_TICK_MS),
            ),
            grading_delay: Duration::from_millis(
                non_empty("QUIZ_GRADING_DELAY_MS")
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(DEFAULT_GRADING_DELAY_MS),
            ),
            log_json: env_bool(non_empty("QUIZ_LOG_JSON").as_deref(), false),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--quiz" => {
                    let value = require_value(&mut args, "--quiz")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::EmptyValue { flag: "--quiz" });
                    }
                    config.quiz_file = PathBuf::from(value);
                }
                "--quiz-id" => {
                    let value = require_value(&mut args, "--quiz-id")?;
                    let id = value
                        .parse::<QuizId>()
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                    config.quiz_id = Some(id);
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::EmptyValue { flag: "--user" });
                    }
                    config.user = value.trim().to_string();
                }
                "--tick-ms" => {
                    let value = require_value(&mut args, "--tick-ms")?;
                    let millis = parse_millis(&value).ok_or_else(|| ArgsError::InvalidMillis {
                        flag: "--tick-ms",
                        raw: value.clone(),
                    })?;
                    config.tick_period = Duration::from_millis(millis);
                }
                "--grading-delay-ms" => {
                    let value = require_value(&mut args, "--grading-delay-ms")?;
                    let millis: u64 =
                        value
                            .trim()
                            .parse()
                            .map_err(|_| ArgsError::InvalidMillis {
                                flag: "--grading-delay-ms",
                                raw: value.clone(),
                            })?;
                    config.grading_delay = Duration::from_millis(millis);
                }
                "--log-json" => config.log_json = true,
                "--help" | "-h" => return Ok(Invocation::Help),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Invocation::Run(config))
    }

    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            tick_period: self.tick_period,
            grading_delay: self.grading_delay,
        }
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

/// Tick periods must be positive.
fn parse_millis(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|millis| *millis > 0)
}

fn env_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::trim) {
        Some("1" | "true" | "TRUE" | "yes" | "YES") => true,
        Some("0" | "false" | "FALSE" | "no" | "NO") => false,
        _ => default,
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play [--quiz <file>] [--quiz-id <id>] [--user <name>]");
    eprintln!("                           [--tick-ms <ms>] [--grading-delay-ms <ms>] [--log-json]");
    eprintln!("  cargo run -p app -- list [--quiz <file>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --quiz {DEFAULT_QUIZ_FILE}");
    eprintln!("  --quiz-id <first quiz in the file>");
    eprintln!("  --tick-ms {DEFAULT_TICK_MS}");
    eprintln!("  --grading-delay-ms {DEFAULT_GRADING_DELAY_MS}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_FILE, QUIZ_ID, QUIZ_USER, QUIZ_TICK_MS, QUIZ_GRADING_DELAY_MS,");
    eprintln!("  QUIZ_LOG_JSON, RUST_LOG");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn run(raw: &[&str]) -> AppConfig {
        match AppConfig::parse(args(raw), no_env).unwrap() {
            Invocation::Run(config) => config,
            Invocation::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn defaults_to_play_with_sample_file() {
        let config = run(&[]);
        assert_eq!(config.command, Command::Play);
        assert_eq!(config.quiz_file, PathBuf::from(DEFAULT_QUIZ_FILE));
        assert_eq!(config.quiz_id, None);
        assert_eq!(config.user, "learner");
        assert_eq!(config.tick_period, Duration::from_secs(1));
        assert_eq!(config.grading_delay, Duration::from_millis(500));
        assert!(!config.log_json);
    }

    #[test]
    fn flags_override_defaults() {
        let config = run(&[
            "play",
            "--quiz",
            "other.json",
            "--quiz-id",
            "2",
            "--user",
            " Ada ",
            "--tick-ms",
            "50",
            "--grading-delay-ms",
            "0",
            "--log-json",
        ]);
        assert_eq!(config.quiz_file, PathBuf::from("other.json"));
        assert_eq!(config.quiz_id, Some(QuizId::new(2)));
        assert_eq!(config.user, "Ada");
        assert_eq!(config.session_settings().tick_period, Duration::from_millis(50));
        assert!(config.session_settings().grading_delay.is_zero());
        assert!(config.log_json);
    }

    #[test]
    fn flags_without_subcommand_mean_play() {
        assert_eq!(run(&["--quiz-id", "1"]).command, Command::Play);
        assert_eq!(run(&["list"]).command, Command::List);
    }

    #[test]
    fn environment_fills_in_missing_flags() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("QUIZ_FILE", "env.json"),
            ("QUIZ_ID", "7"),
            ("QUIZ_USER", "Grace"),
            ("QUIZ_TICK_MS", "0"),
            ("QUIZ_LOG_JSON", "yes"),
        ]);
        let lookup = |key: &str| env.get(key).map(|v| (*v).to_string());
        let Invocation::Run(config) = AppConfig::parse(args(&["--user", "Linus"]), lookup).unwrap()
        else {
            panic!("unexpected help");
        };
        assert_eq!(config.quiz_file, PathBuf::from("env.json"));
        assert_eq!(config.quiz_id, Some(QuizId::new(7)));
        assert_eq!(config.user, "Linus");
        // A zero tick period from the environment falls back to the default.
        assert_eq!(config.tick_period, Duration::from_secs(1));
        assert!(config.log_json);
    }

    #[test]
    fn help_is_recognised_anywhere() {
        assert_eq!(AppConfig::parse(args(&["-h"]), no_env).unwrap(), Invocation::Help);
        assert_eq!(
            AppConfig::parse(args(&["list", "--help"]), no_env).unwrap(),
            Invocation::Help
        );
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        let err = |raw: &[&str]| AppConfig::parse(args(raw), no_env).unwrap_err();
        assert_eq!(err(&["serve"]), ArgsError::UnknownCommand("serve".into()));
        assert_eq!(err(&["--verbose"]), ArgsError::UnknownArg("--verbose".into()));
        assert_eq!(err(&["--quiz"]), ArgsError::MissingValue { flag: "--quiz" });
        assert_eq!(err(&["--user", "  "]), ArgsError::EmptyValue { flag: "--user" });
        assert_eq!(
            err(&["--quiz-id", "abc"]),
            ArgsError::InvalidQuizId { raw: "abc".into() }
        );
        assert_eq!(
            err(&["--tick-ms", "0"]),
            ArgsError::InvalidMillis {
                flag: "--tick-ms",
                raw: "0".into()
            }
        );
    }
}
