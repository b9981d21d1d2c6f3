mod config;
mod input;
mod render;

use std::error::Error;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{AppConfig, Command, Invocation, print_usage};
use input::{KEY_HELP, PlayerCommand};
use quiz_core::model::{Quiz, UserId};
use quiz_core::time::format_countdown;
use quiz_core::{SessionSnapshot, SubmitReason};
use services::{
    Clock, Learner, SessionEvent, SessionEvents, SessionLoopService, SessionService,
};
use storage::Storage;
use storage::json::load_repository;

/// Logs go to stderr; stdout belongs to the player.
fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let invocation = AppConfig::from_process().inspect_err(|e| {
        eprintln!("{e}");
        print_usage();
    })?;
    let config = match invocation {
        Invocation::Help => {
            print_usage();
            return Ok(());
        }
        Invocation::Run(config) => config,
    };

    init_tracing(config.log_json);

    let repo = load_repository(&config.quiz_file)?;
    let storage = Storage::in_memory(repo);
    let session_loop = SessionLoopService::new(
        Clock::default_clock(),
        storage.quizzes,
        storage.attempts,
    )
    .with_settings(config.session_settings());

    match config.command {
        Command::List => {
            let quizzes = session_loop.list_quizzes().await?;
            info!(count = quizzes.len(), file = %config.quiz_file.display(), "quizzes loaded");
            println!("{}", render::quiz_list(&quizzes));
            Ok(())
        }
        Command::Play => play(&session_loop, &config).await,
    }
}

async fn play(session_loop: &SessionLoopService, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let quiz_id = match config.quiz_id {
        Some(id) => id,
        None => session_loop
            .list_quizzes()
            .await?
            .first()
            .map(Quiz::id)
            .ok_or("the quiz file contains no quizzes")?,
    };

    let learner = Learner::new(UserId::new(1), config.user.clone());
    let (mut session, mut events) = session_loop.start_session(quiz_id, learner).await?;
    println!("{KEY_HELP}\n");
    show_question(&session)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        // Events first, so a completion is handled before the next command.
        tokio::select! {
            biased;
            Some(event) = events.recv() => on_event(event, session_loop, &mut session).await?,
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                let option_count = session.inspect(|s| s.current_question().options.len())?;
                let command = PlayerCommand::parse(&line, option_count);
                if command == PlayerCommand::Quit {
                    break;
                }
                apply(command, &mut session).await?;
            }
        }
    }

    drain_events(&mut events, session_loop, &mut session).await?;
    session.dispose();
    info!("session closed");
    Ok(())
}

/// Handle whatever the session already queued, e.g. a result produced by the
/// last `s` before quitting.
async fn drain_events(
    events: &mut SessionEvents,
    session_loop: &SessionLoopService,
    session: &mut SessionService,
) -> Result<(), Box<dyn Error>> {
    while let Ok(event) = events.try_recv() {
        on_event(event, session_loop, session).await?;
    }
    Ok(())
}

async fn on_event(
    event: SessionEvent,
    session_loop: &SessionLoopService,
    session: &mut SessionService,
) -> Result<(), Box<dyn Error>> {
    match event {
        SessionEvent::Tick { remaining_secs } => {
            if remaining_secs <= 10 || remaining_secs % 60 == 0 {
                println!("-- {} left --", format_countdown(remaining_secs));
            }
        }
        SessionEvent::GradingStarted { reason } => match reason {
            SubmitReason::Manual => println!("Grading..."),
            SubmitReason::TimeExpired => println!("\nTime is up!"),
        },
        SessionEvent::Completed {
            attempt_number,
            result,
        } => {
            // Stored from the event, the session may already be on a retake.
            let attempt_id = session_loop
                .record_result(session, attempt_number, &result)
                .await?;
            let text = session.inspect(|s| render::result(&result, s.quiz()))?;
            println!("\n{text}");
            let saved = session_loop.attempt(attempt_id).await?;
            let history = session_loop.attempt_history(session.quiz_id()).await?;
            println!("{}\n{}", render::saved(&saved), render::history(&history));
        }
        SessionEvent::Restarted { attempt_number } => {
            println!("\nAttempt {attempt_number}. The clock is running again.\n");
            show_question(session)?;
        }
    }
    Ok(())
}

/// Apply one player command. Results and retakes are printed from the event
/// stream, everything else redraws immediately.
async fn apply(command: PlayerCommand, session: &mut SessionService) -> Result<(), Box<dyn Error>> {
    let accepted = match command {
        PlayerCommand::Select(label) => session.select_by_label(&label)?,
        PlayerCommand::Next => session.next()?,
        PlayerCommand::Previous => session.previous()?,
        PlayerCommand::GoTo(index) => session.go_to(index)?,
        PlayerCommand::ToggleFlag => session.toggle_current_flag()?,
        PlayerCommand::Clear => session.clear_current_answer()?,
        PlayerCommand::Submit => {
            if !session.submit().await? {
                println!("Nothing to submit.");
            }
            return Ok(());
        }
        PlayerCommand::Retake => {
            if !session.retake()? {
                println!("Retake is available once the attempt is graded.");
            }
            return Ok(());
        }
        PlayerCommand::Help => {
            println!("{KEY_HELP}");
            return Ok(());
        }
        PlayerCommand::Empty => {
            show_question(session)?;
            return Ok(());
        }
        PlayerCommand::Unknown(raw) => {
            println!("Unknown command: {raw} (h for help)");
            return Ok(());
        }
        PlayerCommand::Quit => return Ok(()),
    };

    if accepted {
        show_question(session)?;
    } else if session.inspect(|s| s.is_in_progress())? {
        println!("Not possible here.");
    } else {
        debug!("input ignored, attempt already submitted");
        println!("The attempt is over. Type r to retake or q to quit.");
    }
    Ok(())
}

fn show_question(session: &SessionService) -> Result<(), Box<dyn Error>> {
    let frame = session.inspect(|s| render::question(&SessionSnapshot::capture(s), s.quiz()))?;
    println!("{frame}\n");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionId, QuizId};
    use quiz_core::time::fixed_clock;
    use std::sync::Arc;
    use storage::AttemptRepository;

    const SAMPLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../quizzes/sample.json");

    #[tokio::test]
    async fn queued_result_is_stored_after_retake_and_quit() {
        let repo = load_repository(SAMPLE).unwrap();
        let session_loop =
            SessionLoopService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo.clone()));
        let quiz_id = QuizId::new(2);
        let (mut session, mut events) = session_loop
            .start_session(quiz_id, Learner::new(UserId::new(1), "Ada"))
            .await
            .unwrap();

        // `a`, `s`, `r`, `q` typed faster than the events are handled.
        apply(PlayerCommand::Select("b".into()), &mut session).await.unwrap();
        apply(PlayerCommand::Submit, &mut session).await.unwrap();
        apply(PlayerCommand::Retake, &mut session).await.unwrap();
        session.dispose();

        drain_events(&mut events, &session_loop, &mut session)
            .await
            .unwrap();

        let stored = repo.list_attempts(quiz_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].attempt.attempt_number, 1);
        assert_eq!(stored[0].attempt.correct_count, 1);
        assert!(session.recorded_attempt(1).is_some());
        assert_eq!(session.inspect(|s| s.attempt_number()).unwrap(), 2);
        assert!(session.inspect(|s| s.answer(QuestionId::new(201))).unwrap().is_none());
    }
}
