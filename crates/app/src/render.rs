//! Plain-text frames for the terminal player.

use quiz_core::model::{AnswerOption, OptionId, Question, Quiz};
use quiz_core::time::format_countdown;
use quiz_core::{QuizResult, SessionPhase, SessionSnapshot, SubmitReason};
use storage::AttemptRecord;

#[must_use]
pub fn quiz_list(quizzes: &[Quiz]) -> String {
    if quizzes.is_empty() {
        return "No quizzes found.".to_string();
    }
    quizzes
        .iter()
        .map(|quiz| {
            let subject = if quiz.subject().is_empty() {
                String::new()
            } else {
                format!(" [{}]", quiz.subject())
            };
            format!(
                "{:>4}  {}{subject}  {} questions, {} min, pass at {}%",
                quiz.id(),
                quiz.title(),
                quiz.question_count(),
                quiz.time_limit_minutes(),
                quiz.passing_score(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Current question with its options, flag marker and countdown.
#[must_use]
pub fn question(snapshot: &SessionSnapshot, quiz: &Quiz) -> String {
    let view = &snapshot.question;
    let mut lines = vec![
        format!(
            "{}  |  Question {} of {}  |  {} left  |  answered {}/{}",
            snapshot.title,
            view.number,
            view.total,
            snapshot.countdown,
            snapshot.progress.answered,
            snapshot.progress.total,
        ),
        navigator(snapshot, quiz),
        String::new(),
    ];

    let flag = if view.flagged { "  [flagged]" } else { "" };
    lines.push(format!("({}){flag}", view.difficulty.as_str()));
    lines.push(view.prompt.clone());
    for option in &view.options {
        let mark = if option.selected { "(*)" } else { "( )" };
        lines.push(format!("  {mark} {}. {}", option.label, option.text));
    }

    if snapshot.phase == SessionPhase::InProgress && snapshot.progress.unanswered.is_empty() {
        lines.push(String::new());
        lines.push("All questions answered. Type s to submit.".to_string());
    }
    lines.join("\n")
}

/// One cell per question: `*` answered, `!` flagged, brackets on the current one.
fn navigator(snapshot: &SessionSnapshot, quiz: &Quiz) -> String {
    quiz.questions()
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let mut cell = (index + 1).to_string();
            if snapshot.answers.contains_key(&question.id) {
                cell.push('*');
            }
            if snapshot.flagged.contains(&question.id) {
                cell.push('!');
            }
            if index == snapshot.question.index {
                format!("[{cell}]")
            } else {
                format!(" {cell} ")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[must_use]
pub fn result(result: &QuizResult, quiz: &Quiz) -> String {
    let mut lines = Vec::new();
    if result.reason == SubmitReason::TimeExpired {
        lines.push("Time is up. Your answers were submitted automatically.".to_string());
    }
    let verdict = if result.passed { "PASSED" } else { "NOT PASSED" };
    lines.push(format!(
        "Score: {}/{} ({}%)  {verdict}, pass mark {}%",
        result.correct_count, result.total_questions, result.percentage, result.passing_score,
    ));
    lines.push(format!(
        "Answered {} of {}, time used {}",
        result.answered_count,
        result.total_questions,
        format_countdown(result.time_used_secs),
    ));
    lines.push(String::new());

    for (index, question) in quiz.questions().iter().enumerate() {
        let Some(outcome) = result.outcome(question.id) else {
            continue;
        };
        let status = if outcome.is_correct { "right" } else { "wrong" };
        let detail = if outcome.is_correct {
            String::new()
        } else {
            format!(
                "  (yours: {}, correct: {})",
                label_of(question, outcome.selected),
                label_of(question, outcome.correct),
            )
        };
        lines.push(format!(
            "{:>3}. {status:<5} {}{detail}",
            index + 1,
            question.prompt
        ));
    }
    lines.push(String::new());
    lines.push("Type r to retake or q to quit.".to_string());
    lines.join("\n")
}

fn label_of(question: &Question, option: Option<OptionId>) -> String {
    option
        .and_then(|id| question.options.iter().position(|o| o.id == id))
        .map_or_else(|| "-".to_string(), AnswerOption::label_for)
}

#[must_use]
pub fn saved(record: &AttemptRecord) -> String {
    format!(
        "Saved as record #{} (attempt {} on this quiz, {}%).",
        record.id, record.attempt.attempt_number, record.attempt.percentage
    )
}

#[must_use]
pub fn history(records: &[AttemptRecord]) -> String {
    let best = records.iter().map(|r| r.attempt.percentage).max();
    match best {
        None => "No attempts recorded yet.".to_string(),
        Some(best) => format!(
            "Attempts on this quiz: {}, best score {best}%",
            records.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AttemptId, Difficulty, QuestionId, QuizDraft, QuizId, UserId};
    use quiz_core::time::fixed_now;
    use quiz_core::QuizSession;
    use std::sync::Arc;
    use storage::NewAttemptRecord;

    fn quiz() -> Arc<Quiz> {
        let questions = (1..=3_u64)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Question {id}?"),
                    Difficulty::Easy,
                    vec![
                        AnswerOption::new(OptionId::new(1), "yes", true),
                        AnswerOption::new(OptionId::new(2), "no", false),
                    ],
                )
            })
            .collect();
        Arc::new(
            Quiz::new(QuizDraft {
                id: QuizId::new(4),
                title: "Render".into(),
                subject: String::new(),
                time_limit_minutes: 1,
                passing_score: 60,
                questions,
            })
            .unwrap(),
        )
    }

    #[test]
    fn question_frame_marks_selection_flag_and_countdown() {
        let quiz = quiz();
        let mut session = QuizSession::start(Arc::clone(&quiz), fixed_now());
        session.select_answer(QuestionId::new(1), OptionId::new(2));
        session.toggle_flag(QuestionId::new(1));
        session.tick(fixed_now());

        let frame = question(&SessionSnapshot::capture(&session), &quiz);
        assert!(frame.contains("Question 1 of 3"));
        assert!(frame.contains("00:59 left"));
        assert!(frame.contains("[flagged]"));
        assert!(frame.contains("( ) A. yes"));
        assert!(frame.contains("(*) B. no"));
        assert!(frame.contains("[1*!]"));
        assert!(!frame.contains("submit"));
    }

    #[test]
    fn result_lists_wrong_answers_with_labels() {
        let quiz = quiz();
        let mut session = QuizSession::start(Arc::clone(&quiz), fixed_now());
        session.select_answer(QuestionId::new(1), OptionId::new(1));
        session.select_answer(QuestionId::new(2), OptionId::new(2));
        assert!(session.submit(fixed_now()));

        let text = result(session.result().unwrap(), &quiz);
        assert!(text.contains("Score: 1/3 (33%)  NOT PASSED"));
        assert!(text.contains("yours: B, correct: A"));
        assert!(text.contains("yours: -, correct: A"));
        assert!(!text.contains("Time is up"));
    }

    #[test]
    fn saved_line_and_history_report_best_score() {
        let mut session = QuizSession::start(quiz(), fixed_now());
        session.select_answer(QuestionId::new(1), OptionId::new(1));
        session.submit(fixed_now());
        let attempt = NewAttemptRecord::from_result(
            QuizId::new(4),
            UserId::new(1),
            1,
            session.result().unwrap(),
        );
        let records = vec![
            AttemptRecord {
                id: AttemptId::new(7),
                attempt: attempt.clone(),
            },
            AttemptRecord {
                id: AttemptId::new(8),
                attempt: NewAttemptRecord {
                    attempt_number: 2,
                    percentage: 100,
                    ..attempt
                },
            },
        ];

        assert_eq!(
            saved(&records[0]),
            "Saved as record #7 (attempt 1 on this quiz, 33%)."
        );
        assert_eq!(history(&records), "Attempts on this quiz: 2, best score 100%");
    }

    #[test]
    fn empty_listings_say_so() {
        assert_eq!(quiz_list(&[]), "No quizzes found.");
        assert_eq!(history(&[]), "No attempts recorded yet.");
    }
}
