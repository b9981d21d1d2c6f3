use quiz_core::model::AnswerOption;

/// One line typed by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Option label of the current question, lowercased.
    Select(String),
    Next,
    Previous,
    /// Zero-based question index.
    GoTo(usize),
    ToggleFlag,
    Clear,
    Submit,
    Retake,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl PlayerCommand {
    /// Parse a line against the current question. Option labels win over
    /// single-letter command keys, so a question with 16 options can still
    /// have its `P` selected; the long command names always work.
    #[must_use]
    pub fn parse(line: &str, option_count: usize) -> Self {
        let trimmed = line.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.is_empty() {
            return Self::Empty;
        }

        if let Some(rest) = lower
            .strip_prefix("go ")
            .or_else(|| lower.strip_prefix("g "))
        {
            return match rest.trim().parse::<usize>() {
                Ok(number) if number > 0 => Self::GoTo(number - 1),
                _ => Self::Unknown(trimmed.to_string()),
            };
        }

        if is_option_label(&lower, option_count) {
            return Self::Select(lower);
        }

        match lower.as_str() {
            "n" | "next" => Self::Next,
            "p" | "prev" | "previous" => Self::Previous,
            "f" | "flag" => Self::ToggleFlag,
            "x" | "clear" => Self::Clear,
            "s" | "submit" => Self::Submit,
            "r" | "retake" => Self::Retake,
            "h" | "?" | "help" => Self::Help,
            "q" | "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

fn is_option_label(input: &str, option_count: usize) -> bool {
    (0..option_count).any(|index| AnswerOption::label_for(index).eq_ignore_ascii_case(input))
}

pub const KEY_HELP: &str = "\
Commands:
  a, b, c ...   select that option
  n / p         next / previous question
  g N           jump to question N
  f             flag or unflag the question
  x             clear the answer
  s             submit
  r             retake after results
  h             show this help
  q             quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_select_options_case_insensitively() {
        assert_eq!(PlayerCommand::parse("A", 4), PlayerCommand::Select("a".into()));
        assert_eq!(PlayerCommand::parse(" d \n", 4), PlayerCommand::Select("d".into()));
        assert_eq!(PlayerCommand::parse("e", 4), PlayerCommand::Unknown("e".into()));
    }

    #[test]
    fn option_labels_shadow_command_keys() {
        assert_eq!(PlayerCommand::parse("n", 4), PlayerCommand::Next);
        assert_eq!(PlayerCommand::parse("n", 14), PlayerCommand::Select("n".into()));
        assert_eq!(PlayerCommand::parse("next", 14), PlayerCommand::Next);
    }

    #[test]
    fn jump_takes_a_one_based_number() {
        assert_eq!(PlayerCommand::parse("g 3", 4), PlayerCommand::GoTo(2));
        assert_eq!(PlayerCommand::parse("go 1", 4), PlayerCommand::GoTo(0));
        assert_eq!(PlayerCommand::parse("g 0", 4), PlayerCommand::Unknown("g 0".into()));
        assert_eq!(PlayerCommand::parse("g x", 4), PlayerCommand::Unknown("g x".into()));
    }

    #[test]
    fn command_words_and_blank_lines() {
        assert_eq!(PlayerCommand::parse("", 4), PlayerCommand::Empty);
        assert_eq!(PlayerCommand::parse("x", 4), PlayerCommand::Clear);
        assert_eq!(PlayerCommand::parse("Submit", 4), PlayerCommand::Submit);
        assert_eq!(PlayerCommand::parse("f", 2), PlayerCommand::ToggleFlag);
        assert_eq!(PlayerCommand::parse("q", 2), PlayerCommand::Quit);
        assert_eq!(PlayerCommand::parse("?", 2), PlayerCommand::Help);
    }
}
