/// One line of user input at the interview prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Anything that is not a command is (part of) the answer.
    Answer(String),
    ToggleMic,
    Retry,
    Review,
    Back,
    Quit,
    Help,
    Unknown(String),
    Empty,
}

pub const HELP: &str = "\
Type your answer and press Enter to submit it. After dictating, Enter alone submits.
  /mic     start or stop dictation (dictated text is submitted with your next answer)
  /retry   re-send the last request after a failure
  /review  quick review points for this section
  /back    end this interview and pick another section
  /quit    exit";

/// Parses one prompt line. With `dictation` set (capture running or dictated
/// text pending) a blank line submits the dictated answer.
pub fn parse_input(line: &str, dictation: bool) -> UserInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return if dictation {
            UserInput::Answer(String::new())
        } else {
            UserInput::Empty
        };
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return UserInput::Answer(trimmed.to_string());
    };
    match command.to_lowercase().as_str() {
        "mic" => UserInput::ToggleMic,
        "retry" => UserInput::Retry,
        "review" => UserInput::Review,
        "back" => UserInput::Back,
        "quit" | "exit" => UserInput::Quit,
        "help" | "?" => UserInput::Help,
        other => UserInput::Unknown(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands_and_answers() {
        assert_eq!(parse_input("/mic", false), UserInput::ToggleMic);
        assert_eq!(parse_input("  /Retry ", false), UserInput::Retry);
        assert_eq!(parse_input("/exit", false), UserInput::Quit);
        assert_eq!(parse_input("/dance", false), UserInput::Unknown("dance".to_string()));
        assert_eq!(parse_input("   ", false), UserInput::Empty);
        assert_eq!(
            parse_input("  I built a caching layer ", false),
            UserInput::Answer("I built a caching layer".to_string())
        );
    }

    #[test]
    fn test_blank_line_submits_dictation() {
        assert_eq!(parse_input("", true), UserInput::Answer(String::new()));
        assert_eq!(parse_input("  ", true), UserInput::Answer(String::new()));
        assert_eq!(parse_input("/mic", true), UserInput::ToggleMic);
        assert_eq!(
            parse_input(" and more ", true),
            UserInput::Answer("and more".to_string())
        );
    }
}
