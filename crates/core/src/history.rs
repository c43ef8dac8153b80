use crate::error::DialogueError;
use rehearsal_types::Turn;

/// Ordered log of interview turns. Turns are appended and amended, never removed
/// or reordered.
///
/// Invariant: only the last turn may lack an answer.
#[derive(Debug, Clone, Default)]
pub struct TurnHistory {
    turns: Vec<Turn>,
}

impl TurnHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new unanswered turn. The previous turn must have been answered.
    pub fn append(&mut self, question: &str) -> Result<(), DialogueError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DialogueError::invalid_state("a turn needs a non-empty question"));
        }
        if self.last().is_some_and(|t| !t.is_answered()) {
            return Err(DialogueError::invalid_state(
                "the current question has not been answered yet",
            ));
        }
        self.turns.push(Turn::new(question));
        Ok(())
    }

    /// Sets the (trimmed) answer on the last turn.
    pub fn record_answer(&mut self, text: &str) -> Result<(), DialogueError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DialogueError::invalid_state("an answer cannot be empty"));
        }
        let Some(last) = self.turns.last_mut() else {
            return Err(DialogueError::invalid_state("there is no question to answer"));
        };
        if last.is_answered() {
            return Err(DialogueError::invalid_state(
                "the current question has already been answered",
            ));
        }
        last.answer = Some(text.to_string());
        Ok(())
    }

    /// Sets feedback on the second-to-last turn, the one preceding the turn most
    /// recently appended.
    pub fn record_feedback(&mut self, text: &str) -> Result<(), DialogueError> {
        let len = self.turns.len();
        if len < 2 {
            return Err(DialogueError::invalid_state(
                "no previous turn to attach feedback to",
            ));
        }
        let target = &mut self.turns[len - 2];
        if target.has_feedback() {
            return Err(DialogueError::invalid_state(
                "the previous turn already has feedback",
            ));
        }
        target.feedback = Some(text.to_string());
        Ok(())
    }

    /// Continuation step: attaches `feedback` to the just-answered last turn, then
    /// appends a turn for `question`. Both halves are checked before anything is
    /// mutated.
    pub fn advance(&mut self, feedback: &str, question: &str) -> Result<(), DialogueError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DialogueError::invalid_state("a turn needs a non-empty question"));
        }
        let Some(last) = self.turns.last_mut() else {
            return Err(DialogueError::invalid_state("no answered turn to give feedback on"));
        };
        if !last.is_answered() {
            return Err(DialogueError::invalid_state(
                "the current question has not been answered yet",
            ));
        }
        if last.has_feedback() {
            return Err(DialogueError::invalid_state(
                "the answered turn already has feedback",
            ));
        }
        last.feedback = Some(feedback.to_string());
        self.turns.push(Turn::new(question));
        Ok(())
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// True when the last turn still waits for its answer.
    pub fn awaiting_answer(&self) -> bool {
        self.last().is_some_and(|t| !t.is_answered())
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
