use rehearsal_core::{DialogueError, Phase, Snapshot};

/// Turns successive snapshots into the terminal lines describing what changed.
#[derive(Debug, Default)]
pub struct Renderer {
    questions_shown: usize,
    feedback_shown: usize,
    phase: Option<Phase>,
    capturing: bool,
    pending: String,
    last_error: Option<DialogueError>,
}

impl Renderer {
    pub fn render(&mut self, snapshot: &Snapshot) -> Vec<String> {
        let mut lines = Vec::new();

        if snapshot.last_error != self.last_error {
            if let Some(error) = &snapshot.last_error {
                lines.push(format!("! {error}"));
                if snapshot.can_retry {
                    lines.push("  Type /retry to send it again.".to_string());
                }
            }
            self.last_error = snapshot.last_error.clone();
        }

        while let Some(turn) = snapshot.turns.get(self.feedback_shown) {
            let Some(feedback) = &turn.feedback else {
                break;
            };
            lines.push(format!("Feedback: {feedback}"));
            self.feedback_shown += 1;
        }

        for (index, turn) in snapshot.turns.iter().enumerate().skip(self.questions_shown) {
            lines.push(format!("Q{}: {}", index + 1, turn.question));
        }
        self.questions_shown = self.questions_shown.max(snapshot.turns.len());

        if self.phase != Some(snapshot.phase) {
            match snapshot.phase {
                Phase::WaitingForQuestion => lines.push("Preparing the first question...".to_string()),
                Phase::Submitting => lines.push("Sending your answer...".to_string()),
                Phase::Closed => lines.push("Interview ended.".to_string()),
                Phase::Idle | Phase::AwaitingAnswer => {}
            }
            self.phase = Some(snapshot.phase);
        }

        if snapshot.capturing != self.capturing {
            lines.push(if snapshot.capturing {
                "Listening. Type /mic to stop.".to_string()
            } else {
                "Stopped listening.".to_string()
            });
            self.capturing = snapshot.capturing;
        }

        if snapshot.pending_capture_text != self.pending {
            if !snapshot.pending_capture_text.is_empty() {
                lines.push(format!("  (dictated) {}", snapshot.pending_capture_text));
            }
            self.pending = snapshot.pending_capture_text.clone();
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rehearsal_core::Turn;

    fn snapshot(phase: Phase, turns: Vec<Turn>) -> Snapshot {
        Snapshot {
            phase,
            turns,
            pending_capture_text: String::new(),
            capturing: false,
            capture_available: false,
            last_error: None,
            can_retry: false,
            revision: 0,
        }
    }

    #[test]
    fn test_feedback_is_shown_before_next_question() {
        let mut renderer = Renderer::default();
        renderer.render(&snapshot(Phase::AwaitingAnswer, vec![Turn::new("Q one")]));

        let lines = renderer.render(&snapshot(
            Phase::AwaitingAnswer,
            vec![
                Turn::new("Q one").with_answer("A").with_feedback("Nice."),
                Turn::new("Q two"),
            ],
        ));

        assert_eq!(lines, vec!["Feedback: Nice.", "Q2: Q two"]);
    }

    #[test]
    fn test_each_change_is_reported_once() {
        let mut renderer = Renderer::default();
        let mut failed = snapshot(Phase::Idle, vec![]);
        failed.last_error = Some(DialogueError::ServiceUnavailable("timed out".to_string()));
        failed.can_retry = true;

        let lines = renderer.render(&failed);
        assert_eq!(
            lines,
            vec![
                "! interview service unavailable: timed out",
                "  Type /retry to send it again."
            ]
        );
        assert!(renderer.render(&failed).is_empty());
    }

    #[test]
    fn test_dictation_progress() {
        let mut renderer = Renderer::default();
        let mut listening = snapshot(Phase::AwaitingAnswer, vec![Turn::new("Q")]);
        renderer.render(&listening);

        listening.capturing = true;
        listening.pending_capture_text = "I led the".to_string();
        let lines = renderer.render(&listening);

        assert_eq!(lines, vec!["Listening. Type /mic to stop.", "  (dictated) I led the"]);
    }
}
