/// How a responder's state machine ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Non-empty text was delivered (streamed or spoken).
    Completed(String),
    /// The backend produced nothing; a fallback was shown.
    Empty,
    /// A backend call failed; a fallback was shown.
    Failed,
}

impl ResponseOutcome {
    /// The text recorded in history for this exchange.
    pub fn history_output(&self) -> &str {
        match self {
            ResponseOutcome::Completed(text) => text,
            ResponseOutcome::Empty | ResponseOutcome::Failed => "",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResponseOutcome::Completed(_) => "completed",
            ResponseOutcome::Empty => "empty",
            ResponseOutcome::Failed => "failed",
        }
    }
}
