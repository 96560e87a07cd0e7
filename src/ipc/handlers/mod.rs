pub mod core;
pub mod courses;
pub mod grid;
pub mod ui;

use crate::app::Prompter;

/// Per-request prompt: the front-end passes the dialog answer along with the
/// request, and the alerts raised during the operation travel back in the
/// response for it to display.
pub struct RequestPrompt {
    pub answer: bool,
    pub alerts: Vec<String>,
}

impl RequestPrompt {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            alerts: Vec::new(),
        }
    }
}

impl Prompter for RequestPrompt {
    fn confirm(&mut self, _message: &str) -> bool {
        self.answer
    }

    fn notify(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}
