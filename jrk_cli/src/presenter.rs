//! Console implementation of the controller's presentation collaborator.

use std::io::{self, BufRead, Write};

use jrk_core::{ControllerView, Presenter};

/// Answers questions from stdin (or `--yes`), prints info messages, and
/// collects error messages so the command can fail with them.
#[derive(Debug)]
pub struct ConsolePresenter {
    assume_yes: bool,
    json: bool,
    errors: Vec<String>,
    declined: usize,
}

impl ConsolePresenter {
    pub fn new(assume_yes: bool, json: bool) -> Self {
        Self {
            assume_yes,
            json,
            errors: Vec::new(),
            declined: 0,
        }
    }

    /// Error messages shown since the last call.
    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }

    /// Number of questions answered with no.
    pub fn declined(&self) -> usize {
        self.declined
    }
}

impl Presenter for ConsolePresenter {
    fn confirm(&mut self, question: &str) -> bool {
        if self.assume_yes {
            tracing::info!(question, "auto-confirmed");
            return true;
        }
        eprint!("{question} [y/N] ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        let yes = match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        };
        if !yes {
            self.declined += 1;
        }
        yes
    }

    fn show_error_message(&mut self, message: &str) {
        tracing::warn!(message, "controller error");
        self.errors.push(message.to_string());
    }

    fn show_info_message(&mut self, message: &str) {
        if self.json {
            println!("{}", serde_json::json!({ "info": message }));
        } else {
            println!("{message}");
        }
    }

    fn render(&mut self, view: &ControllerView) {
        tracing::trace!(
            connected = view.connected,
            modified = view.settings.modified,
            devices = view.device_list.len(),
            "view"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assume_yes_never_declines() {
        let mut p = ConsolePresenter::new(true, false);
        assert!(p.confirm("Proceed?"));
        assert_eq!(p.declined(), 0);
    }

    #[test]
    fn take_errors_drains() {
        let mut p = ConsolePresenter::new(true, true);
        p.show_error_message("one");
        p.show_error_message("two");
        assert_eq!(p.take_errors(), vec!["one".to_string(), "two".to_string()]);
        assert!(p.take_errors().is_empty());
    }
}
