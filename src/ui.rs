use std::sync::Arc;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::config::UIConfig;
use crate::event_bus::{Event, EventBus};
use crate::models::GenerationResult;

pub const CODE_HEADER: &str = "Generated Code:";
pub const TEST_HEADER: &str = "Test Code:";

/// Terminal output for the CLI: a spinner on stderr while the backend works,
/// results on stdout.
pub struct TerminalUI {
    colorful: bool,
    spinner: Option<ProgressBar>,
}

impl TerminalUI {
    pub fn new(config: &UIConfig) -> Self {
        let spinner = config.progress_bars.then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed}] {msg}")
                    .unwrap(),
            );
            spinner
        });
        Self {
            colorful: config.colorful,
            spinner,
        }
    }

    /// Follow pipeline events on `bus` and reflect them in the spinner.
    pub fn start(&self, bus: &Arc<EventBus>) {
        let Some(spinner) = self.spinner.clone() else {
            info!("Progress display disabled");
            return;
        };
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message("Starting...");

        let mut receiver = bus.subscribe();
        tokio::spawn(async move {
            let mut stage_name = String::new();
            while let Ok(event) = receiver.recv().await {
                match event {
                    Event::StageStarted { stage, .. } => {
                        spinner.set_message(format!("Running {stage}..."));
                        stage_name = stage;
                    }
                    Event::APICallStarted { provider, model } => {
                        spinner.set_message(format!("Running {stage_name} with {provider} ({model})..."));
                    }
                    Event::GenerationCompleted { .. } | Event::GenerationFailed { .. } => {
                        spinner.finish_and_clear();
                        break;
                    }
                    _ => {}
                }
            }
        });
    }

    /// Clear the spinner so results print on a clean line.
    pub fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }

    pub fn print_result(&self, result: &GenerationResult) {
        println!("{}", render_result(result, self.colorful));
    }

    pub fn print_partial_code(&self, code: &str) {
        println!("{}", self.header(CODE_HEADER));
        println!("{}", code);
        println!();
    }

    /// Failures go to stdout in the same stream as results.
    pub fn print_error(&self, message: &str) {
        println!("{}", render_error(message, self.colorful));
    }

    fn header(&self, text: &str) -> String {
        style_header(text, self.colorful)
    }
}

fn style_header(text: &str, colorful: bool) -> String {
    if colorful {
        text.bright_cyan().bold().to_string()
    } else {
        text.to_string()
    }
}

/// Code section, a blank line, then the test section.
pub fn render_result(result: &GenerationResult, colorful: bool) -> String {
    format!(
        "{}\n{}\n\n{}\n{}",
        style_header(CODE_HEADER, colorful),
        result.code,
        style_header(TEST_HEADER, colorful),
        result.test
    )
}

/// The single line printed for a failed run.
pub fn render_error(message: &str, colorful: bool) -> String {
    let label = if colorful { "Error:".red().bold().to_string() } else { "Error:".to_string() };
    format!("{} {}", label, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_result_order() {
        let result = GenerationResult {
            code: "def add(a, b): return a + b".into(),
            test: "assert add(1, 2) == 3".into(),
        };
        let text = render_result(&result, false);
        assert_eq!(
            text,
            "Generated Code:\ndef add(a, b): return a + b\n\nTest Code:\nassert add(1, 2) == 3"
        );
    }

    #[test]
    fn test_render_result_colored_keeps_headers() {
        let result = GenerationResult {
            code: "x".into(),
            test: "y".into(),
        };
        let text = render_result(&result, true);
        let code_at = text.find(CODE_HEADER).unwrap();
        let test_at = text.find(TEST_HEADER).unwrap();
        assert!(code_at < test_at);
    }

    #[test]
    fn test_render_error_line() {
        assert_eq!(
            render_error("unsupported language 'COBOL'", false),
            "Error: unsupported language 'COBOL'"
        );
        assert!(render_error("boom", true).ends_with(" boom"));
    }

    #[test]
    fn test_headless_ui_has_no_spinner() {
        let ui = TerminalUI::new(&UIConfig {
            colorful: false,
            progress_bars: false,
        });
        assert!(ui.spinner.is_none());
        ui.finish();
    }
}
