use super::ui;
use crate::core::notify::Notifier;
use std::io::{self, Write};
use tracing::info;

const PROMPT: &str = "Press enter to continue...";

/// Prints to the terminal and blocks on a line from stdin.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn display_and_wait(&self, message: &str) -> io::Result<()> {
        println!("{}", ui::style_text(message, ui::StyleType::Alert));
        self.wait()
    }

    fn wait(&self) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", ui::style_text(PROMPT, ui::StyleType::Subtle))?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(())
    }
}

/// Prints notifications without waiting, for non-interactive runs.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn display_and_wait(&self, message: &str) -> io::Result<()> {
        println!("{}", ui::style_text(message, ui::StyleType::Alert));
        Ok(())
    }

    fn wait(&self) -> io::Result<()> {
        info!("Skipping halt acknowledgment");
        Ok(())
    }
}
