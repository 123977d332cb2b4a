//! Blocking user acknowledgment surface

use std::io;

pub trait Notifier {
    /// Shows `message` and blocks until the user acknowledges it.
    fn display_and_wait(&self, message: &str) -> io::Result<()>;

    /// Blocks until the user acknowledges, without a message.
    fn wait(&self) -> io::Result<()>;
}
