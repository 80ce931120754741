//! Console cancel listener.

use std::io::BufRead;
use std::thread::{self, JoinHandle};

use crate::error::Result;
use crate::shared::CancellationToken;

/// Watch stdin for `c` + Enter and cancel the flight when seen.
///
/// End of input also cancels. The thread blocks on stdin, so callers should
/// not join it; it ends with the process.
pub fn spawn_console_listener(cancel: CancellationToken) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            println!("\n>>> Type 'c' and press Enter at any time to cancel the flight.");
            let stdin = std::io::stdin();
            let mut lines = stdin.lock().lines();
            while !cancel.is_cancelled() {
                match lines.next() {
                    Some(Ok(line)) if is_cancel_command(&line) => {
                        tracing::warn!("Cancel requested from console");
                        cancel.cancel();
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => {
                        cancel.cancel();
                    }
                }
            }
            tracing::debug!("Console listener exited");
        })?;
    Ok(handle)
}

fn is_cancel_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("c")
}
