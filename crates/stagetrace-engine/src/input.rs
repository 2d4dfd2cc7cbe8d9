//! Controller input read on a dedicated thread.
//!
//! Lines are forwarded to the async command loop over an unbounded channel.
//! The reader thread is never joined: a read still blocked on stdin does not
//! keep the process alive once `main` returns.

use std::io::{self, BufRead};

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;

use crate::error::EngineError;

/// Spawn the reader thread for `input`.
///
/// The channel closes at end of input or after the first read error, which
/// is forwarded before closing.
pub fn spawn_reader<R>(input: R) -> Result<UnboundedReceiver<io::Result<String>>, EngineError>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("controller-input".to_owned())
        .spawn(move || {
            for line in input.lines() {
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
            debug!("Controller input reader finished");
        })?;
    Ok(rx)
}
