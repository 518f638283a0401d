use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{Context, Result};

use super::{InputEvent, InputSource};

/// Console input.
///
/// A reader thread blocks on stdin and forwards recognised lines over a
/// channel; `poll` only ever calls `try_recv`.
pub struct StdinInput {
    events: Receiver<InputEvent>,
    closed: bool,
}

impl StdinInput {
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("stdin-input".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    match InputEvent::from_line(&line) {
                        Some(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        None => log::debug!("ignoring console input {:?}", line),
                    }
                }
            })
            .context("spawn stdin reader thread")?;
        Ok(Self {
            events: rx,
            closed: false,
        })
    }
}

impl InputSource for StdinInput {
    fn poll(&mut self) -> Option<InputEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.closed {
                    log::info!("console input closed; use Ctrl-C to stop");
                    self.closed = true;
                }
                None
            }
        }
    }
}
