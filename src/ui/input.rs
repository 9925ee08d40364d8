//! Console input reader
//!
//! A dedicated thread polls crossterm events and forwards them as
//! `KeyInput` over an unbounded channel. The thread stops when the
//! receiver is dropped, on a read error, or after forwarding an interrupt.
//!
//! Headless runs read whole lines from a plain reader instead; end of input
//! closes the stream.

use std::io::BufRead;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, error, trace};

use super::keymapper::KeyMapper;
use crate::core::terminal::{KeyInput, KeyReceiver};

const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Translate one console event
pub fn map_event(event: Event) -> Option<KeyInput> {
    match event {
        // Only process key press events
        Event::Key(key) if key.kind != KeyEventKind::Release => KeyMapper::map(&key),
        Event::Resize(cols, rows) => Some(KeyInput::Resize(cols, rows)),
        Event::Paste(text) => Some(KeyInput::Data(text)),
        _ => None,
    }
}

/// Start the reader thread
pub fn spawn_key_reader() -> (JoinHandle<()>, KeyReceiver) {
    let (tx, rx) = unbounded_channel();
    let handle = thread::spawn(move || read_loop(tx));
    (handle, rx)
}

fn read_loop(tx: UnboundedSender<KeyInput>) {
    loop {
        if tx.is_closed() {
            break;
        }

        match event::poll(POLL_TIMEOUT) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                error!("Console poll failed: {}", e);
                break;
            }
        }

        let evt = match event::read() {
            Ok(evt) => evt,
            Err(e) => {
                error!("Console read failed: {}", e);
                break;
            }
        };
        trace!("Event received: {:?}", evt);

        let Some(input) = map_event(evt) else {
            continue;
        };
        let interrupt = input == KeyInput::Interrupt;
        if tx.send(input).is_err() || interrupt {
            break;
        }
    }
    debug!("Key reader stopped");
}

/// Forward each line of `reader` as typed input followed by Enter
pub fn spawn_line_reader<R>(reader: R) -> (JoinHandle<()>, KeyReceiver)
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = unbounded_channel();
    let handle = thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Input read failed: {}", e);
                    break;
                }
            };
            if tx.send(KeyInput::Data(format!("{}\r", line))).is_err() {
                break;
            }
        }
        debug!("Line reader reached end of input");
    });
    (handle, rx)
}
