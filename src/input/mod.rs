//! Operator input.
//!
//! The control loop polls one `InputEvent` per iteration, never blocking.
//! Where the events come from (a keyboard, a script, a remote console) is the
//! source's business.

mod stdin;

use std::collections::VecDeque;

pub use stdin::StdinInput;

const KEY_TAB: u8 = 9;
const KEY_ESC: u8 = 27;
const KEY_SPACE: u8 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    ToggleMode,
    ToggleSubmode,
}

impl InputEvent {
    /// Map a raw key code: Esc quits, Space toggles mode, Tab toggles sub-mode.
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            KEY_ESC => Some(InputEvent::Quit),
            KEY_SPACE => Some(InputEvent::ToggleMode),
            KEY_TAB => Some(InputEvent::ToggleSubmode),
            _ => None,
        }
    }

    /// Map one line of console input.
    pub fn from_line(line: &str) -> Option<Self> {
        let trimmed_newline = line.trim_end_matches(['\r', '\n']);
        if let [key] = trimmed_newline.as_bytes() {
            if let Some(event) = Self::from_key(*key) {
                return Some(event);
            }
        }
        match trimmed_newline.trim().to_ascii_lowercase().as_str() {
            "q" | "quit" | "exit" => Some(InputEvent::Quit),
            "m" | "mode" => Some(InputEvent::ToggleMode),
            "s" | "sub" | "submode" => Some(InputEvent::ToggleSubmode),
            _ => None,
        }
    }
}

/// Non-blocking source of operator events.
pub trait InputSource {
    /// Take at most one pending event.
    fn poll(&mut self) -> Option<InputEvent>;
}

impl<I: InputSource + ?Sized> InputSource for Box<I> {
    fn poll(&mut self) -> Option<InputEvent> {
        (**self).poll()
    }
}

/// Per-iteration script of events. `None` entries are iterations where the
/// operator did nothing.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    script: VecDeque<Option<InputEvent>>,
}

impl ScriptedInput {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Option<InputEvent>>,
    {
        Self {
            script: script.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Option<InputEvent> {
        self.script.pop_front().flatten()
    }
}
