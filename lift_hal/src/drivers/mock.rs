//! Scripted device port for deterministic tests.
//!
//! Frame reads replay a script of position sets; the last set repeats once
//! the script runs out. Flag writes update an in-memory coil table and are
//! recorded in a [`PortJournal`] that stays readable after the port has been
//! moved into a controller. Failures can be injected per operation.

use async_trait::async_trait;
use lift_common::frame::{DirectionFlags, FrameLayout};
use lift_common::port::{DevicePort, PortError};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// One request observed by the scripted port, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    /// `read_flags(address, count)`.
    ReadFlags {
        /// First flag address.
        address: u16,
        /// Flags requested.
        count: u16,
    },
    /// `read_words` of the position block.
    ReadFrame,
    /// `write_flag(address, value)`, recorded even when it failed.
    WriteFlag {
        /// Flag address.
        address: u16,
        /// Value written.
        value: bool,
        /// Whether the write was acknowledged.
        ok: bool,
    },
}

/// Shared record of every request a [`ScriptedPort`] served.
#[derive(Debug, Clone, Default)]
pub struct PortJournal {
    events: Arc<Mutex<Vec<PortEvent>>>,
}

impl PortJournal {
    fn push(&self, event: PortEvent) {
        self.events.lock().push(event);
    }

    /// All events in call order.
    pub fn events(&self) -> Vec<PortEvent> {
        self.events.lock().clone()
    }

    /// Acknowledged and failed flag writes as `(address, value)`.
    pub fn writes(&self) -> Vec<(u16, bool)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match *e {
                PortEvent::WriteFlag { address, value, .. } => Some((address, value)),
                _ => None,
            })
            .collect()
    }

    /// Number of position block reads.
    pub fn frame_reads(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, PortEvent::ReadFrame))
            .count()
    }

    /// Whether any flag was ever set to `true`.
    pub fn asserted_any(&self) -> bool {
        self.writes().iter().any(|&(_, value)| value)
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

enum Step {
    Positions(Vec<i32>),
    Words(Vec<u16>),
    Fail(PortError),
}

struct WriteFault {
    address: u16,
    value: bool,
    error: PortError,
}

/// Device port driven by a test script.
pub struct ScriptedPort {
    layout: FrameLayout,
    steps: VecDeque<Step>,
    last_words: Option<Vec<u16>>,
    coils: HashMap<u16, bool>,
    flag_read_faults: VecDeque<PortError>,
    write_faults: Vec<WriteFault>,
    journal: PortJournal,
}

impl ScriptedPort {
    /// Empty script for the given layout. Every flag starts cleared.
    pub fn new(layout: FrameLayout) -> Self {
        Self {
            layout,
            steps: VecDeque::new(),
            last_words: None,
            coils: HashMap::new(),
            flag_read_faults: VecDeque::new(),
            write_faults: Vec::new(),
            journal: PortJournal::default(),
        }
    }

    /// Append one frame read returning these positions.
    pub fn then_frame(mut self, positions: &[i32]) -> Self {
        self.steps.push_back(Step::Positions(positions.to_vec()));
        self
    }

    /// Append several frame reads.
    pub fn then_frames(mut self, frames: &[&[i32]]) -> Self {
        for positions in frames {
            self.steps.push_back(Step::Positions(positions.to_vec()));
        }
        self
    }

    /// Append one frame read returning this exact register block.
    pub fn then_words(mut self, words: &[u16]) -> Self {
        self.steps.push_back(Step::Words(words.to_vec()));
        self
    }

    /// Append one failing frame read.
    pub fn then_read_error(mut self, error: PortError) -> Self {
        self.steps.push_back(Step::Fail(error));
        self
    }

    /// Preset a flag value as if another actor had written it.
    pub fn with_flag(mut self, address: u16, value: bool) -> Self {
        self.coils.insert(address, value);
        self
    }

    /// Fail the next flag read.
    pub fn fail_next_flag_read(mut self, error: PortError) -> Self {
        self.flag_read_faults.push_back(error);
        self
    }

    /// Fail the next write of `value` to `address`. Repeat to fail more.
    pub fn fail_write(mut self, address: u16, value: bool, error: PortError) -> Self {
        self.write_faults.push(WriteFault {
            address,
            value,
            error,
        });
        self
    }

    /// Handle for inspecting requests after the port has been moved.
    pub fn journal(&self) -> PortJournal {
        self.journal.clone()
    }

    /// Current coil value.
    pub fn flag(&self, address: u16) -> bool {
        self.coils.get(&address).copied().unwrap_or(false)
    }

    /// Both direction flags cleared.
    pub fn is_stopped(&self, flags: &DirectionFlags) -> bool {
        flags.both().iter().all(|&address| !self.flag(address))
    }

    fn encode(&self, positions: &[i32]) -> Vec<u16> {
        let stride = self.layout.register_stride as usize;
        let mut words = vec![0u16; self.layout.block_len() as usize];
        for (index, &position) in positions.iter().enumerate() {
            if let Some(word) = words.get_mut(index * stride) {
                *word = position as u16;
            }
        }
        words
    }
}

#[async_trait]
impl DevicePort for ScriptedPort {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn read_flags(&mut self, address: u16, count: u16) -> Result<Vec<bool>, PortError> {
        self.journal.push(PortEvent::ReadFlags { address, count });
        if let Some(error) = self.flag_read_faults.pop_front() {
            return Err(error);
        }
        Ok((address..address.saturating_add(count))
            .map(|a| self.flag(a))
            .collect())
    }

    async fn read_words(&mut self, address: u16, count: u16) -> Result<Vec<u16>, PortError> {
        self.journal.push(PortEvent::ReadFrame);
        if address != self.layout.register_base || count != self.layout.block_len() {
            return Err(PortError::Protocol(format!(
                "unexpected block read at {address} x {count}"
            )));
        }
        let words = match self.steps.pop_front() {
            Some(Step::Positions(positions)) => self.encode(&positions),
            Some(Step::Words(words)) => words,
            Some(Step::Fail(error)) => return Err(error),
            None => self
                .last_words
                .clone()
                .ok_or_else(|| PortError::Transport("script exhausted".into()))?,
        };
        self.last_words = Some(words.clone());
        Ok(words)
    }

    async fn write_flag(&mut self, address: u16, value: bool) -> Result<(), PortError> {
        let fault = self
            .write_faults
            .iter()
            .position(|f| f.address == address && f.value == value)
            .map(|i| self.write_faults.remove(i));
        self.journal.push(PortEvent::WriteFlag {
            address,
            value,
            ok: fault.is_none(),
        });
        if let Some(fault) = fault {
            return Err(fault.error);
        }
        self.coils.insert(address, value);
        Ok(())
    }
}
