//! Recording transport for unit tests.

use std::collections::VecDeque;

use embedded_hal::digital::PinState;

use crate::registers::command;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Begin,
    End,
    Select,
    Deselect,
    Byte(u8),
    Sleep(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFault;

#[derive(Default)]
pub struct MockTransport {
    pub events: Vec<Event>,
    /// Bytes returned while the data register is being clocked out.
    pub data: VecDeque<u8>,
    /// Fail the n-th byte transfer (counted from zero over the transport's lifetime).
    pub fail_at_byte: Option<usize>,
    bytes: usize,
    reading: u8,
    depth: i32,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: &[u8]) -> Self {
        Self {
            data: data.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Bytes sent between each chip-select assertion and the following de-assertion.
    /// A frame still open at the end is included.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut current: Option<Vec<u8>> = None;

        for event in &self.events {
            match event {
                Event::Select => {
                    current.get_or_insert_with(Vec::new);
                }
                Event::Deselect => {
                    if let Some(frame) = current.take() {
                        frames.push(frame);
                    }
                }
                Event::Byte(byte) => {
                    if let Some(frame) = current.as_mut() {
                        frame.push(*byte);
                    }
                }
                _ => {}
            }
        }

        frames.extend(current);
        frames
    }

    pub fn count(&self, event: Event) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }

    pub fn is_balanced(&self) -> bool {
        self.depth == 0
    }

    /// Chip-select level after the last recorded change, high if never driven.
    pub fn chip_select(&self) -> PinState {
        self.events
            .iter()
            .rev()
            .find_map(|event| match event {
                Event::Select => Some(PinState::Low),
                Event::Deselect => Some(PinState::High),
                _ => None,
            })
            .unwrap_or(PinState::High)
    }
}

impl Transport for MockTransport {
    type Error = MockFault;

    fn begin_transaction(&mut self) -> Result<(), Self::Error> {
        self.depth += 1;
        self.events.push(Event::Begin);
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), Self::Error> {
        self.depth -= 1;
        self.events.push(Event::End);
        Ok(())
    }

    fn transfer_byte(&mut self, out: u8) -> Result<u8, Self::Error> {
        let index = self.bytes;
        self.bytes += 1;

        if self.fail_at_byte == Some(index) {
            return Err(MockFault);
        }

        self.events.push(Event::Byte(out));

        if self.reading > 0 {
            self.reading -= 1;
            return Ok(self.data.pop_front().unwrap_or(0));
        }

        if out == command::READ_DATA {
            self.reading = 3;
        }

        Ok(0xFF)
    }

    fn set_chip_select(&mut self, level: PinState) -> Result<(), Self::Error> {
        self.events.push(match level {
            PinState::Low => Event::Select,
            PinState::High => Event::Deselect,
        });
        Ok(())
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.events.push(Event::Sleep(ms));
    }
}
