// Shared test modules for the integration tests
#![allow(dead_code)]

use keel_core::hal::DeviceIdentity;
use keel_core::persistence::StateWriter;
use keel_core::{KeelResult, Module};
use parking_lot::Mutex;
use std::sync::Arc;

pub const OWNER: u8 = 0xFA;
pub const APP: u8 = 0x42;

pub fn identity(version: u16) -> DeviceIdentity {
    DeviceIdentity::new(OWNER, APP, version)
}

/// Everything a [`RecordingModule`] saw, shared with the test body
#[derive(Debug, Default)]
pub struct Journal {
    pub restores: Vec<Vec<u8>>,
    pub events: Vec<String>,
    pub ticks: u64,
    pub secondary_ticks: u64,
}

pub type SharedJournal = Arc<Mutex<Journal>>;

/// Module with a fixed payload that logs every callback it receives
pub struct RecordingModule {
    name: String,
    payload: Vec<u8>,
    secondary: bool,
    journal: SharedJournal,
}

impl RecordingModule {
    pub fn new(name: &str, payload: &[u8]) -> (Self, SharedJournal) {
        let journal = SharedJournal::default();
        let module = Self {
            name: name.to_string(),
            payload: payload.to_vec(),
            secondary: false,
            journal: journal.clone(),
        };
        (module, journal)
    }

    /// Same module, opted into the secondary context
    pub fn secondary(name: &str) -> (Self, SharedJournal) {
        let (mut module, journal) = Self::new(name, &[]);
        module.secondary = true;
        (module, journal)
    }

    fn event(&self, event: &str) {
        self.journal.lock().events.push(event.to_string());
    }
}

impl Module for RecordingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_size(&self) -> u16 {
        self.payload.len() as u16
    }

    fn restore_state(&mut self, data: &[u8]) {
        self.journal.lock().restores.push(data.to_vec());
    }

    fn persist_state(&self, writer: &mut StateWriter<'_>) -> KeelResult<()> {
        writer.write_bytes(&self.payload)
    }

    fn setup(&mut self) {
        self.event("setup");
    }

    fn tick(&mut self) {
        self.journal.lock().ticks += 1;
    }

    fn uses_secondary_context(&self) -> bool {
        self.secondary
    }

    fn tick_secondary(&mut self) {
        self.journal.lock().secondary_ticks += 1;
    }

    fn on_startup_delay_elapsed(&mut self) {
        self.event("startup_delay");
    }

    fn before_save_signal(&mut self) {
        self.event("save_signal");
    }

    fn before_restart(&mut self) {
        self.event("restart");
    }
}

/// Module that always tries to write more than it declared
pub struct OverflowModule;

impl Module for OverflowModule {
    fn name(&self) -> &str {
        "overflow"
    }

    fn state_size(&self) -> u16 {
        4
    }

    fn persist_state(&self, writer: &mut StateWriter<'_>) -> KeelResult<()> {
        writer.write_bytes(&[0xAB; 8])?;
        writer.write_bytes(&[0xCD; 2])
    }

    fn tick(&mut self) {}
}
