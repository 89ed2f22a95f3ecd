use super::cursor::StateWriter;
use super::layout::{
    Checksum, Footer, CHECKSUM_OFFSET, ERASED, FOOTER_LEN, MAGIC_LEN, MAGIC_OFFSET,
    RECORD_HEADER_LEN,
};
use super::region::PersistentRegion;
use crate::core::{ModuleRegistry, ModuleState};
use crate::diagnostics::log_hex;
use crate::error::{KeelError, KeelResult};
use crate::hal::{BusInterface, DeviceIdentity};
use std::collections::HashSet;
use std::time::{Duration, Instant};

const TARGET: &str = "keel::flash";

/// Persistence engine settings
#[derive(Debug, Clone)]
pub struct FlashConfig {
    /// Minimum time between two unforced saves
    pub min_rewrite_interval: Duration,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            min_rewrite_interval: Duration::from_secs(180),
        }
    }
}

/// What a call to [`PersistenceEngine::save`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The bus is being commissioned; nothing written
    NotConfigured,
    /// Unforced save inside the rewrite interval; nothing written
    RateLimited,
    Written {
        /// Stream plus footer
        bytes: usize,
        records: usize,
        elapsed: Duration,
    },
}

/// What a call to [`PersistenceEngine::load`] found.
///
/// Every outcome except `Restored` means no stored record was applied and
/// every module with state got an empty restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No magic marker: never written, or a save was interrupted
    Empty,
    /// Checksum mismatch
    Corrupt { stored: u16, computed: u16 },
    /// Footer or record headers describe more bytes than the region holds
    Malformed { offset: usize },
    /// Written by another device or application
    Foreign { owner_id: u8, application_number: u8 },
    Restored {
        /// Records handed to a registered module
        restored: usize,
        /// Records whose id is no longer registered
        skipped: usize,
        /// Modules that had no record and got an empty restore
        defaulted: usize,
    },
}

impl LoadOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, LoadOutcome::Restored { .. })
    }
}

/// Parsed record: module id and payload range within the stream
struct Record {
    id: u8,
    start: usize,
    len: usize,
}

/// Serializes every module's state into one persistent region and reads
/// it back at boot.
///
/// Only the main execution context holds the engine, so the region has a
/// single writer.
pub struct PersistenceEngine {
    region: Box<dyn PersistentRegion>,
    config: FlashConfig,
    last_write: Option<Instant>,
    stored_identity: Option<DeviceIdentity>,
}

impl PersistenceEngine {
    pub fn new(region: Box<dyn PersistentRegion>, config: FlashConfig) -> Self {
        Self {
            region,
            config,
            last_write: None,
            stored_identity: None,
        }
    }

    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    pub fn region_size(&self) -> usize {
        self.region.size()
    }

    /// Application version found in the footer by the last load
    pub fn stored_version(&self) -> Option<u16> {
        self.stored_identity.map(|id| id.application_version)
    }

    /// Identity found in the footer by the last load
    pub fn stored_identity(&self) -> Option<DeviceIdentity> {
        self.stored_identity
    }

    pub fn last_write(&self) -> Option<Instant> {
        self.last_write
    }

    /// Write the state of every module with a non-zero size.
    pub fn save(
        &mut self,
        registry: &ModuleRegistry,
        bus: &dyn BusInterface,
        force: bool,
    ) -> KeelResult<SaveOutcome> {
        // table not loaded (commissioning in progress)
        if !bus.is_configured() {
            return Ok(SaveOutcome::NotConfigured);
        }

        if !force {
            if let Some(last) = self.last_write {
                if last.elapsed() < self.config.min_rewrite_interval {
                    log::debug!(target: TARGET, "save skipped (rate limit)");
                    return Ok(SaveOutcome::RateLimited);
                }
            }
        }

        let start = Instant::now();
        log::info!(target: TARGET, "save <{}>", force);

        // sizes are read once here and used for the whole pass
        let records: Vec<(u8, usize)> = registry
            .iter()
            .map(|entry| (entry.id(), entry.module().state_size() as usize))
            .filter(|&(_, size)| size > 0)
            .collect();

        let stream_len: usize = records
            .iter()
            .map(|&(_, size)| RECORD_HEADER_LEN + size)
            .sum();

        let region_size = self.region.size();
        if stream_len > u16::MAX as usize || stream_len + FOOTER_LEN > region_size {
            return Err(KeelError::storage(format!(
                "record stream of {} bytes does not fit region of {} bytes",
                stream_len, region_size
            )));
        }

        // drop the old marker first: an interrupted save must read as empty
        let magic_address = region_size - MAGIC_LEN;
        self.region.fill(magic_address, ERASED, MAGIC_LEN)?;

        let mut checksum = Checksum::new();
        let mut address = region_size - FOOTER_LEN - stream_len;
        let stream_start = address;

        for &(id, size) in &records {
            let entry = match registry.entry(id) {
                Some(entry) => entry,
                None => continue,
            };

            let mut header =
                StateWriter::new(self.region.as_mut(), &mut checksum, id, address, RECORD_HEADER_LEN);
            header.write_byte(id)?;
            header.write_word(size as u16)?;
            address += RECORD_HEADER_LEN;

            log::info!(
                target: TARGET,
                "  save module {} ({}) with {} bytes",
                entry.name(),
                id,
                size
            );

            let mut writer = StateWriter::new(self.region.as_mut(), &mut checksum, id, address, size);
            if let Err(e) = entry.module().persist_state(&mut writer) {
                // contained to this record, the rest of the save goes on
                log::warn!(target: TARGET, "  module {} ({}): {}", entry.name(), id, e);
            }
            let padded = writer.pad()?;
            if padded > 0 {
                log::trace!(target: TARGET, "    padded {} bytes", padded);
            }
            address += size;
        }

        let mut footer = Footer::new(bus.device_identity(), stream_len as u16);
        checksum.add(&footer.encode()[..CHECKSUM_OFFSET]);
        footer.checksum = checksum.value();

        // magic goes last
        let encoded = footer.encode();
        address = self.region.write_bytes(address, &encoded[..MAGIC_OFFSET])?;
        self.region.write_bytes(address, &encoded[MAGIC_OFFSET..])?;

        self.region.commit()?;

        if log::log_enabled!(target: TARGET, log::Level::Trace) {
            let written = self.region.read_bytes(stream_start, stream_len + FOOTER_LEN)?;
            log_hex(TARGET, &written);
        }

        let elapsed = start.elapsed();
        self.last_write = Some(Instant::now());
        log::info!(target: TARGET, "  complete ({}ms)", elapsed.as_millis());

        Ok(SaveOutcome::Written {
            bytes: stream_len + FOOTER_LEN,
            records: records.len(),
            elapsed,
        })
    }

    /// Restore every module from the region.
    ///
    /// Runs once at boot, before any module loops. Invalid content never
    /// reaches a module; in every case each module with a non-zero size
    /// that got no record receives exactly one empty restore.
    pub fn load(
        &mut self,
        registry: &mut ModuleRegistry,
        identity: DeviceIdentity,
    ) -> KeelResult<LoadOutcome> {
        let start = Instant::now();
        log::info!(target: TARGET, "load");
        self.stored_identity = None;

        let mut loaded = HashSet::new();
        let outcome = self.read_records(registry, identity, &mut loaded)?;

        let mut defaulted = 0;
        for entry in registry.iter_mut() {
            let has_state = entry.module().state_size() > 0;
            if has_state && !loaded.contains(&entry.id()) {
                log::info!(target: TARGET, "  init module {} ({})", entry.name(), entry.id());
                entry.module_mut().restore_state(&[]);
                defaulted += 1;
            }
            entry.set_state(ModuleState::Restored);
        }

        log::info!(target: TARGET, "  complete ({}ms)", start.elapsed().as_millis());

        Ok(match outcome {
            LoadOutcome::Restored {
                restored, skipped, ..
            } => LoadOutcome::Restored {
                restored,
                skipped,
                defaulted,
            },
            other => other,
        })
    }

    fn read_records(
        &mut self,
        registry: &mut ModuleRegistry,
        identity: DeviceIdentity,
        loaded: &mut HashSet<u8>,
    ) -> KeelResult<LoadOutcome> {
        let region_size = self.region.size();
        if region_size < FOOTER_LEN {
            log::info!(target: TARGET, "  - Abort: region too small");
            return Ok(LoadOutcome::Empty);
        }

        let footer_address = region_size - FOOTER_LEN;
        let mut raw_footer = [0u8; FOOTER_LEN];
        raw_footer.copy_from_slice(&self.region.read_bytes(footer_address, FOOTER_LEN)?);

        let footer = match Footer::decode(&raw_footer) {
            Some(footer) => footer,
            None => {
                log::info!(target: TARGET, "  - Abort: No data found");
                return Ok(LoadOutcome::Empty);
            }
        };

        let stream_len = footer.stream_len as usize;
        if stream_len > footer_address {
            log::warn!(target: TARGET, "  - Abort: stream size {} exceeds region", stream_len);
            return Ok(LoadOutcome::Malformed {
                offset: footer_address,
            });
        }

        let stream_start = footer_address - stream_len;
        let stream = self.region.read_bytes(stream_start, stream_len)?;

        let mut checksum = Checksum::new();
        checksum.add(&stream);
        checksum.add(&raw_footer[..CHECKSUM_OFFSET]);
        if checksum.value() != footer.checksum {
            log::warn!(
                target: TARGET,
                "  - Abort: Checksum invalid! (stored {:04x}, computed {:04x})",
                footer.checksum,
                checksum.value()
            );
            log_hex(TARGET, &stream);
            log_hex(TARGET, &raw_footer);
            return Ok(LoadOutcome::Corrupt {
                stored: footer.checksum,
                computed: checksum.value(),
            });
        }

        log::info!(target: TARGET, "  ApplicationNumber: {:02x}", footer.application_number);
        log::info!(target: TARGET, "  ApplicationVersion: {}", footer.application_version);

        if !identity.accepts(footer.owner_id, footer.application_number) {
            log::warn!(target: TARGET, "  - Abort: Data from other application");
            return Ok(LoadOutcome::Foreign {
                owner_id: footer.owner_id,
                application_number: footer.application_number,
            });
        }

        self.stored_identity = Some(DeviceIdentity::new(
            footer.owner_id,
            footer.application_number,
            footer.application_version,
        ));

        // validate the whole stream before any module sees a byte
        let records = match parse_records(&stream) {
            Ok(records) => records,
            Err(offset) => {
                log::warn!(target: TARGET, "  - Abort: record header at {} overruns stream", offset);
                return Ok(LoadOutcome::Malformed {
                    offset: stream_start + offset,
                });
            }
        };

        let mut restored = 0;
        let mut skipped = 0;
        for record in records {
            let payload = &stream[record.start..record.start + record.len];
            match registry.entry_mut(record.id) {
                Some(entry) => {
                    log::info!(
                        target: TARGET,
                        "  restore module {} ({}) with {} bytes",
                        entry.name(),
                        record.id,
                        record.len
                    );
                    entry.module_mut().restore_state(payload);
                    loaded.insert(record.id);
                    restored += 1;
                }
                None => {
                    log::info!(target: TARGET, "  skip module with id {} (not found)", record.id);
                    skipped += 1;
                }
            }
        }

        Ok(LoadOutcome::Restored {
            restored,
            skipped,
            defaulted: 0,
        })
    }
}

/// Split the stream into records. Err carries the offset of the first
/// header whose record runs past the end.
fn parse_records(stream: &[u8]) -> Result<Vec<Record>, usize> {
    let mut records = Vec::new();
    let mut pos = 0;

    while pos < stream.len() {
        if pos + RECORD_HEADER_LEN > stream.len() {
            return Err(pos);
        }
        let id = stream[pos];
        let len = u16::from_be_bytes([stream[pos + 1], stream[pos + 2]]) as usize;
        let start = pos + RECORD_HEADER_LEN;
        if start + len > stream.len() {
            return Err(pos);
        }
        records.push(Record { id, start, len });
        pos = start + len;
    }

    Ok(records)
}
