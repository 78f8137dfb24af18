//! Wear level data: every write moves the record forward in a ring of slots. Each write cycle
//! writes `wear_level_data_copies` consecutive slots with increasing generations, older slots
//! stay in place until the ring wraps around and overwrites them.

use crate::block::{Block, Comparison, ReadOutcome};
use crate::error::Error;
use crate::platform::Platform;
use crate::Eeprom;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// Location of a wear level block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub(crate) offset: usize,
    pub(crate) generation: u32,
}

impl<T: Platform> Eeprom<T> {
    /// Scans the whole ring for the highest generation in `min_generation..max_generation`
    /// among the slots with a matching CRC. On equal generations the slot with the highest
    /// offset wins, which makes the write after [`Eeprom::erase_and_initialize`] start at the
    /// first slot.
    pub(crate) fn find_slot(
        &mut self,
        min_generation: u32,
        max_generation: u32,
    ) -> Result<Option<Slot>, Error> {
        let region = *self.layout.wear_level();
        let mut latest: Option<Slot> = None;

        for offset in region.slot_offsets() {
            let block = Block::new(&region, offset);
            let header = block.load_header(&mut self.hal)?;

            let lower = latest.map_or(min_generation, |slot| slot.generation);
            if header.generation < lower || header.generation >= max_generation {
                continue;
            }

            if block.validate(&mut self.hal)?.crc_ok {
                latest = Some(Slot {
                    offset,
                    generation: header.generation,
                });
            } else {
                #[cfg(feature = "defmt")]
                warn!("wear level @{:#06x}: crc mismatch", offset);
            }
        }

        Ok(latest)
    }

    /// Counts the slots following `latest` that claim ever higher generations although their
    /// CRC does not match, the remains of an interrupted write cycle. Slots elsewhere in the
    /// ring are never considered, whatever generation they claim.
    fn torn_slots(&mut self, latest: Slot) -> Result<usize, Error> {
        let region = *self.layout.wear_level();
        let mut generation = latest.generation;
        let mut torn = 0;

        while torn + 1 < region.slots() {
            let offset = region.slot_after(latest.offset, torn + 1);
            let header = Block::new(&region, offset).load_header(&mut self.hal)?;
            if header.generation <= generation {
                break;
            }
            generation = header.generation;
            torn += 1;
        }

        Ok(torn)
    }

    /// Reads the latest wear level data. If the newest block is torn, the next older
    /// generation is tried, up to `max_attempts` blocks in total. Returns the attempt that
    /// succeeded starting with 1, or 0 on failure. With
    /// [`Layout::wear_level_data_copies`](crate::layout::Layout::wear_level_data_copies)
    /// attempts a single torn write cycle always falls back to the last verified block.
    ///
    /// `data` may contain the payload of a corrupted block if 0 is returned.
    pub fn read_wear_level_data(&mut self, data: &mut [u8], max_attempts: u8) -> Result<u8, Error> {
        Self::check_buffer(data.len(), self.layout.wear_level().record_size())?;
        let result = self.read_wear_level_attempts(data, max_attempts);
        self.track_fault(result)
    }

    fn read_wear_level_attempts(&mut self, data: &mut [u8], max_attempts: u8) -> Result<u8, Error> {
        let Some(latest) = self.find_slot(0, u32::MAX)? else {
            return Ok(0);
        };
        let region = *self.layout.wear_level();
        let torn = self.torn_slots(latest)?;

        // newest torn slot first, the verified latest slot last
        for attempt in 1..=max_attempts {
            let remaining = torn + 1 - attempt as usize;
            let offset = match remaining {
                0 => latest.offset,
                _ => region.slot_after(latest.offset, remaining),
            };

            match Block::new(&region, offset).read(&mut self.hal, data)? {
                ReadOutcome::Valid(_) => return Ok(attempt),
                ReadOutcome::NoData => break,
                ReadOutcome::Corrupt(_header) => {
                    #[cfg(feature = "defmt")]
                    warn!(
                        "wear level @{:#06x}: generation {} corrupted, falling back",
                        offset, _header.generation
                    );
                }
            }

            if remaining == 0 {
                break;
            }
        }

        Ok(0)
    }

    /// Writes `data` to the next `wear_level_data_copies` slots after the latest valid one and
    /// returns the number of verified copies. The area has to be initialized, otherwise 0 is
    /// returned.
    pub fn write_wear_level_data(&mut self, data: &[u8]) -> Result<u8, Error> {
        if self.faulted {
            return Err(Error::DeviceError);
        }
        Self::check_buffer(data.len(), self.layout.wear_level().record_size())?;
        let result = self.write_wear_level_copies(data);
        self.track_fault(result)
    }

    fn write_wear_level_copies(&mut self, data: &[u8]) -> Result<u8, Error> {
        let Some(latest) = self.find_slot(0, u32::MAX)? else {
            #[cfg(feature = "defmt")]
            warn!("wear level: no valid slot, area not initialized");
            return Ok(0);
        };

        let region = *self.layout.wear_level();
        let attempts = self.layout.write_retries();
        let mut offset = latest.offset;
        let mut generation = latest.generation;
        let mut written = 0u8;

        for _ in 0..self.layout.wear_level_data_copies() {
            offset = region.slot_after(offset, 1);
            if offset == region.offset() {
                self.rotations += 1;
            }

            let Some(next) = generation.checked_add(1) else {
                #[cfg(feature = "defmt")]
                warn!("wear level: generation overflow");
                break;
            };
            generation = next;

            #[cfg(feature = "defmt")]
            trace!("wear level: write @{:#06x}, generation {}", offset, generation);

            if Block::new(&region, offset).write(&mut self.hal, generation, data, attempts)? {
                written += 1;
            }
        }

        Ok(written)
    }

    /// Returns true if `data` differs from the latest wear level data or if there is no valid
    /// data. The payload is compared byte by byte.
    pub fn is_wear_level_data_modified(&mut self, data: &[u8]) -> Result<bool, Error> {
        Self::check_buffer(data.len(), self.layout.wear_level().record_size())?;
        let result = self.compare_wear_level_data(data);
        self.track_fault(result)
    }

    fn compare_wear_level_data(&mut self, data: &[u8]) -> Result<bool, Error> {
        let Some(latest) = self.find_slot(0, u32::MAX)? else {
            return Ok(true);
        };
        let block = Block::new(self.layout.wear_level(), latest.offset);
        Ok(block.compare(&mut self.hal, data)? != Comparison::Identical)
    }
}
