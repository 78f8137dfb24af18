#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use eeprom_wl::Eeprom;
use eeprom_wl::layout::{Config, Layout};
use embedded_storage::{ReadStorage, Storage};

pub const CAPACITY: usize = 256;
pub const STATIC_DATA_SIZE: usize = 8;
pub const WEAR_LEVEL_DATA_SIZE: usize = 5;
pub const HEADER_SIZE: usize = 6;

/// In-memory EEPROM
#[derive(Default)]
pub struct Memory {
    pub buf: Vec<u8>,
    /// Number of writes per byte
    pub wear: Vec<u32>,
    pub operations: Vec<Operation>,
    pub fail_after_operation: usize,
    /// Silently ignore this many of the next write calls
    pub dropped_writes: usize,
    /// Writes touching this range are silently ignored, like worn out cells
    pub worn_out: Option<core::ops::Range<usize>>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
}

impl Memory {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0xFFu8; capacity],
            wear: vec![0; capacity],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn new_with_fault(capacity: usize, fail_after_operation: usize) -> Self {
        Self {
            fail_after_operation,
            ..Self::new(capacity)
        }
    }

    pub fn flip_bit(&mut self, offset: usize, bit: u8) {
        self.buf[offset] ^= 1 << bit;
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    /// Number of write calls starting in `range`
    pub fn writes_in(&self, range: core::ops::Range<usize>) -> usize {
        self.operations
            .iter()
            .filter(|op| {
                matches!(op, Operation::Write { offset, .. } if range.contains(&(*offset as usize)))
            })
            .count()
    }

    pub fn max_wear(&self, range: core::ops::Range<usize>) -> u32 {
        self.wear[range].iter().copied().max().unwrap_or(0)
    }

    fn check_fault(&self) -> Result<(), MemoryError> {
        if self.operations.len() >= self.fail_after_operation {
            println!("    memory: FAULT");
            return Err(MemoryError);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryError;

impl ReadStorage for Memory {
    type Error = MemoryError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.check_fault()?;
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl Storage for Memory {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.check_fault()?;
        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        if self.dropped_writes > 0 {
            self.dropped_writes -= 1;
            return Ok(());
        }

        let offset = offset as usize;
        if let Some(worn_out) = &self.worn_out {
            if offset < worn_out.end && worn_out.start < offset + bytes.len() {
                return Ok(());
            }
        }
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        for wear in &mut self.wear[offset..offset + bytes.len()] {
            *wear += 1;
        }
        Ok(())
    }
}

impl eeprom_wl::platform::Crc for Memory {}

pub fn config() -> Config {
    Config::new(CAPACITY, STATIC_DATA_SIZE, WEAR_LEVEL_DATA_SIZE)
}

pub fn layout() -> Layout {
    Layout::new(&config()).unwrap()
}

/// Storage with the default configuration on a fresh, never erased device
pub fn eeprom() -> Eeprom<Memory> {
    Eeprom::new(layout(), Memory::new(CAPACITY)).unwrap()
}

/// Storage with both areas initialized
pub fn initialized() -> Eeprom<Memory> {
    let mut eeprom = eeprom();
    eeprom.erase_and_initialize(eeprom_wl::Area::All).unwrap();
    eeprom.device_mut().operations.clear();
    eeprom
}

/// Header of the slot at `offset` as (crc, generation)
pub fn header(memory: &Memory, offset: usize) -> (u16, u32) {
    let raw = &memory.buf[offset..offset + HEADER_SIZE];
    (
        u16::from_le_bytes([raw[0], raw[1]]),
        u32::from_le_bytes([raw[2], raw[3], raw[4], raw[5]]),
    )
}

pub fn payload(memory: &Memory, offset: usize, size: usize) -> &[u8] {
    &memory.buf[offset + HEADER_SIZE..offset + HEADER_SIZE + size]
}
