//! The `Record` trait allows storing typed records instead of byte slices. The record may be
//! larger than the configured size, surplus bytes are not stored and read back as zero.
//!
//! Records are staged in a heap buffer of `R::SIZE` bytes, the typed methods need a global
//! allocator.

use crate::error::Error;
use crate::platform::Platform;
use crate::Eeprom;
use alloc::vec;

pub trait Record: Sized {
    /// Serialized size in bytes
    const SIZE: usize;

    /// `buf` is exactly `SIZE` bytes long
    fn to_bytes(&self, buf: &mut [u8]);

    /// `buf` is exactly `SIZE` bytes long
    fn from_bytes(buf: &[u8]) -> Self;
}

impl<const N: usize> Record for [u8; N] {
    const SIZE: usize = N;

    fn to_bytes(&self, buf: &mut [u8]) {
        buf.copy_from_slice(self);
    }

    fn from_bytes(buf: &[u8]) -> Self {
        let mut record = [0u8; N];
        record.copy_from_slice(buf);
        record
    }
}

fn check_record<R: Record>(size: usize) -> Result<(), Error> {
    if R::SIZE < size {
        return Err(Error::RecordTooSmall);
    }
    Ok(())
}

fn encode<R: Record>(record: &R) -> alloc::vec::Vec<u8> {
    let mut buf = vec![0u8; R::SIZE];
    record.to_bytes(&mut buf);
    buf
}

impl<T: Platform> Eeprom<T> {
    /// See [`Eeprom::read_static_data`]. `record` is only updated if a copy could be read.
    pub fn read_static_record<R: Record>(&mut self, record: &mut R, copies: u8) -> Result<u8, Error> {
        check_record::<R>(self.layout.static_data().record_size())?;
        let mut buf = vec![0u8; R::SIZE];
        let copy = self.read_static_data(&mut buf, copies)?;
        if copy != 0 {
            *record = R::from_bytes(&buf);
        }
        Ok(copy)
    }

    /// See [`Eeprom::write_static_data`]
    pub fn write_static_record<R: Record>(&mut self, record: &R, copies: u8) -> Result<u8, Error> {
        check_record::<R>(self.layout.static_data().record_size())?;
        self.write_static_data(&encode(record), copies)
    }

    /// See [`Eeprom::is_static_data_modified`]
    pub fn is_static_record_modified<R: Record>(&mut self, record: &R, copies: u8) -> Result<u8, Error> {
        check_record::<R>(self.layout.static_data().record_size())?;
        self.is_static_data_modified(&encode(record), copies)
    }

    /// See [`Eeprom::read_wear_level_data`]. `record` is only updated on success.
    pub fn read_wear_level_record<R: Record>(
        &mut self,
        record: &mut R,
        max_attempts: u8,
    ) -> Result<u8, Error> {
        check_record::<R>(self.layout.wear_level().record_size())?;
        let mut buf = vec![0u8; R::SIZE];
        let attempt = self.read_wear_level_data(&mut buf, max_attempts)?;
        if attempt != 0 {
            *record = R::from_bytes(&buf);
        }
        Ok(attempt)
    }

    /// See [`Eeprom::write_wear_level_data`]
    pub fn write_wear_level_record<R: Record>(&mut self, record: &R) -> Result<u8, Error> {
        check_record::<R>(self.layout.wear_level().record_size())?;
        self.write_wear_level_data(&encode(record))
    }

    /// See [`Eeprom::is_wear_level_data_modified`]
    pub fn is_wear_level_record_modified<R: Record>(&mut self, record: &R) -> Result<bool, Error> {
        check_record::<R>(self.layout.wear_level().record_size())?;
        self.is_wear_level_data_modified(&encode(record))
    }
}
