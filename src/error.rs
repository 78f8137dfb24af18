use thiserror::Error;

/// Errors returned by the storage. Data quality problems (no data, CRC mismatches, failed
/// write verification) are never reported here, they are part of the regular return values.
/// What's left are configuration problems, misuse of the API and failures of the device itself.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The page size must be at least 1
    #[error("invalid page size")]
    InvalidPageSize,

    /// Static data copies are limited to 1..=8 since they are addressed by an u8 bitset. The
    /// wear level area needs at least one copy per write.
    #[error("invalid number of copies")]
    InvalidCopies,

    /// The configured areas do not fit into the device
    #[error("area exceeds device")]
    RegionExceedsDevice,

    /// The wear level ring must hold more generations than copies written per write cycle,
    /// otherwise a write could overwrite the data it is duplicating.
    #[error("wear level area too small: {held} generations, more than {copies} required")]
    InsufficientGenerations { held: usize, copies: u8 },

    /// The internal error value is returned from the provided platform
    #[error("internal device error")]
    DeviceError,

    /// The provided buffer is shorter than the configured record size
    #[error("buffer too small")]
    BufferTooSmall,

    /// The size of a typed record is less than the configured record size
    #[error("record too small")]
    RecordTooSmall,

    /// Writing diagnostics to the output sink failed
    #[error("format error")]
    FormatError,
}

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Error::FormatError
    }
}
