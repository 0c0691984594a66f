use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid time format '{0}' (expected HH:MM)")]
    InvalidTimeFormat(String),

    #[error("time out of range: {hour:02}:{minute:02}")]
    TimeOutOfRange { hour: u32, minute: u32 },

    #[error("slot duration must be at least one minute")]
    ZeroDuration,

    #[error("slot count must be at least one")]
    ZeroSlotCount,

    #[error("slot number {number} is out of range 1..={total}")]
    SlotNumberOutOfRange { number: u32, total: u32 },
}
