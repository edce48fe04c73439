//! Peripheral core constants

// Default table capacities
pub const DEFAULT_MAX_LISTENERS: usize = 2;
pub const DEFAULT_MAX_CHARACTERISTICS: usize = 16;
pub const DEFAULT_MAX_DEFERRED_OPERATIONS: usize = 4;

// Largest attribute value a read handler may produce
pub const ATT_MAX_ATTRIBUTE_LEN: usize = 512;

// Result codes sent back to the peer are the ATT error code offset by this base
pub const ATT_RESULT_BASE: u16 = 0x0400;

// ATT error codes used by the read/write result taxonomy
pub const ATT_ERROR_NOT_PERMITTED: u8 = 0x03;
pub const ATT_ERROR_ATTRIBUTE_NOT_FOUND: u8 = 0x0A;
pub const ATT_ERROR_UNLIKELY: u8 = 0x0E;
pub const ATT_ERROR_VALUE_NOT_ALLOWED: u8 = 0x13;
