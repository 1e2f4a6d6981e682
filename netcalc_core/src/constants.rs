//! Constants shared by the engine and its C ABI.

/// Family codes accepted by `netcalc_next_available`.
pub const FAMILY_V4: u8 = 4;
pub const FAMILY_V6: u8 = 6;

/// Enough room for any CIDR text plus the NUL terminator (the longest
/// IPv6 form is 43 bytes before the mask).
pub const CIDR_STR_MAX: usize = 64;
