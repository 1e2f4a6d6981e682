//! Error values and C-ABI error codes for the allocator.

use std::cell::RefCell;
use std::fmt;
use std::os::raw::c_char;

use crate::types::Family;

/// Error type for allocator operations. Errors are returned by value and
/// never recovered internally; an invariant violation inside the engine is
/// a programmer error and aborts instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed CIDR (or family) text, with the offending input.
    Parse { text: String, reason: String },
    /// Enumeration ran dry: no pool can supply a subnet of this length.
    NoSuitablePrefix { prefix_len: u8 },
    /// Requested mask length exceeds the family's address width.
    InvalidMaskLength { prefix_len: u8, family: Family },
    /// Malformed multi-subnet identity.
    InvalidId(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse { text, reason } => write!(f, "Unable to parse CIDR {text:?}: {reason}"),
            Error::NoSuitablePrefix { prefix_len } => {
                write!(f, "No eligible subnet with mask /{prefix_len} found")
            }
            Error::InvalidMaskLength { prefix_len, family } => {
                write!(f, "Mask length /{prefix_len} is not valid for {family}")
            }
            Error::InvalidId(msg) => write!(f, "Invalid ID: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    ParseError = 1,
    NoSuitablePrefix = 2,
    InvalidMaskLength = 3,
    InvalidId = 4,
    InvalidHandle = 5,
    Utf8Error = 6,
    InvalidFamily = 7,
    BufferTooSmall = 8,
    Unknown = 255,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::ParseError => "CIDR parsing error",
            ErrorCode::NoSuitablePrefix => "No suitable prefix",
            ErrorCode::InvalidMaskLength => "Invalid mask length",
            ErrorCode::InvalidId => "Invalid ID",
            ErrorCode::InvalidHandle => "Invalid handle",
            ErrorCode::Utf8Error => "UTF-8 conversion error",
            ErrorCode::InvalidFamily => "Invalid address family",
            ErrorCode::BufferTooSmall => "Buffer too small",
            ErrorCode::Unknown => "Unknown error",
        }
    }
}

// Thread-local last error for the C ABI
thread_local! {
    static LAST_ERROR: RefCell<ErrorCode> = RefCell::new(ErrorCode::Success);
}

pub fn set_last_error(code: ErrorCode) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = code);
}

pub fn get_last_error() -> ErrorCode {
    LAST_ERROR.with(|cell| *cell.borrow())
}

#[no_mangle]
pub extern "C" fn netcalc_last_error() -> ErrorCode {
    get_last_error()
}

#[no_mangle]
pub extern "C" fn netcalc_strerror(code: ErrorCode) -> *const c_char {
    match code {
        ErrorCode::Success => b"Success\0".as_ptr() as *const c_char,
        ErrorCode::ParseError => b"CIDR parsing error\0".as_ptr() as *const c_char,
        ErrorCode::NoSuitablePrefix => b"No suitable prefix\0".as_ptr() as *const c_char,
        ErrorCode::InvalidMaskLength => b"Invalid mask length\0".as_ptr() as *const c_char,
        ErrorCode::InvalidId => b"Invalid ID\0".as_ptr() as *const c_char,
        ErrorCode::InvalidHandle => b"Invalid handle\0".as_ptr() as *const c_char,
        ErrorCode::Utf8Error => b"UTF-8 conversion error\0".as_ptr() as *const c_char,
        ErrorCode::InvalidFamily => b"Invalid address family\0".as_ptr() as *const c_char,
        ErrorCode::BufferTooSmall => b"Buffer too small\0".as_ptr() as *const c_char,
        ErrorCode::Unknown => b"Unknown error\0".as_ptr() as *const c_char,
    }
}

// Map internal Error to ErrorCode
pub fn map_error(e: &Error) -> ErrorCode {
    match e {
        Error::Parse { .. } => ErrorCode::ParseError,
        Error::NoSuitablePrefix { .. } => ErrorCode::NoSuitablePrefix,
        Error::InvalidMaskLength { .. } => ErrorCode::InvalidMaskLength,
        Error::InvalidId(_) => ErrorCode::InvalidId,
    }
}
