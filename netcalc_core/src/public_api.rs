//! C-ABI surface for plugin-framework hosts.
//!
//! Prefixes cross this boundary as CIDR text; everything behind it works
//! on canonical parsed values. Each function stores its result code in the
//! thread-local last error before returning it.

use std::ffi::CStr;
use std::os::raw::c_char;

use ipnet::IpNet;

use crate::constants::{FAMILY_V4, FAMILY_V6};
use crate::errors::{map_error, set_last_error, ErrorCode};
use crate::handle_registry::{register_handle, unregister_handle, with_handle, HandleId};
use crate::helpers::parse_prefix;
use crate::types::{Family, SyncCalculator};

// ─────────────────────────── helpers ─────────────────────────────────── //

#[inline]
fn cstr<'a>(p: *const c_char) -> Result<&'a str, ErrorCode> {
    if p.is_null() {
        return Err(ErrorCode::Utf8Error);
    }
    unsafe { CStr::from_ptr(p) }
        .to_str()
        .map_err(|_| ErrorCode::Utf8Error)
}

/// NUL-terminate `s` into a caller-provided buffer.
fn write_cstr(out: *mut c_char, out_len: usize, s: &str) -> ErrorCode {
    if out.is_null() || out_len == 0 {
        return ErrorCode::InvalidHandle;
    }
    if s.len() + 1 > out_len {
        return ErrorCode::BufferTooSmall;
    }
    unsafe {
        std::ptr::copy_nonoverlapping(s.as_ptr(), out as *mut u8, s.len());
        *out.add(s.len()) = 0;
    }
    ErrorCode::Success
}

#[inline]
fn finish(code: ErrorCode) -> ErrorCode {
    set_last_error(code);
    code
}

// ─── small helper to turn Result<T,ErrorCode> into early-return ──────────
macro_rules! try_c { ($expr:expr) => { match $expr {
    Ok(v)  => v,
    Err(e) => return finish(e),
}}}

fn with_parsed_prefix(
    h: HandleId,
    cidr_utf8: *const c_char,
    f: impl FnOnce(&SyncCalculator, IpNet),
) -> ErrorCode {
    let text = try_c!(cstr(cidr_utf8));
    let prefix = match parse_prefix(text) {
        Ok(p) => p,
        Err(e) => return finish(map_error(&e)),
    };
    match with_handle(h, |calc| f(calc, prefix)) {
        Ok(()) => finish(ErrorCode::Success),
        Err(code) => finish(code),
    }
}

// ───────────────────────── lifetime ──────────────────────────────────── //

/// Create an empty allocator. Returns `Success` **and** stores the handle
/// in `*out` -- or an error code otherwise.
#[no_mangle]
pub extern "C" fn netcalc_new(out: *mut HandleId) -> ErrorCode {
    if out.is_null() {
        return finish(ErrorCode::InvalidHandle);
    }
    let id = register_handle(SyncCalculator::new());
    unsafe { *out = id };
    finish(ErrorCode::Success)
}

/// Destroy the allocator behind `h`. The handle is dead afterwards.
#[no_mangle]
pub extern "C" fn netcalc_close(h: HandleId) -> ErrorCode {
    match unregister_handle(h) {
        Ok(()) => finish(ErrorCode::Success),
        Err(code) => finish(code),
    }
}

// ───────────────────────── pools & claims ────────────────────────────── //

#[no_mangle]
pub extern "C" fn netcalc_add_pool(h: HandleId, cidr_utf8: *const c_char) -> ErrorCode {
    with_parsed_prefix(h, cidr_utf8, |calc, prefix| calc.add_pool(prefix))
}

#[no_mangle]
pub extern "C" fn netcalc_remove_pool(h: HandleId, cidr_utf8: *const c_char) -> ErrorCode {
    with_parsed_prefix(h, cidr_utf8, |calc, prefix| calc.remove_pool(prefix))
}

#[no_mangle]
pub extern "C" fn netcalc_add_allocation(h: HandleId, cidr_utf8: *const c_char) -> ErrorCode {
    with_parsed_prefix(h, cidr_utf8, |calc, prefix| calc.add_allocation(prefix))
}

#[no_mangle]
pub extern "C" fn netcalc_remove_allocation(h: HandleId, cidr_utf8: *const c_char) -> ErrorCode {
    with_parsed_prefix(h, cidr_utf8, |calc, prefix| calc.remove_allocation(prefix))
}

// ───────────────────────── queries ───────────────────────────────────── //

#[no_mangle]
pub extern "C" fn netcalc_prefix_in_pools(
    h: HandleId,
    cidr_utf8: *const c_char,
    out_found: *mut bool,
) -> ErrorCode {
    if out_found.is_null() {
        return finish(ErrorCode::InvalidHandle);
    }
    let text = try_c!(cstr(cidr_utf8));
    let prefix = match parse_prefix(text) {
        Ok(p) => p,
        Err(e) => return finish(map_error(&e)),
    };
    let found = try_c!(with_handle(h, |calc| calc.prefix_in_pools(prefix)));
    unsafe { *out_found = found };
    finish(ErrorCode::Success)
}

/// Allocate the next available subnet and write its CIDR text, NUL
/// terminator included, into `out`. `family` is `FAMILY_V4` or
/// `FAMILY_V6`.
#[no_mangle]
pub extern "C" fn netcalc_next_available(
    h: HandleId,
    prefix_len: u8,
    family: u8,
    out: *mut c_char,
    out_len: usize,
) -> ErrorCode {
    let family = match family {
        FAMILY_V4 => Family::V4,
        FAMILY_V6 => Family::V6,
        _ => return finish(ErrorCode::InvalidFamily),
    };
    let result = try_c!(with_handle(h, |calc| calc.next_available(prefix_len, family)));
    match result {
        Ok(prefix) => {
            let code = write_cstr(out, out_len, &prefix.to_string());
            if code != ErrorCode::Success {
                // the caller never saw the prefix; don't leak the allocation
                let _ = with_handle(h, |calc| calc.remove_allocation(prefix));
            }
            finish(code)
        }
        Err(e) => finish(map_error(&e)),
    }
}
