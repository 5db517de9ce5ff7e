//! C FFI bindings for wave-core
//!
//! A C-compatible API around `wave_core::Session` for C/C++ front ends.
//! Every caller owns its own session handle. Functions returning `i32` use
//! 0 for success and -1 for failure; the failure message is then available
//! through `wm_last_error`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use wave_core::{MergeConfig, MergeResult, Session};

/// Opaque handle to a merge session
pub struct WaveSession {
    inner: Session,
    last_error: Option<CString>,
}

impl WaveSession {
    fn fail(&mut self, message: impl ToString) -> i32 {
        // Interior NULs would truncate the message; replace them
        let message = message.to_string().replace('\0', " ");
        self.last_error = CString::new(message).ok();
        -1
    }

    fn result(&self) -> Option<&MergeResult> {
        self.inner.last_result()
    }
}

unsafe fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        CStr::from_ptr(ptr).to_str().ok()
    }
}

fn into_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

/// Create an empty session
///
/// Free it with `wm_session_free`.
#[no_mangle]
pub extern "C" fn wm_session_new() -> *mut WaveSession {
    Box::into_raw(Box::new(WaveSession {
        inner: Session::new(),
        last_error: None,
    }))
}

/// Free a session
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new` or null
#[no_mangle]
pub unsafe extern "C" fn wm_session_free(session: *mut WaveSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Load a CSV/TSV file into the session as `wave`, replacing any dataset
/// already loaded for that wave
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new`
/// - `path` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn wm_session_load_csv(
    session: *mut WaveSession,
    path: *const c_char,
    wave: u32,
) -> i32 {
    let Some(session) = session.as_mut() else {
        return -1;
    };
    let Some(path) = str_arg(path) else {
        return session.fail("path is null or not valid UTF-8");
    };

    match session.inner.load_file(path, wave, &[]) {
        Ok(_) => {
            session.last_error = None;
            0
        }
        Err(e) => session.fail(e),
    }
}

/// Drop the dataset loaded for `wave`. Returns 1 if one was removed, 0 if
/// the wave was not loaded and -1 for a null session.
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new`
#[no_mangle]
pub unsafe extern "C" fn wm_session_remove_wave(session: *mut WaveSession, wave: u32) -> i32 {
    match session.as_mut() {
        Some(session) => i32::from(session.inner.remove_wave(wave).is_some()),
        None => -1,
    }
}

/// Drop every loaded dataset, the last result and the merge history
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new` or null
#[no_mangle]
pub unsafe extern "C" fn wm_session_clear(session: *mut WaveSession) {
    if let Some(session) = session.as_mut() {
        session.inner.clear();
        session.last_error = None;
    }
}

/// Merge every loaded wave using a JSON-encoded merge configuration, e.g.
/// `{"primary_key": "PID", "mode": "wide", "join_type": "outer"}`
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new`
/// - `config_json` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn wm_session_merge(
    session: *mut WaveSession,
    config_json: *const c_char,
) -> i32 {
    let Some(session) = session.as_mut() else {
        return -1;
    };
    let Some(json) = str_arg(config_json) else {
        return session.fail("config is null or not valid UTF-8");
    };
    let config: MergeConfig = match serde_json::from_str(json) {
        Ok(config) => config,
        Err(e) => return session.fail(format!("invalid merge config: {}", e)),
    };

    match session.inner.merge(&config) {
        Ok(_) => {
            session.last_error = None;
            0
        }
        Err(e) => session.fail(e),
    }
}

/// Get the row count of the last merge result (0 if there is none)
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new`
#[no_mangle]
pub unsafe extern "C" fn wm_result_row_count(session: *const WaveSession) -> usize {
    session
        .as_ref()
        .and_then(WaveSession::result)
        .map_or(0, |r| r.row_count)
}

/// Get the column count of the last merge result (0 if there is none)
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new`
#[no_mangle]
pub unsafe extern "C" fn wm_result_col_count(session: *const WaveSession) -> usize {
    session
        .as_ref()
        .and_then(WaveSession::result)
        .map_or(0, |r| r.column_count)
}

/// Get a column name of the last merge result
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new`
/// - Returns null if there is no result or index is out of bounds
/// - Caller must free the returned string with `wm_free_string`
#[no_mangle]
pub unsafe extern "C" fn wm_result_col_name(
    session: *const WaveSession,
    index: usize,
) -> *mut c_char {
    session
        .as_ref()
        .and_then(WaveSession::result)
        .and_then(|r| r.table.columns.get(index))
        .map_or(ptr::null_mut(), |c| into_c_string(c.name.clone()))
}

/// Get a cell of the last merge result as text (empty string for a
/// missing value)
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new`
/// - Returns null if there is no result or either index is out of bounds
/// - Caller must free the returned string with `wm_free_string`
#[no_mangle]
pub unsafe extern "C" fn wm_result_cell(
    session: *const WaveSession,
    row: usize,
    col: usize,
) -> *mut c_char {
    session
        .as_ref()
        .and_then(WaveSession::result)
        .and_then(|r| r.table.rows.get(row))
        .and_then(|r| r.get(col))
        .map_or(ptr::null_mut(), |cell| into_c_string(cell.to_string_value()))
}

/// Get the missing value summary of the last merge result as a JSON array
/// of `{"column", "count", "percentage"}` objects
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new`
/// - Returns null if there is no result
/// - Caller must free the returned string with `wm_free_string`
#[no_mangle]
pub unsafe extern "C" fn wm_result_missing_json(session: *const WaveSession) -> *mut c_char {
    session
        .as_ref()
        .and_then(WaveSession::result)
        .and_then(|r| serde_json::to_string(&r.missing_summary).ok())
        .map_or(ptr::null_mut(), into_c_string)
}

/// Get the warnings raised by the last merge as a JSON array
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new`
/// - Returns null if there is no result
/// - Caller must free the returned string with `wm_free_string`
#[no_mangle]
pub unsafe extern "C" fn wm_result_warnings_json(session: *const WaveSession) -> *mut c_char {
    session
        .as_ref()
        .and_then(WaveSession::result)
        .and_then(|r| serde_json::to_string(&r.warnings).ok())
        .map_or(ptr::null_mut(), into_c_string)
}

/// Get the error message of the most recent `wm_session_load_csv` or
/// `wm_session_merge` call on this session
///
/// # Safety
/// - `session` must be a valid pointer returned by `wm_session_new`
/// - Returns null if the most recent load or merge succeeded; `wm_result_*` calls
///   neither set nor clear the message
/// - The string is owned by the session and valid until the next load,
///   merge or clear; do not free it
#[no_mangle]
pub unsafe extern "C" fn wm_last_error(session: *const WaveSession) -> *const c_char {
    session
        .as_ref()
        .and_then(|s| s.last_error.as_ref())
        .map_or(ptr::null(), |e| e.as_ptr())
}

/// Free a string returned by this library
///
/// # Safety
/// - `s` must be a valid pointer returned by a wm_* function or null
#[no_mangle]
pub unsafe extern "C" fn wm_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_wave(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wave-ffi-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    unsafe fn take_string(s: *mut c_char) -> String {
        assert!(!s.is_null());
        let out = CStr::from_ptr(s).to_str().unwrap().to_string();
        wm_free_string(s);
        out
    }

    #[test]
    fn test_session_merge_roundtrip() {
        let w1 = write_wave("ffi_w1.csv", "PID,age\n1,30\n2,40\n");
        let w2 = write_wave("ffi_w2.csv", "PID,age\n2,41\n3,50\n");
        let p1 = CString::new(w1.to_str().unwrap()).unwrap();
        let p2 = CString::new(w2.to_str().unwrap()).unwrap();
        let config = CString::new(r#"{"primary_key":"PID","join_type":"outer"}"#).unwrap();

        unsafe {
            let session = wm_session_new();
            assert_eq!(wm_session_load_csv(session, p1.as_ptr(), 1), 0);
            assert_eq!(wm_session_load_csv(session, p2.as_ptr(), 2), 0);
            assert_eq!(wm_session_merge(session, config.as_ptr()), 0);
            assert!(wm_last_error(session).is_null());

            assert_eq!(wm_result_row_count(session), 3);
            assert_eq!(wm_result_col_count(session), 3);
            assert_eq!(take_string(wm_result_col_name(session, 1)), "age_wave1");
            assert_eq!(take_string(wm_result_cell(session, 2, 1)), "");
            assert_eq!(take_string(wm_result_cell(session, 2, 2)), "50");
            assert!(wm_result_cell(session, 9, 0).is_null());

            let missing = take_string(wm_result_missing_json(session));
            assert!(missing.contains("\"age_wave1\""));
            assert_eq!(take_string(wm_result_warnings_json(session)), "[]");

            // Only wave 1 left: the outer merge shrinks to its rows
            assert_eq!(wm_session_remove_wave(session, 2), 1);
            assert_eq!(wm_session_remove_wave(session, 2), 0);
            assert_eq!(wm_session_merge(session, config.as_ptr()), 0);
            assert_eq!(wm_result_row_count(session), 2);

            wm_session_clear(session);
            assert_eq!(wm_result_row_count(session), 0);
            assert_eq!(wm_session_merge(session, config.as_ptr()), -1);

            wm_session_free(session);
        }

        std::fs::remove_file(w1).unwrap();
        std::fs::remove_file(w2).unwrap();
    }

    #[test]
    fn test_failure_sets_last_error() {
        let config = CString::new(r#"{"primary_key":"PID"}"#).unwrap();
        let bad = CString::new("{not json").unwrap();

        unsafe {
            let session = wm_session_new();
            assert_eq!(wm_session_merge(session, config.as_ptr()), -1);
            let message = CStr::from_ptr(wm_last_error(session)).to_str().unwrap();
            assert!(message.contains("no datasets"), "{message}");

            assert_eq!(wm_session_merge(session, bad.as_ptr()), -1);
            let message = CStr::from_ptr(wm_last_error(session)).to_str().unwrap();
            assert!(message.starts_with("invalid merge config"));

            assert_eq!(wm_result_row_count(session), 0);
            assert!(wm_result_missing_json(session).is_null());
            wm_session_free(session);
        }
    }

    #[test]
    fn test_null_handles() {
        unsafe {
            assert_eq!(wm_session_load_csv(ptr::null_mut(), ptr::null(), 1), -1);
            assert_eq!(wm_result_row_count(ptr::null()), 0);
            assert_eq!(wm_session_remove_wave(ptr::null_mut(), 1), -1);
            wm_session_clear(ptr::null_mut());
            assert!(wm_last_error(ptr::null()).is_null());
            wm_session_free(ptr::null_mut());
            wm_free_string(ptr::null_mut());
        }
    }
}
