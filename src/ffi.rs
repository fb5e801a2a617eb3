//! FFI bindings for FitAI Core
//!
//! This module provides C-compatible functions for calling the core from the
//! mobile and web shells. All functions take null-terminated C strings and
//! return allocated JSON strings that must be freed by the caller using
//! `fitai_free_string`. On failure they return NULL (or -1) and the message is
//! available from `fitai_last_error`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregator::DailyAggregator;
use crate::config::{FallbackPolicy, TrackerConfig};
use crate::error::ComputeError;
use crate::estimate::NutritionEstimate;
use crate::store::MemoryStore;
use crate::target::TargetCalculator;
use crate::tracker::Tracker;
use crate::types::{MealEntry, Profile};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

unsafe fn required_arg(ptr: *const c_char, name: &str) -> Result<String, String> {
    cstr_to_string(ptr).ok_or_else(|| format!("Invalid {name} string pointer"))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| ComputeError::DateParseError(format!("'{value}': {e}")).to_string())
}

/// Serialize the result of `f`, or record its error and return NULL
fn json_result<T, F>(f: F) -> *mut c_char
where
    T: Serialize,
    F: FnOnce() -> Result<T, String>,
{
    match f().and_then(|value| serde_json::to_string(&value).map_err(|e| e.to_string())) {
        Ok(json) => string_to_cstr(&json),
        Err(msg) => {
            set_last_error(&msg);
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute the energy and macro plan for a profile.
///
/// `fallback_kcal <= 0` selects the strict policy (incomplete profiles fail).
///
/// # Safety
/// - `profile_json` and `today` (YYYY-MM-DD) must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `fitai_free_string`.
#[no_mangle]
pub unsafe extern "C" fn fitai_calculate_target(
    profile_json: *const c_char,
    today: *const c_char,
    fallback_kcal: i64,
) -> *mut c_char {
    clear_last_error();

    json_result(|| {
        let profile_str = required_arg(profile_json, "profile JSON")?;
        let today = parse_date(&required_arg(today, "today")?)?;
        let profile: Profile = serde_json::from_str(&profile_str).map_err(|e| e.to_string())?;

        let policy = if fallback_kcal > 0 {
            FallbackPolicy::Constant { kcal: fallback_kcal }
        } else {
            FallbackPolicy::Strict
        };

        TargetCalculator::with_fallback(policy)
            .plan(&profile, today)
            .map_err(|e| e.to_string())
    })
}

/// Summarize a JSON array of meals for one UTC day.
///
/// # Safety
/// - `meals_json` and `date` (YYYY-MM-DD) must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `fitai_free_string`.
#[no_mangle]
pub unsafe extern "C" fn fitai_day_summary(
    meals_json: *const c_char,
    date: *const c_char,
    target_kcal: i64,
) -> *mut c_char {
    clear_last_error();

    json_result(|| {
        let meals_str = required_arg(meals_json, "meals JSON")?;
        let date = parse_date(&required_arg(date, "date")?)?;
        let meals: Vec<MealEntry> = serde_json::from_str(&meals_str).map_err(|e| e.to_string())?;

        Ok(DailyAggregator::summarize(&meals, date, target_kcal))
    })
}

/// Turn a model reply into a meal entry JSON.
///
/// # Safety
/// - `reply` and `user_id` must be valid null-terminated C strings.
/// - `created_at` may be NULL (current time) or an RFC 3339 timestamp.
/// - Returns a newly allocated string that must be freed with `fitai_free_string`.
#[no_mangle]
pub unsafe extern "C" fn fitai_parse_estimate(
    reply: *const c_char,
    user_id: *const c_char,
    created_at: *const c_char,
) -> *mut c_char {
    clear_last_error();

    json_result(|| {
        let reply = required_arg(reply, "reply")?;
        let user_id = required_arg(user_id, "user_id")?;
        let created_at = match cstr_to_string(created_at) {
            Some(ts) => ts
                .parse::<DateTime<Utc>>()
                .map_err(|e| format!("Invalid timestamp '{ts}': {e}"))?,
            None => Utc::now(),
        };

        let estimate = NutritionEstimate::from_reply(&reply).map_err(|e| e.to_string())?;
        Ok(estimate.into_meal(user_id, created_at))
    })
}

// ============================================================================
// Stateful API (tracker over an in-memory store)
// ============================================================================

/// Opaque handle to a tracker
pub struct FitaiTrackerHandle {
    tracker: Tracker<MemoryStore>,
}

/// Create a tracker, optionally restoring store state.
///
/// # Safety
/// - `state_json` may be NULL (empty store) or a string from `fitai_tracker_export`.
/// - `fallback_kcal <= 0` selects the strict policy.
/// - Free the handle with `fitai_tracker_free`.
#[no_mangle]
pub unsafe extern "C" fn fitai_tracker_new(
    state_json: *const c_char,
    fallback_kcal: i64,
) -> *mut FitaiTrackerHandle {
    clear_last_error();

    let store = match cstr_to_string(state_json) {
        Some(json) => match MemoryStore::from_json(&json) {
            Ok(store) => store,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        },
        None => MemoryStore::new(),
    };

    let mut config = TrackerConfig::default();
    if fallback_kcal > 0 {
        config.calculator.fallback = FallbackPolicy::Constant { kcal: fallback_kcal };
    }

    let handle = Box::new(FitaiTrackerHandle {
        tracker: Tracker::with_config(store, config),
    });
    Box::into_raw(handle)
}

/// Free a tracker handle.
///
/// # Safety
/// - `tracker` must be a pointer returned by `fitai_tracker_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn fitai_tracker_free(tracker: *mut FitaiTrackerHandle) {
    if !tracker.is_null() {
        drop(Box::from_raw(tracker));
    }
}

/// Save a profile and return the computed energy target JSON.
///
/// # Safety
/// - `tracker` must be a live handle; string arguments must be valid C strings.
#[no_mangle]
pub unsafe extern "C" fn fitai_tracker_save_profile(
    tracker: *mut FitaiTrackerHandle,
    user_id: *const c_char,
    profile_json: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return ptr::null_mut();
    }
    let handle = &mut *tracker;

    json_result(|| {
        let user_id = required_arg(user_id, "user_id")?;
        let profile_str = required_arg(profile_json, "profile JSON")?;
        let today = parse_date(&required_arg(today, "today")?)?;
        let profile: Profile = serde_json::from_str(&profile_str).map_err(|e| e.to_string())?;

        handle
            .tracker
            .save_profile(&user_id, profile, today)
            .map_err(|e| e.to_string())
    })
}

/// Log a meal entry (JSON). Returns 0 on success, -1 on error.
///
/// # Safety
/// - `tracker` must be a live handle; `meal_json` must be a valid C string.
#[no_mangle]
pub unsafe extern "C" fn fitai_tracker_log_meal(
    tracker: *mut FitaiTrackerHandle,
    meal_json: *const c_char,
) -> i32 {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return -1;
    }
    let handle = &mut *tracker;

    let result = required_arg(meal_json, "meal JSON").and_then(|json| {
        let meal: MealEntry = serde_json::from_str(&json).map_err(|e| e.to_string())?;
        handle.tracker.log_meal(meal).map_err(|e| e.to_string())
    });

    match result {
        Ok(_) => 0,
        Err(msg) => {
            set_last_error(&msg);
            -1
        }
    }
}

/// Delete a meal. Returns 1 if removed, 0 if not found, -1 on error.
///
/// # Safety
/// - `tracker` must be a live handle; string arguments must be valid C strings.
#[no_mangle]
pub unsafe extern "C" fn fitai_tracker_delete_meal(
    tracker: *mut FitaiTrackerHandle,
    user_id: *const c_char,
    meal_id: *const c_char,
) -> i32 {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return -1;
    }
    let handle = &mut *tracker;

    let result = required_arg(user_id, "user_id").and_then(|user_id| {
        let id_str = required_arg(meal_id, "meal_id")?;
        let id = Uuid::parse_str(id_str.trim()).map_err(|e| e.to_string())?;
        handle
            .tracker
            .delete_meal(&user_id, id)
            .map_err(|e| e.to_string())
    });

    match result {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(msg) => {
            set_last_error(&msg);
            -1
        }
    }
}

/// Day summary JSON for a user.
///
/// # Safety
/// - `tracker` must be a live handle; string arguments must be valid C strings.
#[no_mangle]
pub unsafe extern "C" fn fitai_tracker_day_summary(
    tracker: *mut FitaiTrackerHandle,
    user_id: *const c_char,
    date: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return ptr::null_mut();
    }
    let handle = &*tracker;

    json_result(|| {
        let user_id = required_arg(user_id, "user_id")?;
        let date = parse_date(&required_arg(date, "date")?)?;
        handle
            .tracker
            .day_summary(&user_id, date)
            .map_err(|e| e.to_string())
    })
}

/// Export store state as JSON (restore with `fitai_tracker_new`).
///
/// # Safety
/// - `tracker` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn fitai_tracker_export(tracker: *mut FitaiTrackerHandle) -> *mut c_char {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return ptr::null_mut();
    }
    let handle = &*tracker;

    match handle.tracker.store().to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory and diagnostics
// ============================================================================

/// Free a string returned by this library.
///
/// # Safety
/// - `ptr` must have been returned by a `fitai_*` function, or be NULL.
#[no_mangle]
pub unsafe extern "C" fn fitai_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Last error message on this thread, or NULL.
///
/// # Safety
/// - The pointer is valid until the next `fitai_*` call on the same thread.
#[no_mangle]
pub unsafe extern "C" fn fitai_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Library version (static string, do not free).
///
/// # Safety
/// - Always safe to call.
#[no_mangle]
pub unsafe extern "C" fn fitai_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cstring(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn take_json(ptr: *mut c_char) -> serde_json::Value {
        assert!(!ptr.is_null());
        let value = serde_json::from_str(CStr::from_ptr(ptr).to_str().unwrap()).unwrap();
        fitai_free_string(ptr);
        value
    }

    const PROFILE: &str = r#"{"sex": "male", "weight_kg": 80, "height_cm": 180,
                              "age_years": 30, "activity_factor": 1.2}"#;

    #[test]
    fn test_ffi_calculate_target() {
        let profile = cstring(PROFILE);
        let today = cstring("2024-01-15");

        unsafe {
            let plan = take_json(fitai_calculate_target(profile.as_ptr(), today.as_ptr(), 0));
            assert_eq!(plan["energy"]["maintenance_kcal"], 2136);
            assert_eq!(plan["energy"]["target_kcal"], 1636);
            assert_eq!(plan["energy"]["branch"], "flat_deficit");
        }
    }

    #[test]
    fn test_ffi_calculate_target_fallback() {
        let profile = cstring("{}");
        let today = cstring("2024-01-15");

        unsafe {
            let result = fitai_calculate_target(profile.as_ptr(), today.as_ptr(), 0);
            assert!(result.is_null());
            let error = CStr::from_ptr(fitai_last_error()).to_str().unwrap();
            assert!(error.contains("weight_kg"));

            let plan = take_json(fitai_calculate_target(profile.as_ptr(), today.as_ptr(), 2000));
            assert_eq!(plan["energy"]["target_kcal"], 2000);
        }
    }

    #[test]
    fn test_ffi_day_summary() {
        let meals = cstring(
            r#"[
                {"id": "6f1c1f2e-6a43-4b8e-9d5e-1a2b3c4d5e6f", "user_id": "u1", "name": "a",
                 "calories": 300, "protein": 10, "fat": 5, "carbs": 40,
                 "created_at": "2024-01-15T08:00:00Z"},
                {"id": "7f1c1f2e-6a43-4b8e-9d5e-1a2b3c4d5e6f", "user_id": "u1", "name": "b",
                 "calories": 700, "protein": 30, "fat": 25, "carbs": 60,
                 "created_at": "2024-01-15T23:59:59.999Z"},
                {"id": "8f1c1f2e-6a43-4b8e-9d5e-1a2b3c4d5e6f", "user_id": "u1", "name": "c",
                 "calories": 500, "created_at": "2024-01-16T00:00:00Z"}
            ]"#,
        );
        let date = cstring("2024-01-15");

        unsafe {
            let summary = take_json(fitai_day_summary(meals.as_ptr(), date.as_ptr(), 2000));
            assert_eq!(summary["totals"]["calories"], 1000);
            assert_eq!(summary["progress"]["percent"], 50.0);
            assert_eq!(summary["meals"][0]["name"], "b");
        }
    }

    #[test]
    fn test_ffi_parse_estimate() {
        let reply = cstring(r#"Result: {"name": "Toast", "calories": 180.4}"#);
        let user = cstring("u1");
        let ts = cstring("2024-01-15T08:00:00Z");

        unsafe {
            let meal = take_json(fitai_parse_estimate(reply.as_ptr(), user.as_ptr(), ts.as_ptr()));
            assert_eq!(meal["name"], "Toast");
            assert_eq!(meal["calories"], 180);
            assert_eq!(meal["user_id"], "u1");
        }
    }

    #[test]
    fn test_ffi_tracker_lifecycle() {
        let user = cstring("u1");
        let profile = cstring(PROFILE);
        let today = cstring("2024-01-15");

        unsafe {
            let tracker = fitai_tracker_new(ptr::null(), 0);
            assert!(!tracker.is_null());

            let target = take_json(fitai_tracker_save_profile(
                tracker,
                user.as_ptr(),
                profile.as_ptr(),
                today.as_ptr(),
            ));
            assert_eq!(target["target_kcal"], 1636);

            let meal = cstring(
                r#"{"id": "6f1c1f2e-6a43-4b8e-9d5e-1a2b3c4d5e6f", "user_id": "u1", "name": "a",
                    "calories": 400, "created_at": "2024-01-15T12:00:00Z"}"#,
            );
            assert_eq!(fitai_tracker_log_meal(tracker, meal.as_ptr()), 0);

            let summary = take_json(fitai_tracker_day_summary(tracker, user.as_ptr(), today.as_ptr()));
            assert_eq!(summary["totals"]["calories"], 400);
            assert_eq!(summary["target_kcal"], 1636);

            // export and restore into a second tracker
            let state = fitai_tracker_export(tracker);
            assert!(!state.is_null());
            let restored = fitai_tracker_new(state, 0);
            assert!(!restored.is_null());
            fitai_free_string(state);

            let id = cstring("6f1c1f2e-6a43-4b8e-9d5e-1a2b3c4d5e6f");
            assert_eq!(fitai_tracker_delete_meal(restored, user.as_ptr(), id.as_ptr()), 1);
            assert_eq!(fitai_tracker_delete_meal(restored, user.as_ptr(), id.as_ptr()), 0);

            fitai_tracker_free(tracker);
            fitai_tracker_free(restored);
        }
    }

    #[test]
    fn test_ffi_null_handle() {
        let user = cstring("u1");
        let date = cstring("2024-01-15");
        unsafe {
            let result = fitai_tracker_day_summary(ptr::null_mut(), user.as_ptr(), date.as_ptr());
            assert!(result.is_null());
            assert!(!fitai_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_bad_date() {
        let meals = cstring("[]");
        let date = cstring("15/01/2024");
        unsafe {
            assert!(fitai_day_summary(meals.as_ptr(), date.as_ptr(), 2000).is_null());
            let error = CStr::from_ptr(fitai_last_error()).to_str().unwrap();
            assert!(error.starts_with("Date parse error"));
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = fitai_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
