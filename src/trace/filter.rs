//! Client-side trace filtering.
//!
//! Filters are not combined. The first one set wins, in this order:
//! path (substring, case-insensitive), status code (exact), HTTP method
//! (exact), function name (substring, case-insensitive). Later filters are
//! ignored even when set.

use crate::trace::types::{TraceFilters, TraceInfo};

/// Returns true if `record` passes `filters`.
pub fn matches(filters: &TraceFilters, record: &TraceInfo) -> bool {
    if let Some(path) = &filters.path {
        return contains_ignore_case(&record.path, path);
    }
    if let Some(code) = filters.status_code {
        return record.status_code() == Some(code);
    }
    if let Some(method) = &filters.method {
        return record.method() == Some(method.as_str());
    }
    if let Some(func_name) = &filters.func_name {
        return contains_ignore_case(&record.func_name, func_name);
    }
    true
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
