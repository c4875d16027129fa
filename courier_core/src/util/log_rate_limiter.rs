//! Rate limiting for log statements that can fire at arbitrary frequency.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

lazy_static! {
    static ref LAST_LOGGED: Mutex<HashMap<&'static str, Instant>> = Mutex::new(HashMap::new());
}

/// Returns true at most once per `min_interval` for each `site`.
///
/// `site` is an opaque identifier of the log statement, typically
/// `"module::what_went_wrong"`. Distinct sites rate-limit independently.
/// Safe under concurrent use; a poisoned registry silences the site instead
/// of failing the caller.
pub fn should_log(site: &'static str, min_interval: Duration) -> bool {
    let mut last_logged = match LAST_LOGGED.lock() {
        Ok(guard) => guard,
        Err(_) => return false,
    };
    let now = Instant::now();
    match last_logged.entry(site) {
        Entry::Occupied(mut entry) => {
            if now.duration_since(*entry.get()) >= min_interval {
                entry.insert(now);
                true
            } else {
                false
            }
        }
        Entry::Vacant(entry) => {
            entry.insert(now);
            true
        }
    }
}
