//! Serve-relative time arithmetic.
//!
//! Every task time is an integer number of minutes relative to the serve
//! time (0 = serve, negative = before). Wall-clock values are recomputed
//! from the anchor on demand and never stored, so editing the serve time
//! shifts the whole plan without touching any task.

use chrono::{DateTime, Duration, Utc};

/// Convert serve-relative minutes to a wall-clock instant.
pub fn wall_clock(serve_at: DateTime<Utc>, minutes: i32) -> DateTime<Utc> {
    serve_at + Duration::minutes(i64::from(minutes))
}

/// Current position on the serve-relative axis: negative before serve,
/// positive after. Truncates toward zero to whole minutes.
pub fn minutes_from_serve(serve_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - serve_at).num_minutes()
}
