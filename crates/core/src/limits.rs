//! Size and span limits for the forecast pipeline.
//!
//! The whole input buffer and every derived structure live in memory for
//! the duration of a run, so both ends are bounded: the raw buffer before
//! decoding, and the timeline before it is materialised.

// === Time Grid ===

/// Width of one timeline step and one bucket, in milliseconds.
pub const HOUR_MS: i64 = 3_600_000;

// === Buffer Limits ===

/// Default maximum input buffer size in bytes (512MB).
///
/// Overridable through `WorkerConfig::max_buffer_bytes`.
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 512 * 1024 * 1024;

// === Timeline Limits ===

/// Maximum number of hourly steps a timeline may contain (~200 years).
///
/// A single corrupt instant far from the rest of the data would otherwise
/// ask for millions of grid points.
pub const MAX_TIMELINE_HOURS: u64 = 200 * 366 * 24;

// === Diagnostics ===

/// Maximum length of the sample row rendered into the debug string.
pub const MAX_DEBUG_SAMPLE_CHARS: usize = 512;
