//! Application status codes carried in the response envelope
//!
//! The HTTP status line is always 200 for these; callers branch on `code`.

/// Success
pub const SUCCESS: u16 = 200;

/// A caught panic (the only case with a non-200 HTTP status)
pub const INTERNAL_ERROR: u16 = 500;

/// No download URL supplied
pub const MISSING_INPUT: u16 = 900;

/// Package could not be parsed, including unknown platforms
pub const PARSE_FAILED: u16 = 901;

/// Package could not be downloaded
pub const DOWNLOAD_FAILED: u16 = 903;
