//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain     | Description                                     |
//! |------|------------|-------------------------------------------------|
//! | 0    | Universal  | Success                                         |
//! | 1    | Universal  | General error (unspecified)                     |
//! | 2    | Universal  | CLI usage error (bad args, bad role pairs)      |
//! | 3    | parse      | No input file could be decoded                  |
//! | 4    | assembly   | Dataset assembly or cleaning service failure    |
//! | 5    | config     | Regression options rejected                     |
//! | 6    | generation | Role mapping cannot produce a script            |
//! | 7    | io         | Reading inputs or writing outputs failed        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, malformed `--role` pairs, unreadable options JSON.
pub const EXIT_USAGE: u8 = 2;

/// Every input file failed to decode (unsupported, empty, malformed, unknown sheet).
pub const EXIT_PARSE: u8 = 3;

/// Dataset assembly failed: cleaning service unreachable, rejected the
/// upload, or returned an unusable table. Also used by `health`.
pub const EXIT_ASSEMBLY: u8 = 4;

/// Regression options are inconsistent with the columns and roles.
pub const EXIT_CONFIG: u8 = 5;

/// No dependent or no independent variable mapped.
pub const EXIT_GENERATION: u8 = 6;

/// File system error reading inputs or writing the script / dataset.
pub const EXIT_IO: u8 = 7;
