//! Exit codes of the `compat` binary.
//! Scripts rely on these values; keep them stable.

use compat_store::StoreError;

pub const SUCCESS: i32 = 0;
pub const NOT_FOUND: i32 = 1; // No report or summary for the requested date/platform
pub const CONFIG_ERROR: i32 = 2; // Bad arguments or configuration
pub const FETCH_ERROR: i32 = 3; // Reports could not be fetched or decoded

/// Exit code for a failed command.
pub fn from_error(err: &anyhow::Error) -> i32 {
    match err.chain().find_map(|cause| cause.downcast_ref::<StoreError>()) {
        Some(store_err) if store_err.exit_code() == CONFIG_ERROR => CONFIG_ERROR,
        Some(_) => FETCH_ERROR,
        None => CONFIG_ERROR,
    }
}
