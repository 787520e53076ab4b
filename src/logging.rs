//! Library-side logging init (SPEC_FULL A.2). The teacher writes progress
//! and recovery messages straight to stdout/stderr with `println!`/
//! `eprintln!`; a library embedded in a SQL kernel must not hijack the
//! host process's standard streams, so every such call site in this crate
//! goes through `log::{trace,debug,info,warn,error}!` instead and a caller
//! (binary, bench, or test) opts into seeing them by calling [`init`].
//!
//! Grounded on `hamdaankhalid-persistent-btree-storage-engine`, the pack's
//! other B+tree-shaped crate, which depends on `log` + `env_logger` for the
//! same reason.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize `env_logger` exactly once per process. Safe to call from every
/// test and example; repeated calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .is_test(cfg!(test))
            .try_init();
    });
}
