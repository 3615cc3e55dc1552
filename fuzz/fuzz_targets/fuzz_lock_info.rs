//! Fuzz target for LOCK request bodies
//!
//! The parser must reject malformed XML with an error and never panic. A
//! body that parses must also survive being rendered back into a lock
//! discovery response.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lockdav_core::{Depth, ResourceLocks, Transaction};
use lockdav_webdav::xml::{lock_discovery, parse_lock_info};
use std::time::Duration;

fuzz_target!(|data: &[u8]| {
    // Request bodies are small; skip anything that would only stress xmltree
    if data.len() > 64 * 1024 {
        return;
    }

    let Ok(info) = parse_lock_info(data) else {
        return;
    };

    let owner = info.owner.unwrap_or_default();
    let locks = ResourceLocks::default();
    let tx = Transaction::new(1, None);
    locks
        .lock(&tx, "/fuzz", &owner, info.scope, Depth::Zero, Duration::from_secs(60))
        .expect("empty table must grant");
    let lock = locks
        .get_locked_object_by_path("/fuzz")
        .expect("granted lock must be recorded");

    // Owners come from the client and must be escaped, not break the writer
    lock_discovery(&lock, &owner).expect("rendering a granted lock must succeed");
});
