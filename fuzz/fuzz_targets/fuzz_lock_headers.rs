//! Fuzz target for lock-related request headers
//!
//! Covers `If`, `Lock-Token`, `Timeout` and `Depth` parsing plus request
//! path normalization. None of them may panic, and parsed values must stay
//! within their documented bounds.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lockdav_core::path::normalize_path;
use lockdav_core::timeout::parse_timeout;
use lockdav_core::token::{parse_if_header, parse_lock_token_header};
use lockdav_core::LockConfig;
use lockdav_webdav::headers::parse_depth;

#[derive(Arbitrary, Debug)]
enum FuzzInput {
    If(String),
    LockToken(String),
    Timeout(Option<String>),
    Depth(Option<String>),
    Path(String),
}

fuzz_target!(|input: FuzzInput| {
    match input {
        FuzzInput::If(header) => {
            for token in parse_if_header(&header) {
                assert!(!token.is_empty(), "empty token from {header:?}");
            }
        }

        FuzzInput::LockToken(header) => {
            let _ = parse_lock_token_header(&header);
        }

        FuzzInput::Timeout(header) => {
            let config = LockConfig::default();
            let timeout = parse_timeout(header.as_deref(), &config);
            assert!(!timeout.is_zero(), "zero timeout from {header:?}");
            assert!(timeout <= config.max_timeout, "unclamped timeout from {header:?}");
        }

        FuzzInput::Depth(header) => {
            let _ = parse_depth(header.as_deref());
        }

        FuzzInput::Path(raw) => {
            if let Ok(path) = normalize_path(&raw) {
                assert!(path.starts_with('/'), "relative path from {raw:?}");
                assert_eq!(normalize_path(&path).ok().as_deref(), Some(path.as_str()));
            }
        }
    }
});
