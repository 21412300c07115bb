// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for storage path normalization

#![no_main]

use libfuzzer_sys::fuzz_target;
use sbx_core::path::{normalize, StoragePath};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
        assert!(once.starts_with('/'));
        assert!(once == "/" || !once.ends_with('/'));

        let path = StoragePath::new(input);
        let _ = path.name();
        let _ = path.parent();
        assert!(path.segments.iter().all(|s| s != ".." && s != "."));

        // Resolving under a storage root keeps every root segment in place
        let root = StoragePath::new("/storage/repo");
        let resolved = root.resolve(&path);
        assert!(resolved.segments.starts_with(&root.segments));
        assert!(root.join(input).segments.starts_with(&root.segments));
    }
});
