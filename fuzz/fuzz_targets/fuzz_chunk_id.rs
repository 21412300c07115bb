// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for chunk ID parsing and shard naming

#![no_main]

use libfuzzer_sys::fuzz_target;
use sbx_core::ChunkId;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(id) = ChunkId::parse(input) {
            for level in 0..id.levels() {
                let shard = id.shard(level);
                assert_eq!(shard.len(), 2);
                let name = id.file_name(level, true);
                assert!(name.ends_with(".fsl"));
                assert!(id.as_str().ends_with(id.remainder(level)));
            }
        }
    }
});
