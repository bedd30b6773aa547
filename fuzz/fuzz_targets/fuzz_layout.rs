#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode to an error, never a panic
    if let Ok(file) = succinct::SuccinctIndexedFile::from_bytes(data) {
        let stats = file.stats();
        assert_eq!(stats.record_count, file.record_count());
        for id in 0..file.record_count().min(16) as u32 {
            let _ = file.record_range(id);
            let _ = file.record_bytes(id);
        }

        // Queries over a layout that loaded must stay in bounds
        let _ = file.extract(0, file.core().original_size().min(64));
        let _ = file.core().extract_until(0, b'\n');
        let _ = file.count(b"a");
        let _ = file.search(b"ab");
        let _ = file.record_search_ids(b"\n");
    }
});
