#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use succinct::{SuccinctConfig, SuccinctIndexedFile};

#[derive(Debug, Arbitrary)]
struct Input {
    data: Vec<u8>,
    pattern: Vec<u8>,
    sa_rate: u8,
    isa_rate: u8,
    npa_rate: u8,
}

fuzz_target!(|input: Input| {
    // Build, persist, reload and compare every answer against a naive scan
    if input.data.is_empty() || input.data.len() > 4096 || input.pattern.len() > 8 {
        return;
    }
    let config = SuccinctConfig {
        sa_sampling_rate: u32::from(input.sa_rate.max(1)),
        isa_sampling_rate: u32::from(input.isa_rate.max(1)),
        npa_sampling_rate: u32::from(input.npa_rate.max(1)),
        alphabet_size_hint: None,
    };
    let offsets = succinct::utils::line_offsets(&input.data);
    let file = SuccinctIndexedFile::new(&input.data, &offsets, &config).unwrap();
    let file = SuccinctIndexedFile::from_bytes(&file.to_bytes().unwrap()).unwrap();

    assert_eq!(file.extract(0, input.data.len() as u64).unwrap(), input.data);

    let expected: Vec<u64> = if input.pattern.is_empty() {
        (0..input.data.len() as u64).collect()
    } else {
        input
            .data
            .windows(input.pattern.len())
            .enumerate()
            .filter(|(_, w)| *w == input.pattern.as_slice())
            .map(|(i, _)| i as u64)
            .collect()
    };
    assert_eq!(file.search(&input.pattern), expected);
});
