#![no_main]

use libfuzzer_sys::fuzz_target;
use speclib::codec::{parse_file, FileFormat};
use speclib::profile::{decode_profile, encode_profile};

fuzz_target!(|data: &[u8]| {
    // Every codec must reject malformed input with an error, never a panic
    let _ = parse_file(data, None);
    for format in [
        FileFormat::AsdBinary,
        FileFormat::SpectralEvolution,
        FileFormat::DelimitedTable,
    ] {
        if let Ok(parsed) = parse_file(data, Some(format)) {
            for named in &parsed.profiles {
                let _ = encode_profile(&named.profile);
            }
        }
    }

    // Stored profile cells come from arbitrary tables as well
    if let Ok(profile) = decode_profile(data) {
        let _ = encode_profile(&profile);
    }
});
