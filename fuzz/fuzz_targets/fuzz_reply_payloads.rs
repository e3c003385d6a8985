#![no_main]

use afc_client::core::strings::{parse_info_dictionary, parse_string_list};
use afc_client::protocol::FileInfo;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // String lists and info dictionaries must reject, never panic
    let _ = parse_string_list(data);
    if let Ok(raw) = parse_info_dictionary(data) {
        let _ = FileInfo::from_raw(&raw);
    }
});
