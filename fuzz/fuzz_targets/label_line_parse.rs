//! Fuzz target for single-line label parsing.
//!
//! Feeds arbitrary UTF-8 lines to the line codec and, for lines that parse,
//! through the rectangle to oriented conversion and formatter.

#![no_main]

use libfuzzer_sys::fuzz_target;
use labelhub::label::codec::fuzz_parse_line;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    fuzz_parse_line(line);
});
