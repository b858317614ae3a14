#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: prefix-based number parsing.
//
// Catches bugs in:
// - Slicing past the end on dangling '.', 'e' or sign characters
// - Negative values slipping through the guard
// - Multi-byte whitespace handling in the leading trim
fuzz_target!(|text: &str| {
    if let Some(value) = bytetok_reader::number::parse_ufloat(text) {
        assert!(value >= 0.0 && value.is_sign_positive());
    }
    let _ = bytetok_reader::number::parse_uint(text);
});
