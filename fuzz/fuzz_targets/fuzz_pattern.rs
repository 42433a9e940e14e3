#![no_main]

//! Fuzz target for wildcard name matching

use libfuzzer_sys::fuzz_target;
use named_injector::ServicePattern;

fuzz_target!(|input: (&str, &str)| {
    let (pattern, name) = input;

    let Ok(compiled) = ServicePattern::new(pattern) else {
        return;
    };
    assert_eq!(compiled.as_str(), pattern);

    // Without a wildcard the pattern is a literal suffix
    if compiled.matches(name) && !ServicePattern::is_pattern(pattern) {
        assert!(name.ends_with(pattern));
    }
});
