#![no_main]

use libfuzzer_sys::fuzz_target;
use splot_di::{Container, Value};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(options) = serde_yaml::from_str::<Value>(text) else {
        return;
    };

    let container = Container::new();
    if container.register_value("fuzzed", &options).is_ok() {
        assert!(container.has("fuzzed"));
        // no classes are registered, so resolution may only fail cleanly
        let _ = container.get("fuzzed");
    } else {
        assert!(!container.has("fuzzed"));
    }
});
