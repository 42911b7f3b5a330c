#![no_main]

use libfuzzer_sys::fuzz_target;
use splot_di::Container;

// Lines alternate between parameter names and raw values; any mix of
// `%name%` references, including self and mutual references, must resolve
// without panicking or looping.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let container = Container::new();
    let mut names = Vec::new();

    let mut lines = text.lines();
    while let (Some(name), Some(value)) = (lines.next(), lines.next()) {
        container.set_parameter(name, value.to_string());
        names.push(name.to_string());
    }

    for name in &names {
        let resolved = container.get_parameter(name);
        assert!(resolved.is_ok(), "{:?} was just set", name);
    }

    let _ = container.dump_parameters();
});
