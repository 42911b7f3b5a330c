#![no_main]

use libfuzzer_sys::fuzz_target;
use splot_di::Container;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let container = Container::new();
    if container.load_from_str(text).is_err() {
        return;
    }

    for name in container.definition_names() {
        let _ = container.get(&name);
    }
});
