#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Whatever loads must serialize and load back to the same value.
    if let Ok(file) = jrk_config::load_settings_toml(data) {
        let text = jrk_config::settings_to_toml(&file).unwrap();
        let again = jrk_config::load_settings_toml(&text).unwrap();
        assert_eq!(file, again);
    }
});
