//! Human-readable error descriptions and structured JSON error formatting.

use jrk_core::JrkError;

/// Broad class of a failed command; drives exit codes and JSON `reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    NoDevice,
    Timeout,
    AccessDenied,
    Config,
    Device,
    Other,
}

fn classify(err: &eyre::Report) -> Kind {
    if let Some(e) = err.downcast_ref::<JrkError>() {
        return match e {
            JrkError::Disconnected => Kind::NoDevice,
            JrkError::Timeout => Kind::Timeout,
            JrkError::AccessDenied => Kind::AccessDenied,
            JrkError::Config(_) | JrkError::Io(_) => Kind::Config,
            JrkError::Device(_) => Kind::Device,
            JrkError::State(_) => Kind::Other,
        };
    }

    // Controller messages reach us as text.
    let lower = format!("{err:#}").to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        Kind::Timeout
    } else if lower.contains("access denied") || lower.contains("permission") {
        Kind::AccessDenied
    } else if lower.contains("connection to the device was lost")
        || lower.contains("disconnected")
    {
        Kind::NoDevice
    } else if lower.contains("config") || lower.contains("toml") {
        Kind::Config
    } else if lower.contains("device") {
        Kind::Device
    } else {
        Kind::Other
    }
}

const fn reason_name(kind: Kind) -> &'static str {
    match kind {
        Kind::NoDevice => "NoDevice",
        Kind::Timeout => "Timeout",
        Kind::AccessDenied => "AccessDenied",
        Kind::Config => "Config",
        Kind::Device => "Device",
        Kind::Other => "Error",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    let msg = format!("{err:#}");
    match classify(err) {
        Kind::NoDevice => format!(
            "What happened: {msg}\nLikely causes: The jrk is unplugged, or the [simulator] section of the config lists no devices.\nHow to fix: Connect the device (or add [[simulator.devices]] to the config) and check `jrk list`."
        ),
        Kind::Timeout => format!(
            "What happened: The device did not answer in time. ({msg})\nLikely causes: Loose USB cable, the device is resetting, or another program is using it.\nHow to fix: Reconnect the device and retry; run with --log-level=debug for details."
        ),
        Kind::AccessDenied => format!(
            "What happened: The device could not be opened. ({msg})\nLikely causes: Missing USB permissions or the device is open in another program.\nHow to fix: Close other jrk tools or fix the device permissions, then retry."
        ),
        Kind::Config => format!(
            "What happened: Invalid configuration or settings file ({msg}).\nLikely causes: A typo, an unknown mode name, or an out-of-range value.\nHow to fix: Edit the file and try again."
        ),
        Kind::Device => format!(
            "What happened: {msg}\nLikely causes: The device rejected the request or is in an error state.\nHow to fix: Check `jrk status` for halting errors, then retry."
        ),
        Kind::Other => {
            let mut cause = String::new();
            if let Some(src) = err.source() {
                cause = format!(" Cause: {src}");
            }
            format!(
                "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
            )
        }
    }
}

/// Stable exit codes per error class; 2 is left to clap usage errors.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match classify(err) {
        Kind::Other => 1,
        Kind::NoDevice => 3,
        Kind::Timeout => 4,
        Kind::AccessDenied => 5,
        Kind::Config => 6,
        Kind::Device => 7,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(classify(err)),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;
    use rstest::rstest;

    #[rstest]
    #[case(JrkError::Disconnected, 3)]
    #[case(JrkError::Timeout, 4)]
    #[case(JrkError::AccessDenied, 5)]
    #[case(JrkError::Config("bad".into()), 6)]
    #[case(JrkError::Device("nak".into()), 7)]
    #[case(JrkError::State("odd".into()), 1)]
    fn typed_errors_map_to_stable_codes(#[case] e: JrkError, #[case] code: i32) {
        assert_eq!(exit_code_for_error(&eyre::Report::new(e)), code);
    }

    #[test]
    fn wrapped_errors_keep_their_kind() {
        let err = Err::<(), _>(JrkError::Disconnected)
            .wrap_err("No jrk was found.")
            .unwrap_err();
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).starts_with("What happened: No jrk was found."));
    }

    #[test]
    fn controller_messages_are_classified_by_text() {
        let err = eyre::eyre!("There was an error applying settings.  timeout talking to device");
        assert_eq!(exit_code_for_error(&err), 4);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Timeout");
        assert_eq!(v["exit_code"], 4);
    }
}
