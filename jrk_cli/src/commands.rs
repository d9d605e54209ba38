//! Command dispatch: builds the backend and controller, then runs one command.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::{Result, WrapErr, eyre};
use jrk_config::{Config, SimDevice};
use jrk_core::runner::run_with;
use jrk_core::{Controller, ControllerConfig, ControllerView, DirectionOutcome, JrkError, current, pid};
use jrk_hardware::{SimBackend, SimOp, SimSpec};
use jrk_traits::{Device, MonotonicClock, Settings, protocol};
use serde_json::json;

use crate::cli::{Cli, Commands, PidCmd, SettingsCmd};
use crate::presenter::ConsolePresenter;

type Ctl = Controller<SimBackend, ConsolePresenter>;

/// Comma-separated simulator operations to fail on every unit (test hook).
const SIM_FAULT_ENV: &str = "JRK_TEST_SIM_FAULT";

fn sim_spec(d: &SimDevice) -> SimSpec {
    let mut device = Device::new(d.product, d.serial_number.clone(), d.os_id());
    device.firmware_version = d.firmware_version;
    let mut spec = SimSpec::new(device);
    spec.wiring_inverted = d.wiring_inverted;
    spec.stiction = d.stiction;
    spec.start_feedback = d.start_feedback;
    spec
}

fn parse_sim_op(name: &str) -> Option<SimOp> {
    Some(match name.trim() {
        "open" => SimOp::Open,
        "get_settings" => SimOp::GetSettings,
        "set_settings" => SimOp::SetSettings,
        "get_variables" => SimOp::GetVariables,
        "set_target" => SimOp::SetTarget,
        "stop_motor" => SimOp::StopMotor,
        "reinitialize" => SimOp::Reinitialize,
        "restore_defaults" => SimOp::RestoreDefaults,
        _ => return None,
    })
}

pub fn build_backend(cfg: &Config) -> SimBackend {
    let sim = SimBackend::with_units(cfg.simulator.devices.iter().map(sim_spec));
    if let Ok(faults) = std::env::var(SIM_FAULT_ENV) {
        for op in faults.split(',').filter_map(parse_sim_op) {
            for d in &cfg.simulator.devices {
                sim.set_fault(&d.os_id(), op, true);
            }
        }
    }
    sim
}

/// Fails with the error messages the controller showed, if any.
fn check(c: &mut Ctl) -> Result<()> {
    let errors = c.presenter_mut().take_errors();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(eyre!(errors.join("\n")))
    }
}

/// First tick: list devices and auto-connect, or connect to `--device`.
fn connect(c: &mut Ctl, device: Option<&str>) -> Result<()> {
    c.start();
    c.update();
    if let Some(os_id) = device
        && c.connected_device().is_none_or(|d| d.os_id != os_id)
    {
        c.connect_device_with_os_id(os_id);
    }
    check(c)?;
    if c.connected() {
        return Ok(());
    }
    if let Some(message) = c.connection_error() {
        return Err(eyre!(message.to_string()));
    }
    match c.device_list().len() {
        0 => Err(JrkError::Disconnected).wrap_err("No jrk was found."),
        n => Err(JrkError::State(format!(
            "{n} devices found; choose one with --device <OS_ID>"
        )))
        .wrap_err("No device selected."),
    }
}

fn cancelled(c: &Ctl, json: bool) -> bool {
    let declined = c.presenter().declined() > 0;
    if declined {
        if json {
            println!("{}", json!({ "cancelled": true }));
        } else {
            println!("Cancelled.");
        }
    }
    declined
}

pub fn dispatch(cli: &Cli, cfg: &Config) -> Result<()> {
    match &cli.cmd {
        Commands::CurrentTable { product } => return current_table(*product, cli.json),
        Commands::Pid { action } => return pid_command(action, cli.json),
        _ => {}
    }

    let backend = build_backend(cfg);
    let presenter = ConsolePresenter::new(cli.yes, cli.json);
    let mut c = Controller::new(backend, presenter, ControllerConfig::from(&cfg.controller));
    let device = cli.device.as_deref();
    let json = cli.json;

    match &cli.cmd {
        Commands::List => list(&mut c, json),
        Commands::Status => {
            connect(&mut c, device)?;
            print_status(&c.view(), json);
            Ok(())
        }
        Commands::Watch { ticks, csv } => {
            connect(&mut c, device)?;
            watch(&mut c, *ticks, csv.as_deref(), json)
        }
        Commands::Settings { action } => {
            connect(&mut c, device)?;
            settings_command(&mut c, action, json)
        }
        Commands::Apply => {
            connect(&mut c, device)?;
            c.apply_settings();
            check(&mut c)?;
            if !cancelled(&c, json) {
                done(json, "Settings applied.");
            }
            Ok(())
        }
        Commands::Reload => {
            connect(&mut c, device)?;
            c.reload_settings(false);
            check(&mut c)?;
            done(json, "Settings reloaded from the device.");
            Ok(())
        }
        Commands::RestoreDefaults => {
            connect(&mut c, device)?;
            c.restore_default_settings();
            check(&mut c)?;
            cancelled(&c, json);
            Ok(())
        }
        Commands::DetectDirection { apply } => {
            connect(&mut c, device)?;
            detect_direction(&mut c, *apply, json)
        }
        Commands::Target { target } => {
            connect(&mut c, device)?;
            c.set_target(*target);
            check(&mut c)?;
            done(json, &format!("Target set to {target}."));
            Ok(())
        }
        Commands::Stop => {
            connect(&mut c, device)?;
            c.stop_motor();
            check(&mut c)?;
            done(json, "Motor stopped.");
            Ok(())
        }
        Commands::Run => {
            connect(&mut c, device)?;
            c.run_motor();
            check(&mut c)?;
            done(json, "Motor running.");
            Ok(())
        }
        Commands::CurrentTable { .. } | Commands::Pid { .. } => Ok(()),
    }
}

fn done(json: bool, message: &str) {
    if json {
        println!("{}", json!({ "ok": true, "message": message }));
    } else {
        println!("{message}");
    }
}

fn list(c: &mut Ctl, json: bool) -> Result<()> {
    c.start();
    c.update();
    check(c)?;
    let devices = c.device_list();
    if json {
        let list: Vec<_> = devices
            .iter()
            .map(|d| {
                json!({
                    "os_id": d.os_id,
                    "serial_number": d.serial_number,
                    "product": d.product,
                    "product_name": protocol::product_name(d.product),
                })
            })
            .collect();
        println!("{}", json!({ "devices": list }));
    } else if devices.is_empty() {
        println!("No devices found.");
    } else {
        for d in devices {
            println!(
                "{}\t{}\t{}",
                d.label(),
                protocol::product_name(d.product),
                d.os_id
            );
        }
    }
    Ok(())
}

fn print_status(view: &ControllerView, json: bool) {
    let v = &view.variables;
    let s = &view.settings;
    if json {
        let out = json!({
            "os_id": view.selected_os_id,
            "product": view.product_name,
            "firmware_version": view.firmware_version,
            "variables": {
                "up_time_ms": v.up_time_ms,
                "input": v.input,
                "target": v.target,
                "feedback": v.feedback,
                "scaled_feedback": v.scaled_feedback,
                "duty_cycle": v.duty_cycle,
                "vin_voltage_mv": v.vin_voltage_mv,
                "current_ma": v.measured_current_ma,
                "raw_current_mv64": v.raw_current_mv64,
                "halting_errors": v.halting_errors,
                "device_reset": v.device_reset,
                "update_failed": v.update_failed,
            },
            "settings": {
                "modified": s.modified,
                "motor_asymmetric": s.motor_asymmetric,
                "motor_invert": s.settings.motor_invert,
                "pid_constants": s.pid_constants,
                "max_current_forward_ma": s.max_current_forward_ma,
                "max_current_reverse_ma": s.max_current_reverse_ma,
            },
        });
        println!("{out}");
        return;
    }

    let halting = if v.halting_errors.is_empty() {
        "None".to_string()
    } else {
        v.halting_errors.join(", ")
    };
    let [p, i, d] = s.pid_constants;
    println!(
        "Device:            {} ({})",
        view.product_name,
        view.selected_os_id.as_deref().unwrap_or("Not connected")
    );
    println!("Firmware version:  {}", view.firmware_version);
    println!("Up time:           {} ms", v.up_time_ms);
    println!("Input:             {}", v.input);
    println!("Target:            {}", v.target);
    println!("Feedback:          {} (scaled {})", v.feedback, v.scaled_feedback);
    println!("Duty cycle:        {}", v.duty_cycle);
    println!("VIN voltage:       {} mV", v.vin_voltage_mv);
    println!(
        "Current:           {} mA (raw {} mV*64)",
        v.measured_current_ma, v.raw_current_mv64
    );
    println!("Errors halting:    {halting}");
    println!("Last reset:        {}", v.device_reset);
    println!("Motor invert:      {}", s.settings.motor_invert);
    println!(
        "Motor limits:      {}",
        if s.motor_asymmetric { "asymmetric" } else { "symmetric" }
    );
    println!("PID:               P={p} I={i} D={d}");
    println!(
        "Hard current max:  forward {} mA, reverse {} mA",
        s.max_current_forward_ma, s.max_current_reverse_ma
    );
    if v.update_failed {
        println!("(telemetry update failed; values may be stale)");
    }
}

const CSV_HEADER: [&str; 10] = [
    "tick",
    "up_time_ms",
    "target",
    "feedback",
    "scaled_feedback",
    "duty_cycle",
    "current_ma",
    "vin_voltage_mv",
    "error_flags_halting",
    "update_failed",
];

fn watch(c: &mut Ctl, ticks: Option<u64>, csv_path: Option<&Path>, json: bool) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("failed to install Ctrl-C handler")?;
    }

    let mut writer = csv_path
        .map(csv::Writer::from_path)
        .transpose()
        .wrap_err("failed to create telemetry CSV")?;
    if let Some(w) = writer.as_mut() {
        w.write_record(CSV_HEADER)
            .wrap_err("failed to write telemetry CSV")?;
    }

    let clock = MonotonicClock::new();
    let mut failure: Option<eyre::Report> = None;
    let ran = run_with(c, &clock, ticks, &shutdown, |ctl, tick| {
        if failure.is_some() || !ctl.connected() {
            return;
        }
        let v = ctl.view().variables;
        if json {
            println!(
                "{}",
                json!({
                    "tick": tick,
                    "up_time_ms": v.up_time_ms,
                    "target": v.target,
                    "feedback": v.feedback,
                    "scaled_feedback": v.scaled_feedback,
                    "duty_cycle": v.duty_cycle,
                    "current_ma": v.measured_current_ma,
                    "update_failed": v.update_failed,
                })
            );
        } else {
            println!(
                "{tick:>6}  target {:>4}  feedback {:>4}  duty {:>4}  current {:>5} mA",
                v.target, v.scaled_feedback, v.duty_cycle, v.measured_current_ma
            );
        }
        if let Some(w) = writer.as_mut() {
            let row = [
                tick.to_string(),
                v.up_time_ms.to_string(),
                v.target.to_string(),
                v.feedback.to_string(),
                v.scaled_feedback.to_string(),
                v.duty_cycle.to_string(),
                v.measured_current_ma.to_string(),
                v.vin_voltage_mv.to_string(),
                v.error_flags_halting.to_string(),
                v.update_failed.to_string(),
            ];
            if let Err(e) = w.write_record(&row) {
                failure = Some(e.into());
            }
        }
    });
    tracing::info!(ticks = ran, "watch finished");

    if let Some(e) = failure {
        return Err(e.wrap_err("failed to write telemetry CSV"));
    }
    if let Some(mut w) = writer {
        w.flush().wrap_err("failed to flush telemetry CSV")?;
    }
    check(c)?;
    if let Some(message) = c.connection_error() {
        return Err(eyre!(message.to_string()));
    }
    Ok(())
}

fn settings_command(c: &mut Ctl, action: &SettingsCmd, json: bool) -> Result<()> {
    match action {
        SettingsCmd::Show => {
            let text = jrk_core::conversions::settings_to_string(c.settings())?;
            if json {
                println!("{}", json!({ "settings": text }));
            } else {
                print!("{text}");
            }
        }
        SettingsCmd::Save { file } => {
            c.save_settings_to_file(file);
            check(c)?;
            if !cancelled(c, json) {
                done(json, &format!("Settings saved to {}.", file.display()));
            }
        }
        SettingsCmd::Load { file, apply } => {
            c.open_settings_from_file(file);
            check(c)?;
            if cancelled(c, json) {
                return Ok(());
            }
            if *apply {
                c.apply_settings();
                check(c)?;
                done(json, &format!("Settings loaded from {} and applied.", file.display()));
            } else {
                done(
                    json,
                    &format!(
                        "Settings loaded from {} (not applied; use --apply).",
                        file.display()
                    ),
                );
            }
        }
    }
    Ok(())
}

fn detect_direction(c: &mut Ctl, apply: bool, json: bool) -> Result<()> {
    let outcome = c.detect_motor_direction();
    check(c)?;
    let Some(outcome) = outcome else {
        return Err(JrkError::State("direction detection did not run".into()).into());
    };
    let name = match outcome {
        DirectionOutcome::Detected { inverted: true } => "inverted",
        DirectionOutcome::Detected { inverted: false } => "not_inverted",
        DirectionOutcome::Inconclusive => "inconclusive",
        DirectionOutcome::Cancelled => "cancelled",
    };
    let detected = matches!(outcome, DirectionOutcome::Detected { .. });
    if detected && apply {
        c.apply_settings();
        check(c)?;
    }
    let motor_invert = c.settings().motor_invert;
    if json {
        println!(
            "{}",
            json!({
                "outcome": name,
                "motor_invert": motor_invert,
                "applied": detected && apply,
            })
        );
    } else if outcome == DirectionOutcome::Cancelled {
        println!("Direction detection cancelled.");
    } else if apply {
        println!("Applied motor_invert = {motor_invert}.");
    }
    Ok(())
}

fn current_table(product: u32, json: bool) -> Result<()> {
    let codes = current::recommended_codes(product);
    if codes.is_empty() {
        return Err(JrkError::Config(format!(
            "product {product} ({}) has no current limit table",
            protocol::product_name(product)
        ))
        .into());
    }
    let settings = Settings::defaults_for(product);
    let rows: Vec<(u8, u16)> = codes
        .iter()
        .map(|&code| (code, current::code_to_ma(&settings, u16::from(code))))
        .collect();
    if json {
        let list: Vec<_> = rows
            .iter()
            .map(|(code, ma)| json!({ "code": code, "ma": ma }))
            .collect();
        println!("{}", json!({ "product": product, "codes": list }));
    } else {
        println!("{}", protocol::product_name(product));
        println!("code\tmA");
        for (code, ma) in rows {
            println!("{code}\t{ma}");
        }
    }
    Ok(())
}

fn pid_command(action: &PidCmd, json: bool) -> Result<()> {
    let (multiplier, exponent) = match *action {
        PidCmd::Encode { gain } => pid::constant_to_multiplier_exponent(gain),
        PidCmd::Decode {
            multiplier,
            exponent,
        } => (multiplier, exponent),
    };
    let constant = pid::multiplier_exponent_to_constant(multiplier, exponent);
    if json {
        println!(
            "{}",
            json!({ "multiplier": multiplier, "exponent": exponent, "constant": constant })
        );
    } else {
        println!("multiplier={multiplier} exponent={exponent} constant={constant}");
    }
    Ok(())
}
