#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Host-side logic for jrk motor controllers (hardware-agnostic).
//!
//! All device access goes through `jrk_traits::DeviceBackend` and
//! `jrk_traits::DeviceHandle`; all user interaction goes through
//! `view::Presenter`.
//!
//! ## Modules
//!
//! - **current**: current limit codes <-> milliamps, bit-exact with firmware
//! - **pid**: PID gain <-> multiplier/exponent codec
//! - **settings**: derived values (motor asymmetry, PID constants) and `fix`
//! - **direction**: motor direction detection state machine
//! - **controller**: connection lifecycle, dirty tracking, apply
//! - **runner**: timer cadence for `Controller::update`

pub mod controller;
pub mod conversions;
pub mod current;
pub mod direction;
pub mod edit;
pub mod error;
pub mod pid;
pub mod runner;
pub mod settings;
pub mod util;
pub mod view;

pub use controller::{Controller, ControllerConfig};
pub use direction::{DirectionDetector, DirectionOutcome};
pub use edit::{MotorDirection, SettingEdit};
pub use error::{JrkError, Result};
pub use view::{ControllerView, Presenter};
