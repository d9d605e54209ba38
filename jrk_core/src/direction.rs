//! Motor direction detection.
//!
//! Drives the motor in growing steps away from the center target and watches
//! which way the scaled feedback moves. The device must already be in the
//! probe configuration (serial input, proportional-only PID); the controller
//! takes care of entering and leaving it.

use jrk_traits::DeviceHandle;
use tracing::{debug, info, warn};

use crate::error::{JrkError, map_boxed};

pub const CENTER_PROMPT: &str = "Center the output, then click OK.";

const CENTER: i32 = 2048;
const CENTER_WINDOW: std::ops::RangeInclusive<u16> = 1024..=3071;
const STEP: i32 = 32;
const MAX_TARGET: i32 = 4095;
/// Feedback change that counts as movement.
const MOVE_THRESHOLD: i32 = 100;
/// Give up on centering after this many prompts.
const MAX_CENTER_PROMPTS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionOutcome {
    /// The motor moved; `inverted` is relative to the current invert setting.
    Detected { inverted: bool },
    /// No feedback movement over the whole probe range.
    Inconclusive,
    /// The user declined to center the output.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectState {
    AwaitCenter { prompts: u32 },
    Probing { start: u16, factor: i32, diff: i32 },
    Done(DirectionOutcome),
}

#[derive(Debug)]
pub struct DirectionDetector {
    state: DetectState,
}

impl Default for DirectionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectionDetector {
    pub fn new() -> Self {
        Self {
            state: DetectState::AwaitCenter { prompts: 0 },
        }
    }

    pub fn state(&self) -> DetectState {
        self.state
    }

    fn read_scaled_feedback<H: DeviceHandle>(handle: &mut H) -> Result<u16, JrkError> {
        handle
            .get_variables(false)
            .map(|v| v.scaled_feedback)
            .map_err(|e| map_boxed(&e))
    }

    fn finish<H: DeviceHandle>(
        &mut self,
        handle: &mut H,
        outcome: DirectionOutcome,
    ) -> Result<DetectState, JrkError> {
        handle.stop_motor().map_err(|e| map_boxed(&e))?;
        self.state = DetectState::Done(outcome);
        Ok(self.state)
    }

    /// Performs one device read and advances the state machine.
    pub fn step<H, F>(&mut self, handle: &mut H, confirm: &mut F) -> Result<DetectState, JrkError>
    where
        H: DeviceHandle,
        F: FnMut(&str) -> bool,
    {
        match self.state {
            DetectState::AwaitCenter { prompts } => {
                let feedback = Self::read_scaled_feedback(handle)?;
                if CENTER_WINDOW.contains(&feedback) {
                    let factor = if i32::from(feedback) >= CENTER { -1 } else { 1 };
                    debug!(start = feedback, factor, "direction probe start");
                    self.state = DetectState::Probing {
                        start: feedback,
                        factor,
                        diff: STEP,
                    };
                } else if prompts >= MAX_CENTER_PROMPTS {
                    warn!(feedback, "output never centered");
                    return self.finish(handle, DirectionOutcome::Cancelled);
                } else if confirm(CENTER_PROMPT) {
                    self.state = DetectState::AwaitCenter {
                        prompts: prompts + 1,
                    };
                } else {
                    return self.finish(handle, DirectionOutcome::Cancelled);
                }
            }
            DetectState::Probing {
                start,
                factor,
                diff,
            } => {
                if diff > MAX_TARGET {
                    info!(start, "direction probe saw no movement");
                    return self.finish(handle, DirectionOutcome::Inconclusive);
                }
                let target = (CENTER + diff * factor).clamp(0, MAX_TARGET);
                handle
                    .set_target(u16::try_from(target).unwrap_or_default())
                    .map_err(|e| map_boxed(&e))?;
                let feedback = i32::from(Self::read_scaled_feedback(handle)?);
                let start_i = i32::from(start);
                let moved = if feedback > start_i + MOVE_THRESHOLD {
                    Some(factor == -1)
                } else if feedback < start_i - MOVE_THRESHOLD {
                    Some(factor == 1)
                } else {
                    None
                };
                match moved {
                    Some(inverted) => {
                        info!(target, feedback, inverted, "motor direction detected");
                        return self.finish(handle, DirectionOutcome::Detected { inverted });
                    }
                    None => {
                        self.state = DetectState::Probing {
                            start,
                            factor,
                            diff: diff + STEP,
                        };
                    }
                }
            }
            DetectState::Done(_) => {}
        }
        Ok(self.state)
    }

    /// Steps until done.
    pub fn run<H, F>(&mut self, handle: &mut H, confirm: &mut F) -> Result<DirectionOutcome, JrkError>
    where
        H: DeviceHandle,
        F: FnMut(&str) -> bool,
    {
        loop {
            if let DetectState::Done(outcome) = self.step(handle, confirm)? {
                return Ok(outcome);
            }
        }
    }
}

/// Invert setting after a detection, given the setting the probe ran with.
///
/// A motor that already has invert set responds backwards, so the detected
/// inversion toggles the previous value.
pub fn combine_invert(previous_invert: bool, detected_inverted: bool) -> bool {
    previous_invert != detected_inverted
}
