//! Timer cadence for `Controller::update`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use jrk_traits::{Clock, DeviceBackend};

use crate::controller::Controller;
use crate::view::Presenter;

/// Time left in the current tick, or zero if the tick overran.
#[inline]
fn remaining(interval: Duration, spent: Duration) -> Duration {
    interval.saturating_sub(spent)
}

/// Calls `update()` once per `update_interval_ms` until `ticks` have run
/// (forever when `None`) or `shutdown` is set. Returns the number of ticks
/// run.
///
/// The first tick happens immediately. Time spent inside `update()` counts
/// against the interval so the cadence does not drift.
pub fn run_for<B, P, C>(
    controller: &mut Controller<B, P>,
    clock: &C,
    ticks: Option<u64>,
    shutdown: &AtomicBool,
) -> u64
where
    B: DeviceBackend,
    P: Presenter,
    C: Clock,
{
    run_with(controller, clock, ticks, shutdown, |_, _| {})
}

/// Like `run_for`, calling `on_tick(controller, tick)` after every update.
/// Ticks are numbered from 1.
pub fn run_with<B, P, C, F>(
    controller: &mut Controller<B, P>,
    clock: &C,
    ticks: Option<u64>,
    shutdown: &AtomicBool,
    mut on_tick: F,
) -> u64
where
    B: DeviceBackend,
    P: Presenter,
    C: Clock,
    F: FnMut(&Controller<B, P>, u64),
{
    let interval = Duration::from_millis(controller.config().update_interval_ms.max(1));
    let mut done: u64 = 0;
    tracing::debug!(?interval, ?ticks, "update loop start");
    while ticks.is_none_or(|n| done < n) {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(ticks = done, "update loop stopped");
            break;
        }
        let started = clock.now();
        controller.update();
        done += 1;
        on_tick(controller, done);
        if ticks.is_some_and(|n| done >= n) {
            break;
        }
        let spent = clock.now().saturating_duration_since(started);
        clock.sleep(remaining(interval, spent));
    }
    done
}
