// ==============================================================================
// frame_loop.rs — DISPLAY-FRAME RUN LOOP
// ------------------------------------------------------------------------------
// One Simulation::frame per tick of a tokio interval. The loop owns nothing;
// it borrows the simulation, the input source and the backend for as long as
// it runs. Stops at the first tick that finds the cancel flag raised.
// ==============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::info;

use crate::input::InputSource;
use crate::render::RenderBackend;
use crate::state::Simulation;

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Returns the number of frames run.
pub async fn run(
    sim: &mut Simulation,
    source: &mut InputSource,
    backend: &mut dyn RenderBackend,
    cancel: &CancelFlag,
    frame_interval: Duration,
) -> u64 {
    let mut ticker = interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last = Instant::now();
    let mut frames = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        ticker.tick().await;

        let now = Instant::now();
        let real_delta = now.duration_since(last).as_secs_f32();
        last = now;

        let events = source.drain();
        sim.frame(&events, real_delta, backend);
        frames += 1;
    }

    info!("run loop stopped after {} frames (sim frame {})", frames, sim.frame_count());
    frames
}
