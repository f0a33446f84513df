//! Loop drivers
//!
//! Two independent periodic activities share the main thread: a render task
//! that fires once per host frame and a fixed-rate network task fed by a time
//! accumulator. Each has its own handle and can be cancelled on its own.

use crate::consts::MAX_FRAME_DT;

/// Handle to a scheduled loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u32);

/// Fires once per frame until cancelled
#[derive(Debug)]
pub struct FrameTask {
    handle: TaskHandle,
    cancelled: bool,
}

impl FrameTask {
    pub fn new(handle: TaskHandle) -> Self {
        Self {
            handle,
            cancelled: false,
        }
    }

    pub fn fires(&self) -> bool {
        !self.cancelled
    }
}

/// Fixed-rate task driven by frame deltas
#[derive(Debug)]
pub struct FixedRateTask {
    handle: TaskHandle,
    period: f32,
    accumulator: f32,
    max_catchup: u32,
    cancelled: bool,
}

impl FixedRateTask {
    pub fn new(handle: TaskHandle, hz: f32, max_catchup: u32) -> Self {
        Self {
            handle,
            period: 1.0 / hz.max(1.0),
            accumulator: 0.0,
            max_catchup: max_catchup.max(1),
            cancelled: false,
        }
    }

    pub fn period(&self) -> f32 {
        self.period
    }

    /// Number of ticks due after `dt` seconds
    pub fn advance(&mut self, dt: f32) -> u32 {
        if self.cancelled {
            return 0;
        }
        // Clamp long stalls (tab hidden, debugger) before accumulating
        self.accumulator += dt.clamp(0.0, MAX_FRAME_DT);

        let mut due = 0;
        while self.accumulator >= self.period && due < self.max_catchup {
            self.accumulator -= self.period;
            due += 1;
        }
        due
    }
}

/// Work due this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramePlan {
    pub render: bool,
    pub network_ticks: u32,
}

/// The render loop and the network loop of one session
#[derive(Debug)]
pub struct Loops {
    render: FrameTask,
    network: FixedRateTask,
}

impl Loops {
    pub fn start(network_hz: f32, max_catchup: u32) -> Self {
        Self {
            render: FrameTask::new(TaskHandle(1)),
            network: FixedRateTask::new(TaskHandle(2), network_hz, max_catchup),
        }
    }

    pub fn render_handle(&self) -> TaskHandle {
        self.render.handle
    }

    pub fn network_handle(&self) -> TaskHandle {
        self.network.handle
    }

    /// Cancel one loop. Returns false if the handle was unknown or already cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let flag = if handle == self.render.handle {
            &mut self.render.cancelled
        } else if handle == self.network.handle {
            &mut self.network.cancelled
        } else {
            return false;
        };
        !std::mem::replace(flag, true)
    }

    pub fn cancel_all(&mut self) {
        self.cancel(self.render.handle);
        self.cancel(self.network.handle);
    }

    pub fn is_running(&self, handle: TaskHandle) -> bool {
        if handle == self.render.handle {
            self.render.fires()
        } else if handle == self.network.handle {
            !self.network.cancelled
        } else {
            false
        }
    }

    pub fn any_running(&self) -> bool {
        self.render.fires() || !self.network.cancelled
    }

    pub fn plan(&mut self, dt: f32) -> FramePlan {
        FramePlan {
            render: self.render.fires(),
            network_ticks: self.network.advance(dt),
        }
    }
}
