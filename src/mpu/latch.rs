// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

use core::cell::Cell;

use critical_section::Mutex;

/// Client routine run from the data-ready interrupt, after the latch is set. Gets the latch that fired.
pub type UpdateFn = fn(&DataReadyLatch);

/// Edge the data-ready line triggers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Low to high
    Rising,
    /// High to low
    Falling,
}

/// EXTI configuration provided by the board.
///
/// The board's interrupt handler for the configured line must call [`DataReadyLatch::on_edge`]
/// (or [`DataReadyLatch::on_edge_timed`]) on the latch the gyro device was built with.
pub trait InterruptController<P> {
    /// Configure `pin` as an input that fires on `edge` with the given NVIC priority, and enable it.
    fn enable_edge(&mut self, pin: &mut P, edge: Edge, priority: u8);
}

/// Monotonic microsecond clock, only used for interrupt timing diagnostics.
pub trait MicrosClock {
    /// Microseconds since an arbitrary epoch, wrapping.
    fn micros(&self) -> u32;
}

/// Timing of the most recent data-ready interrupt.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeTiming {
    /// Microseconds between the last two edges
    pub interval_us: u32,
    /// Microseconds spent in the handler, update callback included
    pub handler_us: u32,
    last_edge_us: Option<u32>,
}

/// Single bit data-ready signal shared between the data-ready interrupt and the polling loop.
///
/// Two states: idle and ready. [`on_edge`](Self::on_edge) moves to ready, [`consume`](Self::consume)
/// moves back to idle and reports whether a new sample arrived. Every access happens inside a
/// critical section, so neither side ever sees a torn update. The interrupt side never blocks.
///
/// Meant to live in a `static`:
///
/// ```
/// use mpu_driver::DataReadyLatch;
///
/// static GYRO_READY: DataReadyLatch = DataReadyLatch::new();
///
/// // in the EXTI handler
/// GYRO_READY.on_edge();
///
/// // in the control loop
/// assert!(GYRO_READY.consume());
/// assert!(!GYRO_READY.consume());
/// ```
pub struct DataReadyLatch {
    ready: Mutex<Cell<bool>>,
    update: Mutex<Cell<Option<UpdateFn>>>,
    timing: Mutex<Cell<EdgeTiming>>,
}

impl DataReadyLatch {
    /// A latch in the idle state with no update callback.
    pub const fn new() -> Self {
        DataReadyLatch {
            ready: Mutex::new(Cell::new(false)),
            update: Mutex::new(Cell::new(None)),
            timing: Mutex::new(Cell::new(EdgeTiming {
                interval_us: 0,
                handler_us: 0,
                last_edge_us: None,
            })),
        }
    }

    /// Data-ready edge. Call from interrupt context only.
    ///
    /// Sets the latch (a no-op if it is already set) and then runs the update callback, if any,
    /// before returning.
    pub fn on_edge(&self) {
        let update = critical_section::with(|cs| {
            self.ready.borrow(cs).set(true);
            self.update.borrow(cs).get()
        });
        if let Some(update) = update {
            update(self);
        }
    }

    /// [`on_edge`](Self::on_edge), also recording the edge interval and handler duration.
    pub fn on_edge_timed<C: MicrosClock>(&self, clock: &C) {
        let now = clock.micros();
        self.on_edge();
        let done = clock.micros();

        critical_section::with(|cs| {
            let timing = self.timing.borrow(cs);
            let last = timing.get();
            timing.set(EdgeTiming {
                interval_us: last.last_edge_us.map_or(0, |t| now.wrapping_sub(t)),
                handler_us: done.wrapping_sub(now),
                last_edge_us: Some(now),
            });
        });
    }

    /// Returns true exactly once per edge, clearing the latch.
    pub fn consume(&self) -> bool {
        critical_section::with(|cs| self.ready.borrow(cs).replace(false))
    }

    /// Look at the latch without clearing it.
    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.ready.borrow(cs).get())
    }

    /// Install, replace or (with `None`) remove the update callback.
    pub fn set_update_callback(&self, update: Option<UpdateFn>) {
        critical_section::with(|cs| self.update.borrow(cs).set(update));
    }

    /// Snapshot of the interrupt timing recorded by [`on_edge_timed`](Self::on_edge_timed).
    pub fn timing(&self) -> EdgeTiming {
        critical_section::with(|cs| self.timing.borrow(cs).get())
    }
}

impl Default for DataReadyLatch {
    fn default() -> Self {
        Self::new()
    }
}
