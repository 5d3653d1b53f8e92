// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

use crate::mpu::bus::{DispatchTable, PrimaryBus, ProbeList};
use crate::mpu::detect;
use crate::mpu::latch::{DataReadyLatch, Edge, InterruptController, UpdateFn};
use crate::mpu::regs::ACCEL_XOUT_H;
use crate::mpu::{
    DetectionResult, FailureMode, FailureReporter, MpuError, Resolution, SensorVariant,
    MPU_SETTLE_DELAY_MS, NVIC_PRIO_MPU_INT_EXTI,
};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin};

/// Board level settings of the MPU layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MpuConfig {
    /// Delay before the first register access, in milliseconds
    pub settle_delay_ms: u32,
    /// NVIC priority of the data-ready interrupt
    pub exti_priority: u8,
    /// Edge the data-ready line fires on
    pub data_ready_edge: Edge,
    /// Refuse to arm the interrupt if the data-ready line is already high
    pub require_idle_line: bool,
}

impl Default for MpuConfig {
    fn default() -> Self {
        MpuConfig {
            settle_delay_ms: MPU_SETTLE_DELAY_MS,
            exti_priority: NVIC_PRIO_MPU_INT_EXTI,
            data_ready_edge: Edge::Rising,
            require_idle_line: false,
        }
    }
}

impl MpuConfig {
    /// Set the power-up settle delay.
    pub fn with_settle_delay_ms(mut self, settle_delay_ms: u32) -> Self {
        self.settle_delay_ms = settle_delay_ms;
        self
    }

    /// Set the data-ready interrupt priority.
    pub fn with_exti_priority(mut self, exti_priority: u8) -> Self {
        self.exti_priority = exti_priority;
        self
    }

    /// Set the data-ready trigger edge.
    pub fn with_data_ready_edge(mut self, data_ready_edge: Edge) -> Self {
        self.data_ready_edge = data_ready_edge;
        self
    }

    /// Only arm the interrupt if the data-ready line reads low.
    pub fn with_require_idle_line(mut self, require_idle_line: bool) -> Self {
        self.require_idle_line = require_idle_line;
        self
    }
}

/// Placeholder for a gyro wired without a data-ready line. Always reads low.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLine;

impl digital::ErrorType for NoLine {
    type Error = core::convert::Infallible;
}

impl InputPin for NoLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

fn decode(data: &[u8; 6]) -> [i16; 3] {
    [
        i16::from_be_bytes([data[0], data[1]]),
        i16::from_be_bytes([data[2], data[3]]),
        i16::from_be_bytes([data[4], data[5]]),
    ]
}

/// The gyro half of the MPU, and the owner of the detection result.
///
/// Created undetected at boot. [`detect`](Self::detect) binds its dispatch table exactly once;
/// until a supported chip is found every bus operation returns [`MpuError::NotDetected`].
///
/// The interrupt side only ever touches `latch`. Everything else belongs to the polling loop.
pub struct GyroDevice<'l, B, P = NoLine> {
    config: MpuConfig,
    dispatch: Option<DispatchTable<B>>,
    detection: DetectionResult,
    detected: bool,
    incompatible: bool,

    int_line: Option<P>,
    armed: bool,
    latch: &'l DataReadyLatch,

    adc_raw: [i16; 3],
}

impl<'l, B> GyroDevice<'l, B, NoLine> {
    /// Create an undetected gyro without a data-ready line.
    pub fn without_line(latch: &'l DataReadyLatch) -> Self {
        GyroDevice::new(latch, None)
    }
}

impl<'l, B, P> GyroDevice<'l, B, P> {
    /// Create an undetected gyro with default settings.
    ///
    /// `latch` is the latch the board's data-ready interrupt handler sets.
    pub fn new(latch: &'l DataReadyLatch, int_line: Option<P>) -> Self {
        Self::with_config(latch, int_line, MpuConfig::default())
    }

    /// Create an undetected gyro.
    pub fn with_config(latch: &'l DataReadyLatch, int_line: Option<P>, config: MpuConfig) -> Self {
        GyroDevice {
            config,
            dispatch: None,
            detection: DetectionResult::UNDETECTED,
            detected: false,
            incompatible: false,
            int_line,
            armed: false,
            latch,
            adc_raw: [0; 3],
        }
    }

    /// Identify the chip and bind its dispatch table.
    ///
    /// Runs the detection once: later calls return the first outcome without touching the bus.
    ///
    /// Returns `Ok(SensorVariant::Unknown)` if no chip was found; whether that is fatal is up to the
    /// caller. An MPU-60x0 with an unsupported revision is reported to `failure` and returns
    /// [`MpuError::Incompatible`]; the device then refuses all further reads.
    ///
    /// [`MpuError::NoAck`] means the chip stopped answering halfway. The device stays undetected and
    /// the call can be retried.
    pub fn detect<D, F>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        probes: &ProbeList<B>,
        failure: &mut F,
    ) -> Result<SensorVariant, MpuError>
    where
        B: PrimaryBus,
        D: DelayNs,
        F: FailureReporter,
    {
        if self.incompatible {
            return Err(MpuError::Incompatible);
        }
        if self.detected {
            return Ok(self.detection.sensor);
        }

        match detect::run(bus, delay, self.config.settle_delay_ms, probes) {
            Ok(detection) => {
                self.detected = true;
                self.dispatch = detection.table;
                self.detection = detection.result;
                info!(
                    "mpu: detected {=str}, resolution {}",
                    self.detection.sensor.name(),
                    self.detection.resolution
                );
                Ok(self.detection.sensor)
            }
            Err(MpuError::Incompatible) => {
                self.detected = true;
                self.detection = DetectionResult {
                    sensor: SensorVariant::Mpu60x0,
                    resolution: None,
                };
                self.incompatible = true;
                error!("mpu: unsupported MPU-60x0 revision");
                failure.report_fatal(FailureMode::AccIncompatible);
                Err(MpuError::Incompatible)
            }
            Err(e) => {
                warn!("mpu: detection interrupted by the bus, {}", e);
                Err(e)
            }
        }
    }

    /// Detected chip family and transport.
    pub fn variant(&self) -> SensorVariant {
        self.detection.sensor
    }

    /// Accel resolution class, only known for an MPU-60x0 on I2C.
    pub fn resolution(&self) -> Option<Resolution> {
        self.detection.resolution
    }

    /// Full detection result.
    pub fn detection(&self) -> DetectionResult {
        self.detection
    }

    /// The bound operations, `None` until a chip was detected.
    pub fn dispatch(&self) -> Option<&DispatchTable<B>> {
        self.dispatch.as_ref()
    }

    /// Latest raw gyro sample, X Y Z.
    pub fn raw(&self) -> [i16; 3] {
        self.adc_raw
    }

    fn readable(&self) -> Result<&DispatchTable<B>, MpuError> {
        if self.incompatible {
            return Err(MpuError::Incompatible);
        }
        if self.detection.sensor == SensorVariant::Unknown {
            return Err(MpuError::NotDetected);
        }
        self.dispatch.as_ref().ok_or(MpuError::NotDetected)
    }

    /// Burst read the gyro output registers into the raw sample.
    ///
    /// On failure the previous sample is kept: treat it as "no new sample".
    pub fn read(&mut self, bus: &mut B) -> Result<(), MpuError> {
        let table = self.readable()?;

        let mut data = [0u8; 6];
        if !(table.read)(bus, table.gyro_read_register, &mut data) {
            return Err(MpuError::NoAck);
        }

        self.adc_raw = decode(&data);
        Ok(())
    }

    /// Read registers at reduced bus speed when the variant supports it, at full speed otherwise.
    pub fn slow_read(&self, bus: &mut B, reg: u8, buf: &mut [u8]) -> Result<(), MpuError> {
        let table = self.readable()?;
        let read = table.slow_read.unwrap_or(table.read);
        if read(bus, reg, buf) {
            Ok(())
        } else {
            Err(MpuError::NoAck)
        }
    }

    /// Write one register.
    pub fn write_register(&self, bus: &mut B, reg: u8, data: u8) -> Result<(), MpuError> {
        let table = self.readable()?;
        if (table.write)(bus, reg, data) {
            Ok(())
        } else {
            Err(MpuError::NoAck)
        }
    }

    /// Write one register and check it took, on variants that need it. Plain write otherwise.
    pub fn write_register_verified(&self, bus: &mut B, reg: u8, data: u8) -> Result<(), MpuError> {
        let table = self.readable()?;
        let write = table.verified_write.unwrap_or(table.write);
        if write(bus, reg, data) {
            Ok(())
        } else {
            Err(MpuError::NoAck)
        }
    }

    /// Run the variant's reset routine. Returns false if the variant has none.
    pub fn reset(&self, bus: &mut B) -> Result<bool, MpuError> {
        let table = self.readable()?;
        match table.reset {
            Some(reset) => {
                reset(bus);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// True once per data-ready edge since the last call.
    ///
    /// Never true if the interrupt isn't armed.
    pub fn consume_data_ready(&self) -> bool {
        self.armed && self.latch.consume()
    }

    /// Install, replace or remove the routine the data-ready interrupt runs after setting the latch.
    pub fn set_update_callback(&self, update: Option<UpdateFn>) {
        self.latch.set_update_callback(update);
    }

    /// True if the data-ready interrupt was armed.
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl<'l, B, P: InputPin> GyroDevice<'l, B, P> {
    /// Enable the data-ready interrupt on the gyro's line.
    ///
    /// Does nothing and returns false if the device has no line, or if `require_idle_line` is set and
    /// the line is already asserted (or can't be read).
    pub fn arm_interrupt<X: InterruptController<P>>(&mut self, exti: &mut X) -> bool {
        if self.armed {
            return true;
        }

        let Some(line) = self.int_line.as_mut() else {
            debug!("mpu: no data-ready line");
            return false;
        };

        if self.config.require_idle_line && !matches!(line.is_high(), Ok(false)) {
            warn!("mpu: data-ready line busy, interrupt not armed");
            return false;
        }

        exti.enable_edge(line, self.config.data_ready_edge, self.config.exti_priority);
        self.armed = true;
        trace!("mpu: data-ready interrupt armed");
        true
    }
}

/// The accel half of the MPU.
///
/// Both sensors are on the same die in every variant, so the accel has no operations of its own: each
/// read goes through the dispatch table of its gyro.
#[derive(Debug, Default)]
pub struct AccelDevice {
    adc_raw: [i16; 3],
}

impl AccelDevice {
    /// Pair with a detected gyro.
    pub fn new<B, P>(gyro: &GyroDevice<'_, B, P>) -> Result<Self, MpuError> {
        gyro.readable()?;
        Ok(AccelDevice { adc_raw: [0; 3] })
    }

    /// Burst read the accel output registers into the raw sample, through `gyro`'s table.
    ///
    /// On failure the previous sample is kept: treat it as "no new sample".
    pub fn read<B, P>(&mut self, gyro: &GyroDevice<'_, B, P>, bus: &mut B) -> Result<(), MpuError> {
        let table = gyro.readable()?;

        let mut data = [0u8; 6];
        if !(table.read)(bus, ACCEL_XOUT_H, &mut data) {
            return Err(MpuError::NoAck);
        }

        self.adc_raw = decode(&data);
        Ok(())
    }

    /// Latest raw accel sample, X Y Z.
    pub fn raw(&self) -> [i16; 3] {
        self.adc_raw
    }
}
