// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

/// Bitfield views of the revision and product id registers
pub mod bits;

/// The bus module holds the dispatch table, the primary transport and the secondary bus probes
pub mod bus;

/// The detect module holds the probing algorithm that picks exactly one variant at boot
pub mod detect;

/// The device module holds the gyro and accel devices the control loop reads from
pub mod device;

/// The latch module holds the interrupt-safe data-ready latch
pub mod latch;

/// The revision module classifies the silicon revision of the MPU-60x0 family
pub mod revision;

use core::fmt;

/// 7-bit I2C address of the MPU with AD0 tied low.
pub const MPU_ADDRESS: u8 = 0x68;

/// WHO_AM_I contents of the MPU-6500 family, after masking.
pub const MPU6500_WHO_AM_I_CONST: u8 = 0x70;
/// WHO_AM_I contents of the MPU-3050/6000/6050, after masking.
pub const MPUX0X0_WHO_AM_I_CONST: u8 = 0x68;
/// Mask applied to identity bytes before comparing them.
pub const MPU_INQUIRY_MASK: u8 = 0x7E;

/// Time to wait after power up before the first register access. The datasheet specifies 30ms.
pub const MPU_SETTLE_DELAY_MS: u32 = 35;

/// Default priority of the data-ready EXTI line.
pub const NVIC_PRIO_MPU_INT_EXTI: u8 = 0x0F;

/// Register addresses used by this layer. Only the registers common to every variant are listed.
pub(crate) mod regs {
    pub const WHO_AM_I_LEGACY: u8 = 0x00;
    pub const XA_OFFS_H: u8 = 0x06;
    pub const PRODUCT_ID: u8 = 0x0C;
    /// First gyro output register of the MPU-3050.
    pub const MPU3050_GYRO_OUT: u8 = 0x1D;
    /// First accel output register, the same on every variant.
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    /// First gyro output register of every variant except the MPU-3050.
    pub const GYRO_XOUT_H: u8 = 0x43;
    pub const WHO_AM_I: u8 = 0x75;
}

pub use regs::{ACCEL_XOUT_H, GYRO_XOUT_H, MPU3050_GYRO_OUT};

/// Chip family and transport identified at boot.
///
/// Set exactly once by [`GyroDevice::detect`](device::GyroDevice::detect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr, strum::EnumIter)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorVariant {
    /// Nothing detected, or the identity byte was not recognized
    Unknown,
    /// MPU-3050, 3 axis gyro only, I2C
    Mpu3050,
    /// MPU-6000/6050 on I2C
    Mpu60x0,
    /// MPU-6000 on SPI
    Mpu60x0Spi,
    /// MPU-6500 family on I2C
    Mpu65xxI2c,
    /// MPU-6500 family on SPI
    Mpu65xxSpi,
    /// MPU-9250 on SPI (MPU-6500 die plus magnetometer)
    Mpu9250Spi,
    /// ICM-20608 on SPI
    Icm20608Spi,
    /// ICM-20689 on SPI
    Icm20689Spi,
}

impl SensorVariant {
    /// Returns true if the variant sits on the secondary (SPI) transport.
    pub fn is_spi(&self) -> bool {
        matches!(
            self,
            SensorVariant::Mpu60x0Spi
                | SensorVariant::Mpu65xxSpi
                | SensorVariant::Mpu9250Spi
                | SensorVariant::Icm20608Spi
                | SensorVariant::Icm20689Spi
        )
    }

    /// Chip name, for logs and diagnostics.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// Accelerometer resolution class of the MPU-6050.
///
/// Early parts only report half of the accel scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// Half resolution accel readings
    Half,
    /// Full resolution accel readings
    Full,
}

/// What detection found: the variant plus, for the MPU-60x0, its resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DetectionResult {
    /// Detected chip family and transport
    pub sensor: SensorVariant,
    /// Resolution class, `None` unless the chip is an MPU-60x0 on I2C
    pub resolution: Option<Resolution>,
}

impl DetectionResult {
    /// The sentinel result before (or after a failed) detection.
    pub const UNDETECTED: Self = DetectionResult {
        sensor: SensorVariant::Unknown,
        resolution: None,
    };
}

impl Default for DetectionResult {
    fn default() -> Self {
        Self::UNDETECTED
    }
}

/// The possible errors that the driver can return.
///
/// `NoAck` is the only recoverable error: the bus did not answer and the caller picks the retry policy.
/// `Incompatible` is fatal and is also escalated through the [`FailureReporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpuError {
    /// The bus transaction was not acknowledged
    NoAck,
    /// The device was not detected, so there is nothing to read
    NotDetected,
    /// The chip was identified but its revision is not supported
    Incompatible,
    /// No room left in the probe list
    ProbeListFull,
}

impl fmt::Display for MpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MpuError::NoAck => f.write_str("bus transaction not acknowledged"),
            MpuError::NotDetected => f.write_str("no supported MPU detected"),
            MpuError::Incompatible => f.write_str("unsupported MPU revision"),
            MpuError::ProbeListFull => f.write_str("probe list is full"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MpuError {
    fn format(&self, fmt: defmt::Formatter) {
        match *self {
            MpuError::NoAck => defmt::write!(fmt, "Bus not acknowledged!"),
            MpuError::NotDetected => defmt::write!(fmt, "No MPU detected!"),
            MpuError::Incompatible => defmt::write!(fmt, "Incompatible MPU revision!"),
            MpuError::ProbeListFull => defmt::write!(fmt, "Probe list full!"),
        }
    }
}

/// Reasons this layer escalates to the system failure handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailureMode {
    /// The accelerometer revision is not supported
    AccIncompatible,
}

/// System level fatal failure handler.
///
/// Closures taking a [`FailureMode`] implement this trait, so a board can pass its failure routine directly.
pub trait FailureReporter {
    /// Report a fatal hardware failure. The implementation normally halts normal operation.
    fn report_fatal(&mut self, reason: FailureMode);
}

impl<F: FnMut(FailureMode)> FailureReporter for F {
    fn report_fatal(&mut self, reason: FailureMode) {
        self(reason)
    }
}
