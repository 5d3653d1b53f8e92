// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! Device agnostic detection and readout layer for the InvenSense MPU family of IMUs.
//!
//! One [`GyroDevice`](mpu::device::GyroDevice) hides which chip is actually populated on the board.
//! At boot it probes the primary (I2C) transport and then a configurable list of secondary (SPI)
//! probes, identifies the chip family and silicon revision, and binds a dispatch table of plain
//! function pointers. From then on the control loop reads raw gyro and accel samples through that
//! table, optionally gated by the interrupt-driven data-ready latch.
//!
//! Supported families:
//! - MPU-3050 (3 axis gyro, I2C)
//! - MPU-6000/6050 (I2C or SPI), with half/full accel resolution detection
//! - MPU-6500 family (I2C or SPI), MPU-9250 (SPI)
//! - ICM-20608 and ICM-20689 (SPI)
//!
//! The SPI drivers themselves are not part of this crate; each one is plugged in as a
//! [`VariantProbe`](mpu::bus::VariantProbe).
//!
//! The crate is `no_std`. Enable the `defmt` feature for logging, and `rtt` to also link
//! `defmt-rtt` and `panic-probe` into a firmware image.

#![deny(missing_docs)]
#![cfg_attr(not(test), no_std)]

#[cfg(feature = "rtt")]
use defmt_rtt as _; // global logger
#[cfg(feature = "rtt")]
use panic_probe as _;

#[macro_use]
mod fmt;

/// Main module that holds the detection, latch and device sub modules.
/// Also holds the registers, enums and constants shared between them.
pub mod mpu;

pub use mpu::bus::{DispatchTable, I2cBus, PrimaryBus, ProbeList, VariantProbe};
pub use mpu::device::{AccelDevice, GyroDevice, MpuConfig, NoLine};
pub use mpu::latch::{DataReadyLatch, Edge, EdgeTiming, InterruptController, MicrosClock};
pub use mpu::{DetectionResult, FailureMode, FailureReporter, MpuError, Resolution, SensorVariant};
pub use mpu::{ACCEL_XOUT_H, GYRO_XOUT_H, MPU3050_GYRO_OUT};
