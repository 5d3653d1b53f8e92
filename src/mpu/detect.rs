// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

use crate::mpu::bus::{DispatchTable, PrimaryBus, ProbeList};
use crate::mpu::regs::{GYRO_XOUT_H, MPU3050_GYRO_OUT, WHO_AM_I, WHO_AM_I_LEGACY};
use crate::mpu::revision;
use crate::mpu::{
    DetectionResult, MpuError, SensorVariant, MPU6500_WHO_AM_I_CONST, MPUX0X0_WHO_AM_I_CONST,
    MPU_INQUIRY_MASK,
};

use embedded_hal::delay::DelayNs;

/// Outcome of a detection run: the bound operations and what they talk to.
///
/// `table` is `None` only when nothing answered on either transport.
pub struct Detection<B> {
    /// Operations of the detected variant
    pub table: Option<DispatchTable<B>>,
    /// Variant and resolution
    pub result: DetectionResult,
}

impl<B> Detection<B> {
    fn undetected() -> Self {
        Detection {
            table: None,
            result: DetectionResult::UNDETECTED,
        }
    }

    fn found(table: DispatchTable<B>, result: DetectionResult) -> Self {
        Detection {
            table: Some(table),
            result,
        }
    }
}

/// Probe the transports and identify the chip.
///
/// Blocks for `settle_delay_ms` first. Then the primary transport is asked for WHO_AM_I. If it
/// doesn't answer, the secondary bus probes are tried in list order and the first claim wins. If it
/// does answer, the MPU-3050, MPU-60x0 and MPU-65xx are told apart by their identity registers, and
/// the MPU-60x0 revision is classified.
///
/// Every branch is decided by a different predicate, so at most one variant can win.
///
/// Only an unsupported MPU-60x0 revision is an error. A board with no chip, or with an unrecognized
/// one, gets [`SensorVariant::Unknown`].
pub fn run<B, D>(
    bus: &mut B,
    delay: &mut D,
    settle_delay_ms: u32,
    probes: &ProbeList<B>,
) -> Result<Detection<B>, MpuError>
where
    B: PrimaryBus,
    D: DelayNs,
{
    delay.delay_ms(settle_delay_ms);

    let mut sig = [0u8];
    if !bus.read_registers(WHO_AM_I, &mut sig) {
        debug!("mpu: no answer on I2C, trying {=usize} SPI probe(s)", probes.len());
        return Ok(detect_secondary(bus, probes));
    }
    debug!("mpu: WHO_AM_I {=u8:#x}", sig[0]);

    let table = DispatchTable::<B>::primary(GYRO_XOUT_H);

    // The MPU-3050 keeps its identity in register 0.
    let mut inquiry = [0u8];
    if bus.read_registers(WHO_AM_I_LEGACY, &mut inquiry)
        && inquiry[0] & MPU_INQUIRY_MASK == MPUX0X0_WHO_AM_I_CONST
    {
        return Ok(Detection::found(
            table.with_gyro_register(MPU3050_GYRO_OUT),
            DetectionResult {
                sensor: SensorVariant::Mpu3050,
                resolution: None,
            },
        ));
    }

    let result = match sig[0] & MPU_INQUIRY_MASK {
        MPUX0X0_WHO_AM_I_CONST => DetectionResult {
            sensor: SensorVariant::Mpu60x0,
            resolution: Some(revision::classify(&table, bus)?),
        },
        MPU6500_WHO_AM_I_CONST => DetectionResult {
            sensor: SensorVariant::Mpu65xxI2c,
            resolution: None,
        },
        _ => {
            warn!("mpu: unrecognized WHO_AM_I {=u8:#x}", sig[0]);
            DetectionResult::UNDETECTED
        }
    };

    Ok(Detection::found(table, result))
}

fn detect_secondary<B>(bus: &mut B, probes: &ProbeList<B>) -> Detection<B> {
    for probe in probes.iter() {
        if (probe.probe)(bus) {
            return Detection::found(
                probe.table,
                DetectionResult {
                    sensor: probe.variant,
                    resolution: None,
                },
            );
        }
        trace!("mpu: {=str} probe declined", probe.variant.name());
    }

    Detection::undetected()
}
