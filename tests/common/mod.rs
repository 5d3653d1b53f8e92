#![allow(dead_code)]

//! Simulated board bus: an I2C register file plus one SPI chip select with a pluggable chip.

use embedded_hal::delay::DelayNs;
use mpu_driver::{DispatchTable, PrimaryBus, ProbeList, SensorVariant, VariantProbe, GYRO_XOUT_H};

pub const XA_OFFS_H: u8 = 0x06;
pub const PRODUCT_ID: u8 = 0x0C;
pub const WHO_AM_I: u8 = 0x75;

pub struct SimBus {
    /// Whether anything answers on I2C
    pub i2c_present: bool,
    pub i2c_regs: [u8; 128],
    /// Chip sitting on SPI, if any
    pub spi_chip: Option<SensorVariant>,
    pub spi_regs: [u8; 128],

    /// Every I2C register read, by start address
    pub i2c_reads: Vec<u8>,
    /// Every SPI register read, by start address
    pub spi_reads: Vec<u8>,
    /// I2C registers that never acknowledge a read
    pub nack_i2c_regs: Vec<u8>,
    /// SPI probes in the order they were tried
    pub probed: Vec<SensorVariant>,
    /// Make every data read fail from now on
    pub nack_reads: bool,

    pub writes: Vec<(u8, u8)>,
    pub verified_writes: Vec<(u8, u8)>,
    pub resets: usize,
}

impl SimBus {
    pub fn empty() -> Self {
        SimBus {
            i2c_present: false,
            i2c_regs: [0; 128],
            spi_chip: None,
            spi_regs: [0; 128],
            i2c_reads: Vec::new(),
            spi_reads: Vec::new(),
            nack_i2c_regs: Vec::new(),
            probed: Vec::new(),
            nack_reads: false,
            writes: Vec::new(),
            verified_writes: Vec::new(),
            resets: 0,
        }
    }

    /// An I2C chip answering `who_am_i`.
    pub fn i2c(who_am_i: u8) -> Self {
        let mut bus = SimBus::empty();
        bus.i2c_present = true;
        bus.i2c_regs[WHO_AM_I as usize] = who_am_i;
        bus
    }

    /// An MPU-6050 whose offset registers encode `code`.
    pub fn mpu6050_with_revision(code: u8) -> Self {
        let mut bus = SimBus::i2c(0x68);
        let offsets = [0x12, code & 1, 0x34, (code >> 1) & 1, 0x56, (code >> 2) & 1];
        bus.i2c_regs[XA_OFFS_H as usize..XA_OFFS_H as usize + 6].copy_from_slice(&offsets);
        bus
    }

    pub fn spi(chip: SensorVariant) -> Self {
        let mut bus = SimBus::empty();
        bus.spi_chip = Some(chip);
        bus
    }

    /// Reads starting at `reg`, on either transport.
    pub fn reads_of(&self, reg: u8) -> usize {
        self.i2c_reads
            .iter()
            .chain(self.spi_reads.iter())
            .filter(|&&r| r == reg)
            .count()
    }

    pub fn set_i2c_regs(&mut self, reg: u8, data: &[u8]) {
        self.i2c_regs[reg as usize..reg as usize + data.len()].copy_from_slice(data);
    }

    pub fn set_spi_regs(&mut self, reg: u8, data: &[u8]) {
        self.spi_regs[reg as usize..reg as usize + data.len()].copy_from_slice(data);
    }

    fn spi_read(&mut self, reg: u8, buf: &mut [u8]) -> bool {
        if self.nack_reads || self.spi_chip.is_none() {
            return false;
        }
        self.spi_reads.push(reg);
        let start = reg as usize;
        buf.copy_from_slice(&self.spi_regs[start..start + buf.len()]);
        true
    }

    fn claim(&mut self, variant: SensorVariant) -> bool {
        self.probed.push(variant);
        self.spi_chip == Some(variant)
    }
}

impl PrimaryBus for SimBus {
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> bool {
        if !self.i2c_present || self.nack_reads || self.nack_i2c_regs.contains(&reg) {
            return false;
        }
        self.i2c_reads.push(reg);
        let start = reg as usize;
        buf.copy_from_slice(&self.i2c_regs[start..start + buf.len()]);
        true
    }

    fn write_register(&mut self, reg: u8, data: u8) -> bool {
        if !self.i2c_present {
            return false;
        }
        self.writes.push((reg, data));
        true
    }
}

fn spi_read(bus: &mut SimBus, reg: u8, buf: &mut [u8]) -> bool {
    bus.spi_read(reg, buf)
}

fn spi_write(bus: &mut SimBus, reg: u8, data: u8) -> bool {
    bus.writes.push((reg, data));
    bus.spi_chip.is_some()
}

fn spi_verified_write(bus: &mut SimBus, reg: u8, data: u8) -> bool {
    bus.verified_writes.push((reg, data));
    bus.spi_chip.is_some()
}

fn spi_reset(bus: &mut SimBus) {
    bus.resets += 1;
}

fn mpu6000_detect(bus: &mut SimBus) -> bool {
    bus.claim(SensorVariant::Mpu60x0Spi)
}

fn mpu6500_detect(bus: &mut SimBus) -> bool {
    bus.claim(SensorVariant::Mpu65xxSpi)
}

fn mpu9250_detect(bus: &mut SimBus) -> bool {
    bus.claim(SensorVariant::Mpu9250Spi)
}

fn icm20689_detect(bus: &mut SimBus) -> bool {
    bus.claim(SensorVariant::Icm20689Spi)
}

const SPI_TABLE: DispatchTable<SimBus> = DispatchTable::new(spi_read, spi_write, GYRO_XOUT_H);

/// The probe set of a board with every SPI driver enabled.
pub fn all_spi_probes() -> ProbeList<SimBus> {
    let mut probes = ProbeList::new();
    probes
        .push(VariantProbe::new(SensorVariant::Mpu60x0Spi, mpu6000_detect, SPI_TABLE))
        .unwrap();
    probes
        .push(VariantProbe::new(SensorVariant::Mpu65xxSpi, mpu6500_detect, SPI_TABLE))
        .unwrap();
    probes
        .push(VariantProbe::new(
            SensorVariant::Mpu9250Spi,
            mpu9250_detect,
            SPI_TABLE
                .with_slow_read(spi_read)
                .with_verified_write(spi_verified_write)
                .with_reset(spi_reset),
        ))
        .unwrap();
    probes
        .push(VariantProbe::new(SensorVariant::Icm20689Spi, icm20689_detect, SPI_TABLE))
        .unwrap();
    probes
}

/// Delay that only adds up how long it was asked to wait.
#[derive(Default)]
pub struct RecordingDelay {
    pub total_ns: u64,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

/// Failure reporter that counts fatal reports.
#[derive(Default)]
pub struct FailureLog {
    pub reports: Vec<mpu_driver::FailureMode>,
}

impl mpu_driver::FailureReporter for FailureLog {
    fn report_fatal(&mut self, reason: mpu_driver::FailureMode) {
        self.reports.push(reason);
    }
}
