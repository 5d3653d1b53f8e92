// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

use crate::mpu::{SensorVariant, MpuError, MPU_ADDRESS};

use embedded_hal::i2c;

/// Burst register read: `(bus, first register, buffer) -> ack`.
pub type ReadFn<B> = fn(&mut B, u8, &mut [u8]) -> bool;
/// Single register write: `(bus, register, value) -> ack`.
pub type WriteFn<B> = fn(&mut B, u8, u8) -> bool;
/// Chip reset routine.
pub type ResetFn<B> = fn(&mut B);

/// Maximum number of secondary bus probes a [`ProbeList`] can hold.
pub const MAX_VARIANT_PROBES: usize = 8;

/// The operations bound to a detected variant.
///
/// `B` is the board's bus context, handed to every call. The table is a plain set of function
/// pointers: it is selected once during detection and never changes afterwards.
pub struct DispatchTable<B> {
    /// Burst read
    pub read: ReadFn<B>,
    /// Single register write
    pub write: WriteFn<B>,
    /// Low clock rate read for chips whose configuration registers can't be read at full speed
    pub slow_read: Option<ReadFn<B>>,
    /// Write followed by a read back
    pub verified_write: Option<WriteFn<B>>,
    /// Chip reset
    pub reset: Option<ResetFn<B>>,
    /// First register of the 6 byte gyro burst
    pub gyro_read_register: u8,
}

impl<B> Clone for DispatchTable<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for DispatchTable<B> {}

impl<B> core::fmt::Debug for DispatchTable<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("slow_read", &self.slow_read.is_some())
            .field("verified_write", &self.verified_write.is_some())
            .field("reset", &self.reset.is_some())
            .field("gyro_read_register", &self.gyro_read_register)
            .finish()
    }
}

impl<B> DispatchTable<B> {
    /// A table with only the mandatory read and write operations.
    pub const fn new(read: ReadFn<B>, write: WriteFn<B>, gyro_read_register: u8) -> Self {
        DispatchTable {
            read,
            write,
            slow_read: None,
            verified_write: None,
            reset: None,
            gyro_read_register,
        }
    }

    /// Add a slow read operation.
    pub const fn with_slow_read(mut self, slow_read: ReadFn<B>) -> Self {
        self.slow_read = Some(slow_read);
        self
    }

    /// Add a verified write operation.
    pub const fn with_verified_write(mut self, verified_write: WriteFn<B>) -> Self {
        self.verified_write = Some(verified_write);
        self
    }

    /// Add a reset routine.
    pub const fn with_reset(mut self, reset: ResetFn<B>) -> Self {
        self.reset = Some(reset);
        self
    }

    /// Same operations, different gyro burst start register.
    pub const fn with_gyro_register(mut self, gyro_read_register: u8) -> Self {
        self.gyro_read_register = gyro_read_register;
        self
    }
}

impl<B: PrimaryBus> DispatchTable<B> {
    /// The table for a chip found on the primary transport.
    pub fn primary(gyro_read_register: u8) -> Self {
        DispatchTable::new(primary_read::<B>, primary_write::<B>, gyro_read_register)
    }
}

/// Register access over the primary (I2C) transport.
///
/// Every board bus context implements this, even boards without an I2C MPU.
/// Those simply never acknowledge.
pub trait PrimaryBus {
    /// Read `buf.len()` registers starting at `reg`. Returns true if the device acknowledged.
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> bool;

    /// Write `data` to `reg`. Returns true if the device acknowledged.
    fn write_register(&mut self, reg: u8, data: u8) -> bool;
}

fn primary_read<B: PrimaryBus>(bus: &mut B, reg: u8, buf: &mut [u8]) -> bool {
    bus.read_registers(reg, buf)
}

fn primary_write<B: PrimaryBus>(bus: &mut B, reg: u8, data: u8) -> bool {
    bus.write_register(reg, data)
}

/// [`PrimaryBus`] over an `embedded-hal` I2C bus.
pub struct I2cBus<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: i2c::I2c> I2cBus<I2C> {
    /// Wrap `i2c`, talking to the MPU at its default address.
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, MPU_ADDRESS)
    }

    /// Wrap `i2c`, talking to the MPU at the 7-bit address `addr` (0x69 when AD0 is high).
    pub fn with_address(i2c: I2C, addr: u8) -> Self {
        I2cBus { i2c, addr }
    }

    /// The 7-bit address in use.
    pub fn address(&self) -> u8 {
        self.addr
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: i2c::I2c> PrimaryBus for I2cBus<I2C> {
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> bool {
        self.i2c.write_read(self.addr, &[reg], buf).is_ok()
    }

    fn write_register(&mut self, reg: u8, data: u8) -> bool {
        self.i2c.write(self.addr, &[reg, data]).is_ok()
    }
}

/// A chip family reachable over the secondary (SPI) transport.
///
/// `probe` belongs to the chip's SPI driver: it returns true if it claims the device.
/// On a claim, `table` becomes the device's dispatch table and `variant` its detection result.
pub struct VariantProbe<B> {
    /// Variant reported when the probe claims the device
    pub variant: SensorVariant,
    /// Detection routine of the chip driver
    pub probe: fn(&mut B) -> bool,
    /// Operations installed on a claim
    pub table: DispatchTable<B>,
}

impl<B> Clone for VariantProbe<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for VariantProbe<B> {}

impl<B> VariantProbe<B> {
    /// Bundle a chip driver's probe with its operations.
    pub const fn new(variant: SensorVariant, probe: fn(&mut B) -> bool, table: DispatchTable<B>) -> Self {
        VariantProbe { variant, probe, table }
    }
}

/// The secondary bus probes enabled on this board, in priority order.
///
/// Built once at startup; detection walks it front to back and the first claim wins.
pub struct ProbeList<B> {
    probes: heapless::Vec<VariantProbe<B>, MAX_VARIANT_PROBES>,
}

impl<B> ProbeList<B> {
    /// An empty list: only the primary transport is probed.
    pub const fn new() -> Self {
        ProbeList {
            probes: heapless::Vec::new(),
        }
    }

    /// Append `probe` with the lowest priority so far.
    pub fn push(&mut self, probe: VariantProbe<B>) -> Result<(), MpuError> {
        self.probes.push(probe).map_err(|_| MpuError::ProbeListFull)
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, probe: VariantProbe<B>) -> Result<Self, MpuError> {
        self.push(probe)?;
        Ok(self)
    }

    /// Probes in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &VariantProbe<B>> {
        self.probes.iter()
    }

    /// Number of enabled probes.
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// True if no secondary bus probe is enabled.
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

impl<B> Default for ProbeList<B> {
    fn default() -> Self {
        Self::new()
    }
}
