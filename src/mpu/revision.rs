// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

use crate::mpu::bits::{ProductId, RevisionCode};
use crate::mpu::bus::DispatchTable;
use crate::mpu::regs::{PRODUCT_ID, XA_OFFS_H};
use crate::mpu::{MpuError, Resolution};

/// Classify the accel resolution of an MPU-60x0.
///
/// The revision is read from the low bits of the accel offset registers. Early silicon leaves those
/// empty, in which case the low nibble of PRODUCT_ID is used instead.
///
/// A read the chip doesn't acknowledge returns [`MpuError::NoAck`] instead of a classification.
pub fn classify<B>(table: &DispatchTable<B>, bus: &mut B) -> Result<Resolution, MpuError> {
    let mut offsets = [0u8; 6];
    if !(table.read)(bus, XA_OFFS_H, &mut offsets) {
        return Err(MpuError::NoAck);
    }

    let code = RevisionCode::from_offsets(&offsets);
    if code.value() != 0 {
        debug!("mpu: accel revision code {=u8}", code.value());
        return from_revision_code(code);
    }

    let mut product_id = [0u8];
    if !(table.read)(bus, PRODUCT_ID, &mut product_id) {
        return Err(MpuError::NoAck);
    }
    let product_id = ProductId(product_id[0]);
    debug!("mpu: product id {=u8:#x}", product_id.0);

    from_product_revision(product_id.revision())
}

fn from_revision_code(code: RevisionCode) -> Result<Resolution, MpuError> {
    match code.value() {
        1 => Ok(Resolution::Half),
        2 | 3 | 7 => Ok(Resolution::Full),
        _ => Err(MpuError::Incompatible),
    }
}

// Only nibble 4 is known to be half resolution; everything else nonzero is treated as full.
fn from_product_revision(revision: u8) -> Result<Resolution, MpuError> {
    match revision {
        0 => Err(MpuError::Incompatible),
        4 => Ok(Resolution::Half),
        _ => Ok(Resolution::Full),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Register file just big enough for the classifier: XA_OFFS_H..+6 and PRODUCT_ID.
    struct Regs {
        offsets: [u8; 6],
        product_id: u8,
        product_id_reads: usize,
    }

    impl Regs {
        fn with_code(code: u8) -> Self {
            Regs {
                offsets: [0, code & 1, 0, (code >> 1) & 1, 0, (code >> 2) & 1],
                product_id: 0,
                product_id_reads: 0,
            }
        }

        fn legacy(product_id: u8) -> Self {
            Regs {
                offsets: [0; 6],
                product_id,
                product_id_reads: 0,
            }
        }
    }

    fn read(regs: &mut Regs, reg: u8, buf: &mut [u8]) -> bool {
        match reg {
            XA_OFFS_H => buf.copy_from_slice(&regs.offsets),
            PRODUCT_ID => {
                regs.product_id_reads += 1;
                buf[0] = regs.product_id;
            }
            _ => return false,
        }
        true
    }

    fn write(_: &mut Regs, _: u8, _: u8) -> bool {
        true
    }

    fn table() -> DispatchTable<Regs> {
        DispatchTable::new(read, write, 0x43)
    }

    #[test]
    fn revision_codes() {
        let expected = [
            (1, Ok(Resolution::Half)),
            (2, Ok(Resolution::Full)),
            (3, Ok(Resolution::Full)),
            (4, Err(MpuError::Incompatible)),
            (5, Err(MpuError::Incompatible)),
            (6, Err(MpuError::Incompatible)),
            (7, Ok(Resolution::Full)),
        ];
        for (code, resolution) in expected {
            let mut regs = Regs::with_code(code);
            assert_eq!(classify(&table(), &mut regs), resolution, "code {}", code);
            assert_eq!(regs.product_id_reads, 0);
        }
    }

    #[test]
    fn product_id_fallback() {
        let mut regs = Regs::legacy(0x54);
        assert_eq!(classify(&table(), &mut regs), Ok(Resolution::Half));
        assert_eq!(regs.product_id_reads, 1);

        let mut regs = Regs::legacy(0x00);
        assert_eq!(classify(&table(), &mut regs), Err(MpuError::Incompatible));

        // undocumented nibbles are accepted as full resolution
        for nibble in [1, 2, 3, 5, 8, 0xF] {
            let mut regs = Regs::legacy(0x50 | nibble);
            assert_eq!(classify(&table(), &mut regs), Ok(Resolution::Full));
        }
    }

    #[test]
    fn unacknowledged_offsets_are_not_classified() {
        fn nack(_: &mut Regs, _: u8, _: &mut [u8]) -> bool {
            false
        }
        let table = DispatchTable::new(nack, write, 0x43);
        let mut regs = Regs::with_code(2);
        assert_eq!(classify(&table, &mut regs), Err(MpuError::NoAck));
    }

    #[test]
    fn unacknowledged_product_id_is_not_classified() {
        fn offsets_only(regs: &mut Regs, reg: u8, buf: &mut [u8]) -> bool {
            reg == XA_OFFS_H && read(regs, reg, buf)
        }
        let table = DispatchTable::new(offsets_only, write, 0x43);
        let mut regs = Regs::legacy(0x54);
        assert_eq!(classify(&table, &mut regs), Err(MpuError::NoAck));
        assert_eq!(regs.product_id_reads, 0);
    }
}
