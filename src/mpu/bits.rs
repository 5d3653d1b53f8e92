use bitfield::bitfield;

bitfield! {
    /// 3-bit accel revision code assembled from the low bits of the XA/YA/ZA_OFFS registers
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct RevisionCode(u8);
    impl Debug;
    /// low bit of XA_OFFS_L (burst offset 1)
    pub xa_bit, set_xa_bit: 0;
    /// low bit of YA_OFFS_L (burst offset 3)
    pub ya_bit, set_ya_bit: 1;
    /// low bit of ZA_OFFS_L (burst offset 5)
    pub za_bit, set_za_bit: 2;
}

bitfield! {
    /// bitfields of PRODUCT_ID register
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct ProductId(u8);
    impl Debug;
    u8;
    /// product family
    pub family, _: 7, 4;
    /// legacy silicon revision, used when the offset registers carry no revision
    pub revision, _: 3, 0;
}

impl RevisionCode {
    /// Build the code from the 6 byte XA_OFFS_H burst.
    pub fn from_offsets(buf: &[u8; 6]) -> Self {
        let mut code = RevisionCode(0);
        code.set_xa_bit(buf[1] & 0x01 != 0);
        code.set_ya_bit(buf[3] & 0x01 != 0);
        code.set_za_bit(buf[5] & 0x01 != 0);
        code
    }

    /// Raw code, 0..=7.
    pub fn value(&self) -> u8 {
        self.0
    }
}
