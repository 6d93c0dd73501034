use std::fmt;

/// Tracks which properties of a mirrored object changed since the last push,
/// one bit per property index.
#[derive(Clone, PartialEq, Eq)]
pub struct DiffMask {
    mask: Vec<u8>,
}

impl DiffMask {
    /// Create a new DiffMask able to track `bit_length` properties
    pub fn new(bit_length: u8) -> Self {
        let byte_length = (bit_length as usize).div_ceil(8);
        Self {
            mask: vec![0; byte_length.max(1)],
        }
    }

    pub fn bit(&self, index: u8) -> Option<bool> {
        let byte = self.mask.get((index / 8) as usize)?;
        Some(byte & (1 << (index % 8)) != 0)
    }

    pub fn set_bit(&mut self, index: u8, value: bool) {
        let Some(byte) = self.mask.get_mut((index / 8) as usize) else {
            return;
        };
        let bit = 1 << (index % 8);
        if value {
            *byte |= bit;
        } else {
            *byte &= !bit;
        }
    }

    pub fn clear(&mut self) {
        for byte in self.mask.iter_mut() {
            *byte = 0;
        }
    }

    pub fn is_clear(&self) -> bool {
        self.mask.iter().all(|byte| *byte == 0)
    }

    pub fn or(&mut self, other: &DiffMask) {
        for (byte, other_byte) in self.mask.iter_mut().zip(other.mask.iter()) {
            *byte |= *other_byte;
        }
    }

    /// Indices of every set bit, ascending
    pub fn set_bits(&self) -> impl Iterator<Item = u8> + '_ {
        (0..(self.mask.len() * 8) as u16)
            .map(|index| index as u8)
            .filter(move |index| self.bit(*index) == Some(true))
    }
}

impl fmt::Debug for DiffMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DiffMask(")?;
        for byte in self.mask.iter().rev() {
            write!(f, "{:08b}", byte)?;
        }
        write!(f, ")")
    }
}
