// Stream headers of the FSA5 and CFSA2 formats.

use bytemuck::{Pod, Zeroable};

use crate::FsaError;
use crate::flags::FsaFlags;

/// Every stream starts with these four bytes.
pub const MAGIC: [u8; 4] = *b"\\fsa";

pub const FSA5_VERSION: u8 = 5;
pub const CFSA2_VERSION: u8 = 0xC6;

/// Largest label map a CFSA2 header can carry.
pub const MAX_LABEL_MAP: usize = 7;

/// FSA5 header (8 bytes).
///
/// `hgtl` packs the node data length into the high nibble and the arc
/// address width into the low nibble.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Fsa5Header {
    pub magic: [u8; 4],
    pub version: u8,
    pub filler: u8,
    pub annotation: u8,
    pub hgtl: u8,
}

const _: () = assert!(std::mem::size_of::<Fsa5Header>() == 8);

impl Fsa5Header {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(filler: u8, annotation: u8, node_data_length: usize, gtl: usize) -> Self {
        debug_assert!(node_data_length < 16 && gtl < 16);
        Fsa5Header {
            magic: MAGIC,
            version: FSA5_VERSION,
            filler,
            annotation,
            hgtl: ((node_data_length as u8) << 4) | gtl as u8,
        }
    }

    pub fn node_data_length(&self) -> usize {
        usize::from(self.hgtl >> 4)
    }

    pub fn gtl(&self) -> usize {
        usize::from(self.hgtl & 0x0F)
    }

    pub fn parse(data: &[u8]) -> Result<Self, FsaError> {
        let bytes = data.get(..Self::SIZE).ok_or_else(|| {
            FsaError::corrupt(data.len(), "FSA5 header", "end of stream")
        })?;
        let header: Fsa5Header = bytemuck::pod_read_unaligned(bytes);
        check_magic(&header.magic)?;
        check_version(header.version, FSA5_VERSION)?;
        Ok(header)
    }
}

/// Fixed part of the CFSA2 header (10 bytes).
///
/// The label map (`label_count` bytes) and the root address (vint) follow.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Cfsa2Header {
    pub magic: [u8; 4],
    pub version: u8,
    /// Big-endian [`FsaFlags`] bits.
    pub flags: [u8; 2],
    pub filler: u8,
    pub annotation: u8,
    pub label_count: u8,
}

const _: () = assert!(std::mem::size_of::<Cfsa2Header>() == 10);

impl Cfsa2Header {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(flags: FsaFlags, filler: u8, annotation: u8, label_count: usize) -> Self {
        debug_assert!(label_count <= MAX_LABEL_MAP);
        Cfsa2Header {
            magic: MAGIC,
            version: CFSA2_VERSION,
            flags: flags.bits().to_be_bytes(),
            filler,
            annotation,
            label_count: label_count as u8,
        }
    }

    pub fn parse(data: &[u8]) -> Result<(Self, FsaFlags), FsaError> {
        let bytes = data.get(..Self::SIZE).ok_or_else(|| {
            FsaError::corrupt(data.len(), "CFSA2 header", "end of stream")
        })?;
        let header: Cfsa2Header = bytemuck::pod_read_unaligned(bytes);
        check_magic(&header.magic)?;
        check_version(header.version, CFSA2_VERSION)?;

        let bits = u16::from_be_bytes(header.flags);
        let flags = FsaFlags::from_bits(bits).ok_or_else(|| {
            FsaError::corrupt(5, "known flag bits", format!("{bits:#06x}"))
        })?;
        if usize::from(header.label_count) > MAX_LABEL_MAP {
            return Err(FsaError::corrupt(
                9,
                format!("at most {MAX_LABEL_MAP} mapped labels"),
                header.label_count.to_string(),
            ));
        }
        Ok((header, flags))
    }
}

fn check_magic(magic: &[u8; 4]) -> Result<(), FsaError> {
    if *magic != MAGIC {
        return Err(FsaError::corrupt(
            0,
            format!("magic {:02x?}", MAGIC),
            format!("{:02x?}", magic),
        ));
    }
    Ok(())
}

fn check_version(found: u8, expected: u8) -> Result<(), FsaError> {
    if found != expected {
        return Err(FsaError::corrupt(
            4,
            format!("version {expected:#04x}"),
            format!("{found:#04x}"),
        ));
    }
    Ok(())
}

/// Reads the version byte, checking the magic first.
pub fn peek_version(data: &[u8]) -> Result<u8, FsaError> {
    let magic: &[u8; 4] = data
        .get(..4)
        .and_then(|m| m.try_into().ok())
        .ok_or_else(|| FsaError::corrupt(data.len(), "magic", "end of stream"))?;
    check_magic(magic)?;
    data.get(4)
        .copied()
        .ok_or_else(|| FsaError::corrupt(4, "version byte", "end of stream"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fsa5_header_layout() {
        let header = Fsa5Header::new(b'_', b'+', 2, 3);
        let bytes = bytemuck::bytes_of(&header);
        assert_eq!(bytes, b"\\fsa\x05_+\x23");
        let parsed = Fsa5Header::parse(bytes).unwrap();
        assert_eq!(parsed.node_data_length(), 2);
        assert_eq!(parsed.gtl(), 3);
    }

    #[test]
    fn cfsa2_header_flags_are_big_endian() {
        let flags = FsaFlags::NUMBERS | FsaFlags::NEXTBIT;
        let header = Cfsa2Header::new(flags, b'_', b'+', 3);
        let bytes = bytemuck::bytes_of(&header);
        assert_eq!(&bytes[..5], b"\\fsa\xC6");
        assert_eq!(&bytes[5..7], &[0x01, 0x04]);
        let (parsed, parsed_flags) = Cfsa2Header::parse(bytes).unwrap();
        assert_eq!(parsed_flags, flags);
        assert_eq!(parsed.label_count, 3);
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut bytes = bytemuck::bytes_of(&Fsa5Header::new(0, 0, 0, 1)).to_vec();
        bytes[4] = 6;
        assert!(matches!(
            Fsa5Header::parse(&bytes),
            Err(FsaError::CorruptStream { offset: 4, .. })
        ));
        bytes[0] = b'/';
        assert!(matches!(
            Fsa5Header::parse(&bytes),
            Err(FsaError::CorruptStream { offset: 0, .. })
        ));
        assert!(matches!(
            peek_version(b"\\fs"),
            Err(FsaError::CorruptStream { .. })
        ));
    }

    #[test]
    fn rejects_unknown_flags() {
        let mut bytes = bytemuck::bytes_of(&Cfsa2Header::new(FsaFlags::empty(), 0, 0, 0)).to_vec();
        bytes[5] = 0x80;
        assert!(matches!(
            Cfsa2Header::parse(&bytes),
            Err(FsaError::CorruptStream { offset: 5, .. })
        ));
    }
}
