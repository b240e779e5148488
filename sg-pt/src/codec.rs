//! Unaligned integer access for CDBs and response buffers
//!
//! SCSI uses big endian everywhere, the ATA log pages are little endian.
//! All accessors are bounds checked.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("access of {width} bytes at offset {offset} exceeds buffer length {len}")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },
    #[error("value {value:#x} does not fit into {width} bytes")]
    ValueTooLarge { value: u64, width: usize },
    #[error("unsupported field width {0} (must be 1 to 8 bytes)")]
    InvalidWidth(usize),
}

fn check_width(width: usize) -> Result<(), CodecError> {
    if width == 0 || width > 8 {
        return Err(CodecError::InvalidWidth(width));
    }
    Ok(())
}

fn field(buf: &[u8], offset: usize, width: usize) -> Result<&[u8], CodecError> {
    offset
        .checked_add(width)
        .and_then(|end| buf.get(offset..end))
        .ok_or(CodecError::OutOfBounds {
            offset,
            width,
            len: buf.len(),
        })
}

fn field_mut(buf: &mut [u8], offset: usize, width: usize) -> Result<&mut [u8], CodecError> {
    let len = buf.len();
    offset
        .checked_add(width)
        .and_then(|end| buf.get_mut(offset..end))
        .ok_or(CodecError::OutOfBounds { offset, width, len })
}

/// Read a big endian unsigned integer of `width` (1 to 8) bytes
pub fn get_be(buf: &[u8], offset: usize, width: usize) -> Result<u64, CodecError> {
    check_width(width)?;
    Ok(field(buf, offset, width)?
        .iter()
        .fold(0u64, |value, byte| (value << 8) | *byte as u64))
}

/// Write `value` as big endian unsigned integer of `width` (1 to 8) bytes
pub fn put_be(buf: &mut [u8], offset: usize, width: usize, value: u64) -> Result<(), CodecError> {
    check_width(width)?;
    if width < 8 && (value >> (width * 8)) != 0 {
        return Err(CodecError::ValueTooLarge { value, width });
    }
    let dest = field_mut(buf, offset, width)?;
    let bytes = value.to_be_bytes();
    dest.copy_from_slice(&bytes[8 - width..]);
    Ok(())
}

pub fn get_be16(buf: &[u8], offset: usize) -> Result<u16, CodecError> {
    Ok(get_be(buf, offset, 2)? as u16)
}

pub fn get_be24(buf: &[u8], offset: usize) -> Result<u32, CodecError> {
    Ok(get_be(buf, offset, 3)? as u32)
}

pub fn get_be32(buf: &[u8], offset: usize) -> Result<u32, CodecError> {
    Ok(get_be(buf, offset, 4)? as u32)
}

pub fn get_be48(buf: &[u8], offset: usize) -> Result<u64, CodecError> {
    get_be(buf, offset, 6)
}

pub fn get_be64(buf: &[u8], offset: usize) -> Result<u64, CodecError> {
    get_be(buf, offset, 8)
}

pub fn put_be16(buf: &mut [u8], offset: usize, value: u16) -> Result<(), CodecError> {
    put_be(buf, offset, 2, value as u64)
}

pub fn put_be24(buf: &mut [u8], offset: usize, value: u32) -> Result<(), CodecError> {
    put_be(buf, offset, 3, value as u64)
}

pub fn put_be32(buf: &mut [u8], offset: usize, value: u32) -> Result<(), CodecError> {
    put_be(buf, offset, 4, value as u64)
}

pub fn put_be48(buf: &mut [u8], offset: usize, value: u64) -> Result<(), CodecError> {
    put_be(buf, offset, 6, value)
}

pub fn put_be64(buf: &mut [u8], offset: usize, value: u64) -> Result<(), CodecError> {
    put_be(buf, offset, 8, value)
}

pub fn get_le16(buf: &[u8], offset: usize) -> Result<u16, CodecError> {
    let data = field(buf, offset, 2)?;
    Ok(u16::from_le_bytes([data[0], data[1]]))
}

pub fn get_le32(buf: &[u8], offset: usize) -> Result<u32, CodecError> {
    let data = field(buf, offset, 4)?;
    Ok(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
}

pub fn get_le64(buf: &[u8], offset: usize) -> Result<u64, CodecError> {
    let data = field(buf, offset, 8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(data);
    Ok(u64::from_le_bytes(bytes))
}

pub fn put_le16(buf: &mut [u8], offset: usize, value: u16) -> Result<(), CodecError> {
    field_mut(buf, offset, 2)?.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Byte at `offset`, or an out of bounds error
pub fn get_u8(buf: &[u8], offset: usize) -> Result<u8, CodecError> {
    Ok(field(buf, offset, 1)?[0])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn big_endian_widths() -> Result<(), CodecError> {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
        assert_eq!(get_be16(&data, 0)?, 0x0102);
        assert_eq!(get_be24(&data, 1)?, 0x020304);
        assert_eq!(get_be32(&data, 2)?, 0x03040506);
        assert_eq!(get_be48(&data, 3)?, 0x040506070809);
        assert_eq!(get_be64(&data, 1)?, 0x0203040506070809);
        Ok(())
    }

    #[test]
    fn write_and_read_back() -> Result<(), CodecError> {
        let mut buf = [0u8; 16];
        put_be24(&mut buf, 0, 0x1f_ffff)?;
        put_be48(&mut buf, 3, 0xfedc_ba98_7654)?;
        put_be64(&mut buf, 8, 0x1_0000_0000)?;
        assert_eq!(get_be24(&buf, 0)?, 0x1f_ffff);
        assert_eq!(get_be48(&buf, 3)?, 0xfedc_ba98_7654);
        assert_eq!(&buf[8..16], &[0, 0, 0, 1, 0, 0, 0, 0]);

        put_le16(&mut buf, 0, 0x1234)?;
        assert_eq!(&buf[0..2], &[0x34, 0x12]);
        assert_eq!(get_le16(&buf, 0)?, 0x1234);
        Ok(())
    }

    #[test]
    fn bounds_and_width_checks() {
        let mut buf = [0u8; 4];
        assert_eq!(
            get_be32(&buf, 1),
            Err(CodecError::OutOfBounds {
                offset: 1,
                width: 4,
                len: 4
            })
        );
        assert!(get_be16(&buf, usize::MAX).is_err());
        assert_eq!(
            put_be24(&mut buf, 0, 0x100_0000),
            Err(CodecError::ValueTooLarge {
                value: 0x100_0000,
                width: 3
            })
        );
        assert_eq!(buf, [0u8; 4]);
        assert!(get_u8(&buf, 4).is_err());
    }

    #[test]
    fn unsupported_widths() {
        let data = [0x11u8; 16];
        let mut buf = [0u8; 16];
        for width in [0, 9, 10] {
            assert_eq!(get_be(&data, 0, width), Err(CodecError::InvalidWidth(width)));
            assert_eq!(put_be(&mut buf, 0, width, 1), Err(CodecError::InvalidWidth(width)));
        }
        assert_eq!(buf, [0u8; 16]);
    }
}
