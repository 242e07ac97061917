//! Stride-aware row copy into tightly packed BGRA

use crate::error::{IrviewError, Result};
use crate::formats::BGRA_BYTES_PER_PIXEL;

/// Copy `height` rows of `width` BGRA pixels from `src` into `dst`
///
/// `pitch` is the byte distance between rows as reported by the buffer
/// lock; a negative pitch means the rows arrive bottom-up and its absolute
/// value is the stride. `dst` must already be `width * height * 4` bytes.
pub fn copy_rows(src: &[u8], pitch: i32, width: u32, height: u32, dst: &mut [u8]) -> Result<()> {
    let row = width as usize * BGRA_BYTES_PER_PIXEL;
    let rows = height as usize;
    let stride = pitch.unsigned_abs() as usize;

    if dst.len() != row * rows {
        return Err(IrviewError::acquisition(format!(
            "destination holds {} bytes, expected {}",
            dst.len(),
            row * rows
        )));
    }
    if rows == 0 || row == 0 {
        return Ok(());
    }
    if stride < row {
        return Err(IrviewError::acquisition(format!(
            "stride {} is narrower than a {}-byte row",
            stride, row
        )));
    }

    let needed = stride * (rows - 1) + row;
    if src.len() < needed {
        return Err(IrviewError::acquisition(format!(
            "sample holds {} bytes, {}x{} at stride {} needs {}",
            src.len(),
            width,
            height,
            stride,
            needed
        )));
    }

    if stride == row {
        dst.copy_from_slice(&src[..row * rows]);
    } else {
        for (y, out) in dst.chunks_exact_mut(row).enumerate() {
            let start = y * stride;
            out.copy_from_slice(&src[start..start + row]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tight_pitch_bulk_copy() {
        let src: Vec<u8> = (0..16).collect();
        let mut dst = vec![0u8; 16];
        copy_rows(&src, 8, 2, 2, &mut dst).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_padded_rows() {
        // 1x2 frame, rows padded to 8 bytes
        let src = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8];
        let mut dst = vec![0u8; 8];
        copy_rows(&src, 8, 1, 2, &mut dst).unwrap();
        assert_eq!(dst, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_negative_pitch_uses_absolute_stride() {
        let src = [1, 2, 3, 4, 9, 9, 5, 6, 7, 8];
        let mut dst = vec![0u8; 8];
        copy_rows(&src, -6, 1, 2, &mut dst).unwrap();
        assert_eq!(dst, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_rejects_short_sample() {
        let mut dst = vec![0u8; 16];
        assert!(copy_rows(&[0u8; 12], 8, 2, 2, &mut dst).is_err());
    }

    #[test]
    fn test_rejects_narrow_stride() {
        let mut dst = vec![0u8; 16];
        assert!(copy_rows(&[0u8; 64], 4, 2, 2, &mut dst).is_err());
    }

    #[test]
    fn test_rejects_wrong_destination() {
        let mut dst = vec![0u8; 4];
        assert!(copy_rows(&[0u8; 16], 8, 2, 2, &mut dst).is_err());
    }
}
