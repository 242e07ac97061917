//! Pixel format constants and conversions
//!
//! Centralizes V4L2 fourcc handling so the platform layer and the session
//! agree on what "decoded 32-bit BGRA" means.

/// Build a little-endian fourcc code
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    (code[0] as u32) | ((code[1] as u32) << 8) | ((code[2] as u32) << 16) | ((code[3] as u32) << 24)
}

/// V4L2 fourcc constants
///
/// See: <https://www.kernel.org/doc/html/latest/userspace-api/media/v4l/pixfmt.html>
pub mod codes {
    use super::fourcc;

    /// XBGR32 - B, G, R, X in memory
    pub const XR24: u32 = fourcc(b"XR24");
    /// ABGR32 - B, G, R, A in memory
    pub const AR24: u32 = fourcc(b"AR24");
    /// BGR32 (deprecated alias of the above)
    pub const BGR4: u32 = fourcc(b"BGR4");
    /// YUV 4:2:2 packed, Y0 U Y1 V
    pub const YUYV: u32 = fourcc(b"YUYV");
    /// Motion JPEG
    pub const MJPG: u32 = fourcc(b"MJPG");
    /// H.264 elementary stream
    pub const H264: u32 = fourcc(b"H264");
}

/// Bytes per output pixel; every frame handed to consumers is 32-bit BGRA
pub const BGRA_BYTES_PER_PIXEL: usize = 4;

/// How a device format reaches BGRA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLayout {
    /// Already 32-bit BGRx/BGRA, copied as-is
    Bgra32,
    /// Packed YUYV, converted in software
    Yuyv,
}

impl SourceLayout {
    /// Classify a fourcc, `None` for formats the reader cannot decode
    pub fn from_fourcc(code: u32) -> Option<Self> {
        match code {
            codes::XR24 | codes::AR24 | codes::BGR4 => Some(SourceLayout::Bgra32),
            codes::YUYV => Some(SourceLayout::Yuyv),
            _ => None,
        }
    }

    /// Bytes per source pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            SourceLayout::Bgra32 => 4,
            SourceLayout::Yuyv => 2,
        }
    }
}

/// Whether a fourcc is a compressed bitstream
pub fn is_compressed(code: u32) -> bool {
    matches!(code, codes::MJPG | codes::H264)
}

/// Format name for logs
pub fn format_name(code: u32) -> String {
    let bytes = code.to_le_bytes();
    if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        String::from_utf8_lossy(&bytes).trim_end().to_string()
    } else {
        format!("0x{:08x}", code)
    }
}

/// Convert packed YUYV rows to tightly packed BGRA
///
/// `src_stride` is the byte distance between source rows. Returns `false`
/// when `src` is too short for `height` rows.
pub fn yuyv_to_bgra(
    src: &[u8],
    src_stride: usize,
    width: u32,
    height: u32,
    dst: &mut Vec<u8>,
) -> bool {
    let width = width as usize;
    let height = height as usize;
    let row_bytes = width.div_ceil(2) * 4;
    if src_stride < row_bytes || height == 0 {
        return false;
    }
    let needed = src_stride * (height - 1) + row_bytes;
    if src.len() < needed {
        return false;
    }

    dst.resize(width * height * BGRA_BYTES_PER_PIXEL, 0);
    let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(dst.as_mut_slice());

    for (y, out_row) in pixels.chunks_exact_mut(width).enumerate() {
        let row = &src[y * src_stride..y * src_stride + row_bytes];
        for (x, out) in out_row.iter_mut().enumerate() {
            let pair = &row[(x / 2) * 4..(x / 2) * 4 + 4];
            let luma = if x % 2 == 0 { pair[0] } else { pair[2] };
            *out = yuv_to_bgra(luma, pair[1], pair[3]);
        }
    }
    true
}

/// BT.601 limited-range YUV to BGRA
#[inline]
fn yuv_to_bgra(y: u8, u: u8, v: u8) -> [u8; 4] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    [clamp(b), clamp(g), clamp(r), 255]
}

#[inline]
fn clamp(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
