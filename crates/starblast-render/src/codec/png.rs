use std::io::{Cursor, Read};

use png::{ColorType, Transformations};

use crate::error::FormatError;
use crate::resources::{ImageSource, SourceReader};

/// The 8-byte PNG stream signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Pixel layout of a decoded image, in memory order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
    Luminance,
    LuminanceAlpha,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
            PixelFormat::Luminance => 1,
            PixelFormat::LuminanceAlpha => 2,
        }
    }
}

/// A fully decoded image.
///
/// Rows are stored bottom-to-top: `pixels[0..row]` is the *bottom* row of
/// the image as authored. Sixteen-bit channels are narrowed to eight and
/// palettes are expanded during decoding, so `format` is always one of the
/// four direct layouts.
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Expands the pixel data to RGBA, one byte per channel.
    ///
    /// Formats without alpha get an opaque alpha channel; luminance is
    /// replicated across the color channels. Row order is preserved.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let count = self.width as usize * self.height as usize;
        let mut out = Vec::with_capacity(count * 4);
        match self.format {
            PixelFormat::Rgba => return self.pixels.clone(),
            PixelFormat::Rgb => {
                for p in self.pixels.chunks_exact(3) {
                    out.extend_from_slice(&[p[0], p[1], p[2], 0xFF]);
                }
            }
            PixelFormat::Luminance => {
                for &l in &self.pixels {
                    out.extend_from_slice(&[l, l, l, 0xFF]);
                }
            }
            PixelFormat::LuminanceAlpha => {
                for p in self.pixels.chunks_exact(2) {
                    out.extend_from_slice(&[p[0], p[0], p[0], p[1]]);
                }
            }
        }
        out
    }
}

/// Decodes a PNG stream from `source`.
///
/// Opens the source, validates the signature before committing to a full
/// decode, and closes the source on every path, success or failure.
pub fn decode(source: &mut dyn ImageSource) -> Result<DecodedImage, FormatError> {
    source
        .open()
        .map_err(|e| FormatError::Open(e.to_string()))?;
    let result = decode_open(source);
    source.close();
    result
}

fn decode_open(source: &mut dyn ImageSource) -> Result<DecodedImage, FormatError> {
    let mut signature = [0u8; 8];
    read_fully(source, &mut signature)?;
    if signature != PNG_SIGNATURE {
        return Err(FormatError::BadSignature);
    }

    // The signature was consumed by the check; splice it back in front of
    // the remaining stream for the decoder.
    let reader = Cursor::new(signature).chain(SourceReader(source));

    let mut decoder = png::Decoder::new(reader);
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);

    let mut reader = decoder.read_info().map_err(decode_error)?;
    let mut pixels = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut pixels).map_err(decode_error)?;
    pixels.truncate(info.buffer_size());

    if info.width == 0 || info.height == 0 {
        return Err(FormatError::EmptyImage);
    }

    let format = match info.color_type {
        ColorType::Rgb => PixelFormat::Rgb,
        ColorType::Rgba => PixelFormat::Rgba,
        ColorType::Grayscale => PixelFormat::Luminance,
        ColorType::GrayscaleAlpha => PixelFormat::LuminanceAlpha,
        ColorType::Indexed => {
            return Err(FormatError::Unsupported("indexed without palette expansion".into()));
        }
    };

    Ok(DecodedImage {
        width: info.width,
        height: info.height,
        format,
        pixels: flip_rows(&pixels, info.line_size),
    })
}

/// Reverses row order so row 0 is the bottom of the image.
fn flip_rows(pixels: &[u8], row: usize) -> Vec<u8> {
    let mut out = vec![0u8; pixels.len()];
    let height = pixels.len() / row;
    for (i, line) in pixels.chunks_exact(row).enumerate() {
        let dst = (height - 1 - i) * row;
        out[dst..dst + row].copy_from_slice(line);
    }
    out
}

fn read_fully(source: &mut dyn ImageSource, buf: &mut [u8]) -> Result<(), FormatError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source
            .read(&mut buf[filled..])
            .map_err(|e| FormatError::Read(e.to_string()))?;
        if n == 0 {
            return Err(FormatError::Truncated);
        }
        filled += n;
    }
    Ok(())
}

fn decode_error(error: png::DecodingError) -> FormatError {
    match error {
        png::DecodingError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            FormatError::Truncated
        }
        png::DecodingError::IoError(e) => FormatError::Read(e.to_string()),
        other => FormatError::Decode(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::MemorySource;

    struct Png {
        width: u32,
        height: u32,
        color: ColorType,
        depth: png::BitDepth,
        palette: Option<Vec<u8>>,
        trns: Option<Vec<u8>>,
    }

    fn encode(params: Png, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, params.width, params.height);
            encoder.set_color(params.color);
            encoder.set_depth(params.depth);
            if let Some(palette) = params.palette {
                encoder.set_palette(palette);
            }
            if let Some(trns) = params.trns {
                encoder.set_trns(trns);
            }
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn rejects_wrong_signature() {
        let mut src = MemorySource::new("junk", vec![0u8; 32]);
        assert!(matches!(decode(&mut src), Err(FormatError::BadSignature)));
        assert!(!src.is_open());
    }

    #[test]
    fn rejects_stream_shorter_than_signature() {
        let mut src = MemorySource::new("stub", PNG_SIGNATURE[..4].to_vec());
        assert!(matches!(decode(&mut src), Err(FormatError::Truncated)));
    }

    #[test]
    fn rejects_stream_cut_mid_image() {
        let full = encode(
            Png {
                width: 4,
                height: 4,
                color: ColorType::Rgba,
                depth: png::BitDepth::Eight,
                palette: None,
                trns: None,
            },
            &[0x40u8; 64],
        );
        let mut src = MemorySource::new("cut", full[..full.len() / 2].to_vec());
        assert!(matches!(decode(&mut src), Err(FormatError::Truncated)));
        assert!(!src.is_open());
    }

    #[test]
    fn grayscale_rows_come_out_bottom_first() {
        // Top row 10, bottom row 200 as authored.
        let bytes = encode(
            Png {
                width: 1,
                height: 2,
                color: ColorType::Grayscale,
                depth: png::BitDepth::Eight,
                palette: None,
                trns: None,
            },
            &[10, 200],
        );
        let mut src = MemorySource::new("gray", bytes);
        let image = decode(&mut src).unwrap();
        assert_eq!(image.format, PixelFormat::Luminance);
        assert_eq!(image.pixels, vec![200, 10]);
        assert_eq!(
            image.to_rgba8(),
            vec![200, 200, 200, 255, 10, 10, 10, 255]
        );
    }

    #[test]
    fn palette_with_transparency_expands_to_rgba() {
        let bytes = encode(
            Png {
                width: 2,
                height: 2,
                color: ColorType::Indexed,
                depth: png::BitDepth::Eight,
                // Entry 0 opaque red, entry 1 half-transparent green.
                palette: Some(vec![255, 0, 0, 0, 255, 0]),
                trns: Some(vec![255, 128]),
            },
            // Rows as authored: top [red, green], bottom [green, red].
            &[0, 1, 1, 0],
        );
        let mut src = MemorySource::new("indexed", bytes);
        let image = decode(&mut src).unwrap();
        assert_eq!(image.format, PixelFormat::Rgba);
        assert_eq!(
            image.pixels,
            vec![
                0, 255, 0, 128, 255, 0, 0, 255, // bottom row first
                255, 0, 0, 255, 0, 255, 0, 128,
            ]
        );
    }

    #[test]
    fn sixteen_bit_channels_narrow_to_eight() {
        let bytes = encode(
            Png {
                width: 1,
                height: 1,
                color: ColorType::Rgb,
                depth: png::BitDepth::Sixteen,
                palette: None,
                trns: None,
            },
            &[0x12, 0x34, 0xFF, 0x00, 0x00, 0x01],
        );
        let mut src = MemorySource::new("deep", bytes);
        let image = decode(&mut src).unwrap();
        assert_eq!(image.format, PixelFormat::Rgb);
        assert_eq!(image.pixels, vec![0x12, 0xFF, 0x00]);
        assert_eq!(image.to_rgba8(), vec![0x12, 0xFF, 0x00, 0xFF]);
    }

    #[test]
    fn source_closed_after_successful_decode() {
        let bytes = encode(
            Png {
                width: 1,
                height: 1,
                color: ColorType::Grayscale,
                depth: png::BitDepth::Eight,
                palette: None,
                trns: None,
            },
            &[7],
        );
        let mut src = MemorySource::new("one", bytes);
        decode(&mut src).unwrap();
        assert!(!src.is_open());
    }
}
