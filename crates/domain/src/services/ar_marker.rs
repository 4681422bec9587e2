//! AR marker patterns and their raster images.
//!
//! A marker is the SHA-256 of an entity id rendered as an 8x8 grid: cell
//! `(r, c)` reads hex digit `r * 8 + c`, even digits are black, odd digits
//! are white. The grid is framed by a one-cell white quiet zone.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use thiserror::Error;

pub const GRID: usize = 8;
/// Grid cells plus one border cell on each side.
const CELLS_WITH_BORDER: u32 = GRID as u32 + 2;
pub const MIN_IMAGE_SIZE: u32 = 80;
pub const MAX_IMAGE_SIZE: u32 = 2048;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArMarkerError {
    #[error("Marker id must not be negative, got {0}")]
    NegativeId(i64),

    #[error("Pattern must be 64 hex characters")]
    InvalidPattern,

    #[error("Image size must be between {min} and {max} pixels, got {size}")]
    InvalidSize { size: u32, min: u32, max: u32 },

    #[error("Failed to encode marker image: {0}")]
    Encode(String),
}

pub type Grid = [[bool; GRID]; GRID];

pub struct ArMarker;

impl ArMarker {
    /// 64 lowercase hex characters derived from the decimal id.
    pub fn generate(id: i64) -> Result<String, ArMarkerError> {
        if id < 0 {
            return Err(ArMarkerError::NegativeId(id));
        }
        Ok(shared::crypto::sha256_hex(&id.to_string()))
    }

    /// `true` marks a filled (black) cell.
    pub fn grid(pattern: &str) -> Result<Grid, ArMarkerError> {
        let bytes = pattern.as_bytes();
        if bytes.len() != GRID * GRID {
            return Err(ArMarkerError::InvalidPattern);
        }
        let mut grid = [[false; GRID]; GRID];
        for (i, byte) in bytes.iter().enumerate() {
            let digit = (*byte as char)
                .to_digit(16)
                .ok_or(ArMarkerError::InvalidPattern)?;
            grid[i / GRID][i % GRID] = digit % 2 == 0;
        }
        Ok(grid)
    }

    /// Paints the marker. The side length is `size` rounded down to a multiple of 10.
    pub fn generate_image(pattern: &str, size: u32) -> Result<RgbImage, ArMarkerError> {
        if !(MIN_IMAGE_SIZE..=MAX_IMAGE_SIZE).contains(&size) {
            return Err(ArMarkerError::InvalidSize {
                size,
                min: MIN_IMAGE_SIZE,
                max: MAX_IMAGE_SIZE,
            });
        }
        let grid = Self::grid(pattern)?;
        let cell = size / CELLS_WITH_BORDER;
        let side = cell * CELLS_WITH_BORDER;

        Ok(RgbImage::from_fn(side, side, |x, y| {
            let (cx, cy) = (x / cell, y / cell);
            let inside = (1..=GRID as u32).contains(&cx) && (1..=GRID as u32).contains(&cy);
            if inside && grid[(cy - 1) as usize][(cx - 1) as usize] {
                BLACK
            } else {
                WHITE
            }
        }))
    }

    pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ArMarkerError> {
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| ArMarkerError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }

    /// Pattern straight to PNG bytes.
    pub fn render_png(pattern: &str, size: u32) -> Result<Vec<u8>, ArMarkerError> {
        let image = Self::generate_image(pattern, size)?;
        Self::encode_png(&image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: &str = "6b86b273ff34fce19d6b804eff5a3f5747ada4eaa22f1d49c01e52ddb7875b4b";

    #[test]
    fn test_generate_is_sha256_of_decimal_id() {
        assert_eq!(ArMarker::generate(1).unwrap(), ONE);
        assert_eq!(ArMarker::generate(1).unwrap(), ArMarker::generate(1).unwrap());
        assert_ne!(ArMarker::generate(1).unwrap(), ArMarker::generate(2).unwrap());
    }

    #[test]
    fn test_negative_id_rejected() {
        assert_eq!(ArMarker::generate(-1), Err(ArMarkerError::NegativeId(-1)));
    }

    #[test]
    fn test_grid_parity() {
        let grid = ArMarker::grid(ONE).unwrap();
        // "6b86b273": 6 even, b odd, 8 even, 6 even, b odd, 2 even, 7 odd, 3 odd
        assert_eq!(grid[0], [true, false, true, true, false, true, false, false]);
        // last digit 'b' is odd
        assert!(!grid[7][7]);
    }

    #[test]
    fn test_grid_rejects_bad_pattern() {
        assert_eq!(ArMarker::grid("abc"), Err(ArMarkerError::InvalidPattern));
        let bad = "z".repeat(64);
        assert_eq!(ArMarker::grid(&bad), Err(ArMarkerError::InvalidPattern));
    }

    #[test]
    fn test_image_layout() {
        let image = ArMarker::generate_image(ONE, 100).unwrap();
        assert_eq!(image.dimensions(), (100, 100));
        // border is white
        assert_eq!(*image.get_pixel(5, 5), WHITE);
        assert_eq!(*image.get_pixel(95, 50), WHITE);
        // cell (0,0) is '6' -> black, cell (0,1) is 'b' -> white
        assert_eq!(*image.get_pixel(15, 15), BLACK);
        assert_eq!(*image.get_pixel(25, 15), WHITE);
    }

    #[test]
    fn test_image_size_bounds() {
        assert!(matches!(
            ArMarker::generate_image(ONE, 79),
            Err(ArMarkerError::InvalidSize { size: 79, .. })
        ));
        assert!(ArMarker::generate_image(ONE, 2049).is_err());
        assert_eq!(ArMarker::generate_image(ONE, 405).unwrap().width(), 400);
    }

    #[test]
    fn test_encode_png_signature() {
        let png = ArMarker::render_png(ONE, 80).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }
}
