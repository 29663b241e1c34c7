//! Terminal geometry derived from the display's pixel size

use portable_pty::PtySize as PortablePtySize;

use super::error::PtyError;

/// Glyph cell size of the display font, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CellSize {
    fn default() -> Self {
        // Standard 8x16 console font
        Self {
            width: 8,
            height: 16,
        }
    }
}

/// Terminal size configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    pub rows: u16,
    pub cols: u16,
    pub pixel_width: u16,
    pub pixel_height: u16,
}

impl Default for PtySize {
    fn default() -> Self {
        Self {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

impl PtySize {
    /// Derive columns and rows from a pixel area and the font cell size.
    ///
    /// Partial cells are dropped. A display that cannot hold a single full
    /// cell in either direction is rejected.
    pub fn from_pixels(width_px: u32, height_px: u32, cell: CellSize) -> Result<Self, PtyError> {
        let too_small = || PtyError::GeometryTooSmall {
            width_px,
            height_px,
            cell_width: cell.width,
            cell_height: cell.height,
        };

        if cell.width == 0 || cell.height == 0 {
            return Err(too_small());
        }

        let cols = width_px / cell.width;
        let rows = height_px / cell.height;
        if cols == 0 || rows == 0 {
            return Err(too_small());
        }

        Ok(Self {
            rows: clamp_u16(rows),
            cols: clamp_u16(cols),
            pixel_width: clamp_u16(width_px),
            pixel_height: clamp_u16(height_px),
        })
    }
}

fn clamp_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

impl From<PtySize> for PortablePtySize {
    fn from(size: PtySize) -> Self {
        PortablePtySize {
            rows: size.rows,
            cols: size.cols,
            pixel_width: size.pixel_width,
            pixel_height: size.pixel_height,
        }
    }
}

impl From<PortablePtySize> for PtySize {
    fn from(size: PortablePtySize) -> Self {
        PtySize {
            rows: size.rows,
            cols: size.cols,
            pixel_width: size.pixel_width,
            pixel_height: size.pixel_height,
        }
    }
}
