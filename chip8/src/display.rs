//! Monochrome framebuffer.
use std::fmt::{self, Write};

use crate::constants::*;

/// Read-only view of the pixels handed to renderers.
pub type Chip8DisplayBuffer<'a> = &'a [bool; DISPLAY_BUFFER_SIZE];

/// 64x32 grid of pixels, stored row-major.
///
/// A pixel is either on (foreground) or off (background).
/// The only way pixels are turned on is by XOR-ing sprites onto the grid.
pub struct Display {
    buffer: Box<[bool; DISPLAY_BUFFER_SIZE]>,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            buffer: Box::new([false; DISPLAY_BUFFER_SIZE]),
        }
    }
}

impl Display {
    pub fn new() -> Self {
        Default::default()
    }

    /// Turn every pixel off.
    pub fn clear(&mut self) {
        self.buffer.fill(false);
    }

    #[inline(always)]
    pub fn buffer(&self) -> Chip8DisplayBuffer {
        &self.buffer
    }

    /// State of the pixel at the given coordinate.
    ///
    /// Coordinates outside the display are off.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT {
            self.buffer[x + y * DISPLAY_WIDTH]
        } else {
            false
        }
    }

    /// Number of pixels that are on.
    pub fn count_lit(&self) -> usize {
        self.buffer.iter().filter(|px| **px).count()
    }

    /// XOR a sprite onto the display, returning whether any lit pixel was erased.
    ///
    /// The anchor coordinate wraps around the display edges. Rows and columns
    /// of the sprite that then extend past the right or bottom edge are clipped.
    ///
    /// Each byte of the sprite is one row of 8 pixels, most significant bit
    /// on the left.
    pub fn draw_sprite(&mut self, x: u8, y: u8, sprite: impl IntoIterator<Item = u8>) -> bool {
        let x0 = x as usize % DISPLAY_WIDTH;
        let y0 = y as usize % DISPLAY_HEIGHT;
        let mut is_erased = false;

        for (r, row) in sprite.into_iter().enumerate() {
            let py = y0 + r;
            if py >= DISPLAY_HEIGHT {
                break;
            }

            for c in 0..SPRITE_WIDTH {
                let px = x0 + c;
                if px >= DISPLAY_WIDTH {
                    break;
                }

                let d = px + py * DISPLAY_WIDTH;
                let old_px = self.buffer[d];
                let new_px = (row >> (7 - c) & 1) != 0;

                // XOR erases a pixel when both the old and new values are both 1.
                is_erased |= old_px && new_px;

                self.buffer[d] = old_px ^ new_px;
            }
        }

        is_erased
    }

    /// Render the display as text, `#` for lit pixels and `.` for unlit.
    pub fn dump(&self) -> Result<String, fmt::Error> {
        let mut buf = String::with_capacity((DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT);

        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                if self.buffer[x + y * DISPLAY_WIDTH] {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }
}
