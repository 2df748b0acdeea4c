//! Monochrome framebuffer.
//!
//! One byte per pixel (0 or 1), row-major, plus a dirty flag that tells a
//! renderer the contents changed since it last looked.

/// Default framebuffer width in pixels.
pub const DEFAULT_WIDTH: usize = 64;

/// Default framebuffer height in pixels.
pub const DEFAULT_HEIGHT: usize = 32;

/// Largest supported framebuffer width in pixels.
pub const MAX_WIDTH: usize = 256;

/// Largest supported framebuffer height in pixels.
pub const MAX_HEIGHT: usize = 256;

/// Outcome of drawing one sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawResult {
    /// A set sprite bit landed on an already-set pixel.
    pub collision: bool,
    /// Number of set sprite bits that fell outside the framebuffer.
    pub clipped: usize,
}

/// The framebuffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    dirty: bool,
}

impl Framebuffer {
    /// Create a cleared framebuffer. It starts dirty so the first frame renders.
    ///
    /// Each dimension is clamped to `1..=MAX_WIDTH` / `1..=MAX_HEIGHT`.
    pub fn new(width: usize, height: usize) -> Self {
        let width = width.clamp(1, MAX_WIDTH);
        let height = height.clamp(1, MAX_HEIGHT);
        Self {
            width,
            height,
            pixels: vec![0; width * height],
            dirty: true,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw pixel data, `width * height` bytes, each 0 or 1.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at (x, y), or `None` outside the framebuffer.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// True if the contents changed since the last [`clear_dirty`](Self::clear_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the contents as observed.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Turn every pixel off.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
        self.dirty = true;
    }

    /// XOR an 8-pixel-wide sprite onto the framebuffer with its top-left
    /// corner at (x, y). Pixels outside the framebuffer are clipped.
    ///
    /// The framebuffer is marked dirty whenever a sprite is drawn, whether
    /// or not any pixel changed.
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u8]) -> DrawResult {
        let mut result = DrawResult::default();

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..8 {
                if bits & (0x80 >> col) == 0 {
                    continue;
                }
                match self.index(x + col, y + row) {
                    Some(i) => {
                        if self.pixels[i] == 1 {
                            result.collision = true;
                        }
                        self.pixels[i] ^= 1;
                    }
                    None => result.clipped += 1,
                }
            }
        }

        self.dirty = true;
        result
    }

    /// Render as text art, `#` for lit pixels, one line per row.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.pixels.chunks(self.width.max(1)) {
            out.extend(row.iter().map(|p| if *p != 0 { '#' } else { ' ' }));
            out.push('\n');
        }
        out
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("lit", &self.pixels.iter().filter(|p| **p != 0).count())
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_clear_and_dirty() {
        let fb = Framebuffer::default();
        assert_eq!(fb.pixels().len(), 64 * 32);
        assert!(fb.pixels().iter().all(|p| *p == 0));
        assert!(fb.is_dirty());
    }

    #[test]
    fn test_new_clamps_dimensions() {
        let fb = Framebuffer::new(usize::MAX, 0);
        assert_eq!((fb.width(), fb.height()), (MAX_WIDTH, 1));
        assert_eq!(fb.pixels().len(), MAX_WIDTH);
    }

    #[test]
    fn test_draw_sprite_sets_pixels() {
        let mut fb = Framebuffer::default();
        fb.clear_dirty();

        let result = fb.draw_sprite(2, 1, &[0b1010_0000]);

        assert!(!result.collision);
        assert_eq!(fb.get(2, 1), Some(1));
        assert_eq!(fb.get(3, 1), Some(0));
        assert_eq!(fb.get(4, 1), Some(1));
        assert!(fb.is_dirty());
    }

    #[test]
    fn test_draw_twice_erases_and_collides() {
        let mut fb = Framebuffer::default();
        let sprite = [0xF0, 0x90, 0xF0];

        assert!(!fb.draw_sprite(10, 5, &sprite).collision);
        assert!(fb.draw_sprite(10, 5, &sprite).collision);
        assert!(fb.pixels().iter().all(|p| *p == 0));
    }

    #[test]
    fn test_empty_sprite_still_marks_dirty() {
        let mut fb = Framebuffer::default();
        fb.clear_dirty();

        fb.draw_sprite(0, 0, &[0x00]);

        assert!(fb.is_dirty());
    }

    #[test]
    fn test_draw_clips_at_right_and_bottom_edges() {
        let mut fb = Framebuffer::default();

        let result = fb.draw_sprite(60, 31, &[0xFF, 0xFF]);

        // 4 visible on the bottom row, 4 off the right, 8 below the bottom
        assert_eq!(result.clipped, 12);
        assert_eq!(fb.pixels().iter().filter(|p| **p != 0).count(), 4);
        assert_eq!(fb.get(63, 31), Some(1));
        // nothing wrapped onto the left edge or the top row
        assert_eq!(fb.get(0, 0), Some(0));
        assert_eq!(fb.get(0, 31), Some(0));
    }

    #[test]
    fn test_draw_fully_outside() {
        let mut fb = Framebuffer::default();
        let result = fb.draw_sprite(200, 100, &[0x81]);
        assert_eq!(result, DrawResult { collision: false, clipped: 2 });
    }

    #[test]
    fn test_clear() {
        let mut fb = Framebuffer::default();
        fb.draw_sprite(0, 0, &[0xFF]);
        fb.clear_dirty();

        fb.clear();

        assert!(fb.pixels().iter().all(|p| *p == 0));
        assert!(fb.is_dirty());
    }

    #[test]
    fn test_to_ascii() {
        let mut fb = Framebuffer::new(4, 2);
        fb.draw_sprite(0, 1, &[0b1001_0000]);
        assert_eq!(fb.to_ascii(), "    \n#  #\n");
    }
}
