// bitmap.rs — RGBA8 raster surface the stroke is drawn onto.
//
// This is the engine's input type: the drawing collaborator owns and mutates
// one `Bitmap` for the whole session, and the scanner reads a snapshot of it
// on every `scan()` call.
//
// Memory layout (stride = 5, width = 4), one element = one [r, g, b, a] pixel:
//
//   data index:  0  1  2  3 [4]  5  6  7  8 [9] 10 11 12 13 [14]
//   pixel:       ■  ■  ■  ■  ·   ■  ■  ■  ■  ·   ■  ■  ■  ■  ·
//   row:         |--- row 0 ---|  |--- row 1 ---|  |--- row 2 ---|
//
// Padding elements are never read by the scan. The GPU upload compacts rows
// before writing them to the texture, so any stride is accepted.

use std::fmt;

/// One RGBA8 pixel: `[r, g, b, a]`.
pub type Rgba = [u8; 4];

/// Fully transparent pixel. A fresh bitmap is filled with it.
pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// A 2D RGBA8 bitmap with runtime dimensions and an explicit row stride.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// Pixel data in row-major order. Length = height * stride.
    data: Vec<Rgba>,
    width: usize,
    height: usize,
    /// Row stride in *pixels* (not bytes). stride >= width.
    stride: usize,
}

impl Bitmap {
    // --- Constructors ---

    /// Create a fully transparent bitmap. Stride equals width.
    pub fn new(width: usize, height: usize) -> Self {
        Self::new_with_stride(width, height, width)
    }

    /// Create a fully transparent bitmap with an explicit stride.
    ///
    /// # Panics
    /// Panics if `stride < width`.
    pub fn new_with_stride(width: usize, height: usize, stride: usize) -> Self {
        assert!(
            stride >= width,
            "stride ({stride}) must be >= width ({width})"
        );
        Bitmap {
            data: vec![TRANSPARENT; height * stride],
            width,
            height,
            stride,
        }
    }

    /// Create a bitmap from tightly packed RGBA bytes (`width * height * 4`).
    ///
    /// # Panics
    /// Panics if `bytes.len() != width * height * 4`.
    pub fn from_rgba_bytes(width: usize, height: usize, bytes: &[u8]) -> Self {
        assert_eq!(
            bytes.len(),
            width * height * 4,
            "byte length ({}) must equal width * height * 4 ({})",
            bytes.len(),
            width * height * 4,
        );
        let data: Vec<Rgba> = bytemuck::cast_slice(bytes).to_vec();
        Bitmap { data, width, height, stride: width }
    }

    /// Create a bitmap from pixels with an explicit stride.
    ///
    /// # Panics
    /// Panics if `data.len() != height * stride` or `stride < width`.
    pub fn from_pixels_with_stride(
        width: usize,
        height: usize,
        stride: usize,
        data: Vec<Rgba>,
    ) -> Self {
        assert!(stride >= width, "stride ({stride}) must be >= width ({width})");
        assert_eq!(
            data.len(),
            height * stride,
            "data length ({}) must equal height * stride ({})",
            data.len(),
            height * stride,
        );
        Bitmap { data, width, height, stride }
    }

    // --- Accessors ---

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// True when either dimension is zero. Empty bitmaps cannot be scanned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Get the pixel at (x, y). x is column, y is row.
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Rgba {
        self.bounds_check(x, y);
        self.data[y * self.stride + x]
    }

    /// Alpha channel of the pixel at (x, y).
    #[inline]
    pub fn alpha(&self, x: usize, y: usize) -> u8 {
        self.get(x, y)[3]
    }

    /// A pixel counts as drawn when its alpha is nonzero.
    #[inline]
    pub fn is_drawn(&self, x: usize, y: usize) -> bool {
        self.alpha(x, y) > 0
    }

    /// Set the pixel at (x, y).
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: Rgba) {
        self.bounds_check(x, y);
        let idx = y * self.stride + x;
        self.data[idx] = value;
    }

    /// Set the pixel at signed coordinates, silently skipping anything
    /// outside the bitmap. Used by the pen and the overlay painter.
    #[inline]
    pub fn set_clipped(&mut self, x: i64, y: i64, value: Rgba) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            self.data[y * self.stride + x] = value;
        }
    }

    /// Reset every pixel (padding included) to transparent.
    pub fn clear(&mut self) {
        self.data.fill(TRANSPARENT);
    }

    /// Borrow a single row, without stride padding.
    #[inline]
    pub fn row(&self, y: usize) -> &[Rgba] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    /// Borrow a single row as raw bytes (`width * 4` long).
    #[inline]
    pub fn row_bytes(&self, y: usize) -> &[u8] {
        bytemuck::cast_slice(self.row(y))
    }

    /// Copy the pixels into a tightly packed byte vector (stride == width).
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height * 4);
        for y in 0..self.height {
            out.extend_from_slice(self.row_bytes(y));
        }
        out
    }

    /// Iterate over all pixels as `(x, y, value)` tuples, skipping padding.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, Rgba)> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).map(move |x| (x, y, self.data[y * self.stride + x]))
        })
    }

    /// Underlying data, padding included.
    pub fn as_slice(&self) -> &[Rgba] {
        &self.data
    }

    // --- Internal helpers ---

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for bitmap {}×{}",
            self.width,
            self.height,
        );
    }
}

// Small bitmaps print as an alpha mask ('#' drawn, '.' empty).
impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Bitmap {{ {}×{}, stride={} }}",
            self.width, self.height, self.stride,
        )?;
        for y in 0..self.height.min(16) {
            write!(f, "  ")?;
            for x in 0..self.width.min(32) {
                write!(f, "{}", if self.is_drawn(x, y) { '#' } else { '.' })?;
            }
            if self.width > 32 {
                write!(f, " ...")?;
            }
            writeln!(f)?;
        }
        if self.height > 16 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// `image` crate interop
// ---------------------------------------------------------------------------

impl From<&image::RgbaImage> for Bitmap {
    fn from(img: &image::RgbaImage) -> Self {
        Bitmap::from_rgba_bytes(img.width() as usize, img.height() as usize, img.as_raw())
    }
}

impl From<&Bitmap> for image::RgbaImage {
    fn from(bmp: &Bitmap) -> Self {
        // Length always matches width * height * 4, so the constructor
        // cannot return None.
        image::RgbaImage::from_raw(bmp.width as u32, bmp.height as u32, bmp.to_rgba_bytes())
            .unwrap_or_else(|| image::RgbaImage::new(bmp.width as u32, bmp.height as u32))
    }
}
