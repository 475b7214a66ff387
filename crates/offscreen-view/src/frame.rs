//! Pixel surfaces exchanged between the UI thread and the consumer.

use bytemuck::{Pod, Zeroable};

/// RGBA pixel, 8 bits per channel.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct RgbaPixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RgbaPixel {
    pub const WHITE: RgbaPixel = RgbaPixel::new(255, 255, 255, 255);
    pub const BLACK: RgbaPixel = RgbaPixel::new(0, 0, 0, 255);
    pub const TRANSPARENT: RgbaPixel = RgbaPixel::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl From<[u8; 4]> for RgbaPixel {
    fn from(rgba: [u8; 4]) -> Self {
        Self::new(rgba[0], rgba[1], rgba[2], rgba[3])
    }
}

/// A drawable RGBA8 surface.
///
/// The backing allocation may be larger than the content area (see
/// [`Surface::allocation`]); rows are `stride()` bytes apart.
#[derive(Debug, Clone)]
pub struct Surface {
    data: Vec<u8>,
    width: u32,
    height: u32,
    alloc_width: u32,
    alloc_height: u32,
}

impl Surface {
    /// Create a surface whose allocation matches its content size.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_allocation(width, height, width, height)
    }

    /// Create a surface with an allocation of at least `alloc_width`x`alloc_height`.
    pub fn with_allocation(width: u32, height: u32, alloc_width: u32, alloc_height: u32) -> Self {
        let alloc_width = alloc_width.max(width);
        let alloc_height = alloc_height.max(height);
        Self {
            data: vec![0u8; (alloc_width as usize) * (alloc_height as usize) * 4],
            width,
            height,
            alloc_width,
            alloc_height,
        }
    }

    /// Reuse this surface's buffer for a new size. Pixel contents are unspecified afterwards.
    pub(crate) fn reshape(&mut self, width: u32, height: u32, alloc_width: u32, alloc_height: u32) {
        self.alloc_width = alloc_width.max(width);
        self.alloc_height = alloc_height.max(height);
        self.width = width;
        self.height = height;
        let len = (self.alloc_width as usize) * (self.alloc_height as usize) * 4;
        self.data.resize(len, 0);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Size of the backing allocation in pixels.
    pub fn allocation(&self) -> (u32, u32) {
        (self.alloc_width, self.alloc_height)
    }

    /// Bytes per row.
    pub fn stride(&self) -> u32 {
        self.alloc_width * 4
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw bytes of the whole allocation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Content pixels of row `y`.
    pub fn row(&self, y: u32) -> &[RgbaPixel] {
        let start = (y * self.alloc_width) as usize;
        let pixels: &[RgbaPixel] = bytemuck::cast_slice(&self.data);
        &pixels[start..start + self.width as usize]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [RgbaPixel] {
        let start = (y * self.alloc_width) as usize;
        let width = self.width as usize;
        let pixels: &mut [RgbaPixel] = bytemuck::cast_slice_mut(&mut self.data);
        &mut pixels[start..start + width]
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<RgbaPixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.row(y)[x as usize])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: RgbaPixel) {
        if x < self.width && y < self.height {
            self.row_mut(y)[x as usize] = color;
        }
    }

    /// Fill the whole content area.
    pub fn fill(&mut self, color: RgbaPixel) {
        for y in 0..self.height {
            self.row_mut(y).fill(color);
        }
    }

    /// Fill a rectangle, clipped to the content area.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: RgbaPixel) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        if x >= x_end {
            return;
        }
        for row in y..y_end {
            self.row_mut(row)[x as usize..x_end as usize].fill(color);
        }
    }

    /// Copy content rows tightly packed (`width * 4` bytes per row) into `dst`.
    ///
    /// Returns `false` if `dst` is too small.
    pub fn copy_packed(&self, dst: &mut [u8]) -> bool {
        let row_len = (self.width * 4) as usize;
        if dst.len() < row_len * self.height as usize {
            return false;
        }
        for y in 0..self.height {
            let src_offset = (y * self.stride()) as usize;
            let dst_offset = y as usize * row_len;
            dst[dst_offset..dst_offset + row_len]
                .copy_from_slice(&self.data[src_offset..src_offset + row_len]);
        }
        true
    }

    /// Content pixels tightly packed, row after row.
    pub fn to_packed_pixels(&self) -> Vec<RgbaPixel> {
        let mut out = Vec::with_capacity((self.width * self.height) as usize);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_only_touches_content_area() {
        let mut surface = Surface::with_allocation(2, 2, 4, 4);
        surface.fill(RgbaPixel::WHITE);
        assert_eq!(surface.pixel(1, 1), Some(RgbaPixel::WHITE));
        // Padding column of the first row stays zeroed.
        let pixels: &[RgbaPixel] = bytemuck::cast_slice(surface.as_bytes());
        assert_eq!(pixels[2], RgbaPixel::TRANSPARENT);
        assert_eq!(surface.stride(), 16);
    }

    #[test]
    fn fill_rect_is_clipped() {
        let mut surface = Surface::new(4, 4);
        surface.fill_rect(2, 2, 10, 10, RgbaPixel::BLACK);
        assert_eq!(surface.pixel(3, 3), Some(RgbaPixel::BLACK));
        assert_eq!(surface.pixel(1, 1), Some(RgbaPixel::TRANSPARENT));
        assert_eq!(surface.pixel(4, 4), None);
    }

    #[test]
    fn copy_packed_strips_row_padding() {
        let mut surface = Surface::with_allocation(2, 1, 3, 1);
        surface.set_pixel(1, 0, RgbaPixel::new(1, 2, 3, 4));
        let mut out = vec![0u8; 8];
        assert!(surface.copy_packed(&mut out));
        assert_eq!(&out[4..8], &[1, 2, 3, 4]);
        assert!(!surface.copy_packed(&mut [0u8; 4]));
    }

    #[test]
    fn reshape_reuses_buffer() {
        let mut surface = Surface::new(8, 8);
        surface.reshape(4, 2, 4, 2);
        assert_eq!(surface.size(), (4, 2));
        assert_eq!(surface.as_bytes().len(), 4 * 2 * 4);
    }
}
