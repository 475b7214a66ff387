//! Texture-coordinate transform published alongside each frame.

/// 4x4 row-major matrix applied to `(u, v, 0, 1)` texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform([f32; 16]);

impl TextureTransform {
    pub const IDENTITY: TextureTransform = TextureTransform([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    pub fn from_rows(values: [f32; 16]) -> Self {
        Self(values)
    }

    /// Transform for content of `width`x`height` stored in an allocation of
    /// `alloc_width`x`alloc_height`, optionally flipped vertically.
    pub fn for_content(
        width: u32,
        height: u32,
        alloc_width: u32,
        alloc_height: u32,
        flip_y: bool,
    ) -> Self {
        let sx = if alloc_width == 0 { 0.0 } else { width as f32 / alloc_width as f32 };
        let sy = if alloc_height == 0 { 0.0 } else { height as f32 / alloc_height as f32 };
        let mut m = Self::IDENTITY.0;
        m[0] = sx;
        if flip_y {
            // v' = sy * (1 - v)
            m[5] = -sy;
            m[7] = sy;
        } else {
            m[5] = sy;
        }
        Self(m)
    }

    /// Element `index` in row-major order; `None` past the end.
    pub fn component(&self, index: usize) -> Option<f32> {
        self.0.get(index).copied()
    }

    pub fn as_array(&self) -> &[f32; 16] {
        &self.0
    }

    /// Apply the transform to a texture coordinate.
    pub fn apply(&self, u: f32, v: f32) -> (f32, f32) {
        let m = &self.0;
        (m[0] * u + m[1] * v + m[3], m[4] * u + m[5] * v + m[7])
    }
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_allocation_without_flip_is_identity() {
        let t = TextureTransform::for_content(64, 32, 64, 32, false);
        assert_eq!(t, TextureTransform::IDENTITY);
    }

    #[test]
    fn padded_allocation_scales_coordinates() {
        let t = TextureTransform::for_content(50, 25, 100, 100, false);
        assert_eq!(t.apply(1.0, 1.0), (0.5, 0.25));
    }

    #[test]
    fn flip_maps_top_to_bottom() {
        let t = TextureTransform::for_content(10, 10, 10, 10, true);
        assert_eq!(t.apply(0.0, 0.0), (0.0, 1.0));
        assert_eq!(t.apply(0.0, 1.0), (0.0, 0.0));
        assert_eq!(t.component(5), Some(-1.0));
        assert_eq!(t.component(16), None);
    }
}
