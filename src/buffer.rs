//! Index-aligned position and color storage.

use glam::Vec3;

/// `N` particles stored as two flat `3N` float arrays.
///
/// Particle `i` lives at offsets `3i..3i + 3` in both arrays. The particle
/// count is fixed at construction; only the contents are ever overwritten.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleBuffer {
    positions: Vec<f32>,
    colors: Vec<f32>,
}

impl ParticleBuffer {
    /// Allocate `count` parked particles (zero position, zero color).
    pub fn new(count: usize) -> Self {
        Self {
            positions: vec![0.0; count * 3],
            colors: vec![0.0; count * 3],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    #[inline]
    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    /// Both arrays, mutably, for code that writes positions and colors together.
    #[inline]
    pub fn split_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.positions, &mut self.colors)
    }

    #[inline]
    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[index * 3..index * 3 + 3])
    }

    #[inline]
    pub fn color(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.colors[index * 3..index * 3 + 3])
    }

    #[inline]
    pub fn set(&mut self, index: usize, position: Vec3, color: Vec3) {
        position.write_to_slice(&mut self.positions[index * 3..index * 3 + 3]);
        color.write_to_slice(&mut self.colors[index * 3..index * 3 + 3]);
    }

    #[inline]
    pub fn set_position(&mut self, index: usize, position: Vec3) {
        position.write_to_slice(&mut self.positions[index * 3..index * 3 + 3]);
    }

    /// Hide a particle: zero position and zero color render as nothing under
    /// additive blending on a black backdrop.
    #[inline]
    pub fn park(&mut self, index: usize) {
        self.set(index, Vec3::ZERO, Vec3::ZERO);
    }

    /// Whether particle `index` is exactly parked.
    pub fn is_parked(&self, index: usize) -> bool {
        self.position(index) == Vec3::ZERO && self.color(index) == Vec3::ZERO
    }

    /// Move every component a `factor` of the way toward `target`.
    ///
    /// `current += (target - current) * factor`, applied per scalar.
    pub fn blend_toward(&mut self, target: &ParticleBuffer, factor: f32) {
        debug_assert_eq!(self.len(), target.len());
        for (c, t) in self.positions.iter_mut().zip(&target.positions) {
            *c += (t - *c) * factor;
        }
        for (c, t) in self.colors.iter_mut().zip(&target.colors) {
            *c += (t - *c) * factor;
        }
    }

    /// Overwrite the contents with another buffer of the same length.
    pub fn copy_from(&mut self, other: &ParticleBuffer) {
        self.positions.copy_from_slice(&other.positions);
        self.colors.copy_from_slice(&other.colors);
    }

    /// Raw position bytes for GPU upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Raw color bytes for GPU upload.
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_parked() {
        let buf = ParticleBuffer::new(4);
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.positions().len(), 12);
        assert_eq!(buf.colors().len(), 12);
        assert!((0..4).all(|i| buf.is_parked(i)));
    }

    #[test]
    fn test_set_is_index_aligned() {
        let mut buf = ParticleBuffer::new(3);
        buf.set(1, Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.1, 0.2, 0.3));
        assert_eq!(&buf.positions()[3..6], &[1.0, 2.0, 3.0]);
        assert_eq!(&buf.colors()[3..6], &[0.1, 0.2, 0.3]);
        assert!(buf.is_parked(0));
        assert!(buf.is_parked(2));
    }

    #[test]
    fn test_blend_single_step() {
        let mut current = ParticleBuffer::new(1);
        let mut target = ParticleBuffer::new(1);
        target.set(0, Vec3::splat(10.0), Vec3::ONE);

        current.blend_toward(&target, 0.05);

        assert!((current.position(0) - Vec3::splat(0.5)).abs().max_element() < 1e-6);
        assert!((current.color(0) - Vec3::splat(0.05)).abs().max_element() < 1e-6);
    }

    #[test]
    fn test_byte_views() {
        let buf = ParticleBuffer::new(2);
        assert_eq!(buf.position_bytes().len(), 2 * 3 * 4);
        assert_eq!(buf.color_bytes().len(), 2 * 3 * 4);
    }
}
