//! Basis decomposition of a dual-capsule pair.
//!
//! A capsule pair facing opposite directions yields an omnidirectional
//! component (`a + b`) and a figure-eight component (`a - b`). No
//! normalization is applied; the mixer accounts for the doubled level.

/// Writes `omni = a + b` and `eight = a - b` for the first `a.len()` samples.
#[inline]
pub fn decompose(a: &[f32], b: &[f32], omni: &mut [f32], eight: &mut [f32]) {
    for (((&a, &b), o), e) in a.iter().zip(b).zip(omni.iter_mut()).zip(eight.iter_mut()) {
        *o = a + b;
        *e = a - b;
    }
}

/// Owned omni/eight buffers for one capsule axis.
///
/// Sized once in `prepare` and reused for every block.
pub struct AxisComponents {
    omni: Vec<f32>,
    eight: Vec<f32>,
    len: usize,
}

impl AxisComponents {
    pub fn new(capacity: usize) -> Self {
        Self {
            omni: vec![0.0; capacity],
            eight: vec![0.0; capacity],
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.omni.len()
    }

    /// Decompose a channel pair. Both inputs must have the same length and fit
    /// into the prepared capacity.
    pub fn compute(&mut self, a: &[f32], b: &[f32]) {
        debug_assert_eq!(a.len(), b.len(), "capsule pair length mismatch");
        debug_assert!(a.len() <= self.capacity(), "block exceeds prepared size");
        let n = a.len().min(b.len()).min(self.capacity());
        decompose(&a[..n], &b[..n], &mut self.omni[..n], &mut self.eight[..n]);
        self.len = n;
    }

    pub fn omni(&self) -> &[f32] {
        &self.omni[..self.len]
    }

    pub fn eight(&self) -> &[f32] {
        &self.eight[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_and_difference() {
        let l = [1.0f32, 0.25, -0.5, 0.0];
        let r = [-1.0f32, 0.5, -0.5, 0.3];
        let mut axis = AxisComponents::new(8);
        axis.compute(&l, &r);

        assert_eq!(axis.omni().len(), 4);
        for i in 0..4 {
            assert!((axis.omni()[i] - (l[i] + r[i])).abs() < 1e-7);
            assert!((axis.eight()[i] - (l[i] - r[i])).abs() < 1e-7);
        }
    }

    #[test]
    fn test_reuse_shorter_block() {
        let mut axis = AxisComponents::new(8);
        axis.compute(&[1.0; 8], &[1.0; 8]);
        axis.compute(&[0.5; 3], &[0.25; 3]);

        assert_eq!(axis.omni(), &[0.75, 0.75, 0.75]);
        assert_eq!(axis.eight(), &[0.25, 0.25, 0.25]);
    }
}
