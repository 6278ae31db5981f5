//! Body colors.

use rand::Rng;
use rand::seq::SliceRandom;

/// RGB color used for cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Generate a saturated random color: one channel full, one nearly
    /// off and one random, in shuffled order.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut channels = [0xFF, 0x07, rng.random_range(0..=255u8)];
        channels.shuffle(rng);
        Self::new(channels[0], channels[1], channels[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_color_is_saturated() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            let c = Color::random(&mut rng);
            let channels = [c.r, c.g, c.b];
            assert!(channels.contains(&0xFF));
            assert!(channels.contains(&0x07));
        }
    }
}
