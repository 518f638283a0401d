use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PALETTE_SEED: u64 = 0x5eed_c0c0;
const FALLBACK_COLOR: [u8; 3] = [255, 255, 255];

/// Per-class box colours.
///
/// Colours are random but seeded, so a class keeps its colour across runs.
/// Class ids beyond the palette draw white.
#[derive(Clone, Debug, Default)]
pub struct ClassPalette {
    colors: Vec<[u8; 3]>,
}

impl ClassPalette {
    pub fn new(classes: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(PALETTE_SEED);
        let colors = (0..classes).map(|_| rng.gen::<[u8; 3]>()).collect();
        Self { colors }
    }

    pub fn color(&self, class_id: u32) -> [u8; 3] {
        self.colors
            .get(class_id as usize)
            .copied()
            .unwrap_or(FALLBACK_COLOR)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
