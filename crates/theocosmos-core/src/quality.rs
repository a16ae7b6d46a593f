use serde::{Deserialize, Serialize};

/// Device quality tier. Detection happens outside the core; the tier arrives
/// through viewer configuration and is fixed for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Mid,
    High,
}

impl Default for QualityTier {
    fn default() -> Self {
        Self::High
    }
}

/// Fixed rendering budget consumed at scene-build time. Read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityPreset {
    /// Upper bound applied to the device pixel ratio.
    pub pixel_ratio_cap: f32,
    /// (longitudes, latitudes) for locus sphere meshes.
    pub sphere_segments: (u32, u32),
    /// (longitudes, latitudes) for sub-topic sphere meshes.
    pub sub_sphere_segments: (u32, u32),
    /// Width of the texture a label is rasterized into.
    pub label_canvas_width: u32,
    /// Extra ticks the scheduler keeps running after the last state change,
    /// so interpolations visibly finish before the loop idles.
    pub settle_frames: u32,
    /// Hover raycast runs every n-th frame.
    pub hover_throttle: u32,
    pub enable_glow: bool,
    pub enable_arrows: bool,
    /// Label budget; nodes past it simply get no label (graceful shortfall).
    pub max_label_sprites: usize,
}

impl QualityPreset {
    pub fn for_tier(tier: QualityTier) -> Self {
        match tier {
            QualityTier::Low => Self {
                pixel_ratio_cap: 1.5,
                sphere_segments: (12, 8),
                sub_sphere_segments: (6, 4),
                label_canvas_width: 256,
                settle_frames: 20,
                hover_throttle: 3,
                enable_glow: false,
                enable_arrows: false,
                max_label_sprites: 8,
            },
            QualityTier::Mid => Self {
                pixel_ratio_cap: 2.0,
                sphere_segments: (18, 12),
                sub_sphere_segments: (8, 6),
                label_canvas_width: 384,
                settle_frames: 30,
                hover_throttle: 2,
                enable_glow: true,
                enable_arrows: true,
                max_label_sprites: 20,
            },
            QualityTier::High => Self {
                pixel_ratio_cap: 2.5,
                sphere_segments: (18, 12),
                sub_sphere_segments: (10, 6),
                label_canvas_width: 512,
                settle_frames: 40,
                hover_throttle: 2,
                enable_glow: true,
                enable_arrows: true,
                max_label_sprites: usize::MAX,
            },
        }
    }
}

impl Default for QualityPreset {
    fn default() -> Self {
        Self::for_tier(QualityTier::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_tier_trims_budgets() {
        let low = QualityPreset::for_tier(QualityTier::Low);
        let high = QualityPreset::for_tier(QualityTier::High);
        assert!(low.settle_frames < high.settle_frames);
        assert!(low.max_label_sprites < high.max_label_sprites);
        assert!(!low.enable_glow);
        assert!(low.hover_throttle > high.hover_throttle);
    }
}
