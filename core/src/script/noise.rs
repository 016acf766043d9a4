//! Fractal value noise for map generation.
//!
//! The noise is a sum of white-noise layers. Each layer halves the pixel size of the previous
//! one and scales its range by `crispness / 10`; layer pixels are stretched over the map with
//! bilinear integer interpolation. Rigged rectangles take their layer values from a callback
//! instead of the random source, which lets a script keep start areas flat while the noise
//! around them still blends in.

use crate::error::ScriptError;

/// Largest noise side length.
pub const MAX_NOISE_SIDE: u32 = 256;

/// Largest layer scale. The first layer already covers any map at this scale.
pub const MAX_NOISE_SCALE: u32 = 2 * MAX_NOISE_SIDE;

/// Rectangle `[x1, x2] x [y1, y2]` (inclusive, map tiles) whose layer values come from a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiggedRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl RiggedRegion {
    fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x1 && y >= self.y1 && x <= self.x2 && y <= self.y2
    }
}

/// Arguments of one noise request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseParams {
    pub width: u32,
    pub height: u32,
    /// Range of the first layer.
    pub range: u32,
    /// Range decay per layer, in tenths.
    pub crispness: u32,
    /// Pixel size of the first layer.
    pub scale: u32,
    /// Rescale the result to `[0, n]` when non-zero.
    pub normalize_to_range: u32,
}

/// Where layer values come from.
pub trait NoiseSource {
    /// Next value of the seeded generator.
    fn next_random(&mut self) -> u32;

    /// Value for a rigged point. Must be below `layer_range`.
    fn rigged_value(
        &mut self,
        region: usize,
        x: u32,
        y: u32,
        layer_idx: u32,
        layer_range: u32,
    ) -> Result<u32, ScriptError>;
}

const FUNCTION: &str = "generate_fractal_value_noise";

fn bad_argument(reason: &str) -> ScriptError {
    ScriptError::BadArgument {
        function: FUNCTION,
        reason: reason.to_string(),
    }
}

impl NoiseParams {
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.width == 0 {
            return Err(bad_argument("width must be > 0"));
        }
        if self.height == 0 {
            return Err(bad_argument("height must be > 0"));
        }
        if self.range == 0 {
            return Err(bad_argument("range must be > 0"));
        }
        if self.scale == 0 {
            return Err(bad_argument("scale must be > 0"));
        }
        if self.crispness == 0 {
            return Err(bad_argument("crispness must be > 0"));
        }
        if self.scale > MAX_NOISE_SCALE {
            return Err(bad_argument("scale must be <= 512"));
        }
        if self.width > MAX_NOISE_SIDE {
            return Err(bad_argument("width must be <= 256"));
        }
        if self.height > MAX_NOISE_SIDE {
            return Err(bad_argument("height must be <= 256"));
        }
        if self.width * self.height > u32::from(u16::MAX) {
            return Err(bad_argument("requested data too large"));
        }
        Ok(())
    }

    /// Number of values produced.
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generate `width * height` values, stored column-major (`x * height + y`).
pub fn fractal_value_noise(
    params: &NoiseParams,
    rigged: &[RiggedRegion],
    source: &mut impl NoiseSource,
) -> Result<Vec<u32>, ScriptError> {
    params.validate()?;
    let NoiseParams { width, height, .. } = *params;

    let mut noise = vec![0u32; params.len()];
    let mut layer = vec![0u32; (width as usize + 1) * (height as usize + 1)];

    let mut layer_scale = params.scale;
    let mut layer_range = params.range;
    let mut layer_idx = u32::MAX;

    loop {
        layer_scale = (layer_scale / 2).max(1);
        layer_range = layer_range.wrapping_mul(params.crispness) / 10;
        layer_idx = layer_idx.wrapping_add(1);

        let layer_width = width / layer_scale + 1;
        let layer_height = height / layer_scale + 1;
        let scale_area = layer_scale * layer_scale;

        for x in 0..layer_width {
            for y in 0..layer_height {
                let (map_x, map_y) = (x * layer_scale, y * layer_scale);
                let slot = (x * layer_height + y) as usize;

                let mut is_rigged = false;
                for (index, region) in rigged.iter().enumerate() {
                    if !region.contains(map_x, map_y) {
                        continue;
                    }
                    is_rigged = true;
                    let value = source.rigged_value(index, map_x, map_y, layer_idx, layer_range)?;
                    if value >= layer_range {
                        return Err(bad_argument(
                            "rigged region callback must return a value within range",
                        ));
                    }
                    layer[slot] = value;
                }

                if !is_rigged {
                    // A layer range of 0 means nothing is left to add.
                    layer[slot] = source.next_random().checked_rem(layer_range).unwrap_or(0);
                }
            }
        }

        for x in 0..layer_width - 1 {
            for y in 0..layer_height - 1 {
                let (map_x, map_y) = (x * layer_scale, y * layer_scale);
                let tl = layer[(x * layer_height + y) as usize];
                let tr = layer[((x + 1) * layer_height + y) as usize];
                let bl = layer[(x * layer_height + y + 1) as usize];
                let br = layer[((x + 1) * layer_height + y + 1) as usize];

                for ix in 0..layer_scale {
                    for iy in 0..layer_scale {
                        let rx = layer_scale - 1 - ix;
                        let ry = layer_scale - 1 - iy;
                        let blended = br
                            .wrapping_mul(ix * iy)
                            .wrapping_add(bl.wrapping_mul(rx * iy))
                            .wrapping_add(tr.wrapping_mul(ix * ry))
                            .wrapping_add(tl.wrapping_mul(rx * ry));
                        let index = ((map_x + ix) * height + (map_y + iy)) as usize;
                        noise[index] = noise[index].wrapping_add(blended / scale_area);
                    }
                }
            }
        }

        if layer_scale <= 1 || layer_range <= 1 {
            break;
        }
    }

    if params.normalize_to_range > 0 {
        normalize(&mut noise, params.normalize_to_range);
    }
    Ok(noise)
}

/// Rescale so the minimum becomes 0 and the maximum becomes `to_range`. Flat input becomes 0.
fn normalize(values: &mut [u32], to_range: u32) {
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return;
    };
    let spread = u64::from(max - min);
    for value in values.iter_mut() {
        *value = if spread == 0 {
            0
        } else {
            (u64::from(*value - min) * u64::from(to_range) / spread) as u32
        };
    }
}
