/// Hue/saturation/lightness color triple, the native color space of the
/// game's note blenders. Hue is normalized to [0,1) (wrapped), saturation
/// and lightness to [0,1] (clamped).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HslColor {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

/// Tolerance for "same color" checks when suppressing redundant blender
/// writes. Values closer than this are indistinguishable after 8-bit
/// quantization anyway.
pub const COLOR_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex color '{0}': expected 6 hex digits with an optional leading '#'")]
pub struct HexColorError(pub String);

impl HslColor {
    pub const fn new(hue: f32, saturation: f32, lightness: f32) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }

    /// Componentwise linear blend, saturating at the endpoints. No
    /// extrapolation: `t <= 0` yields `a` and `t >= 1` yields `b` exactly.
    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        if t <= 0.0 {
            return a;
        }
        if t >= 1.0 {
            return b;
        }
        Self {
            hue: a.hue + t * (b.hue - a.hue),
            saturation: a.saturation + t * (b.saturation - a.saturation),
            lightness: a.lightness + t * (b.lightness - a.lightness),
        }
    }

    /// Wraps hue into [0,1) and clamps saturation/lightness to [0,1].
    /// A non-finite hue collapses to 0 rather than poisoning the blend.
    pub fn wrap_and_clamp(&mut self) {
        self.hue = if self.hue.is_finite() {
            let wrapped = self.hue.rem_euclid(1.0);
            // rem_euclid can round up to exactly 1.0 for tiny negative inputs.
            if wrapped < 1.0 { wrapped } else { 0.0 }
        } else {
            0.0
        };
        self.saturation = self.saturation.clamp(0.0, 1.0);
        self.lightness = self.lightness.clamp(0.0, 1.0);
    }

    #[inline(always)]
    pub fn wrapped_and_clamped(mut self) -> Self {
        self.wrap_and_clamp();
        self
    }

    pub fn approx_eq(self, other: Self) -> bool {
        (self.hue - other.hue).abs() <= COLOR_EPSILON
            && (self.saturation - other.saturation).abs() <= COLOR_EPSILON
            && (self.lightness - other.lightness).abs() <= COLOR_EPSILON
    }

    /// Standard HSL -> RGB conversion (six 60-degree hue sectors), rounded
    /// to the nearest byte per channel. Normalizes first.
    pub fn to_rgb8(self) -> [u8; 3] {
        let c = self.wrapped_and_clamped();
        let chroma = (1.0 - (2.0 * c.lightness - 1.0).abs()) * c.saturation;
        let hue6 = c.hue * 6.0;
        let secondary = chroma * (1.0 - (hue6 % 2.0 - 1.0).abs());
        let base = c.lightness - chroma * 0.5;
        let (r, g, b) = match hue6 as u32 {
            0 => (chroma, secondary, 0.0),
            1 => (secondary, chroma, 0.0),
            2 => (0.0, chroma, secondary),
            3 => (0.0, secondary, chroma),
            4 => (secondary, 0.0, chroma),
            _ => (chroma, 0.0, secondary),
        };
        let to_byte = |v: f32| ((v + base) * 255.0).round().clamp(0.0, 255.0) as u8;
        [to_byte(r), to_byte(g), to_byte(b)]
    }

    /// Lowercase `rrggbb` form (no leading '#').
    pub fn to_hex_rgb(self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("{r:02x}{g:02x}{b:02x}")
    }

    /// Parses a 6-hex-digit RGB string, with or without a leading '#', via
    /// the min/max/chroma method. Achromatic input yields hue 0, saturation 0.
    pub fn from_hex_rgb(s: &str) -> Result<Self, HexColorError> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HexColorError(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| HexColorError(s.to_string()))
        };
        let r = channel(0..2)?;
        let g = channel(2..4)?;
        let b = channel(4..6)?;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let lightness = (max + min) * 0.5;
        if max == min {
            return Ok(Self::new(0.0, 0.0, lightness));
        }
        let delta = max - min;
        let saturation = delta / (1.0 - (2.0 * lightness - 1.0).abs());
        let sector = if max == r {
            ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };
        Ok(Self::new(sector / 6.0, saturation, lightness))
    }
}
