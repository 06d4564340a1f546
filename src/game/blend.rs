use crate::game::color::HslColor;

/// Boundary to the host's color-blend object. The engine only ever pushes
/// component writes and asks for one blend regeneration per tick; everything
/// past this trait (mesh tinting, material updates) belongs to the host.
pub trait BlendTarget {
    fn set_hue(&mut self, hue: f32);
    fn set_saturation(&mut self, saturation: f32);
    fn set_lightness(&mut self, lightness: f32);
    fn regenerate_blend(&mut self);
}

/// Wraps one lane's blend target with its live HSL state and a dirty flag,
/// so that any number of component writes per tick cost one
/// `regenerate_blend` call at propagation time.
pub struct ChromaBlender {
    target: Box<dyn BlendTarget>,
    color: HslColor,
    dirty: bool,
}

impl std::fmt::Debug for ChromaBlender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromaBlender")
            .field("color", &self.color)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl ChromaBlender {
    pub fn new(initial: HslColor, mut target: Box<dyn BlendTarget>) -> Self {
        target.set_hue(initial.hue);
        target.set_saturation(initial.saturation);
        target.set_lightness(initial.lightness);
        Self {
            target,
            color: initial,
            dirty: true,
        }
    }

    #[inline(always)]
    pub fn color(&self) -> HslColor {
        self.color
    }

    #[inline(always)]
    pub fn hue(&self) -> f32 {
        self.color.hue
    }

    pub fn set_hue(&mut self, hue: f32) {
        self.color.hue = hue;
        self.target.set_hue(hue);
        self.dirty = true;
    }

    pub fn set_saturation(&mut self, saturation: f32) {
        self.color.saturation = saturation;
        self.target.set_saturation(saturation);
        self.dirty = true;
    }

    pub fn set_lightness(&mut self, lightness: f32) {
        self.color.lightness = lightness;
        self.target.set_lightness(lightness);
        self.dirty = true;
    }

    pub fn set_color(&mut self, color: HslColor) {
        self.set_hue(color.hue);
        self.set_saturation(color.saturation);
        self.set_lightness(color.lightness);
    }

    /// Whether the live state already holds `color` (within quantization
    /// tolerance); used to skip redundant writes.
    pub fn matches(&self, color: HslColor) -> bool {
        self.color.approx_eq(color)
    }

    /// Regenerates the target's blend iff something was written since the
    /// last propagation.
    pub fn propagate(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.target.regenerate_blend();
    }
}

#[cfg(test)]
mod tests {
    use super::{BlendTarget, ChromaBlender};
    use crate::game::color::HslColor;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recording {
        writes: u32,
        regenerations: u32,
        hsl: (f32, f32, f32),
    }

    struct RecordingTarget(Rc<RefCell<Recording>>);

    impl BlendTarget for RecordingTarget {
        fn set_hue(&mut self, hue: f32) {
            let mut r = self.0.borrow_mut();
            r.writes += 1;
            r.hsl.0 = hue;
        }
        fn set_saturation(&mut self, saturation: f32) {
            let mut r = self.0.borrow_mut();
            r.writes += 1;
            r.hsl.1 = saturation;
        }
        fn set_lightness(&mut self, lightness: f32) {
            let mut r = self.0.borrow_mut();
            r.writes += 1;
            r.hsl.2 = lightness;
        }
        fn regenerate_blend(&mut self) {
            self.0.borrow_mut().regenerations += 1;
        }
    }

    fn blender_with_recording() -> (ChromaBlender, Rc<RefCell<Recording>>) {
        let rec = Rc::new(RefCell::new(Recording::default()));
        let blender = ChromaBlender::new(
            HslColor::new(0.25, 0.5, 0.5),
            Box::new(RecordingTarget(rec.clone())),
        );
        (blender, rec)
    }

    #[test]
    fn writes_batch_into_one_regeneration() {
        let (mut blender, rec) = blender_with_recording();
        blender.set_color(HslColor::new(0.5, 1.0, 0.5));
        blender.set_hue(0.75);
        assert_eq!(rec.borrow().regenerations, 0);
        blender.propagate();
        assert_eq!(rec.borrow().regenerations, 1);
        assert_eq!(rec.borrow().hsl.0, 0.75);
    }

    #[test]
    fn propagate_without_writes_is_a_no_op() {
        let (mut blender, rec) = blender_with_recording();
        blender.propagate();
        assert_eq!(rec.borrow().regenerations, 1);
        blender.propagate();
        blender.propagate();
        assert_eq!(rec.borrow().regenerations, 1);
    }

    #[test]
    fn matches_uses_quantization_tolerance() {
        let (blender, _) = blender_with_recording();
        assert!(blender.matches(HslColor::new(0.250000001, 0.5, 0.5)));
        assert!(!blender.matches(HslColor::new(0.26, 0.5, 0.5)));
    }
}
