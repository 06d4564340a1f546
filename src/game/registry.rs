use crate::game::blend::{BlendTarget, ChromaBlender};
use crate::game::color::HslColor;
use crate::game::lane::Lane;
use std::collections::HashMap;

/// Registry misuse is an integration bug, not a user-recoverable condition;
/// callers are expected to treat these as fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("lane '{}' is already registered", .0.display_name())]
    DuplicateLane(Lane),
    #[error("lane '{}' was never registered", .0.display_name())]
    UnknownLane(Lane),
}

/// Owns the lane -> blender mapping and mediates every color write. Entries
/// are registered once per session and never removed, only mutated.
#[derive(Default)]
pub struct LaneRegistry {
    blenders: HashMap<Lane, ChromaBlender>,
}

impl LaneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a lane to its host blend target, seeding it with the lane's
    /// engine default color.
    pub fn register(&mut self, lane: Lane, target: Box<dyn BlendTarget>) -> Result<(), RegistryError> {
        if self.blenders.contains_key(&lane) {
            return Err(RegistryError::DuplicateLane(lane));
        }
        self.blenders
            .insert(lane, ChromaBlender::new(lane.default_color(), target));
        Ok(())
    }

    pub fn blender(&self, lane: Lane) -> Result<&ChromaBlender, RegistryError> {
        self.blenders
            .get(&lane)
            .ok_or(RegistryError::UnknownLane(lane))
    }

    pub fn blender_mut(&mut self, lane: Lane) -> Result<&mut ChromaBlender, RegistryError> {
        self.blenders
            .get_mut(&lane)
            .ok_or(RegistryError::UnknownLane(lane))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Lane, &mut ChromaBlender)> {
        self.blenders.iter_mut().map(|(lane, blender)| (*lane, blender))
    }

    /// Normalizes and writes `color` to the lane's blender. Silently does
    /// nothing while chroma is disabled, and skips writes that would not
    /// change the blended output.
    pub fn set_color(
        &mut self,
        lane: Lane,
        color: HslColor,
        chroma_enabled: bool,
    ) -> Result<(), RegistryError> {
        if !chroma_enabled {
            return Ok(());
        }
        let blender = self.blender_mut(lane)?;
        let color = color.wrapped_and_clamped();
        if blender.matches(color) {
            return Ok(());
        }
        blender.set_color(color);
        Ok(())
    }

    /// Restores every registered lane to its engine default and regenerates
    /// the affected blends immediately.
    pub fn reset_all(&mut self) {
        for (lane, blender) in self.blenders.iter_mut() {
            blender.set_color(lane.default_color());
            blender.propagate();
        }
    }

    /// The once-per-tick batched flush: each dirty blender regenerates its
    /// blend exactly once.
    pub fn propagate_all(&mut self) {
        for blender in self.blenders.values_mut() {
            blender.propagate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LaneRegistry, RegistryError};
    use crate::game::blend::BlendTarget;
    use crate::game::color::HslColor;
    use crate::game::lane::Lane;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counts {
        regenerations: u32,
    }

    struct CountingTarget(Rc<RefCell<Counts>>);

    impl BlendTarget for CountingTarget {
        fn set_hue(&mut self, _hue: f32) {}
        fn set_saturation(&mut self, _saturation: f32) {}
        fn set_lightness(&mut self, _lightness: f32) {}
        fn regenerate_blend(&mut self) {
            self.0.borrow_mut().regenerations += 1;
        }
    }

    fn registry_with_lane(lane: Lane) -> (LaneRegistry, Rc<RefCell<Counts>>) {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let mut registry = LaneRegistry::new();
        registry
            .register(lane, Box::new(CountingTarget(counts.clone())))
            .unwrap();
        (registry, counts)
    }

    #[test]
    fn double_registration_is_rejected() {
        let (mut registry, counts) = registry_with_lane(Lane::NoteA);
        let err = registry
            .register(Lane::NoteA, Box::new(CountingTarget(counts)))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateLane(Lane::NoteA));
    }

    #[test]
    fn unknown_lane_is_an_error() {
        let (mut registry, _) = registry_with_lane(Lane::NoteA);
        assert_eq!(
            registry.blender(Lane::Beat).unwrap_err(),
            RegistryError::UnknownLane(Lane::Beat)
        );
        assert_eq!(
            registry
                .set_color(Lane::Beat, HslColor::new(0.5, 1.0, 0.5), true)
                .unwrap_err(),
            RegistryError::UnknownLane(Lane::Beat)
        );
    }

    #[test]
    fn set_color_respects_the_chroma_toggle() {
        let (mut registry, _) = registry_with_lane(Lane::NoteA);
        registry
            .set_color(Lane::NoteA, HslColor::new(0.5, 1.0, 0.5), false)
            .unwrap();
        let blender = registry.blender(Lane::NoteA).unwrap();
        assert!(blender.matches(Lane::NoteA.default_color()));
    }

    #[test]
    fn redundant_writes_do_not_redirty_the_blender() {
        let (mut registry, counts) = registry_with_lane(Lane::NoteA);
        let color = HslColor::new(0.5, 1.0, 0.5);
        registry.set_color(Lane::NoteA, color, true).unwrap();
        registry.propagate_all();
        let after_first = counts.borrow().regenerations;

        registry.set_color(Lane::NoteA, color, true).unwrap();
        registry.propagate_all();
        assert_eq!(counts.borrow().regenerations, after_first);
    }

    #[test]
    fn set_color_normalizes_before_writing() {
        let (mut registry, _) = registry_with_lane(Lane::NoteA);
        registry
            .set_color(Lane::NoteA, HslColor::new(1.25, 2.0, -1.0), true)
            .unwrap();
        let written = registry.blender(Lane::NoteA).unwrap().color();
        assert!((written.hue - 0.25).abs() < 1e-6);
        assert_eq!(written.saturation, 1.0);
        assert_eq!(written.lightness, 0.0);
    }

    #[test]
    fn reset_all_restores_engine_defaults() {
        let (mut registry, counts) = registry_with_lane(Lane::Scratch);
        registry
            .set_color(Lane::Scratch, HslColor::new(0.9, 0.9, 0.9), true)
            .unwrap();
        registry.reset_all();
        let blender = registry.blender(Lane::Scratch).unwrap();
        assert!(blender.matches(Lane::Scratch.default_color()));
        assert!(counts.borrow().regenerations >= 1);
    }
}
