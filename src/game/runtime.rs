use crate::config::Config;
use crate::game::blend::BlendTarget;
use crate::game::lane::{Lane, LaneSet};
use crate::game::loader::{self, ChromaSource, LoadError};
use crate::game::registry::{LaneRegistry, RegistryError};
use crate::game::triggers::TriggerBank;
use log::info;
use std::path::Path;

/// Per-tick snapshot of the user-facing toggles. The host reads these from
/// its settings layer once per frame and hands them in; the runtime itself
/// holds no configuration state.
#[derive(Debug, Clone, Copy)]
pub struct ChromaSettings {
    pub enable_chroma: bool,
    pub enable_triggers: bool,
    pub enable_rainbow: bool,
    pub rainbow_lanes: LaneSet,
    /// 0.0–10.0; full speed walks the whole hue circle in one second.
    pub rainbow_speed: f32,
}

impl ChromaSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enable_chroma: config.enable_chroma,
            enable_triggers: config.enable_triggers,
            enable_rainbow: config.enable_rainbow,
            rainbow_lanes: config.rainbow_lanes,
            rainbow_speed: config.rainbow_speed,
        }
    }
}

/// The per-process chroma state: the lane registry plus the trigger bank of
/// the chart currently in play. Driven by the host's update callback; all
/// methods are synchronous and none block.
#[derive(Default)]
pub struct ChromaRuntime {
    registry: LaneRegistry,
    bank: Option<TriggerBank>,
}

impl ChromaRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_lane(
        &mut self,
        lane: Lane,
        target: Box<dyn BlendTarget>,
    ) -> Result<(), RegistryError> {
        self.registry.register(lane, target)
    }

    pub fn triggers_loaded(&self) -> bool {
        self.bank.is_some()
    }

    /// Swaps in a fully-built bank. Because the bank is complete before this
    /// call, an evaluation tick sees either the old chart's triggers or the
    /// new chart's, never a half-populated state.
    pub fn install_bank(&mut self, bank: TriggerBank) {
        self.bank = Some(bank);
    }

    /// Chart-load entry point. On success the previous bank is replaced
    /// wholesale (or dropped, when the chart has no chroma sources). On
    /// error nothing changes: the prior script stays authoritative.
    pub fn load_for_chart(
        &mut self,
        chart_path: &Path,
        difficulty: &str,
    ) -> Result<Option<ChromaSource>, LoadError> {
        let loaded = loader::load_for_chart(chart_path, difficulty)?;
        match loaded {
            Some((bank, source)) => {
                self.bank = Some(bank);
                Ok(Some(source))
            }
            None => {
                self.bank = None;
                Ok(None)
            }
        }
    }

    /// Leaving the gameplay context: drop the chart's triggers and put every
    /// blender back to its engine default.
    pub fn clear(&mut self) {
        if self.bank.take().is_some() {
            info!("cleared chart chroma triggers");
        }
        self.registry.reset_all();
    }

    /// One update tick at playback time `now`, `delta` seconds after the
    /// previous tick. Trigger evaluation and the rainbow fallback are
    /// mutually exclusive; whichever ran, dirty blenders are propagated once
    /// at the end so each blend regenerates at most once per tick.
    pub fn tick(
        &mut self,
        now: f32,
        delta: f32,
        settings: &ChromaSettings,
    ) -> Result<(), RegistryError> {
        if !settings.enable_chroma {
            return Ok(());
        }
        if settings.enable_triggers && self.bank.is_some() {
            self.evaluate_triggers(now, settings)?;
        } else if settings.enable_rainbow {
            self.advance_rainbow(delta, settings);
        }
        self.registry.propagate_all();
        Ok(())
    }

    fn evaluate_triggers(&mut self, now: f32, settings: &ChromaSettings) -> Result<(), RegistryError> {
        let Some(bank) = &self.bank else {
            return Ok(());
        };
        for lane in Lane::ALL {
            // Most recently started event; before the baseline there is
            // nothing to show, so the lane is simply left alone.
            let Some(event) = bank.timeline(lane).active_at(now) else {
                continue;
            };
            let color = event.color_at(now);
            self.registry.set_color(lane, color, settings.enable_chroma)?;
        }
        Ok(())
    }

    /// Continuous hue rotation for lanes no script governs. Writes hue
    /// directly so saturation/lightness keep whatever the user's color
    /// settings give them.
    fn advance_rainbow(&mut self, delta: f32, settings: &ChromaSettings) {
        let step = settings.rainbow_speed * 0.1 * delta;
        for (lane, blender) in self.registry.iter_mut() {
            if !settings.rainbow_lanes.contains_lane(lane) {
                continue;
            }
            let mut hue = blender.hue() + step;
            if hue >= 1.0 {
                hue -= 1.0;
            }
            if hue < 0.0 {
                hue += 1.0;
            }
            blender.set_hue(hue);
        }
    }
}
