use crate::config;
use crate::game::blend::BlendTarget;
use crate::game::color::HslColor;
use crate::game::lane::{Lane, LaneSet};
use crate::game::loader;
use crate::game::runtime::{ChromaRuntime, ChromaSettings};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::cell::RefCell;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

#[derive(Parser)]
#[command(
    name = "chromasync",
    version,
    about = "Chart chroma engine: preview, check and configure scripted note colors."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate playback and print every lane's color over time.
    Preview {
        /// Chart file, or a bare .chroma script.
        chart: PathBuf,
        #[arg(short, long, default_value = "XD")]
        difficulty: String,
        /// Simulated playback length in seconds.
        #[arg(long, default_value_t = 30.0)]
        length: f32,
        /// Samples per simulated second.
        #[arg(long, default_value_t = 4.0)]
        rate: f32,
    },
    /// Resolve and parse a chart's chroma sources without simulating.
    Check {
        chart: PathBuf,
        #[arg(short, long, default_value = "XD")]
        difficulty: String,
    },
    /// Show or change the chroma.ini toggles.
    Config {
        #[arg(long)]
        chroma: Option<bool>,
        #[arg(long)]
        triggers: Option<bool>,
        #[arg(long)]
        rainbow: Option<bool>,
        /// Rainbow speed, 0 to 10.
        #[arg(long)]
        rainbow_speed: Option<f32>,
        /// Comma-separated lane names, or 'All'.
        #[arg(long)]
        rainbow_lanes: Option<String>,
        /// off, error, warn, info, debug or trace.
        #[arg(long)]
        log_level: Option<String>,
    },
    /// Convert between #rrggbb and h,s,l (the color picker clipboard format).
    Hex { value: String },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    match Cli::parse().command {
        Command::Preview {
            chart,
            difficulty,
            length,
            rate,
        } => preview(&chart, &difficulty, length, rate),
        Command::Check { chart, difficulty } => check(&chart, &difficulty),
        Command::Config {
            chroma,
            triggers,
            rainbow,
            rainbow_speed,
            rainbow_lanes,
            log_level,
        } => configure(chroma, triggers, rainbow, rainbow_speed, rainbow_lanes, log_level),
        Command::Hex { value } => hex(&value),
    }
}

/* -------------------- terminal blend target -------------------- */

/// Stand-in for the game's color blender: component writes land in `color`,
/// and `regenerate_blend` bakes the displayable RGB, so the preview also
/// demonstrates the once-per-tick batching contract.
#[derive(Default)]
struct SwatchState {
    color: HslColor,
    rgb: [u8; 3],
}

struct TerminalSwatch(Rc<RefCell<SwatchState>>);

impl BlendTarget for TerminalSwatch {
    fn set_hue(&mut self, hue: f32) {
        self.0.borrow_mut().color.hue = hue;
    }
    fn set_saturation(&mut self, saturation: f32) {
        self.0.borrow_mut().color.saturation = saturation;
    }
    fn set_lightness(&mut self, lightness: f32) {
        self.0.borrow_mut().color.lightness = lightness;
    }
    fn regenerate_blend(&mut self) {
        let mut state = self.0.borrow_mut();
        state.rgb = state.color.to_rgb8();
    }
}

fn is_chroma_script(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("chroma"))
}

/* -------------------- subcommands -------------------- */

fn preview(chart: &Path, difficulty: &str, length: f32, rate: f32) -> Result<(), Box<dyn Error>> {
    let mut runtime = ChromaRuntime::new();
    let mut swatches: Vec<Rc<RefCell<SwatchState>>> = Vec::with_capacity(Lane::ALL.len());
    for lane in Lane::ALL {
        let state = Rc::new(RefCell::new(SwatchState::default()));
        runtime.register_lane(lane, Box::new(TerminalSwatch(state.clone())))?;
        swatches.push(state);
    }

    if is_chroma_script(chart) {
        let (bank, source) = loader::load_script_file(chart)?;
        runtime.install_bank(bank);
        info!("previewing {source}");
    } else {
        match runtime.load_for_chart(chart, difficulty)? {
            Some(source) => info!("previewing {source}"),
            None => info!("no chroma sources found; rainbow fallback only"),
        }
    }

    let settings = ChromaSettings::from_config(&config::get());
    let rate = rate.clamp(0.5, 240.0);
    let step = 1.0 / rate;

    let mut header = format!("{:>8}", "time");
    for lane in Lane::ALL {
        header.push_str(&format!("  {:>10}", lane.as_str()));
    }
    println!("{header}");

    let mut now = 0.0f32;
    while now <= length {
        runtime.tick(now, step, &settings)?;
        let mut row = format!("{now:>7.2}s");
        for state in &swatches {
            let [r, g, b] = state.borrow().rgb;
            row.push_str(&format!(
                "  \x1b[48;2;{r};{g};{b}m  \x1b[0m #{r:02x}{g:02x}{b:02x}"
            ));
        }
        println!("{row}");
        now += step;
    }

    // Leaving the simulated gameplay context restores engine defaults.
    runtime.clear();
    Ok(())
}

fn check(chart: &Path, difficulty: &str) -> Result<(), Box<dyn Error>> {
    let loaded = if is_chroma_script(chart) {
        loader::load_script_file(chart).map(Some)
    } else {
        loader::load_for_chart(chart, difficulty)
    };
    match loaded {
        Ok(Some((bank, source))) => {
            println!("OK: {source}");
            for lane in Lane::ALL {
                let authored = bank.timeline(lane).authored_len();
                if authored > 0 {
                    println!("  {:>10}: {authored} event(s)", lane.as_str());
                }
            }
            println!("  total: {} event(s)", bank.authored_event_count());
            Ok(())
        }
        Ok(None) => {
            println!(
                "no chroma sources for '{}' (difficulty {difficulty})",
                chart.display()
            );
            Ok(())
        }
        Err(e) => {
            error!("chroma load failed: {e}");
            Err(e.into())
        }
    }
}

fn configure(
    chroma: Option<bool>,
    triggers: Option<bool>,
    rainbow: Option<bool>,
    rainbow_speed: Option<f32>,
    rainbow_lanes: Option<String>,
    log_level: Option<String>,
) -> Result<(), Box<dyn Error>> {
    if let Some(enabled) = chroma {
        config::update_chroma_enabled(enabled);
    }
    if let Some(enabled) = triggers {
        config::update_triggers_enabled(enabled);
    }
    if let Some(enabled) = rainbow {
        config::update_rainbow_enabled(enabled);
    }
    if let Some(speed) = rainbow_speed {
        if !(0.0..=10.0).contains(&speed) {
            warn!("rainbow speed {speed} is out of range; clamping to 0..=10");
        }
        config::update_rainbow_speed(speed);
    }
    if let Some(list) = rainbow_lanes {
        let (set, unknown) = LaneSet::parse_config(&list);
        for name in unknown {
            warn!("unknown lane '{name}' in --rainbow-lanes; skipping it");
        }
        config::update_rainbow_lanes(set);
    }
    if let Some(level) = log_level {
        match config::LogLevel::from_str(&level) {
            Ok(level) => config::update_log_level(level),
            Err(()) => warn!("unknown log level '{level}'; leaving it unchanged"),
        }
    }

    let cfg = config::get();
    println!("chroma:        {}", if cfg.enable_chroma { "on" } else { "off" });
    println!("triggers:      {}", if cfg.enable_triggers { "on" } else { "off" });
    println!("rainbow:       {}", if cfg.enable_rainbow { "on" } else { "off" });
    println!("rainbow speed: {}", cfg.rainbow_speed);
    println!("rainbow lanes: {}", cfg.rainbow_lanes.config_string());
    println!("log level:     {}", cfg.log_level.as_str());
    Ok(())
}

fn hex(value: &str) -> Result<(), Box<dyn Error>> {
    if value.contains(',') {
        // h,s,l components in, hex out.
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err("expected three comma-separated components: h,s,l".into());
        }
        let component = |s: &str| s.parse::<f32>().map_err(|e| format!("bad component '{s}': {e}"));
        let color = HslColor::new(
            component(parts[0])?,
            component(parts[1])?,
            component(parts[2])?,
        )
        .wrapped_and_clamped();
        println!("#{}", color.to_hex_rgb());
    } else {
        let color = HslColor::from_hex_rgb(value)?;
        println!(
            "h={:.4} s={:.4} l={:.4}",
            color.hue, color.saturation, color.lightness
        );
    }
    Ok(())
}
