use crate::game::lane::LaneSet;
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex};

const CONFIG_PATH: &str = "chroma.ini";

// --- Minimal INI reader ---

#[derive(Debug, Default)]
pub struct IniFile {
    sections: HashMap<String, HashMap<String, String>>,
}

impl IniFile {
    pub fn read_from(content: &str) -> Self {
        let mut out = Self::default();
        let mut current_section = String::new();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                current_section = line[1..line.len() - 1].trim().to_ascii_lowercase();
                out.sections.entry(current_section.clone()).or_default();
                continue;
            }

            // Key/value pair: key=value
            let Some((key_raw, value_raw)) = line.split_once('=') else {
                continue;
            };
            let key = key_raw.trim();
            if key.is_empty() {
                continue;
            }
            out.sections
                .entry(current_section.clone())
                .or_default()
                .insert(key.to_ascii_lowercase(), value_raw.trim().to_string());
        }

        out
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        Ok(Self::read_from(&std::fs::read_to_string(path)?))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(&section.to_ascii_lowercase())
            .and_then(|s| s.get(&key.to_ascii_lowercase()))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    pub const fn as_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Master switch; off means no color effect of any kind runs.
    pub enable_chroma: bool,
    /// Chart-script (trigger) effects.
    pub enable_triggers: bool,
    pub enable_rainbow: bool,
    pub rainbow_lanes: LaneSet,
    /// 0.0..=10.0; at 10 a lane's hue walks the full circle in one second.
    pub rainbow_speed: f32,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_chroma: true,
            enable_triggers: true,
            enable_rainbow: true,
            rainbow_lanes: LaneSet::ALL,
            rainbow_speed: 1.0,
            log_level: LogLevel::Info,
        }
    }
}

// Global, mutable configuration instance.
static CONFIG: LazyLock<Mutex<Config>> = LazyLock::new(|| Mutex::new(Config::default()));

/// Keys that `load` expects; if any is missing the file gets rewritten with
/// the effective values so users can see every knob.
const EXPECTED_KEYS: [(&str, &str); 6] = [
    ("Chroma", "Enable"),
    ("Chroma", "EnableTriggers"),
    ("Chroma", "LogLevel"),
    ("Rainbow", "AffectedLanes"),
    ("Rainbow", "Enable"),
    ("Rainbow", "Speed"),
];

fn parse_toggle(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("on")
    {
        return Some(true);
    }
    if value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value.eq_ignore_ascii_case("off")
    {
        return Some(false);
    }
    value.parse::<u8>().ok().map(|n| n != 0)
}

/// Populates a config from file contents, falling back to defaults for
/// anything missing or unparsable.
fn config_from_ini(ini: &IniFile) -> Config {
    let default = Config::default();
    let mut cfg = default;

    cfg.enable_chroma = ini
        .get("Chroma", "Enable")
        .and_then(parse_toggle)
        .unwrap_or(default.enable_chroma);
    cfg.enable_triggers = ini
        .get("Chroma", "EnableTriggers")
        .and_then(parse_toggle)
        .unwrap_or(default.enable_triggers);
    cfg.log_level = ini
        .get("Chroma", "LogLevel")
        .and_then(|v| LogLevel::from_str(v).ok())
        .unwrap_or(default.log_level);
    cfg.enable_rainbow = ini
        .get("Rainbow", "Enable")
        .and_then(parse_toggle)
        .unwrap_or(default.enable_rainbow);
    cfg.rainbow_lanes = ini
        .get("Rainbow", "AffectedLanes")
        .map(|v| {
            let (set, unknown) = LaneSet::parse_config(v);
            for name in unknown {
                warn!("unknown lane '{name}' in AffectedLanes; skipping it");
            }
            set
        })
        .unwrap_or(default.rainbow_lanes);
    cfg.rainbow_speed = ini
        .get("Rainbow", "Speed")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .map_or(default.rainbow_speed, |v| v.clamp(0.0, 10.0));

    cfg
}

fn render(cfg: &Config) -> String {
    let mut content = String::new();
    content.push_str("[Chroma]\n");
    content.push_str(&format!(
        "Enable={}\n",
        if cfg.enable_chroma { "1" } else { "0" }
    ));
    content.push_str(&format!(
        "EnableTriggers={}\n",
        if cfg.enable_triggers { "1" } else { "0" }
    ));
    content.push_str(&format!("LogLevel={}\n", cfg.log_level.as_str()));
    content.push('\n');
    content.push_str("[Rainbow]\n");
    content.push_str(&format!(
        "AffectedLanes={}\n",
        cfg.rainbow_lanes.config_string()
    ));
    content.push_str(&format!(
        "Enable={}\n",
        if cfg.enable_rainbow { "1" } else { "0" }
    ));
    content.push_str(&format!("Speed={}\n", cfg.rainbow_speed));
    content
}

fn persist(cfg: &Config) {
    if let Err(e) = std::fs::write(CONFIG_PATH, render(cfg)) {
        warn!("Failed to write '{CONFIG_PATH}': {e}");
    }
}

pub fn load() {
    if !Path::new(CONFIG_PATH).exists() {
        info!("'{CONFIG_PATH}' not found, creating with default values.");
        persist(&Config::default());
    }

    match IniFile::load(CONFIG_PATH) {
        Ok(ini) => {
            let cfg = config_from_ini(&ini);
            *CONFIG.lock().unwrap() = cfg;
            info!("Configuration loaded from '{CONFIG_PATH}'.");

            if EXPECTED_KEYS
                .iter()
                .any(|(section, key)| ini.get(section, key).is_none())
            {
                persist(&cfg);
                info!("'{CONFIG_PATH}' updated with default values for any missing fields.");
            }
        }
        Err(e) => warn!("Failed to read '{CONFIG_PATH}': {e}; using defaults."),
    }
}

pub fn get() -> Config {
    *CONFIG.lock().unwrap()
}

fn update(mutate: impl FnOnce(&mut Config)) {
    let snapshot = {
        let mut cfg = CONFIG.lock().unwrap();
        mutate(&mut cfg);
        *cfg
    };
    persist(&snapshot);
}

pub fn update_chroma_enabled(enabled: bool) {
    update(|cfg| cfg.enable_chroma = enabled);
}

pub fn update_triggers_enabled(enabled: bool) {
    update(|cfg| cfg.enable_triggers = enabled);
}

pub fn update_rainbow_enabled(enabled: bool) {
    update(|cfg| cfg.enable_rainbow = enabled);
}

pub fn update_rainbow_lanes(lanes: LaneSet) {
    update(|cfg| cfg.rainbow_lanes = lanes);
}

pub fn update_rainbow_speed(speed: f32) {
    update(|cfg| cfg.rainbow_speed = speed.clamp(0.0, 10.0));
}

pub fn update_log_level(level: LogLevel) {
    update(|cfg| cfg.log_level = level);
}
