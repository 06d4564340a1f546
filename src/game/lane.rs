use crate::game::color::HslColor;
use bitflags::bitflags;

/// The fixed set of logical color targets on a track. Each lane maps to one
/// color blender in the host game; `Highlights` covers ancillary glow
/// elements rather than a playable note type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    NoteA,
    NoteB,
    Beat,
    SpinLeft,
    SpinRight,
    Scratch,
    Highlights,
}

impl Lane {
    pub const ALL: [Lane; 7] = [
        Lane::NoteA,
        Lane::NoteB,
        Lane::Beat,
        Lane::SpinLeft,
        Lane::SpinRight,
        Lane::Scratch,
        Lane::Highlights,
    ];

    /// Canonical lowercase token used in chroma scripts and config files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Lane::NoteA => "notea",
            Lane::NoteB => "noteb",
            Lane::Beat => "beat",
            Lane::SpinLeft => "spinleft",
            Lane::SpinRight => "spinright",
            Lane::Scratch => "scratch",
            Lane::Highlights => "highlights",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Lane::NoteA => "Note A",
            Lane::NoteB => "Note B",
            Lane::Beat => "Beat Bar",
            Lane::SpinLeft => "Left Spin",
            Lane::SpinRight => "Right Spin",
            Lane::Scratch => "Scratch",
            Lane::Highlights => "Highlights",
        }
    }

    /// Accepts any of the script-level spellings, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "notea" => Some(Lane::NoteA),
            "noteb" => Some(Lane::NoteB),
            "beat" => Some(Lane::Beat),
            "spinleft" | "leftspin" => Some(Lane::SpinLeft),
            "spinright" | "rightspin" => Some(Lane::SpinRight),
            "scratch" => Some(Lane::Scratch),
            "ancillary" | "highlights" => Some(Lane::Highlights),
            _ => None,
        }
    }

    /// Stock palette the game ships with; used for baseline events and for
    /// restoring blenders when effects are cleared.
    pub const fn default_color(self) -> HslColor {
        match self {
            Lane::NoteA => HslColor::new(0.935, 0.82, 0.55),
            Lane::NoteB => HslColor::new(0.573, 0.86, 0.52),
            Lane::Beat => HslColor::new(0.0, 0.0, 0.85),
            Lane::SpinLeft => HslColor::new(0.0, 0.81, 0.55),
            Lane::SpinRight => HslColor::new(0.62, 0.78, 0.52),
            Lane::Scratch => HslColor::new(0.14, 0.94, 0.55),
            Lane::Highlights => HslColor::new(0.46, 0.70, 0.60),
        }
    }

    pub const fn flag(self) -> LaneSet {
        match self {
            Lane::NoteA => LaneSet::NOTE_A,
            Lane::NoteB => LaneSet::NOTE_B,
            Lane::Beat => LaneSet::BEAT,
            Lane::SpinLeft => LaneSet::SPIN_LEFT,
            Lane::SpinRight => LaneSet::SPIN_RIGHT,
            Lane::Scratch => LaneSet::SCRATCH,
            Lane::Highlights => LaneSet::HIGHLIGHTS,
        }
    }
}

bitflags! {
    /// Configuration-side lane selection. `ALL` is only ever a config value;
    /// runtime code iterates concrete lanes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LaneSet: u8 {
        const NOTE_A = 1 << 0;
        const NOTE_B = 1 << 1;
        const BEAT = 1 << 2;
        const SPIN_LEFT = 1 << 3;
        const SPIN_RIGHT = 1 << 4;
        const SCRATCH = 1 << 5;
        const HIGHLIGHTS = 1 << 6;
        const ALL = Self::NOTE_A.bits()
            | Self::NOTE_B.bits()
            | Self::BEAT.bits()
            | Self::SPIN_LEFT.bits()
            | Self::SPIN_RIGHT.bits()
            | Self::SCRATCH.bits()
            | Self::HIGHLIGHTS.bits();
    }
}

impl LaneSet {
    #[inline(always)]
    pub fn contains_lane(self, lane: Lane) -> bool {
        self.contains(lane.flag())
    }

    /// Parses a config value: `All`, or a comma-separated list of lane
    /// tokens. Unknown names are reported back so the caller can warn
    /// without rejecting the whole value.
    pub fn parse_config(value: &str) -> (Self, Vec<String>) {
        let mut set = LaneSet::empty();
        let mut unknown = Vec::new();
        for part in value.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if part.eq_ignore_ascii_case("all") {
                return (LaneSet::ALL, unknown);
            }
            match Lane::from_token(part) {
                Some(lane) => set |= lane.flag(),
                None => unknown.push(part.to_string()),
            }
        }
        (set, unknown)
    }

    /// Inverse of [`LaneSet::parse_config`], for writing config back out.
    pub fn config_string(self) -> String {
        if self == LaneSet::ALL {
            return "All".to_string();
        }
        let names: Vec<&str> = Lane::ALL
            .iter()
            .filter(|lane| self.contains_lane(**lane))
            .map(|lane| lane.as_str())
            .collect();
        names.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::{Lane, LaneSet};

    #[test]
    fn token_aliases_resolve() {
        assert_eq!(Lane::from_token("NoteA"), Some(Lane::NoteA));
        assert_eq!(Lane::from_token("leftspin"), Some(Lane::SpinLeft));
        assert_eq!(Lane::from_token("SPINLEFT"), Some(Lane::SpinLeft));
        assert_eq!(Lane::from_token("rightspin"), Some(Lane::SpinRight));
        assert_eq!(Lane::from_token("ancillary"), Some(Lane::Highlights));
        assert_eq!(Lane::from_token("highlights"), Some(Lane::Highlights));
        assert_eq!(Lane::from_token("all"), None);
        assert_eq!(Lane::from_token("notec"), None);
    }

    #[test]
    fn lane_set_config_round_trip() {
        let (set, unknown) = LaneSet::parse_config("notea, beat,scratch");
        assert!(unknown.is_empty());
        assert_eq!(set, LaneSet::NOTE_A | LaneSet::BEAT | LaneSet::SCRATCH);
        assert_eq!(set.config_string(), "notea,beat,scratch");

        let (all, _) = LaneSet::parse_config("All");
        assert_eq!(all, LaneSet::ALL);
        assert_eq!(all.config_string(), "All");
    }

    #[test]
    fn lane_set_reports_unknown_names() {
        let (set, unknown) = LaneSet::parse_config("notea,notec,beat");
        assert_eq!(set, LaneSet::NOTE_A | LaneSet::BEAT);
        assert_eq!(unknown, vec!["notec".to_string()]);
    }
}
