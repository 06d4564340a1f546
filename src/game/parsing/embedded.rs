use crate::game::color::{HexColorError, HslColor};
use crate::game::lane::Lane;
use crate::game::triggers::TriggerEvent;
use serde::Deserialize;
use std::collections::HashMap;

/// Chart files are JSON documents; charts that ship their own chroma data
/// carry it under these top-level keys, difficulty-qualified first.
const EMBEDDED_KEY_PREFIX: &str = "chromaTriggers";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmbeddedError {
    #[error("embedded chroma data under '{key}' is malformed: {message}")]
    Malformed { key: String, message: String },
    #[error("embedded chroma data references unknown lane '{0}'")]
    UnknownLane(String),
    #[error(transparent)]
    Color(#[from] HexColorError),
}

/// One event record as charts embed it. `endColor` may be omitted for
/// instantaneous sets.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EmbeddedEvent {
    time: f32,
    #[serde(default)]
    duration: f32,
    start_color: String,
    #[serde(default)]
    end_color: Option<String>,
}

/// Looks for embedded chroma data in a parsed chart document, probing the
/// difficulty-qualified key before the generic one. `Ok(None)` means the
/// chart simply ships none; malformed data under a present key is an error
/// so a broken chart does not silently lose its colors. The matched key is
/// returned for diagnostics.
pub fn extract(
    chart: &serde_json::Value,
    difficulty: &str,
) -> Result<Option<(String, HashMap<Lane, Vec<TriggerEvent>>)>, EmbeddedError> {
    let qualified = format!("{EMBEDDED_KEY_PREFIX}_{difficulty}");
    for key in [qualified.as_str(), EMBEDDED_KEY_PREFIX] {
        let Some(value) = chart.get(key) else {
            continue;
        };
        let records: HashMap<String, Vec<EmbeddedEvent>> =
            serde_json::from_value(value.clone()).map_err(|e| EmbeddedError::Malformed {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        return convert(records).map(|per_lane| Some((key.to_string(), per_lane)));
    }
    Ok(None)
}

/// Structured records are consumed exactly like parsed script output: the
/// same sort and smooth-hue pass, with baseline events still the loader's
/// concern.
fn convert(
    records: HashMap<String, Vec<EmbeddedEvent>>,
) -> Result<HashMap<Lane, Vec<TriggerEvent>>, EmbeddedError> {
    let mut per_lane: HashMap<Lane, Vec<TriggerEvent>> = HashMap::new();
    for (name, entries) in records {
        let lane = Lane::from_token(&name).ok_or_else(|| EmbeddedError::UnknownLane(name.clone()))?;
        let mut events = Vec::with_capacity(entries.len());
        for entry in entries {
            let start_color = HslColor::from_hex_rgb(&entry.start_color)?;
            let end_color = match &entry.end_color {
                Some(hex) => HslColor::from_hex_rgb(hex)?,
                None => start_color,
            };
            let mut event = TriggerEvent::new(entry.time, entry.duration, start_color, end_color);
            event.smooth_hue_transition();
            events.push(event);
        }
        events.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(std::cmp::Ordering::Less)
        });
        per_lane.entry(lane).or_default().extend(events);
    }
    Ok(per_lane)
}
