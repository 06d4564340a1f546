use crate::game::color::HslColor;
use crate::game::lane::Lane;
use crate::game::triggers::TriggerEvent;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Any parse failure aborts the whole file: the caller must not install a
/// partial timeline. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Format { line: usize, message: String },
    #[error("line {line}: lane '{}' already has a start color", .lane.as_str())]
    DuplicateDefinition { line: usize, lane: Lane },
    #[error("line {line}: invalid color variable name '{name}'")]
    InvalidIdentifier { line: usize, name: String },
    #[error("line {line}: no start color declared for lane '{}'", .lane.as_str())]
    UndefinedColor { line: usize, lane: Lane },
    #[error("line {line}: unknown color variable '{name}'")]
    UndefinedVariable { line: usize, name: String },
    #[error("line {line}: 'endrepeat' without an open 'repeat' block")]
    UnexpectedEndRepeat { line: usize },
    #[error("{open} 'repeat' block(s) left open at end of file")]
    UnbalancedRepeat { open: usize },
}

fn format_err(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::Format {
        line,
        message: message.into(),
    }
}

struct ScriptLine {
    number: usize,
    tokens: Vec<String>,
}

/// An active `repeat` block. The body is re-walked `count` times; every
/// time literal parsed inside the nest is shifted by `interval * iteration`
/// for each enclosing frame, so nested repeats compose additively.
struct RepeatFrame {
    body_start: usize,
    interval: f32,
    count: u32,
    iteration: u32,
}

#[derive(Default)]
struct ParserState {
    events: HashMap<Lane, Vec<TriggerEvent>>,
    defined: HashMap<Lane, HslColor>,
    variables: HashMap<String, HslColor>,
}

/// Parses one chroma script into per-lane event lists, sorted by start time
/// with the smooth-hue correction applied. Baseline events are the loader's
/// concern, not the parser's.
pub fn parse_script(source: &str) -> Result<HashMap<Lane, Vec<TriggerEvent>>, ParseError> {
    let lines = tokenize(source);
    let mut state = ParserState::default();
    let mut stack: Vec<RepeatFrame> = Vec::new();
    let mut pc = 0usize;

    while pc < lines.len() {
        let ScriptLine { number, tokens } = &lines[pc];
        let line = *number;
        match tokens[0].as_str() {
            "repeat" => {
                if tokens.len() != 4 || tokens[2] != "interval" {
                    return Err(format_err(line, "expected 'repeat <count> interval <seconds>'"));
                }
                let count: u32 = tokens[1]
                    .parse()
                    .map_err(|_| format_err(line, format!("invalid repeat count '{}'", tokens[1])))?;
                let interval = parse_float(line, &tokens[3])?;
                if count == 0 {
                    pc = find_block_end(&lines, pc, stack.len())? + 1;
                    continue;
                }
                stack.push(RepeatFrame {
                    body_start: pc + 1,
                    interval,
                    count,
                    iteration: 0,
                });
            }
            "endrepeat" => {
                if tokens.len() != 1 {
                    return Err(format_err(line, "'endrepeat' takes no arguments"));
                }
                let Some(frame) = stack.last_mut() else {
                    return Err(ParseError::UnexpectedEndRepeat { line });
                };
                frame.iteration += 1;
                if frame.iteration < frame.count {
                    pc = frame.body_start;
                    continue;
                }
                stack.pop();
            }
            "start" => state.handle_start(line, tokens)?,
            "set" => state.handle_set(line, tokens)?,
            "instant" => state.handle_instant(line, tokens, &stack)?,
            "swap" => state.handle_swap(line, tokens, &stack)?,
            _ => state.handle_transition(line, tokens, &stack)?,
        }
        pc += 1;
    }

    if !stack.is_empty() {
        return Err(ParseError::UnbalancedRepeat { open: stack.len() });
    }

    for events in state.events.values_mut() {
        events.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(Ordering::Less)
        });
        for event in events.iter_mut() {
            event.smooth_hue_transition();
        }
    }
    Ok(state.events)
}

/// Strips comments/blank lines and lowercases every token; the grammar is
/// entirely case-insensitive.
fn tokenize(source: &str) -> Vec<ScriptLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            Some(ScriptLine {
                number: idx + 1,
                tokens: trimmed
                    .split_whitespace()
                    .map(|t| t.to_ascii_lowercase())
                    .collect(),
            })
        })
        .collect()
}

/// Index of the `endrepeat` matching the `repeat` at `open_idx`, honoring
/// nesting. `outer_open` is how many blocks were already open, for the
/// error report if the file ends first.
fn find_block_end(
    lines: &[ScriptLine],
    open_idx: usize,
    outer_open: usize,
) -> Result<usize, ParseError> {
    let mut depth = 1usize;
    for (offset, line) in lines[open_idx + 1..].iter().enumerate() {
        match line.tokens[0].as_str() {
            "repeat" => depth += 1,
            "endrepeat" => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open_idx + 1 + offset);
                }
            }
            _ => {}
        }
    }
    Err(ParseError::UnbalancedRepeat {
        open: outer_open + 1,
    })
}

fn parse_float(line: usize, token: &str) -> Result<f32, ParseError> {
    token
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format_err(line, format!("invalid number '{token}'")))
}

/// A time literal, shifted by the enclosing repeat iterations.
fn parse_time(line: usize, token: &str, stack: &[RepeatFrame]) -> Result<f32, ParseError> {
    let offset: f32 = stack
        .iter()
        .map(|frame| frame.interval * frame.iteration as f32)
        .sum();
    Ok(parse_float(line, token)? + offset)
}

fn parse_lane(line: usize, token: &str) -> Result<Lane, ParseError> {
    Lane::from_token(token).ok_or_else(|| format_err(line, format!("unknown lane '{token}'")))
}

fn parse_hex(line: usize, token: &str) -> Result<HslColor, ParseError> {
    HslColor::from_hex_rgb(token).map_err(|e| format_err(line, e.to_string()))
}

impl ParserState {
    fn push(&mut self, lane: Lane, event: TriggerEvent) {
        self.events.entry(lane).or_default().push(event);
    }

    /// A lane's most recently resolved color: the end color of the last
    /// event pushed for it (encounter order), else its declared default.
    fn last_color(&self, line: usize, lane: Lane) -> Result<HslColor, ParseError> {
        if let Some(event) = self.events.get(&lane).and_then(|events| events.last()) {
            return Ok(event.end_color);
        }
        self.defined
            .get(&lane)
            .copied()
            .ok_or(ParseError::UndefinedColor { line, lane })
    }

    /// The `<color>` token rule: `#hex` literal, `default` (the line's own
    /// lane), `default<lane>`, else a named variable.
    fn resolve_color(
        &self,
        line: usize,
        token: &str,
        context: Option<Lane>,
    ) -> Result<HslColor, ParseError> {
        if token.starts_with('#') {
            return parse_hex(line, token);
        }
        if token == "default" {
            let Some(lane) = context else {
                return Err(format_err(
                    line,
                    "bare 'default' has no lane here; use default<lane>",
                ));
            };
            return self
                .defined
                .get(&lane)
                .copied()
                .ok_or(ParseError::UndefinedColor { line, lane });
        }
        if let Some(rest) = token.strip_prefix("default")
            && let Some(lane) = Lane::from_token(rest)
        {
            return self
                .defined
                .get(&lane)
                .copied()
                .ok_or(ParseError::UndefinedColor { line, lane });
        }
        self.variables
            .get(token)
            .copied()
            .ok_or_else(|| ParseError::UndefinedVariable {
                line,
                name: token.to_string(),
            })
    }

    fn handle_start(&mut self, line: usize, tokens: &[String]) -> Result<(), ParseError> {
        if tokens.len() != 3 {
            return Err(format_err(line, "expected 'start <lane> <hexColor>'"));
        }
        let lane = parse_lane(line, &tokens[1])?;
        let color = parse_hex(line, &tokens[2])?;
        if self.defined.contains_key(&lane) {
            return Err(ParseError::DuplicateDefinition { line, lane });
        }
        self.defined.insert(lane, color);
        self.push(lane, TriggerEvent::instant(0.0, color));
        Ok(())
    }

    fn handle_set(&mut self, line: usize, tokens: &[String]) -> Result<(), ParseError> {
        if tokens.len() != 3 {
            return Err(format_err(line, "expected 'set <name> <hexColor>'"));
        }
        let name = &tokens[1];
        let valid = !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid || name == "default" {
            return Err(ParseError::InvalidIdentifier {
                line,
                name: name.clone(),
            });
        }
        let color = parse_hex(line, &tokens[2])?;
        self.variables.insert(name.clone(), color);
        Ok(())
    }

    fn handle_instant(
        &mut self,
        line: usize,
        tokens: &[String],
        stack: &[RepeatFrame],
    ) -> Result<(), ParseError> {
        if tokens.len() != 4 {
            return Err(format_err(line, "expected 'instant <lane> <time> <color>'"));
        }
        let lane = parse_lane(line, &tokens[1])?;
        let time = parse_time(line, &tokens[2], stack)?;
        let color = self.resolve_color(line, &tokens[3], Some(lane))?;
        self.push(lane, TriggerEvent::instant(time, color));
        Ok(())
    }

    fn handle_swap(
        &mut self,
        line: usize,
        tokens: &[String],
        stack: &[RepeatFrame],
    ) -> Result<(), ParseError> {
        match tokens.get(1).map(String::as_str) {
            Some("instant") => {
                if tokens.len() != 5 {
                    return Err(format_err(
                        line,
                        "expected 'swap instant <time> <lane1> <lane2>'",
                    ));
                }
                let time = parse_time(line, &tokens[2], stack)?;
                let first = parse_lane(line, &tokens[3])?;
                let second = parse_lane(line, &tokens[4])?;
                let first_color = self.last_color(line, first)?;
                let second_color = self.last_color(line, second)?;
                self.push(first, TriggerEvent::instant(time, second_color));
                self.push(second, TriggerEvent::instant(time, first_color));
                Ok(())
            }
            Some("flash") => {
                if tokens.len() != 7 {
                    return Err(format_err(
                        line,
                        "expected 'swap flash <time> <endTime> <lane1> <lane2> <flashColor>'",
                    ));
                }
                let time = parse_time(line, &tokens[2], stack)?;
                let end_time = parse_time(line, &tokens[3], stack)?;
                let first = parse_lane(line, &tokens[4])?;
                let second = parse_lane(line, &tokens[5])?;
                let flash = self.resolve_color(line, &tokens[6], None)?;
                let first_color = self.last_color(line, first)?;
                let second_color = self.last_color(line, second)?;
                let duration = end_time - time;
                self.push(first, TriggerEvent::new(time, duration, flash, second_color));
                self.push(second, TriggerEvent::new(time, duration, flash, first_color));
                Ok(())
            }
            _ => Err(format_err(
                line,
                "expected 'swap instant ...' or 'swap flash ...'",
            )),
        }
    }

    /// The generic rule: `<lane> <startTime> <endTime> <startColor>
    /// <endColor>`. A negative span is left as authored; the evaluator's
    /// lerp clamping makes it a hold.
    fn handle_transition(
        &mut self,
        line: usize,
        tokens: &[String],
        stack: &[RepeatFrame],
    ) -> Result<(), ParseError> {
        let Some(lane) = Lane::from_token(&tokens[0]) else {
            return Err(format_err(
                line,
                format!("unknown keyword or lane '{}'", tokens[0]),
            ));
        };
        if tokens.len() != 5 {
            return Err(format_err(
                line,
                "expected '<lane> <startTime> <endTime> <startColor> <endColor>'",
            ));
        }
        let start_time = parse_time(line, &tokens[1], stack)?;
        let end_time = parse_time(line, &tokens[2], stack)?;
        let start_color = self.resolve_color(line, &tokens[3], Some(lane))?;
        let end_color = self.resolve_color(line, &tokens[4], Some(lane))?;
        self.push(
            lane,
            TriggerEvent::new(start_time, end_time - start_time, start_color, end_color),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ParseError, parse_script};
    use crate::game::color::HslColor;
    use crate::game::lane::Lane;
    use crate::game::triggers::TriggerEvent;

    fn lane_events(script: &str, lane: Lane) -> Vec<TriggerEvent> {
        parse_script(script)
            .expect("script should parse")
            .remove(&lane)
            .unwrap_or_default()
    }

    fn times(events: &[TriggerEvent]) -> Vec<f32> {
        events.iter().map(|e| e.start_time).collect()
    }

    const RED: HslColor = HslColor::new(0.0, 1.0, 0.5);

    #[test]
    fn start_declares_default_and_emits_instant_event() {
        let events = lane_events("start notea #ff0000", Lane::NoteA);
        assert_eq!(events, vec![TriggerEvent::instant(0.0, RED)]);
    }

    #[test]
    fn generic_rule_resolves_default_reference() {
        let events = lane_events(
            "start notea #ff0000\nnotea 0 5 default #00ff00",
            Lane::NoteA,
        );
        assert_eq!(events.len(), 2);
        let transition = events[1];
        assert_eq!(transition.start_time, 0.0);
        assert_eq!(transition.duration, 5.0);
        assert_eq!(transition.start_color, RED);
        assert!((transition.end_color.hue - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn duplicate_start_is_rejected() {
        let err = parse_script("start notea #ff0000\nstart notea #00ff00").unwrap_err();
        assert_eq!(
            err,
            ParseError::DuplicateDefinition {
                line: 2,
                lane: Lane::NoteA
            }
        );
    }

    #[test]
    fn variables_resolve_case_insensitively() {
        let events = lane_events("set Warm #ff8000\ninstant beat 2 WARM", Lane::Beat);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_time, 2.0);
        assert_eq!(events[0].end_color, HslColor::from_hex_rgb("ff8000").unwrap());
    }

    #[test]
    fn reserved_and_malformed_variable_names_are_rejected() {
        assert_eq!(
            parse_script("set default #ffffff").unwrap_err(),
            ParseError::InvalidIdentifier {
                line: 1,
                name: "default".to_string()
            }
        );
        assert!(matches!(
            parse_script("set bad!name #ffffff").unwrap_err(),
            ParseError::InvalidIdentifier { line: 1, .. }
        ));
    }

    #[test]
    fn malformed_set_line_aborts_the_file() {
        // Stray space splits the name; the argument count no longer fits.
        assert!(matches!(
            parse_script("set de fault #zzz").unwrap_err(),
            ParseError::Format { line: 1, .. }
        ));
    }

    #[test]
    fn undefined_references_abort_the_file() {
        assert_eq!(
            parse_script("instant notea 1 nope").unwrap_err(),
            ParseError::UndefinedVariable {
                line: 1,
                name: "nope".to_string()
            }
        );
        assert_eq!(
            parse_script("instant notea 1 default").unwrap_err(),
            ParseError::UndefinedColor {
                line: 1,
                lane: Lane::NoteA
            }
        );
    }

    #[test]
    fn repeat_block_expands_with_interval_offsets() {
        let events = lane_events(
            "repeat 3 interval 10\ninstant notea 1 #ffffff\nendrepeat",
            Lane::NoteA,
        );
        assert_eq!(times(&events), vec![1.0, 11.0, 21.0]);
    }

    #[test]
    fn nested_repeats_compose_additively() {
        let script = "\
repeat 2 interval 100
repeat 2 interval 10
instant notea 1 #ff0000
endrepeat
endrepeat";
        let events = lane_events(script, Lane::NoteA);
        assert_eq!(times(&events), vec![1.0, 11.0, 101.0, 111.0]);
    }

    #[test]
    fn zero_count_repeat_skips_its_body() {
        let script = "\
repeat 0 interval 10
instant notea 1 #ff0000
endrepeat
instant notea 50 #ff0000";
        let events = lane_events(script, Lane::NoteA);
        assert_eq!(times(&events), vec![50.0]);
    }

    #[test]
    fn unbalanced_repeat_blocks_are_rejected() {
        assert_eq!(
            parse_script("repeat 2 interval 1\ninstant notea 1 #ffffff").unwrap_err(),
            ParseError::UnbalancedRepeat { open: 1 }
        );
        assert_eq!(
            parse_script("endrepeat").unwrap_err(),
            ParseError::UnexpectedEndRepeat { line: 1 }
        );
    }

    #[test]
    fn swap_instant_exchanges_lane_colors() {
        let script = "start notea #ff0000\nstart noteb #0000ff\nswap instant 5 notea noteb";
        let parsed = parse_script(script).unwrap();
        let blue = HslColor::from_hex_rgb("0000ff").unwrap();

        let notea = &parsed[&Lane::NoteA];
        assert_eq!(notea[1].start_time, 5.0);
        assert_eq!(notea[1].end_color, blue);

        let noteb = &parsed[&Lane::NoteB];
        assert_eq!(noteb[1].start_time, 5.0);
        assert_eq!(noteb[1].end_color, RED);
    }

    #[test]
    fn swap_uses_last_pushed_color_over_the_default() {
        let script = "\
start notea #ff0000
start noteb #0000ff
notea 0 2 default #00ff00
swap instant 5 notea noteb";
        let parsed = parse_script(script).unwrap();
        let green = HslColor::from_hex_rgb("00ff00").unwrap();
        // noteb inherits notea's most recent end color, not its default.
        assert_eq!(parsed[&Lane::NoteB][1].end_color, green);
    }

    #[test]
    fn swap_flash_builds_symmetric_transitions() {
        let script = "\
start notea #ff0000
start noteb #0000ff
swap flash 4 6 notea noteb defaultnoteb";
        let parsed = parse_script(script).unwrap();
        let blue = HslColor::from_hex_rgb("0000ff").unwrap();

        let flash_a = parsed[&Lane::NoteA][1];
        assert_eq!(flash_a.start_time, 4.0);
        assert_eq!(flash_a.duration, 2.0);
        assert_eq!(flash_a.start_color, blue);
        assert_eq!(flash_a.end_color, blue);

        let flash_b = parsed[&Lane::NoteB][1];
        assert_eq!(flash_b.start_color, blue);
        assert_eq!(flash_b.end_color, RED);
    }

    #[test]
    fn repeat_offsets_apply_inside_swap_flash() {
        let script = "\
start notea #ff0000
start noteb #0000ff
repeat 2 interval 20
swap flash 1 3 notea noteb #ffff00
endrepeat";
        let parsed = parse_script(script).unwrap();
        let starts: Vec<f32> = parsed[&Lane::NoteA][1..].iter().map(|e| e.start_time).collect();
        assert_eq!(starts, vec![1.0, 21.0]);
        assert!(parsed[&Lane::NoteA][1..].iter().all(|e| e.duration == 2.0));
    }

    #[test]
    fn comments_blank_lines_and_case_are_handled() {
        let script = "\

# full-line comment
START NoteA #FF0000
  # indented comment
INSTANT notea 3 DEFAULT";
        let events = lane_events(script, Lane::NoteA);
        assert_eq!(times(&events), vec![0.0, 3.0]);
        assert_eq!(events[1].end_color, RED);
    }

    #[test]
    fn events_are_sorted_per_lane_after_parse() {
        let script = "\
start notea #ff0000
instant notea 9 default
instant notea 4 default";
        let events = lane_events(script, Lane::NoteA);
        assert_eq!(times(&events), vec![0.0, 4.0, 9.0]);
    }

    #[test]
    fn smooth_hue_correction_runs_after_parse() {
        let events = lane_events(
            "start notea #808080\nnotea 0 5 default #00ff00",
            Lane::NoteA,
        );
        let transition = events[1];
        assert!((transition.start_color.hue - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(transition.start_color.saturation, 0.0);
    }

    #[test]
    fn unknown_keyword_or_lane_is_a_format_error() {
        assert!(matches!(
            parse_script("wobble 0 1 #ff0000 #00ff00").unwrap_err(),
            ParseError::Format { line: 1, .. }
        ));
    }
}
