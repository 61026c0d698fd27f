//! HTS alignment file parsing
//!
//! Each line is `start end full-context-label`, times in 100 ns units.
//! State-level alignments carry the state slot as a `[k]` suffix on the
//! label, `k` counting from 2 as in HTS.

use std::path::Path;

use super::LabelError;

/// One aligned interval
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: u64,
    pub end: u64,
    /// Full-context label with any state suffix removed
    pub name: String,
    /// Zero-based state index for state-level alignments
    pub state: Option<usize>,
}

/// Parse alignment text
///
/// # Errors
/// `LabelError::Parse` for a line with fewer than three fields, unparsable
/// times, `end < start`, segments out of time order, or (state level) a
/// missing or out-of-range state suffix.
pub fn parse_alignment(
    content: &str,
    path: &Path,
    state_level: bool,
    states_per_phone: usize,
) -> Result<Vec<Segment>, LabelError> {
    let mut segments: Vec<Segment> = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let error = |reason: String| LabelError::Parse {
            path: path.to_path_buf(),
            line: line_no + 1,
            reason,
        };

        let mut fields = line.split_whitespace();
        let (Some(start), Some(end), Some(label)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(error("expected 'start end label'".to_string()));
        };

        let start: u64 = start
            .parse()
            .map_err(|_| error(format!("invalid start time '{}'", start)))?;
        let end: u64 = end
            .parse()
            .map_err(|_| error(format!("invalid end time '{}'", end)))?;
        if end < start {
            return Err(error(format!("end {} is before start {}", end, start)));
        }
        if let Some(prev) = segments.last() {
            if start < prev.start {
                return Err(error(format!(
                    "start {} is before previous start {}",
                    start, prev.start
                )));
            }
        }

        let (name, state) = if state_level {
            let (name, slot) = split_state_suffix(label)
                .ok_or_else(|| error(format!("state-level label '{}' has no [k] suffix", label)))?;
            if slot < 2 || slot > states_per_phone + 1 {
                return Err(error(format!(
                    "state slot {} outside 2..={}",
                    slot,
                    states_per_phone + 1
                )));
            }
            (name.to_string(), Some(slot - 2))
        } else {
            (label.to_string(), None)
        };

        segments.push(Segment {
            start,
            end,
            name,
            state,
        });
    }

    Ok(segments)
}

/// Split `name[k]` into `("name", k)`
fn split_state_suffix(label: &str) -> Option<(&str, usize)> {
    let body = label.strip_suffix(']')?;
    let open = body.rfind('[')?;
    let slot = body[open + 1..].parse().ok()?;
    Some((&body[..open], slot))
}
