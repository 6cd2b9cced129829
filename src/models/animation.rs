//! Grouping of keyframe frame names into named animation ranges.
//!
//! Keyframe models store every frame of every animation back to back, named
//! `walk1`, `walk2`, ..., `run1`, ... The grouping relies on that naming
//! convention: a trailing number of at most two digits, restarting near 1 for
//! each animation. Names that do not follow it are still grouped by prefix,
//! but the frame numbers no longer line up.

use tracing::debug;

use crate::models::mesh::AnimationRange;

/// Longest numeric suffix stripped from a frame name.
const MAX_SUFFIX_DIGITS: usize = 2;

/// Split `walk12` into `("walk", 12)`.
///
/// At most two trailing ASCII digits are taken; a name without any yields a
/// frame number of 0.
pub fn split_frame_name(name: &str) -> (&str, usize) {
    let digits = name
        .bytes()
        .rev()
        .take(MAX_SUFFIX_DIGITS)
        .take_while(u8::is_ascii_digit)
        .count();
    let (prefix, suffix) = name.split_at(name.len() - digits);
    (prefix, suffix.parse().unwrap_or(0))
}

/// Group frames into contiguous ranges of equal name prefix.
///
/// A range opens at the first frame of each prefix run, offset by that
/// frame's number minus one, and closes on the frame before the next prefix
/// (or on the last frame). Prefixes compare ignoring ASCII case.
pub fn extract_animation_ranges<S: AsRef<str>>(frame_names: &[S]) -> Vec<AnimationRange> {
    let mut ranges = Vec::new();
    let Some(last) = frame_names.len().checked_sub(1) else {
        return ranges;
    };

    let mut current: Option<AnimationRange> = None;
    for (index, name) in frame_names.iter().enumerate() {
        let (prefix, number) = split_frame_name(name.as_ref());

        let prefix_changed = current
            .as_ref()
            .is_none_or(|range| !range.name.eq_ignore_ascii_case(prefix));
        if prefix_changed {
            if let Some(range) = current.take() {
                ranges.push(close_range(range, index - 1));
            }
            current = Some(AnimationRange {
                name: prefix.to_string(),
                start_frame: index + number.saturating_sub(1),
                end_frame: index,
            });
        }

        if index == last {
            if let Some(range) = current.take() {
                ranges.push(close_range(range, index));
            }
        }
    }

    debug!(frames = frame_names.len(), ranges = ranges.len(), "extracted animation ranges");
    ranges
}

fn close_range(mut range: AnimationRange, end_frame: usize) -> AnimationRange {
    range.end_frame = end_frame;
    // A suffix that does not restart at 1 can push the start past the end.
    range.start_frame = range.start_frame.min(end_frame);
    range
}
