use crate::config::{FADE_FROM, FADE_TO, TOTAL_FRAMES};

/// Linear numeric animation from `from` to `to` over `total_frames` ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeTrack {
    from: f64,
    to: f64,
    total_frames: u32,
}

impl FadeTrack {
    /// The page fade: 0.1 -> 0.999 over 120 frames.
    pub const OPACITY: FadeTrack = match FadeTrack::new(FADE_FROM, FADE_TO, TOTAL_FRAMES) {
        Some(track) => track,
        None => panic!("opacity fade needs at least one frame"),
    };

    /// Returns `None` for a zero-length track.
    pub const fn new(from: f64, to: f64, total_frames: u32) -> Option<Self> {
        if total_frames == 0 {
            return None;
        }
        Some(Self {
            from,
            to,
            total_frames,
        })
    }

    pub fn start_value(&self) -> f64 {
        self.from
    }

    pub fn end_value(&self) -> f64 {
        self.to
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    pub fn change_per_frame(&self) -> f64 {
        (self.to - self.from) / self.total_frames as f64
    }

    /// Value on `frame`. Not clamped: frames past the end keep extrapolating.
    pub fn value_at(&self, frame: u32) -> f64 {
        frame as f64 * self.change_per_frame() + self.from
    }
}

/// Style declaration written to the presentation target.
pub fn opacity_style(opacity: f64) -> String {
    format!("opacity:{opacity}")
}
