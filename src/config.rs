use std::time::Duration;

use crate::animation::FadeTrack;

/// Opacity the fade starts from (frame 0).
pub const FADE_FROM: f64 = 0.1;
/// Opacity the fade reaches on its terminal frame.
pub const FADE_TO: f64 = 0.999;
/// Number of ticks in the fade.
pub const TOTAL_FRAMES: u32 = 120;
/// Longest comment (in chars) the form accepts.
pub const MAX_COMMENT_LEN: usize = 100;
/// Minimum spacing between animation-frame callbacks (~30 Hz).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);
/// Initial window size in physical pixels.
pub const WINDOW_SIZE: (u32, u32) = (640, 480);
/// Side length of the fading square in pixels.
pub const SQUARE_SIZE: f32 = 160.0;

/// Tuning knobs handed to the host at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub fade: FadeTrack,
    pub max_comment_len: usize,
    pub frame_interval: Duration,
    pub window_size: (u32, u32),
    pub square_size: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fade: FadeTrack::OPACITY,
            max_comment_len: MAX_COMMENT_LEN,
            frame_interval: FRAME_INTERVAL,
            window_size: WINDOW_SIZE,
            square_size: SQUARE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fade_matches_constants() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.fade.total_frames(), TOTAL_FRAMES);
        assert_eq!(cfg.fade.start_value(), FADE_FROM);
        assert_eq!(cfg.fade.end_value(), FADE_TO);
        assert_eq!(cfg.max_comment_len, 100);
    }
}
