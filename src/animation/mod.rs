pub mod track;

pub use self::track::{opacity_style, FadeTrack};

/// Something whose inline style the animator can overwrite.
pub trait PresentationTarget {
    fn set_style(&mut self, style: &str);
}

/// Whether the animation still wants frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Done,
}

/// Frame counter plus the per-frame step derived from the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    pub current_frame: u32,
    pub total_frames: u32,
    pub change_per_frame: f64,
}

impl AnimationState {
    pub fn new(track: &FadeTrack) -> Self {
        Self {
            current_frame: 0,
            total_frames: track.total_frames(),
            change_per_frame: track.change_per_frame(),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.current_frame < self.total_frames {
            Phase::Running
        } else {
            Phase::Done
        }
    }
}

/// Advances an [`AnimationState`] once per animation frame and writes the
/// resulting opacity to a [`PresentationTarget`].
///
/// The animator never schedules itself. `tick` returns whether another frame
/// should be requested and the driver decides what to do with that.
#[derive(Debug, Clone)]
pub struct FrameAnimator {
    track: FadeTrack,
    state: AnimationState,
}

impl FrameAnimator {
    pub fn new(track: FadeTrack) -> Self {
        Self {
            state: AnimationState::new(&track),
            track,
        }
    }

    pub fn track(&self) -> &FadeTrack {
        &self.track
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Opacity for the current frame (the start value before the first tick).
    pub fn opacity(&self) -> f64 {
        self.track.value_at(self.state.current_frame)
    }

    /// One animation step. Returns `true` while more frames are wanted.
    ///
    /// Once Done, further calls leave the state and the target untouched.
    pub fn tick(&mut self, target: &mut impl PresentationTarget) -> bool {
        if self.phase() == Phase::Done {
            log::debug!(
                "tick ignored: fade already finished at frame {}",
                self.state.current_frame
            );
            return false;
        }

        self.state.current_frame += 1;
        let new_opacity = self.opacity();
        target.set_style(&opacity_style(new_opacity));

        self.state.current_frame < self.state.total_frames
    }
}
