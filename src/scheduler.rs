use std::time::Duration;

use instant::Instant;

use crate::animation::{FadeTrack, FrameAnimator, Phase};
use crate::dom::{Document, MissingElement, NodeId};

/// Something that displays a line of text.
pub trait TextTarget {
    fn set_text(&mut self, text: &str);
}

// ---------------------------------------------------------------------------
// Frame scheduler
// ---------------------------------------------------------------------------

/// Host side of `requestAnimationFrame`: remembers whether a frame callback
/// is wanted and when it may run next.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Duration,
    requested: bool,
    last_run: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            requested: false,
            last_run: None,
        }
    }

    /// Ask for one callback before the next refresh. Repeated requests
    /// within a frame collapse into one.
    pub fn request_frame(&mut self) {
        self.requested = true;
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// When the pending callback becomes due, or `None` if nothing is pending.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        if !self.requested {
            return None;
        }
        match self.last_run {
            Some(last) => Some((last + self.interval).max(now)),
            None => Some(now),
        }
    }

    /// Consume the pending request if it is due at `now`.
    pub fn take_frame(&mut self, now: Instant) -> bool {
        match self.next_deadline(now) {
            Some(due) if due <= now => {
                self.requested = false;
                self.last_run = Some(now);
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Frame loop
// ---------------------------------------------------------------------------

/// Drives a [`FrameAnimator`] from scheduler callbacks.
///
/// Each callback writes `count: N` to the counter element, ticks the
/// animator against the fade element, and re-requests a frame only if
/// the animator wants one.
#[derive(Debug)]
pub struct FrameLoop {
    animator: FrameAnimator,
    scheduler: FrameScheduler,
    target: NodeId,
    output: NodeId,
    callbacks: u64,
}

impl FrameLoop {
    /// Resolve `div` #0 (fade) and `div` #1 (counter) once and cache them.
    pub fn new(
        doc: &Document,
        track: FadeTrack,
        interval: Duration,
    ) -> Result<Self, MissingElement> {
        let target = doc.require("div", 0)?;
        let output = doc.require("div", 1)?;
        Ok(Self {
            animator: FrameAnimator::new(track),
            scheduler: FrameScheduler::new(interval),
            target,
            output,
            callbacks: 0,
        })
    }

    /// Register the first callback.
    pub fn start(&mut self) {
        let track = self.animator.track();
        let state = self.animator.state();
        log::info!(
            "fade starting: {} -> {} over {} frames (step {:.5}), {:?} per frame",
            track.start_value(),
            track.end_value(),
            state.total_frames,
            state.change_per_frame,
            self.scheduler.interval
        );
        self.scheduler.request_frame();
    }

    pub fn animator(&self) -> &FrameAnimator {
        &self.animator
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Cached fade element (`div` #0).
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Cached counter element (`div` #1).
    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Frame callbacks run so far.
    pub fn callbacks(&self) -> u64 {
        self.callbacks
    }

    pub fn is_done(&self) -> bool {
        self.animator.phase() == Phase::Done
    }

    /// The frame callback body. Returns the animator's continue signal.
    pub fn run_frame(&mut self, doc: &mut Document) -> bool {
        doc.get_mut(self.output)
            .set_text(&format!("count: {}", self.callbacks));
        self.callbacks += 1;

        let more = self.animator.tick(doc.get_mut(self.target));
        log::debug!(
            "frame {} -> style {:?}",
            self.animator.state().current_frame,
            doc.get(self.target).style
        );

        if more {
            self.scheduler.request_frame();
        } else {
            log::info!(
                "fade finished after {} callbacks at opacity {:.3}",
                self.callbacks,
                self.animator.opacity()
            );
        }
        more
    }

    /// Run the pending callback if it is due. Returns true if one ran.
    pub fn poll(&mut self, doc: &mut Document, now: Instant) -> bool {
        if !self.scheduler.take_frame(now) {
            return false;
        }
        self.run_frame(doc);
        true
    }

    /// When the next callback is due, if any is pending.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        self.scheduler.next_deadline(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FRAME_INTERVAL;

    fn page_loop() -> (Document, FrameLoop) {
        let doc = Document::comment_page();
        let fl = FrameLoop::new(&doc, FadeTrack::OPACITY, FRAME_INTERVAL).unwrap();
        (doc, fl)
    }

    /// Jump the clock to each deadline until nothing is requested.
    /// Returns the number of callbacks run.
    fn run_to_completion(fl: &mut FrameLoop, doc: &mut Document) -> u64 {
        let mut now = Instant::now();
        let before = fl.callbacks();
        while let Some(due) = fl.next_deadline(now) {
            now = due;
            fl.poll(doc, now);
        }
        fl.callbacks() - before
    }

    #[test]
    fn scheduler_idle_until_requested() {
        let mut s = FrameScheduler::new(Duration::from_millis(10));
        let now = Instant::now();
        assert_eq!(s.next_deadline(now), None);
        assert!(!s.take_frame(now));

        s.request_frame();
        s.request_frame();
        assert!(s.take_frame(now));
        assert!(!s.take_frame(now));
        assert!(!s.is_requested());
    }

    #[test]
    fn scheduler_respects_interval() {
        let mut s = FrameScheduler::new(Duration::from_millis(10));
        let t0 = Instant::now();
        s.request_frame();
        assert!(s.take_frame(t0));

        s.request_frame();
        assert_eq!(s.next_deadline(t0), Some(t0 + Duration::from_millis(10)));
        assert!(!s.take_frame(t0 + Duration::from_millis(5)));
        assert!(s.take_frame(t0 + Duration::from_millis(10)));
    }

    #[test]
    fn missing_targets_reported() {
        let mut doc = Document::new();
        doc.append(crate::dom::Element::new("div"));
        let err = FrameLoop::new(&doc, FadeTrack::OPACITY, FRAME_INTERVAL).unwrap_err();
        assert_eq!(err, MissingElement { tag: "div", index: 1 });
        assert_eq!(err.to_string(), "document has no <div> at index 1");
    }

    #[test]
    fn nothing_runs_before_start() {
        let (mut doc, mut fl) = page_loop();
        assert!(!fl.poll(&mut doc, Instant::now()));
        assert_eq!(run_to_completion(&mut fl, &mut doc), 0);
    }

    #[test]
    fn first_callback_writes_count_and_style() {
        let (mut doc, mut fl) = page_loop();
        fl.start();
        assert!(fl.poll(&mut doc, Instant::now()));

        let fade = doc.query_selector("div", 0).unwrap();
        let counter = doc.query_selector("div", 1).unwrap();
        assert_eq!(doc.get(counter).inner_html, "count: 0");
        assert!(doc.get(fade).style.starts_with("opacity:0.1074"));
        assert!(fl.scheduler().is_requested());
    }

    #[test]
    fn full_loop_stops_itself() {
        let (mut doc, mut fl) = page_loop();
        fl.start();
        assert_eq!(run_to_completion(&mut fl, &mut doc), 120);
        assert_eq!(fl.callbacks(), 120);
        assert!(fl.is_done());
        assert!(!fl.scheduler().is_requested());
        assert_eq!(fl.animator().state().current_frame, 120);

        let fade = doc.query_selector("div", 0).unwrap();
        let counter = doc.query_selector("div", 1).unwrap();
        assert_eq!(doc.get(counter).inner_html, "count: 119");
        assert!((doc.get(fade).opacity() - 0.999).abs() < 1e-6);

        // Nothing left to schedule.
        assert_eq!(fl.next_deadline(Instant::now()), None);
        assert_eq!(run_to_completion(&mut fl, &mut doc), 0);
    }

    #[test]
    fn every_callback_matches_fade_formula() {
        let (mut doc, mut fl) = page_loop();
        let fade = doc.query_selector("div", 0).unwrap();
        let counter = doc.query_selector("div", 1).unwrap();
        let step = (0.999 - 0.1) / 120.0;

        for n in 1..=120u32 {
            let more = fl.run_frame(&mut doc);
            assert_eq!(more, n < 120, "continue signal on frame {n}");
            assert_eq!(
                doc.get(fade).style,
                format!("opacity:{}", n as f64 * step + 0.1)
            );
            assert_eq!(doc.get(counter).inner_html, format!("count: {}", n - 1));
        }
    }

    #[test]
    fn extra_callback_after_done_keeps_final_style() {
        let (mut doc, mut fl) = page_loop();
        fl.start();
        run_to_completion(&mut fl, &mut doc);
        let fade = doc.query_selector("div", 0).unwrap();
        let final_style = doc.get(fade).style.clone();

        assert!(!fl.run_frame(&mut doc));
        assert_eq!(doc.get(fade).style, final_style);
        assert_eq!(fl.animator().state().current_frame, 120);
    }
}
