use instant::Instant;

use super::ring::RingBuffer;

/// Which part of a redraw a span covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TracePhase {
    /// Animation-frame callbacks.
    Script = 0,
    /// Building the page UI.
    Ui = 1,
    /// GPU upload, pass, submit and present.
    Render = 2,
}

impl TracePhase {
    pub const ALL: [TracePhase; 3] = [Self::Script, Self::Ui, Self::Render];

    pub fn label(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Ui => "ui",
            Self::Render => "render",
        }
    }
}

/// Microseconds spent in each phase during one redraw, indexed by `TracePhase`.
pub type FrameSample = [f64; 3];

const EMA_ALPHA: f64 = 0.1;

/// Timed spans for each redraw phase plus a short history of past redraws.
pub struct FrameTrace {
    open: Option<(TracePhase, Instant)>,
    current: FrameSample,
    smoothed: FrameSample,
    history: RingBuffer<FrameSample>,
    redraws: u64,
}

impl FrameTrace {
    pub fn new(history_len: usize) -> Self {
        Self {
            open: None,
            current: [0.0; 3],
            smoothed: [0.0; 3],
            history: RingBuffer::new(history_len),
            redraws: 0,
        }
    }

    /// Open a span. A span still open is discarded.
    pub fn begin(&mut self, phase: TracePhase) {
        if let Some((stale, _)) = self.open {
            log::trace!("{} span never closed", stale.label());
        }
        self.open = Some((phase, Instant::now()));
    }

    /// Close the span for `phase`. An end that doesn't match the open span is ignored.
    pub fn end(&mut self, phase: TracePhase) {
        match self.open {
            Some((open, start)) if open == phase => {
                self.open = None;
                self.add(phase, start.elapsed().as_secs_f64() * 1_000_000.0);
            }
            _ => log::trace!("unmatched end of {} span", phase.label()),
        }
    }

    fn add(&mut self, phase: TracePhase, elapsed_us: f64) {
        self.current[phase as usize] += elapsed_us;
    }

    /// Close out the redraw: keep its spans in history and fold them into
    /// the running averages.
    pub fn finish_frame(&mut self) {
        let sample = std::mem::take(&mut self.current);
        for (avg, us) in self.smoothed.iter_mut().zip(sample) {
            *avg = *avg * (1.0 - EMA_ALPHA) + us * EMA_ALPHA;
        }
        self.history.push(sample);
        self.redraws += 1;
        log::trace!(
            "redraw {}: script {:.0}us, ui {:.0}us, render {:.0}us",
            self.redraws,
            sample[0],
            sample[1],
            sample[2]
        );
    }

    /// EMA-smoothed duration of `phase` (microseconds).
    pub fn smoothed_us(&self, phase: TracePhase) -> f64 {
        self.smoothed[phase as usize]
    }

    /// Sum of the smoothed phase durations.
    pub fn total_us(&self) -> f64 {
        self.smoothed.iter().sum()
    }

    /// Recent redraws, oldest first.
    pub fn history(&self) -> &RingBuffer<FrameSample> {
        &self.history
    }

    pub fn redraws(&self) -> u64 {
        self.redraws
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_accumulate_within_a_redraw() {
        let mut t = FrameTrace::new(4);
        t.add(TracePhase::Render, 60.0);
        t.add(TracePhase::Render, 40.0);
        t.add(TracePhase::Script, 5.0);
        t.finish_frame();

        let last = t.history().iter().last().copied();
        assert_eq!(last, Some([5.0, 0.0, 100.0]));
        assert!((t.smoothed_us(TracePhase::Render) - 10.0).abs() < 1e-9);
        assert!((t.total_us() - 10.5).abs() < 1e-9);
        assert_eq!(t.redraws(), 1);
    }

    #[test]
    fn ema_moves_toward_sample() {
        let mut t = FrameTrace::new(4);
        for _ in 0..2 {
            t.add(TracePhase::Ui, 100.0);
            t.finish_frame();
        }
        assert!((t.smoothed_us(TracePhase::Ui) - 19.0).abs() < 1e-9);
        assert_eq!(t.smoothed_us(TracePhase::Script), 0.0);
    }

    #[test]
    fn unmatched_end_is_ignored() {
        let mut t = FrameTrace::new(2);
        t.end(TracePhase::Script);
        t.begin(TracePhase::Ui);
        t.end(TracePhase::Render);
        t.finish_frame();
        assert_eq!(t.history().iter().last().copied(), Some([0.0; 3]));

        // The Ui span is still open and closes normally.
        t.end(TracePhase::Ui);
        t.finish_frame();
        assert_eq!(t.history().len(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let mut t = FrameTrace::new(3);
        for _ in 0..10 {
            t.finish_frame();
        }
        assert_eq!(t.history().len(), 3);
        assert_eq!(t.redraws(), 10);
    }
}
