//! Frame pacing over a looping playlist.
//!
//! The player owns the playlist and a transport. Each pull asks the active
//! source for one view, submits its bytes and arms the timer for the view's
//! own duration. A driver calls [`Player::poll`] whenever
//! [`Player::next_deadline`] has passed.

use std::{fmt, rc::Rc, time::Duration, time::Instant};

use crate::{
    animation::{Animation, Pull},
    codec::Codec,
    config::PlayerConfig,
    timeline::{PacingTimer, SharedClock},
    transport::Transport,
    AnimationView, IciclesError, Result,
};

/// Subscriber notified with the frame counter after every pull.
pub trait FrameListener {
    fn on_frame(&self, frame: u64);
}

impl<F: Fn(u64)> FrameListener for F {
    fn on_frame(&self, frame: u64) {
        self(frame)
    }
}

/// Counters describing the work the player has done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub pulls: u64,
    pub frames_submitted: u64,
    /// Times playback moved to the next playlist entry.
    pub advances: u64,
    /// Times playback went from the last entry back to the first.
    pub wraps: u64,
    pub last_pull_time: Duration,
    pub max_pull_time: Duration,
}

impl PlaybackStats {
    fn record_pull(&mut self, elapsed: Duration) {
        self.pulls += 1;
        self.last_pull_time = elapsed;
        self.max_pull_time = self.max_pull_time.max(elapsed);
    }
}

pub struct Player<T: Transport> {
    transport: T,
    clock: SharedClock,
    config: PlayerConfig,
    animations: Vec<Animation>,
    current: Option<usize>,
    playing: bool,
    frame: u64,
    view: AnimationView,
    timer: PacingTimer,
    listeners: Vec<Rc<dyn FrameListener>>,
    stats: PlaybackStats,
}

impl<T: Transport> Player<T> {
    pub fn new(transport: T, clock: SharedClock, config: PlayerConfig) -> Self {
        let view = AnimationView::blank(
            config.fallback_x_count as usize * config.fallback_y_count as usize,
            config.fallback_radio_panels_count as usize,
            config.blank_frame_duration(),
        );
        Self {
            transport,
            clock,
            timer: PacingTimer::new(config.pacing),
            config,
            animations: Vec::new(),
            current: None,
            playing: false,
            frame: 0,
            view,
            listeners: Vec::new(),
            stats: PlaybackStats::default(),
        }
    }

    /// Starts playback at the first entry. `Some` replaces the playlist,
    /// `None` replays the current one.
    pub fn play(&mut self, animations: Option<Vec<Animation>>) -> Result<()> {
        match &animations {
            Some(list) if list.is_empty() => return Err(IciclesError::EmptyPlaylist),
            None if self.animations.is_empty() => return Err(IciclesError::NothingToPlay),
            _ => {}
        }

        if self.playing {
            self.stop();
        }
        if let Some(list) = animations {
            for animation in &mut self.animations {
                animation.dispose();
            }
            self.animations = list;
            tracing::info!(count = self.animations.len(), "playlist replaced");
        }

        self.start_at(0);
        Ok(())
    }

    /// Switches to the entry at `index` and restarts pacing from its first
    /// frame. Out-of-range indices leave the player untouched.
    pub fn play_animation_at(&mut self, index: usize) -> Result<()> {
        let len = self.animations.len();
        if index >= len {
            return Err(IciclesError::IndexOutOfRange { index, len });
        }

        self.timer.cancel();
        if let Some(current) = self.current {
            self.animations[current].dispose();
        }
        self.start_at(index);
        Ok(())
    }

    /// Cancels pacing, releases the active source and blanks the display.
    pub fn stop(&mut self) {
        self.timer.cancel();
        if let Some(current) = self.current {
            self.animations[current].dispose();
        }
        if self.playing {
            tracing::info!(index = ?self.current, "playback stopped");
        }
        self.playing = false;
        self.frame = 0;

        self.view = self.blank_view();
        self.transport.send_frame(&self.view.to_bytes());
        self.transport.end_stream();
        self.notify();
    }

    /// Pulls the next view if the pacing deadline has passed. Returns whether
    /// a pull happened.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now();
        if !self.playing || !self.timer.is_due(now) {
            return false;
        }
        let fired = self.timer.take();
        self.advance(now, fired);
        true
    }

    /// Pulls the next view immediately, ignoring the pending deadline.
    pub fn step(&mut self) -> Result<()> {
        if !self.playing || self.current.is_none() {
            return Err(IciclesError::NoActiveSource);
        }
        let now = self.clock.now();
        self.timer.cancel();
        self.advance(now, None);
        Ok(())
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        if self.playing {
            self.timer.deadline()
        } else {
            None
        }
    }

    pub fn add_listener(&mut self, listener: Rc<dyn FrameListener>) -> Result<()> {
        if self.listeners.iter().any(|known| same_listener(known, &listener)) {
            return Err(IciclesError::DuplicateListener);
        }
        self.listeners.push(listener);
        Ok(())
    }

    pub fn remove_listener(&mut self, listener: &Rc<dyn FrameListener>) -> Result<()> {
        let position = self
            .listeners
            .iter()
            .position(|known| same_listener(known, listener))
            .ok_or(IciclesError::UnknownListener)?;
        self.listeners.remove(position);
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    pub fn current_animation(&self) -> Option<&Animation> {
        self.current.and_then(|index| self.animations.get(index))
    }

    pub fn current_animation_index(&self) -> Option<usize> {
        self.current
    }

    /// Frames pulled from the active source since it (re)started.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Last view handed to the transport.
    pub fn view(&self) -> &AnimationView {
        &self.view
    }

    pub fn progress(&self) -> f64 {
        self.current_animation()
            .map(Animation::progress)
            .unwrap_or(0.0)
    }

    pub fn set_progress(&mut self, progress: f64) {
        if let Some(index) = self.current {
            self.animations[index].set_progress(progress);
        }
    }

    /// Swaps the codec of the music animation being played. Its live
    /// analyser is retuned before the next pull.
    pub fn set_codec(&mut self, codec: Codec) -> Result<()> {
        let index = self
            .current
            .filter(|_| self.playing)
            .ok_or(IciclesError::NoActiveSource)?;
        match &mut self.animations[index] {
            Animation::Music(animation) => animation.set_codec(codec),
            Animation::File(_) => Err(IciclesError::InvalidInput(
                "only music animations render through a codec",
            )),
        }
    }

    pub fn stats(&self) -> &PlaybackStats {
        &self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn start_at(&mut self, index: usize) {
        self.current = Some(index);
        self.playing = true;
        self.frame = 0;
        let animation = &mut self.animations[index];
        animation.play();
        tracing::info!(index, name = animation.name(), "starting animation");
        self.advance(self.clock.now(), None);
    }

    /// Pulls until a view is produced, moving along the playlist for every
    /// source that has ended. Stops if a whole cycle yields nothing.
    fn advance(&mut self, now: Duration, fired: Option<Duration>) {
        let mut ended = 0;
        while let Some(index) = self.current {
            let started = Instant::now();
            let pull = self.animations[index].pull_next();
            self.stats.record_pull(started.elapsed());

            match pull {
                Pull::Frame(view) => {
                    self.submit(view, now, fired);
                    return;
                }
                Pull::Ended => {
                    self.transport.end_stream();
                    ended += 1;
                    if ended > self.animations.len() {
                        tracing::warn!("no animation in the playlist produced a frame");
                        self.stop();
                        return;
                    }
                    self.move_to_next(index);
                }
            }
        }
    }

    fn move_to_next(&mut self, index: usize) {
        let next = (index + 1) % self.animations.len();
        self.animations[index].dispose();
        self.stats.advances += 1;
        if next == 0 {
            self.stats.wraps += 1;
        }

        self.current = Some(next);
        self.frame = 0;
        let animation = &mut self.animations[next];
        animation.play();
        tracing::info!(from = index, to = next, name = animation.name(), "advancing playlist");
    }

    fn submit(&mut self, view: AnimationView, now: Duration, fired: Option<Duration>) {
        self.transport.send_frame(&view.to_bytes());
        self.stats.frames_submitted += 1;

        let delay = view.frame.duration;
        self.view = view;
        self.frame += 1;
        self.notify();
        self.timer.schedule(now, fired, delay);
        tracing::debug!(frame = self.frame, ?delay, "frame submitted");
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener.on_frame(self.frame);
        }
    }

    fn blank_view(&self) -> AnimationView {
        let duration = self.config.blank_frame_duration();
        match self.current_animation() {
            Some(animation) => AnimationView::blank_for(animation.header(), duration),
            None => AnimationView::blank(
                self.config.fallback_x_count as usize * self.config.fallback_y_count as usize,
                self.config.fallback_radio_panels_count as usize,
                duration,
            ),
        }
    }
}

fn same_listener(a: &Rc<dyn FrameListener>, b: &Rc<dyn FrameListener>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

impl<T: Transport + fmt::Debug> fmt::Debug for Player<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("transport", &self.transport)
            .field("playing", &self.playing)
            .field("current", &self.current)
            .field("frame", &self.frame)
            .field("deadline", &self.timer.deadline())
            .field("listeners", &self.listeners.len())
            .field("stats", &self.stats)
            .finish()
    }
}
