//! Tick Runner - Background thread that ticks the game at regular intervals

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::world::{GameWorld, TickResult};

/// Real milliseconds between ticks for a base interval and game speed
pub fn interval_for_speed(base_ms: u64, speed: f64) -> u64 {
    if speed > 0.0 && speed.is_finite() {
        ((base_ms as f64 / speed).round() as u64).max(1)
    } else {
        base_ms
    }
}

#[derive(Debug, Clone)]
struct Autosave {
    path: PathBuf,
    every_ticks: u64,
}

/// Runner that drives a shared game from a background thread
pub struct TickRunner {
    is_running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    autosave: Option<Autosave>,
}

impl TickRunner {
    pub fn new() -> Self {
        Self {
            is_running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            autosave: None,
        }
    }

    /// Save to `path` every `every_ticks` ticks; 0 disables autosave
    pub fn with_autosave(mut self, path: impl Into<PathBuf>, every_ticks: u64) -> Self {
        self.autosave = (every_ticks > 0).then(|| Autosave {
            path: path.into(),
            every_ticks,
        });
        self
    }

    /// Start ticking
    ///
    /// # Arguments
    /// * `world` - Shared game
    /// * `interval_ms` - Milliseconds between ticks at game speed 1.0
    /// * `callback` - Called with each tick's summary; paused ticks are skipped
    pub fn start<F>(&mut self, world: Arc<Mutex<GameWorld>>, interval_ms: u64, callback: F)
    where
        F: Fn(TickResult) + Send + 'static,
    {
        if self.is_running.load(Ordering::Relaxed) {
            warn!("Tick runner already running");
            return;
        }

        info!("Starting tick runner ({}ms base interval)", interval_ms);
        self.is_running.store(true, Ordering::Relaxed);
        let running = Arc::clone(&self.is_running);
        let autosave = self.autosave.clone();

        let handle = thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                let (tick_result, speed) = {
                    let mut game = world.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    let result = game.tick();

                    if let (Some(result), Some(autosave)) = (&result, &autosave) {
                        if result.tick % autosave.every_ticks == 0 {
                            match game.save_to_file(&autosave.path) {
                                Ok(stats) => debug!("Autosaved {} bytes", stats.bytes),
                                Err(e) => warn!("Autosave failed: {}", e),
                            }
                        }
                    }
                    (result, game.game_speed)
                };

                if let Some(result) = tick_result {
                    callback(result);
                }

                thread::sleep(Duration::from_millis(interval_for_speed(interval_ms, speed)));
            }
            info!("Tick runner thread stopped");
        });

        self.thread_handle = Some(handle);
    }

    /// Stop ticking and wait for the thread
    pub fn stop(&mut self) {
        if !self.is_running.load(Ordering::Relaxed) {
            return;
        }

        info!("Stopping tick runner...");
        self.is_running.store(false, Ordering::Relaxed);

        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("Tick runner thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }
}

impl Default for TickRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TickRunner {
    fn drop(&mut self) {
        self.stop();
    }
}
