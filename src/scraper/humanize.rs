use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::app::Result;
use crate::scraper::{DriverConfig, Page};

/// Interaction run once after a driver's first navigation.
#[async_trait]
pub trait Humanizer: Send + Sync {
    async fn humanize(&self, page: &dyn Page) -> Result<()>;
}

/// Does nothing; used when evasion is unnecessary and in tests
pub struct NoopHumanizer;

#[async_trait]
impl Humanizer for NoopHumanizer {
    async fn humanize(&self, _page: &dyn Page) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Move { x: f64, y: f64 },
    Scroll { dy: f64 },
}

/// A few randomized pointer moves followed by a scroll, with pauses.
pub struct PointerHumanizer {
    moves: u32,
    pause_min_ms: u64,
    pause_max_ms: u64,
}

impl PointerHumanizer {
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            moves: config.pointer_moves,
            pause_min_ms: config.pause_min_ms,
            pause_max_ms: config.pause_max_ms.max(config.pause_min_ms),
        }
    }

    /// The gesture plan is drawn up front; the thread rng must not live
    /// across an await.
    fn plan(&self) -> Vec<(Gesture, Duration)> {
        let mut rng = rand::rng();
        let mut plan = Vec::with_capacity(self.moves as usize + 1);

        for step in 0..self.moves {
            let offset = f64::from(step) * 100.0;
            let x = rng.random_range(100.0 + offset..=800.0 + offset * 2.0);
            let y = rng.random_range(100.0 + offset..=500.0 + offset);
            plan.push((Gesture::Move { x, y }, self.pause(&mut rng)));
        }

        let dy = rng.random_range(100.0..=400.0);
        plan.push((Gesture::Scroll { dy }, self.pause(&mut rng)));
        plan
    }

    fn pause(&self, rng: &mut impl Rng) -> Duration {
        Duration::from_millis(rng.random_range(self.pause_min_ms..=self.pause_max_ms))
    }
}

#[async_trait]
impl Humanizer for PointerHumanizer {
    async fn humanize(&self, page: &dyn Page) -> Result<()> {
        for (gesture, pause) in self.plan() {
            match gesture {
                Gesture::Move { x, y } => page.move_pointer(x, y).await?,
                Gesture::Scroll { dy } => page.scroll_by(dy).await?,
            }
            tokio::time::sleep(pause).await;
        }
        Ok(())
    }
}
