use rand::Rng;

use crate::scraper::DriverConfig;

/// Synthetic browser identity drawn independently for every driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub chrome_major: u32,
    pub user_agent: String,
    pub width: u32,
    pub height: u32,
}

impl Fingerprint {
    pub fn random(config: &DriverConfig) -> Self {
        let mut rng = rand::rng();
        let chrome_major = draw(&mut rng, config.chrome_major_min, config.chrome_major_max);
        let width = draw(&mut rng, config.viewport_width_min, config.viewport_width_max);
        let height = draw(&mut rng, config.viewport_height_min, config.viewport_height_max);
        Self::new(chrome_major, width, height)
    }

    pub fn new(chrome_major: u32, width: u32, height: u32) -> Self {
        Self {
            chrome_major,
            user_agent: format!(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36",
                chrome_major
            ),
            width,
            height,
        }
    }
}

/// Inclusive draw that tolerates a reversed range
fn draw(rng: &mut impl Rng, a: u32, b: u32) -> u32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    rng.random_range(lo..=hi)
}
