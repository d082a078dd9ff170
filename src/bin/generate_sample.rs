use std::path::PathBuf;

use air_quality_api::data::loader::save_file;
use air_quality_api::data::model::{Dataset, Entry};
use anyhow::Result;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Monitoring sites: (latitude, longitude, baseline PM2.5 in µg/m³).
const SITES: [(f64, f64, f64); 6] = [
    (51.5074, -0.1278, 11.0),
    (48.8566, 2.3522, 13.5),
    (40.7128, -74.0060, 8.5),
    (28.6139, 77.2090, 95.0),
    (39.9042, 116.4074, 60.0),
    (-33.8688, 151.2093, 7.0),
];

fn main() -> Result<()> {
    env_logger::init();

    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("PM25_dataset.csv"));

    let mut rng = SimpleRng::new(42);
    let mut entries = Vec::new();

    for year in 2010..=2022 {
        // Slow improvement over time at every site.
        let trend = 1.0 - 0.02 * (year - 2010) as f64;
        for &(lat, long, baseline) in &SITES {
            let pm25 = rng.gauss(baseline * trend, baseline * 0.1).max(0.0);
            entries.push(Entry::new(year, lat, long, (pm25 * 100.0).round() / 100.0));
        }
    }

    let dataset = Dataset::from_entries(entries);
    save_file(&output_path, &dataset)?;

    println!(
        "Wrote {} entries ({} sites) to {}",
        dataset.len(),
        SITES.len(),
        output_path.display()
    );
    Ok(())
}
