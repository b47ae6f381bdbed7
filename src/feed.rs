// ===============================
// src/feed.rs
// ===============================
//
// Candidate sources:
// - RandomFeed : demo generator (random tokens/metrics, like a noisy scanner)
// - FixedFeed  : fixed watch-list, same batch every cycle
//
// Neither talks to a real market; they only dress random numbers as candidates.
//

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::FeedMode;
use crate::domain::Candidate;

pub const DEMO_TOKENS: [&str; 10] = [
    "PEPE", "SHIB", "FLOKI", "CHAD", "WOJAK", "BONK", "MEME", "DOGE2", "BABYDOGE", "SAFEMOON",
];

const NETWORK: &str = "BSC";

pub trait CandidateSource: Send {
    fn next_batch(&mut self) -> Vec<Candidate>;
}

fn round_dp(v: f64, dp: i32) -> f64 {
    let f = 10f64.powi(dp);
    (v * f).round() / f
}

pub struct RandomFeed {
    rng: StdRng,
    batch: usize,
}

impl RandomFeed {
    pub fn new(batch: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng, batch: batch.max(1) }
    }

    pub fn draw(&mut self) -> Candidate {
        let symbol = DEMO_TOKENS[self.rng.gen_range(0..DEMO_TOKENS.len())];
        // price >= 1e-6, so rounding to 8 decimals keeps it > 0
        Candidate {
            token_symbol: symbol.to_string(),
            network: NETWORK.to_string(),
            confidence: round_dp(self.rng.gen_range(85.0..=98.0), 1),
            market_cap: round_dp(self.rng.gen_range(25_000.0..=300_000.0), 0),
            liquidity: round_dp(self.rng.gen_range(75_000.0..=500_000.0), 0),
            proposed_entry_price: round_dp(self.rng.gen_range(0.000001..=0.01), 8),
        }
    }
}

impl CandidateSource for RandomFeed {
    fn next_batch(&mut self) -> Vec<Candidate> {
        (0..self.batch).map(|_| self.draw()).collect()
    }
}

/// Watch-list (symbol, confidence, market cap, liquidity, price).
const WATCHLIST: [(&str, f64, f64, f64, f64); 4] = [
    ("PEPE", 85.0, 50_000.0, 75_000.0, 0.000002),
    ("SHIB", 90.0, 25_000.0, 100_000.0, 0.00001),
    ("DOGE", 78.0, 80_000.0, 120_000.0, 0.08),
    ("FLOKI", 82.0, 35_000.0, 60_000.0, 0.0002),
];

pub struct FixedFeed {
    list: Vec<Candidate>,
}

impl FixedFeed {
    pub fn new(list: Vec<Candidate>) -> Self {
        Self { list }
    }

    pub fn watchlist() -> Self {
        Self::new(
            WATCHLIST
                .iter()
                .map(|&(sym, conf, mc, liq, px)| Candidate {
                    token_symbol: sym.to_string(),
                    network: NETWORK.to_string(),
                    confidence: conf,
                    market_cap: mc,
                    liquidity: liq,
                    proposed_entry_price: px,
                })
                .collect(),
        )
    }
}

impl CandidateSource for FixedFeed {
    fn next_batch(&mut self) -> Vec<Candidate> {
        self.list.clone()
    }
}

pub fn build(mode: FeedMode, batch: usize, seed: Option<u64>) -> Box<dyn CandidateSource> {
    match mode {
        FeedMode::Random => Box::new(RandomFeed::new(batch, seed)),
        FeedMode::Fixed => Box::new(FixedFeed::watchlist()),
    }
}
