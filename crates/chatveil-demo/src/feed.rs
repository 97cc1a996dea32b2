//! Scripted chat traffic for the demo feed

use rand::seq::SliceRandom;
use rand::Rng;

const POSITIVE_COMMENTS: &[&str] = &[
    "what an amazing overtake!",
    "this stream is the best",
    "love this commentary team",
    "great strategy call there",
    "awesome defending into turn one",
    "fantastic pit stop, so quick",
    "wonderful racecraft on display",
    "happy to catch this one live",
];

const NEGATIVE_COMMENTS: &[&str] = &[
    "that was a terrible decision",
    "this driver is so bad today",
    "awful stewarding again",
    "i hate how this race is going",
    "worst pit call of the season",
    "horrible tire choice, just horrible",
    "so disappointed in the team",
    "angry about that penalty",
];

const NEUTRAL_COMMENTS: &[&str] = &[
    "lap 32 of 57",
    "yellow flag in sector two",
    "pit window opens soon",
    "gap is 2.4 seconds now",
    "both cars on the medium tire",
    "drs enabled this lap",
];

/// Random comment source with a configurable negative share
pub struct ChatFeed {
    negative_share: f64,
}

impl ChatFeed {
    pub fn new(negative_share: f64) -> Self {
        Self {
            negative_share: negative_share.clamp(0.0, 1.0),
        }
    }

    /// Draw one comment
    pub fn next_comment(&self, rng: &mut impl Rng) -> &'static str {
        let pool = if rng.gen_bool(self.negative_share) {
            NEGATIVE_COMMENTS
        } else if rng.gen_bool(0.5) {
            POSITIVE_COMMENTS
        } else {
            NEUTRAL_COMMENTS
        };
        pool.choose(rng).copied().unwrap_or("...")
    }
}
