//! Distance metric and nearest-first ranking

mod search;

pub use search::{cosine_distance, rank_nearest};
