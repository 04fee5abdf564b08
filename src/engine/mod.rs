//! Pure selection over a [`Corpus`](crate::corpus::Corpus): substring
//! filtering and cosine-similarity ranking. Neither function mutates anything,
//! so both are safe to call from any number of tasks at once.

pub mod filter;
pub mod rank;

pub use filter::filter;
pub use rank::{cosine_similarity, rank};
