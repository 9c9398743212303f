pub mod seed;

pub use seed::{seed, SeedReport};
