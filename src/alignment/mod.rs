pub mod coverage;
pub mod engine;
pub mod hints;
pub mod normalize;
pub mod order_check;
pub mod scoring;
pub mod similarity;
pub mod spatial;
