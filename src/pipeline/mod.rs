pub mod extraction;
pub mod structuring;
pub mod recognition;
pub mod normalize;
pub mod processor;
