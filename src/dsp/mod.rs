//! Signal conditioning stages: rolling statistics, detrending,
//! normalization, and bandpass filtering.
//!
//! Each stage is an explicit state value with a pure `update` method so the
//! pipeline owns all mutation and every stage is directly unit-testable.

mod bandpass;
mod detrend;
mod normalize;
mod window;

pub use bandpass::BandpassFilter;
pub use detrend::Detrender;
pub use normalize::Normalizer;
pub use window::SlidingWindow;
