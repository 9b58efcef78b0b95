//! Effects: nodes that transform a routed signal.

mod lowpass;

pub use lowpass::lowpass;
