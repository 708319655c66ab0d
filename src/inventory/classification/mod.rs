//! Device Classification Module
//!
//! Maps normalized USB devices onto the canonical device type taxonomy.

pub mod classifier;
pub mod rules;

pub use classifier::*;
pub use rules::*;
