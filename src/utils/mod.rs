mod plotting;

pub use plotting::*;
