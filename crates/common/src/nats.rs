mod client;
mod trace_context;
mod traits;

pub use client::*;
pub use trace_context::*;
pub use traits::*;
