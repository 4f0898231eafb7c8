//! Coverage module
//!
//! Provides:
//! - Cobertura XML parsing
//! - Reference vs candidate comparison with per-file regressions
//! - Rendering of the comparison for each publishing channel

mod cobertura;
mod compare;
mod message;
mod model;
pub mod percent;

pub use cobertura::*;
pub use compare::*;
pub use message::*;
pub use model::*;
