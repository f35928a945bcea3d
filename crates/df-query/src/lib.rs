//! DataFoundation Query Engine
//!
//! Time-aware lookups over stored entities: decoded metadata, attribute
//! values active at an instant, filtered relationship enumeration and
//! entity search.

pub mod criteria;
pub mod engine;

pub use criteria::{SearchCriteria, TimeBounds};
pub use engine::{AttributeValue, QueryEngine};
