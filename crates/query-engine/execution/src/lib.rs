//! Query execution against a PostgreSQL database, and serialization of the
//! results into a closed value representation.

pub mod error;
pub mod metrics;
pub mod query;
pub mod rows;

pub use error::Error;
pub use metrics::Metrics;
pub use query::execute;
pub use rows::{RowSet, Value};
