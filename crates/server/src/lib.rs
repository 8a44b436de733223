//! The HTTP shell around the query engine: state, routes, and the request
//! pipeline that sequences generation, validation and execution.

pub mod error;
pub mod pipeline;
pub mod routes;
pub mod state;
