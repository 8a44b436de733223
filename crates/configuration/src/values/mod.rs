mod inference;
mod limits;
mod pool_settings;
mod secret;
mod uri;

pub use inference::{ApiKey, InferenceSettings};
pub use limits::QueryLimits;
pub use pool_settings::PoolSettings;
pub use secret::Secret;
pub use uri::ConnectionUri;
