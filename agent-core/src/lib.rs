pub mod metrics;
pub mod prelude;
pub mod strng;
pub mod telemetry;

pub use strng::Strng;
