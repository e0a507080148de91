//! Result Shaping
//!
//! Turns the nested JSON records returned by the IoT Central query API into
//! flat, typed tables a dashboard can plot:
//!
//! - **Flatten**: nested objects become dotted keys (`telemetry.temp`)
//! - **Schema**: column order and types, inferred in first-seen order
//! - **Builder**: rows aligned to the schema, timestamps as epoch millis

mod builder;
mod error;
mod flatten;
mod schema;

pub use builder::{to_epoch_millis, FrameBuilder, TabularResult};
pub use error::{FrameError, FrameResult};
pub use flatten::{flatten_record, FlatRecord};
pub use schema::{Column, ColumnSchema, FieldType};
