pub mod collector;
pub mod constraints;
pub mod engine;
pub mod expr;
pub mod output;
pub mod pipeline;
pub mod problem;
pub mod sampler;

pub use crate::domain::model::{Point, ResultSet};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Sampler, Storage};
pub use crate::utils::error::Result;
