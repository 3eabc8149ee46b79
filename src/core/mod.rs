pub mod batch;
pub mod decoder;
pub mod etl;
pub mod field_parsers;
pub mod header_validator;
pub mod keep_alive;
pub mod pipeline;
pub mod transformer;

pub use crate::domain::model::{ErrorRow, ImportSummary, MovieRecord, RawRow};
pub use crate::domain::ports::{ConfigProvider, InputSource, MovieStore};
pub use crate::utils::error::Result;
