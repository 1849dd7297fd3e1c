pub mod json;
pub mod language;
pub mod record;

pub use json::{append_json_array, read_json_array, write_json_array};
pub use record::ItemRecord;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
