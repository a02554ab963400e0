pub mod error;
pub mod schema;
pub mod util;
pub mod value;
pub mod verdict;

pub use error::{SchemaError, TracedError, UtilError};
pub use schema::*;
pub use util::*;
pub use value::{FieldValue, Record, ValueKind};
pub use verdict::{FieldVerdict, RecordVerdict, Verdict};
