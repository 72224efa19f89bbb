//! BIFF8 worksheet records and the aggregates built from them.
//!
//! Reading goes bytes -> [`RecordStream`] (typed [`Record`]s, with `CONTINUE` fragments joined
//! where the record allows it) -> [`SheetRecords`], which groups page setup, custom views,
//! conditional formats, column and row outline state and sheet protection into editable blocks.
//! Every block writes back through [`RecordAggregate`]; an unedited sheet serializes to the same
//! bytes it was read from.
//!
//! Records the aggregates do not interpret are kept as [`Record::Unknown`].

mod error;
mod reader;
mod stream;

pub mod aggregates;
pub mod record;
pub mod sheet;

pub use aggregates::RecordAggregate;
pub use error::RecordFormatError;
pub use reader::{
    BiffRecord, BiffRecordIter, LogicalBiffRecord, LogicalBiffRecordIter, RecordStreamOptions,
};
pub use record::{Record, MAX_RECORD_DATA_SIZE};
pub use sheet::SheetRecords;
pub use stream::RecordStream;
