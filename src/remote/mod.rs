//! Remote sync: a row-oriented spreadsheet ↔ the record store.
//!
//! [`TabularService`] is the transport seam (get/update/append values over
//! A1 ranges). [`SheetsAdapter`] is the capability-gated client the session
//! talks to; it owns the per-entity layouts and the row codecs.

pub mod adapter;
pub mod layout;
pub mod memory;
pub mod sheets;

pub use adapter::{RemoteStatus, SheetsAdapter};
pub use layout::{column_letter, SheetLayout, SheetRow};
pub use memory::MemorySheets;
pub use sheets::SheetsClient;

use crate::error::Result;
use async_trait::async_trait;

/// Values addressed as `Sheet!A1:H9`, rows of string cells
#[async_trait]
pub trait TabularService: Send + Sync {
    /// Establish a session with the resource; an error means "unavailable"
    async fn open_session(&self) -> Result<()>;

    /// Rows in `range`; trailing empty cells/rows may be omitted
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>>;

    /// Overwrite the cells starting at the top-left of `range`
    async fn update_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<()>;

    /// Insert `rows` after the last non-empty row of the sheet
    async fn append_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<()>;
}
