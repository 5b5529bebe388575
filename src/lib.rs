// Community Fund Tracker - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod config;
pub mod entities;
pub mod error;
pub mod export;
pub mod persistence;
pub mod remote;
pub mod session;
pub mod store;
pub mod summary;

// Re-export commonly used types
pub use config::{FundConfig, SheetNames};
pub use entities::{
    authorize, Action, CollectionKind, Contribution, ContributionDraft, Mentor, MentorDraft, PaymentType, Record,
    Role, Tab, User, Village,
};
pub use error::{FundError, Result};
pub use export::{export_rows, write_csv, EXPORT_HEADERS};
pub use persistence::{KeyValueStore, MemoryKeyValueStore, PersistenceFallback, SqliteKeyValueStore};
pub use remote::{MemorySheets, RemoteStatus, SheetsAdapter, SheetsClient, TabularService};
pub use session::{MutationReport, RemoteOutcome, Session, SessionStatus, SyncMode};
pub use store::{Collection, RecordStore};
pub use summary::{ContributionFilter, DashboardSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
