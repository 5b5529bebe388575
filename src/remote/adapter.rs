// 🔄 Remote Sync Adapter - capability-gated client over a TabularService
//
// initialize() decides whether the remote can be used at all. Every other
// operation fails with `Unavailable` until it has succeeded.
// Rows are located by their key column with a linear scan; row counts are
// small and this is never on a hot path.

use super::layout::{cell, SheetLayout, SheetRow};
use super::TabularService;
use crate::config::{FundConfig, SheetNames};
use crate::entities::{CollectionKind, User, Village};
use crate::error::{FundError, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Available,
    Unavailable,
}

pub struct SheetsAdapter<S> {
    service: S,
    sheets: SheetNames,
    configured: bool,
    status: RemoteStatus,
}

impl<S: TabularService> SheetsAdapter<S> {
    pub fn new(service: S, config: &FundConfig) -> Self {
        SheetsAdapter {
            service,
            sheets: config.sheets.clone(),
            configured: config.remote_configured(),
            status: RemoteStatus::Unavailable,
        }
    }

    pub fn status(&self) -> RemoteStatus {
        self.status
    }

    pub fn is_available(&self) -> bool {
        self.status == RemoteStatus::Available
    }

    pub fn layout(&self, kind: CollectionKind) -> SheetLayout {
        SheetLayout::for_kind(kind, &self.sheets)
    }

    // ========================================================================
    // SESSION
    // ========================================================================

    /// Try to open a session. Never errors: an unset credential or a failed
    /// handshake both just mean `Unavailable`.
    pub async fn initialize(&mut self) -> RemoteStatus {
        self.status = if !self.configured {
            info!("Remote credential not configured, using local storage only");
            RemoteStatus::Unavailable
        } else {
            match self.service.open_session().await {
                Ok(()) => {
                    info!("Remote spreadsheet session established");
                    RemoteStatus::Available
                }
                Err(e) => {
                    warn!(error = %e, "Remote spreadsheet unreachable, using local storage only");
                    RemoteStatus::Unavailable
                }
            }
        };
        self.status
    }

    /// Drop back to `Unavailable` after the session turned out unusable
    pub fn mark_unavailable(&mut self) {
        self.status = RemoteStatus::Unavailable;
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(FundError::Unavailable("remote session not initialized".to_string()))
        }
    }

    // ========================================================================
    // READ
    // ========================================================================

    /// All well-formed data rows of `T`'s sheet, in sheet order.
    /// Reserved header rows are skipped; incomplete rows are dropped.
    pub async fn fetch_all<T: SheetRow>(&self) -> Result<Vec<T>> {
        self.ensure_available()?;
        let layout = self.layout(T::KIND);
        let rows = self.service.get_values(&layout.full_range()).await?;

        let kind = T::KIND;
        let total = rows.len().saturating_sub(layout.reserved_rows());
        let records: Vec<T> = rows
            .iter()
            .skip(layout.reserved_rows())
            .filter_map(|row| T::from_row(row))
            .collect();

        debug!(
            kind = %kind,
            rows = total,
            skipped = total - records.len(),
            "Fetched remote rows"
        );
        Ok(records)
    }

    // ========================================================================
    // WRITE
    // ========================================================================

    pub async fn append<T: SheetRow>(&self, record: &T) -> Result<()> {
        self.ensure_available()?;
        let layout = self.layout(T::KIND);
        self.service
            .append_values(&layout.full_range(), vec![record.to_row()])
            .await
    }

    /// Overwrite the row whose key column equals `key`
    pub async fn update_by_key<T: SheetRow>(&self, key: &T::Key, record: &T) -> Result<()> {
        self.ensure_available()?;
        let layout = self.layout(T::KIND);
        let row_number = self.find_row(&layout, &key.to_string()).await?;
        self.service
            .update_values(&layout.row_range(row_number), vec![record.to_row()])
            .await
    }

    /// Blank the matching row instead of removing it, so row positions stay put
    pub async fn soft_delete<T: SheetRow>(&self, key: &T::Key) -> Result<()> {
        self.ensure_available()?;
        let layout = self.layout(T::KIND);
        let row_number = self.find_row(&layout, &key.to_string()).await?;
        self.service
            .update_values(&layout.row_range(row_number), vec![layout.blank_row()])
            .await
    }

    /// 1-based sheet row holding `key`, scanning data rows only
    async fn find_row(&self, layout: &SheetLayout, key: &str) -> Result<usize> {
        let rows = self.service.get_values(&layout.full_range()).await?;

        rows.iter()
            .enumerate()
            .skip(layout.reserved_rows())
            .find(|(_, row)| cell(row, layout.key_column) == key)
            .map(|(index, _)| index + 1)
            .ok_or_else(|| FundError::not_found(layout.kind, key))
    }

    // ========================================================================
    // PROVISIONING
    // ========================================================================

    /// Write title/header rows for every sheet and seed default users and villages
    pub async fn initialize_sheets(&self) -> Result<()> {
        self.ensure_available()?;

        for kind in CollectionKind::ALL {
            let layout = self.layout(kind);
            let headers = layout.header_rows();
            let range = layout.rows_range(1, headers.len());
            self.service.update_values(&range, headers).await?;
        }

        let users: Vec<Vec<String>> = User::defaults().iter().map(|u| u.to_row()).collect();
        self.service
            .append_values(&self.layout(CollectionKind::Users).full_range(), users)
            .await?;

        let villages: Vec<Vec<String>> = Village::defaults().iter().map(|v| v.to_row()).collect();
        self.service
            .append_values(&self.layout(CollectionKind::Villages).full_range(), villages)
            .await?;

        info!("Remote sheets initialized with headers and defaults");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Contribution, Mentor, PaymentType};
    use crate::remote::MemorySheets;
    use chrono::NaiveDate;

    fn configured() -> FundConfig {
        FundConfig {
            spreadsheet_id: "test-sheet".to_string(),
            api_key: Some("test-key".to_string()),
            ..FundConfig::default()
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn contribution_sheet() -> Vec<Vec<String>> {
        vec![
            row(&["Community Fund Contributions"]),
            row(&["ID", "Date", "Donor Name", "Contact", "Village", "Locality", "Amount", "Payment Type"]),
            row(&["1", "2024-01-15", "Rajesh Kumar", "9876543210", "Chandrapur", "Main Market", "5000", "Cash"]),
            row(&["2", "2024-01-16", "Priya Sharma", "", "Mohisguha", "Village Center", "3000", "Online"]),
        ]
    }

    async fn ready(sheets: &MemorySheets) -> SheetsAdapter<MemorySheets> {
        let mut adapter = SheetsAdapter::new(sheets.clone(), &configured());
        assert_eq!(adapter.initialize().await, RemoteStatus::Available);
        adapter
    }

    #[tokio::test]
    async fn test_initialize_without_credential_is_unavailable() {
        let mut adapter = SheetsAdapter::new(MemorySheets::new(), &FundConfig::default());

        assert_eq!(adapter.initialize().await, RemoteStatus::Unavailable);
        assert!(matches!(
            adapter.fetch_all::<Contribution>().await,
            Err(FundError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_initialize_unreachable_is_unavailable() {
        let sheets = MemorySheets::new();
        sheets.set_unreachable(true);
        let mut adapter = SheetsAdapter::new(sheets, &configured());

        assert_eq!(adapter.initialize().await, RemoteStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_fetch_all_skips_headers_and_blank_rows() {
        let sheets = MemorySheets::new();
        let mut rows = contribution_sheet();
        rows.insert(3, row(&["", "", "", "", "", "", "", ""]));
        sheets.set_rows("Sheet1", rows);
        let adapter = ready(&sheets).await;

        let contributions = adapter.fetch_all::<Contribution>().await.unwrap();

        assert_eq!(contributions.len(), 2);
        assert_eq!(contributions[0].donor_name, "Rajesh Kumar");
        assert_eq!(contributions[1].payment_type, PaymentType::Online);
    }

    #[tokio::test]
    async fn test_fetch_all_header_only_is_empty() {
        let sheets = MemorySheets::new();
        sheets.set_rows("Sheet1", contribution_sheet()[..2].to_vec());
        sheets.set_rows("Mentors", vec![row(&["ID", "Name", "Contact", "Village", "Locality"])]);
        let adapter = ready(&sheets).await;

        assert!(adapter.fetch_all::<Contribution>().await.unwrap().is_empty());
        assert!(adapter.fetch_all::<Mentor>().await.unwrap().is_empty());
        // Missing sheet entirely
        assert!(adapter.fetch_all::<User>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_without_header_rows_does_not_panic() {
        let sheets = MemorySheets::new();
        sheets.set_rows("Sheet1", contribution_sheet()[2..].to_vec());
        let adapter = ready(&sheets).await;

        assert!(adapter.fetch_all::<Contribution>().await.is_ok());
    }

    #[tokio::test]
    async fn test_append_then_fetch() {
        let sheets = MemorySheets::new();
        sheets.set_rows("Sheet1", contribution_sheet());
        let adapter = ready(&sheets).await;

        let new = Contribution {
            id: 99,
            donor_name: "Test".to_string(),
            donor_contact: String::new(),
            village: "Chandrapur".to_string(),
            locality: "Main Market".to_string(),
            amount: 1000,
            payment_type: PaymentType::Cash,
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        };
        adapter.append(&new).await.unwrap();

        let fetched = adapter.fetch_all::<Contribution>().await.unwrap();
        assert_eq!(fetched.last(), Some(&new));
    }

    #[tokio::test]
    async fn test_update_by_key_missing_is_not_found_and_untouched() {
        let sheets = MemorySheets::new();
        sheets.set_rows("Sheet1", contribution_sheet());
        let adapter = ready(&sheets).await;
        let before = sheets.rows("Sheet1");

        let mut ghost = adapter.fetch_all::<Contribution>().await.unwrap().remove(0);
        ghost.id = 404;
        let result = adapter.update_by_key(&404, &ghost).await;

        assert!(matches!(result, Err(FundError::NotFound { .. })));
        assert_eq!(sheets.rows("Sheet1"), before);
        assert_eq!(sheets.write_count(), 0);
    }

    #[tokio::test]
    async fn test_update_by_key_overwrites_matching_row() {
        let sheets = MemorySheets::new();
        sheets.set_rows("Sheet1", contribution_sheet());
        let adapter = ready(&sheets).await;

        let mut priya = adapter.fetch_all::<Contribution>().await.unwrap().remove(1);
        priya.amount = 3500;
        adapter.update_by_key(&2, &priya).await.unwrap();

        assert_eq!(sheets.rows("Sheet1")[3][6], "3500");
    }

    #[tokio::test]
    async fn test_soft_delete_blanks_row_in_place() {
        let sheets = MemorySheets::new();
        sheets.set_rows("Sheet1", contribution_sheet());
        let adapter = ready(&sheets).await;

        adapter.soft_delete::<Contribution>(&1).await.unwrap();

        let rows = sheets.rows("Sheet1");
        assert_eq!(rows.len(), 4);
        assert!(rows[2].iter().all(|c| c.is_empty()));
        let remaining = adapter.fetch_all::<Contribution>().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 2);

        // Deleting again finds nothing
        assert!(adapter.soft_delete::<Contribution>(&1).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_initialize_sheets_provisions_defaults() {
        let sheets = MemorySheets::new();
        let adapter = ready(&sheets).await;

        adapter.initialize_sheets().await.unwrap();

        assert_eq!(sheets.rows("Sheet1")[0], row(&["Community Fund Contributions"]));
        assert_eq!(sheets.rows("Sheet1")[1][0], "ID");
        let users = adapter.fetch_all::<User>().await.unwrap();
        assert_eq!(users.len(), 9);
        let villages = adapter.fetch_all::<Village>().await.unwrap();
        assert_eq!(villages, Village::defaults());
    }
}
