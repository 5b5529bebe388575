// 📐 Sheet Layouts - column layout + key column per entity kind
//
// Each collection maps to one sheet. The first rows of a sheet are reserved
// (title and/or header row); data rows follow. Columns are positional.

use crate::config::SheetNames;
use crate::entities::{CollectionKind, Contribution, Mentor, PaymentType, Record, Role, User, Village};
use chrono::NaiveDate;

pub const CONTRIBUTIONS_TITLE: &str = "Community Fund Contributions";

const CONTRIBUTION_HEADERS: &[&str] = &[
    "ID",
    "Date",
    "Donor Name",
    "Contact",
    "Village",
    "Locality",
    "Amount",
    "Payment Type",
];
const MENTOR_HEADERS: &[&str] = &["ID", "Name", "Contact", "Village", "Locality"];
const USER_HEADERS: &[&str] = &["Username", "Password", "Role", "Name", "Village"];
const VILLAGE_HEADERS: &[&str] = &["Village Name", "Localities"];

// ============================================================================
// SHEET LAYOUT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub kind: CollectionKind,
    pub sheet: String,
    /// Optional title row above the header row
    pub title: Option<&'static str>,
    pub headers: &'static [&'static str],
    pub key_column: usize,
}

impl SheetLayout {
    pub fn for_kind(kind: CollectionKind, sheets: &SheetNames) -> Self {
        let (sheet, title, headers) = match kind {
            CollectionKind::Contributions => (&sheets.contributions, Some(CONTRIBUTIONS_TITLE), CONTRIBUTION_HEADERS),
            CollectionKind::Mentors => (&sheets.mentors, None, MENTOR_HEADERS),
            CollectionKind::Users => (&sheets.users, None, USER_HEADERS),
            CollectionKind::Villages => (&sheets.villages, None, VILLAGE_HEADERS),
        };

        SheetLayout {
            kind,
            sheet: sheet.clone(),
            title,
            headers,
            key_column: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Rows skipped on read and written by `initialize_sheets`
    pub fn reserved_rows(&self) -> usize {
        usize::from(self.title.is_some()) + 1
    }

    /// Title (if any) followed by the header row
    pub fn header_rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        if let Some(title) = self.title {
            rows.push(vec![title.to_string()]);
        }
        rows.push(self.headers.iter().map(|h| h.to_string()).collect());
        rows
    }

    /// Whole-column range, e.g. `Sheet1!A:H`
    pub fn full_range(&self) -> String {
        format!("{}!A:{}", self.sheet, column_letter(self.width() - 1))
    }

    /// One row, 1-based, e.g. `Sheet1!A5:H5`
    pub fn row_range(&self, row_number: usize) -> String {
        self.rows_range(row_number, row_number)
    }

    pub fn rows_range(&self, first: usize, last: usize) -> String {
        format!(
            "{}!A{}:{}{}",
            self.sheet,
            first,
            column_letter(self.width() - 1),
            last
        )
    }

    pub fn blank_row(&self) -> Vec<String> {
        vec![String::new(); self.width()]
    }
}

/// 0-based column index → A1 letters (0 → A, 25 → Z, 26 → AA)
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

// ============================================================================
// ROW CODEC
// ============================================================================

/// Positional row ↔ record translation
pub trait SheetRow: Record + Sized {
    fn to_row(&self) -> Vec<String>;

    /// None when a required positional field is missing or malformed
    fn from_row(row: &[String]) -> Option<Self>;
}

/// Cell value, blank when the row is ragged
pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.trim()).unwrap_or("")
}

fn non_empty(row: &[String], index: usize) -> Option<String> {
    let value = cell(row, index);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Accepts "1000", "1,000" and "1000.0"
fn parse_amount(raw: &str) -> Option<u64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if let Ok(amount) = cleaned.parse::<u64>() {
        return Some(amount);
    }
    let float = cleaned.parse::<f64>().ok()?;
    if float > 0.0 && float.fract() == 0.0 {
        Some(float as u64)
    } else {
        None
    }
}

fn only_if_valid<T: Record>(record: T) -> Option<T> {
    if record.validation_errors().is_empty() {
        Some(record)
    } else {
        None
    }
}

impl SheetRow for Contribution {
    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.date.format("%Y-%m-%d").to_string(),
            self.donor_name.clone(),
            self.donor_contact.clone(),
            self.village.clone(),
            self.locality.clone(),
            self.amount.to_string(),
            self.payment_type.to_string(),
        ]
    }

    fn from_row(row: &[String]) -> Option<Self> {
        let contribution = Contribution {
            id: cell(row, 0).parse().ok()?,
            date: NaiveDate::parse_from_str(cell(row, 1), "%Y-%m-%d").ok()?,
            donor_name: non_empty(row, 2)?,
            donor_contact: cell(row, 3).to_string(),
            village: cell(row, 4).to_string(),
            locality: cell(row, 5).to_string(),
            amount: parse_amount(cell(row, 6))?,
            payment_type: cell(row, 7).parse().unwrap_or(PaymentType::Other),
        };
        only_if_valid(contribution)
    }
}

impl SheetRow for Mentor {
    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.contact.clone(),
            self.village.clone(),
            self.locality.clone(),
        ]
    }

    fn from_row(row: &[String]) -> Option<Self> {
        let mentor = Mentor {
            id: cell(row, 0).parse().ok()?,
            name: non_empty(row, 1)?,
            contact: cell(row, 2).to_string(),
            village: cell(row, 3).to_string(),
            locality: cell(row, 4).to_string(),
        };
        only_if_valid(mentor)
    }
}

impl SheetRow for User {
    fn to_row(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.password.clone(),
            self.role.to_string(),
            self.name.clone(),
            self.village.clone().unwrap_or_default(),
        ]
    }

    fn from_row(row: &[String]) -> Option<Self> {
        let user = User {
            username: non_empty(row, 0)?,
            password: cell(row, 1).to_string(),
            role: Role::parse(cell(row, 2))?,
            name: non_empty(row, 3)?,
            village: non_empty(row, 4),
        };
        only_if_valid(user)
    }
}

impl SheetRow for Village {
    fn to_row(&self) -> Vec<String> {
        vec![self.name.clone(), self.locality_list()]
    }

    fn from_row(row: &[String]) -> Option<Self> {
        let name = non_empty(row, 0)?;
        Some(Village::from_locality_list(&name, cell(row, 1)))
    }
}
