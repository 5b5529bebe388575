// 📤 Contribution export
//
// CSV is written with the csv crate. Other renderers (spreadsheet, PDF)
// can consume `export_rows()` directly.

use crate::entities::Contribution;
use crate::error::{FundError, Result};
use std::io::Write;

pub const EXPORT_HEADERS: [&str; 7] = [
    "Date",
    "Donor Name",
    "Contact",
    "Village",
    "Locality",
    "Amount",
    "Payment Type",
];

/// One row per contribution, in `EXPORT_HEADERS` order
pub fn export_rows<'a>(contributions: impl IntoIterator<Item = &'a Contribution>) -> Vec<[String; 7]> {
    contributions
        .into_iter()
        .map(|c| {
            [
                c.date.format("%Y-%m-%d").to_string(),
                c.donor_name.clone(),
                c.donor_contact.clone(),
                c.village.clone(),
                c.locality.clone(),
                c.amount.to_string(),
                c.payment_type.to_string(),
            ]
        })
        .collect()
}

/// Write a header line plus one record per contribution. Returns the record count.
pub fn write_csv<'a, W: Write>(
    writer: W,
    contributions: impl IntoIterator<Item = &'a Contribution>,
) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADERS).map_err(csv_error)?;

    let rows = export_rows(contributions);
    for row in &rows {
        wtr.write_record(row).map_err(csv_error)?;
    }
    wtr.flush()?;

    Ok(rows.len())
}

fn csv_error(e: csv::Error) -> FundError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => FundError::Io(io),
        other => FundError::Config(format!("CSV write failed: {:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PaymentType;
    use chrono::NaiveDate;

    fn csv_text<'a>(contributions: impl IntoIterator<Item = &'a Contribution>) -> String {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, contributions).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_export_rows_column_order() {
        let samples = Contribution::samples();
        let rows = export_rows(&samples);

        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0],
            [
                "2024-01-15".to_string(),
                "Rajesh Kumar".to_string(),
                "9876543210".to_string(),
                "Chandrapur".to_string(),
                "Main Market".to_string(),
                "5000".to_string(),
                "Cash".to_string(),
            ]
        );
    }

    #[test]
    fn test_csv_quotes_fields_with_commas() {
        let contribution = Contribution {
            id: 7,
            donor_name: "Kumar, Rajesh".to_string(),
            donor_contact: String::new(),
            village: "Chatra".to_string(),
            locality: "Near School".to_string(),
            amount: 250,
            payment_type: PaymentType::Online,
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        };

        let csv = csv_text([&contribution]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Date,Donor Name,Contact,Village,Locality,Amount,Payment Type");
        assert_eq!(lines[1], "2024-02-01,\"Kumar, Rajesh\",,Chatra,Near School,250,Online");
    }

    #[test]
    fn test_empty_export_has_header_only() {
        let csv = csv_text(std::iter::empty());
        assert_eq!(csv.lines().count(), 1);
    }
}
