// 💰 Contribution Entity - one donation from one donor
//
// Amount is a whole number of currency units and is always positive.
// Village/locality are soft references: a contribution may name a village
// that no longer exists in the villages collection.

use super::{into_validation, require, CollectionKind, Record};
use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PAYMENT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    Cash,
    Online,
    Other,
}

impl PaymentType {
    pub const ALL: [PaymentType; 3] = [PaymentType::Cash, PaymentType::Online, PaymentType::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "Cash",
            PaymentType::Online => "Online",
            PaymentType::Other => "Other",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentType::Cash),
            "online" => Ok(PaymentType::Online),
            "other" => Ok(PaymentType::Other),
            other => Err(format!("unknown payment type '{}'", other)),
        }
    }
}

// ============================================================================
// CONTRIBUTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub id: i64,
    pub donor_name: String,
    #[serde(default)]
    pub donor_contact: String,
    pub village: String,
    pub locality: String,
    pub amount: u64,
    pub payment_type: PaymentType,
    pub date: NaiveDate,
}

impl Contribution {
    /// Sample contributions loaded in local-only mode before the cache overlay
    pub fn samples() -> Vec<Contribution> {
        let sample = |id, donor: &str, contact: &str, village: &str, locality: &str, amount, payment_type, day| {
            Contribution {
                id,
                donor_name: donor.to_string(),
                donor_contact: contact.to_string(),
                village: village.to_string(),
                locality: locality.to_string(),
                amount,
                payment_type,
                // Fixed calendar dates, always valid
                date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap_or_default(),
            }
        };

        vec![
            sample(1, "Rajesh Kumar", "9876543210", "Chandrapur", "Main Market", 5000, PaymentType::Cash, 15),
            sample(2, "Priya Sharma", "9876543211", "Mohisguha", "Village Center", 3000, PaymentType::Online, 16),
            sample(3, "Amit Singh", "9876543212", "Chatra", "Near School", 7500, PaymentType::Cash, 17),
            sample(4, "Sunita Devi", "9876543213", "Chandrapur", "Temple Area", 2000, PaymentType::Other, 18),
        ]
    }

    /// Validate and return self, for use in pipelines
    pub fn validated(self) -> Result<Self> {
        into_validation(self.validation_errors())?;
        Ok(self)
    }
}

impl Record for Contribution {
    type Key = i64;

    const KIND: CollectionKind = CollectionKind::Contributions;

    fn key(&self) -> i64 {
        self.id
    }

    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "donor name", &self.donor_name);
        require(&mut errors, "village", &self.village);
        require(&mut errors, "locality", &self.locality);
        if self.amount == 0 {
            errors.push("amount must be greater than zero".to_string());
        }
        errors
    }
}

// ============================================================================
// CONTRIBUTION DRAFT (form input, no id yet)
// ============================================================================

/// Submitted contribution before an id is assigned
///
/// Amount is signed so that zero/negative input is caught by validation
/// instead of by a conversion error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDraft {
    pub donor_name: String,
    #[serde(default)]
    pub donor_contact: String,
    pub village: String,
    pub locality: String,
    pub amount: i64,
    pub payment_type: Option<PaymentType>,
    pub date: Option<NaiveDate>,
}

impl ContributionDraft {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        require(&mut errors, "donor name", &self.donor_name);
        require(&mut errors, "village", &self.village);
        require(&mut errors, "locality", &self.locality);
        if self.amount <= 0 {
            errors.push("amount must be greater than zero".to_string());
        }
        if self.payment_type.is_none() {
            errors.push("payment type is required".to_string());
        }
        if self.date.is_none() {
            errors.push("date is required".to_string());
        }
        into_validation(errors)
    }

    /// Validate, trim and assign `id`
    pub fn into_contribution(self, id: i64) -> Result<Contribution> {
        self.validate()?;

        Contribution {
            id,
            donor_name: self.donor_name.trim().to_string(),
            donor_contact: self.donor_contact.trim().to_string(),
            village: self.village.trim().to_string(),
            locality: self.locality.trim().to_string(),
            amount: self.amount as u64,
            payment_type: self.payment_type.unwrap_or(PaymentType::Other),
            date: self.date.unwrap_or_default(),
        }
        .validated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FundError;

    fn draft() -> ContributionDraft {
        ContributionDraft {
            donor_name: "  Test ".to_string(),
            donor_contact: String::new(),
            village: "Chandrapur".to_string(),
            locality: "Main Market".to_string(),
            amount: 1000,
            payment_type: Some(PaymentType::Cash),
            date: NaiveDate::from_ymd_opt(2024, 2, 1),
        }
    }

    #[test]
    fn test_payment_type_parsing() {
        assert_eq!("cash".parse::<PaymentType>(), Ok(PaymentType::Cash));
        assert_eq!(" Online ".parse::<PaymentType>(), Ok(PaymentType::Online));
        assert!("cheque".parse::<PaymentType>().is_err());
    }

    #[test]
    fn test_draft_into_contribution_trims() {
        let contribution = draft().into_contribution(7).unwrap();

        assert_eq!(contribution.id, 7);
        assert_eq!(contribution.donor_name, "Test");
        assert_eq!(contribution.amount, 1000);
        assert_eq!(contribution.date.to_string(), "2024-02-01");
    }

    #[test]
    fn test_draft_rejects_non_positive_amount() {
        let mut bad = draft();
        bad.amount = 0;

        match bad.validate() {
            Err(FundError::Validation(reasons)) => {
                assert_eq!(reasons, vec!["amount must be greater than zero".to_string()]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        bad.amount = -50;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_draft_reports_every_missing_field() {
        let empty = ContributionDraft {
            donor_name: String::new(),
            donor_contact: String::new(),
            village: String::new(),
            locality: " ".to_string(),
            amount: 10,
            payment_type: None,
            date: None,
        };

        match empty.validate() {
            Err(FundError::Validation(reasons)) => assert_eq!(reasons.len(), 5),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_shape_is_camel_case() {
        let contribution = draft().into_contribution(1).unwrap();
        let json = serde_json::to_value(&contribution).unwrap();

        assert_eq!(json["donorName"], "Test");
        assert_eq!(json["paymentType"], "Cash");
        assert_eq!(json["date"], "2024-02-01");
    }

    #[test]
    fn test_samples_are_valid() {
        let samples = Contribution::samples();
        assert_eq!(samples.len(), 4);
        assert!(samples.iter().all(|c| c.validation_errors().is_empty()));
    }
}
