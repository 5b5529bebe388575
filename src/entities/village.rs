// 🏘️ Village Entity - a named village and its ordered localities

use super::{require, CollectionKind, Record};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Village {
    pub name: String,
    pub localities: Vec<String>,
}

impl Village {
    /// Trims the name and every locality, dropping blank localities
    pub fn new(name: &str, localities: Vec<String>) -> Self {
        Village {
            name: name.trim().to_string(),
            localities: localities
                .into_iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    /// Build from a comma-separated locality list ("Main Market, Temple Area")
    pub fn from_locality_list(name: &str, localities: &str) -> Self {
        Village::new(name, split_localities(localities))
    }

    pub fn locality_list(&self) -> String {
        self.localities.join(", ")
    }

    pub fn defaults() -> Vec<Village> {
        vec![
            Village::from_locality_list("Chandrapur", "Main Market, Temple Area, School Road"),
            Village::from_locality_list("Mohisguha", "Village Center, Market Area, Near Hospital"),
            Village::from_locality_list("Chatra", "Near School, Market Street, Temple Road"),
        ]
    }
}

pub fn split_localities(list: &str) -> Vec<String> {
    list.split(',')
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

impl Record for Village {
    type Key = String;

    const KIND: CollectionKind = CollectionKind::Villages;

    fn key(&self) -> String {
        self.name.clone()
    }

    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "village name", &self.name);
        errors
    }
}
