// 🧑‍🏫 Mentor Entity - a volunteer assigned to a village/locality

use super::{into_validation, require, CollectionKind, Record};
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mentor {
    pub id: i64,
    pub name: String,
    pub contact: String,
    pub village: String,
    #[serde(default)]
    pub locality: String,
}

impl Mentor {
    pub fn samples() -> Vec<Mentor> {
        let sample = |id, name: &str, contact: &str, village: &str, locality: &str| Mentor {
            id,
            name: name.to_string(),
            contact: contact.to_string(),
            village: village.to_string(),
            locality: locality.to_string(),
        };

        vec![
            sample(1, "Dr. Ramesh Kumar", "9876543200", "Chandrapur", "Main Market"),
            sample(2, "Mrs. Geeta Singh", "9876543201", "Mohisguha", "Village Center"),
            sample(3, "Mr. Suresh Yadav", "9876543202", "Chatra", "Near School"),
        ]
    }
}

impl Record for Mentor {
    type Key = i64;

    const KIND: CollectionKind = CollectionKind::Mentors;

    fn key(&self) -> i64 {
        self.id
    }

    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "name", &self.name);
        require(&mut errors, "contact", &self.contact);
        require(&mut errors, "village", &self.village);
        errors
    }
}

/// Submitted mentor before an id is assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorDraft {
    pub name: String,
    pub contact: String,
    pub village: String,
    #[serde(default)]
    pub locality: String,
}

impl MentorDraft {
    pub fn into_mentor(self, id: i64) -> Result<Mentor> {
        let mentor = Mentor {
            id,
            name: self.name.trim().to_string(),
            contact: self.contact.trim().to_string(),
            village: self.village.trim().to_string(),
            locality: self.locality.trim().to_string(),
        };
        into_validation(mentor.validation_errors())?;
        Ok(mentor)
    }
}
