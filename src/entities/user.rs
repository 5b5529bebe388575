// 👤 User Entity + role capability table
//
// Roles are a closed set. Everything a role may see or do is looked up in
// `Role::capabilities()` and checked in one place: `authorize`.
// Passwords are plaintext account lookups, not a security boundary.

use super::{require, CollectionKind, Record};
use crate::error::{FundError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ROLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    CoreTeam,
    VillageManager,
    Mentor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::CoreTeam => "core_team",
            Role::VillageManager => "village_manager",
            Role::Mentor => "mentor",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim() {
            "admin" => Some(Role::Admin),
            "core_team" => Some(Role::CoreTeam),
            "village_manager" => Some(Role::VillageManager),
            "mentor" => Some(Role::Mentor),
            _ => None,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        const STANDARD_TABS: &[Tab] = &[Tab::Dashboard, Tab::Contributions, Tab::Mentors, Tab::Reports];
        const ALL_TABS: &[Tab] = &[
            Tab::Dashboard,
            Tab::Contributions,
            Tab::Mentors,
            Tab::Reports,
            Tab::Settings,
        ];

        match self {
            Role::Admin => Capabilities {
                village_scope: VillageScope::All,
                tabs: ALL_TABS,
            },
            Role::CoreTeam | Role::Mentor => Capabilities {
                village_scope: VillageScope::All,
                tabs: STANDARD_TABS,
            },
            Role::VillageManager => Capabilities {
                village_scope: VillageScope::Assigned,
                tabs: STANDARD_TABS,
            },
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CAPABILITY TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tab {
    Dashboard,
    Contributions,
    Mentors,
    Reports,
    /// User and village management
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VillageScope {
    /// Every village is visible
    All,
    /// Only the user's assigned village
    Assigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub village_scope: VillageScope,
    pub tabs: &'static [Tab],
}

impl Capabilities {
    pub fn can_see_tab(&self, tab: Tab) -> bool {
        self.tabs.contains(&tab)
    }
}

/// Something a signed-in user wants to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<'a> {
    ViewTab(Tab),
    /// Read or write data belonging to a village
    AccessVillage(&'a str),
    ManageUsers,
    ManageVillages,
}

/// The single authorization check
pub fn authorize(user: &User, action: &Action<'_>) -> Result<()> {
    let caps = user.role.capabilities();

    let allowed = match action {
        Action::ViewTab(tab) => caps.can_see_tab(*tab),
        Action::AccessVillage(village) => match caps.village_scope {
            VillageScope::All => true,
            VillageScope::Assigned => user.village.as_deref() == Some(*village),
        },
        Action::ManageUsers | Action::ManageVillages => caps.can_see_tab(Tab::Settings),
    };

    if allowed {
        Ok(())
    } else {
        Err(FundError::Unauthorized(format!(
            "{} ({}) may not {:?}",
            user.username, user.role, action
        )))
    }
}

// ============================================================================
// USER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub village: Option<String>,
}

impl User {
    pub fn new(username: &str, password: &str, role: Role, name: &str, village: Option<&str>) -> Self {
        User {
            username: username.to_string(),
            password: password.to_string(),
            role,
            name: name.to_string(),
            village: village.map(str::to_string),
        }
    }

    /// The village this user is confined to, if any
    pub fn visible_village(&self) -> Option<&str> {
        match self.role.capabilities().village_scope {
            VillageScope::All => None,
            VillageScope::Assigned => self.village.as_deref(),
        }
    }

    pub fn password_matches(&self, password: &str) -> bool {
        self.password == password
    }

    /// Built-in accounts; always present even when the cache is stale
    pub fn defaults() -> Vec<User> {
        let mut users = vec![User::new("Firoj", "Firoj#786", Role::Admin, "Firoj (Admin)", None)];

        for n in 1..=5 {
            users.push(User::new(
                &format!("User{}", n),
                "123",
                Role::CoreTeam,
                &format!("User {} (Core Team)", n),
                None,
            ));
        }

        for village in ["Chandrapur", "Mohisguha", "Chatra"] {
            users.push(User::new(
                &format!("{}Manager", village),
                "123",
                Role::VillageManager,
                &format!("{} Manager", village),
                Some(village),
            ));
        }

        users
    }
}

impl Record for User {
    type Key = String;

    const KIND: CollectionKind = CollectionKind::Users;

    fn key(&self) -> String {
        self.username.clone()
    }

    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "username", &self.username);
        require(&mut errors, "password", &self.password);
        require(&mut errors, "name", &self.name);
        if self.role == Role::VillageManager
            && self.village.as_deref().map_or(true, |v| v.trim().is_empty())
        {
            errors.push("village is required for village managers".to_string());
        }
        errors
    }
}
