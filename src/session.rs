// 🧭 Session - synchronization orchestrator
//
// Owns the record store, the remote adapter and the local cache, plus the
// signed-in user. Startup picks one of two modes and stays there until
// resync() is called explicitly:
//
//   RemoteActive: store hydrated from the spreadsheet, writes mirrored to it
//   LocalOnly:    seed data overlaid with the local cache, remote skipped
//
// Every mutation runs the same pipeline, in order:
//   1. authorize + validate   (errors here leave everything untouched)
//   2. apply to the store     (always succeeds)
//   3. mirror to the remote   (best-effort, outcome reported)
//   4. save to the cache      (best-effort, outcome reported)
// There is no rollback: a failed remote write keeps the local change.

use crate::config::FundConfig;
use crate::entities::{
    authorize, into_validation, Action, Contribution, ContributionDraft, Mentor, MentorDraft, Record, Tab, User,
    Village,
};
use crate::error::{FundError, Result};
use crate::export;
use crate::persistence::{KeyValueStore, PersistenceFallback, ALL_KEYS};
use crate::remote::{RemoteStatus, SheetRow, SheetsAdapter, TabularService};
use crate::store::RecordStore;
use crate::summary::{visible_to, ContributionFilter, DashboardSummary};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use tracing::{info, warn};

// ============================================================================
// MODE + REPORTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Uninitialized,
    RemoteActive,
    LocalOnly,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncMode::Uninitialized => "uninitialized",
            SyncMode::RemoteActive => "remote_active",
            SyncMode::LocalOnly => "local_only",
        })
    }
}

/// What happened to the remote copy during a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum RemoteOutcome {
    /// Session is local-only
    Skipped,
    Mirrored,
    /// No remote row carries the record's key
    NotFound,
    Failed(String),
}

impl fmt::Display for RemoteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteOutcome::Skipped => f.write_str("skipped"),
            RemoteOutcome::Mirrored => f.write_str("mirrored"),
            RemoteOutcome::NotFound => f.write_str("not found"),
            RemoteOutcome::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    pub remote: RemoteOutcome,
    /// Every cache key was written
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub mode: SyncMode,
    pub remote: RemoteStatus,
    pub signed_in_as: Option<String>,
    pub contributions: usize,
    pub mentors: usize,
    pub villages: usize,
    pub users: usize,
}

fn validate<T: Record>(record: &T) -> Result<()> {
    into_validation(record.validation_errors())
}

// ============================================================================
// SESSION
// ============================================================================

pub struct Session<S, K> {
    config: FundConfig,
    store: RecordStore,
    adapter: SheetsAdapter<S>,
    fallback: PersistenceFallback<K>,
    mode: SyncMode,
    current_user: Option<User>,
}

impl<S: TabularService, K: KeyValueStore> Session<S, K> {
    /// Unstarted session with an empty store
    pub fn new(config: FundConfig, service: S, kv: K) -> Self {
        let adapter = SheetsAdapter::new(service, &config);
        Session {
            config,
            store: RecordStore::new(),
            adapter,
            fallback: PersistenceFallback::new(kv),
            mode: SyncMode::Uninitialized,
            current_user: None,
        }
    }

    /// Build and initialize in one go
    pub async fn start(config: FundConfig, service: S, kv: K) -> Self {
        let mut session = Self::new(config, service, kv);
        session.resync().await;
        session
    }

    /// (Re)run initialization and pick the mode
    pub async fn resync(&mut self) -> SyncMode {
        // Seed + cache first; a remote hydrate replaces what it covers
        self.load_local();

        self.mode = match self.adapter.initialize().await {
            RemoteStatus::Available => match self.pull_remote().await {
                Ok(()) => SyncMode::RemoteActive,
                Err(e) => {
                    warn!(error = %e, "Initial remote fetch failed, staying local-only");
                    self.adapter.mark_unavailable();
                    self.load_local();
                    SyncMode::LocalOnly
                }
            },
            RemoteStatus::Unavailable => SyncMode::LocalOnly,
        };

        info!(
            mode = %self.mode,
            contributions = self.store.contributions.len(),
            mentors = self.store.mentors.len(),
            "Session initialized"
        );
        self.mode
    }

    fn load_local(&mut self) {
        let mut store = RecordStore::seeded();
        let cached = self.fallback.load();
        if cached.is_empty() {
            info!("No local cache found, starting from seed data");
        }
        cached.apply_to(&mut store);
        self.store = store;
    }

    /// Re-fetch contributions, mentors and users from the remote and
    /// replace the store's copies. Villages stay as they are.
    pub async fn refresh(&mut self) -> Result<()> {
        self.require_remote()?;
        self.pull_remote().await
    }

    async fn pull_remote(&mut self) -> Result<()> {
        // Fetch everything before touching the store
        let contributions = self.adapter.fetch_all::<Contribution>().await?;
        let mentors = self.adapter.fetch_all::<Mentor>().await?;
        let users = self.adapter.fetch_all::<User>().await?;

        info!(
            contributions = contributions.len(),
            mentors = mentors.len(),
            users = users.len(),
            "Refreshed from remote"
        );

        self.store.contributions.replace_all(contributions);
        self.store.mentors.replace_all(mentors);
        self.store.users.replace_all(User::defaults());
        self.store.users.overlay(users);

        self.persist();
        Ok(())
    }

    fn require_remote(&self) -> Result<()> {
        if self.mode == SyncMode::RemoteActive {
            Ok(())
        } else {
            Err(FundError::Unavailable(format!("session is {}", self.mode)))
        }
    }

    /// Write title/header rows and default accounts to a fresh spreadsheet
    pub async fn initialize_sheets(&self) -> Result<()> {
        self.check(Action::ManageUsers)?;
        self.require_remote()?;
        self.adapter.initialize_sheets().await
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn config(&self) -> &FundConfig {
        &self.config
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn adapter(&self) -> &SheetsAdapter<S> {
        &self.adapter
    }

    pub fn fallback(&self) -> &PersistenceFallback<K> {
        &self.fallback
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            mode: self.mode,
            remote: self.adapter.status(),
            signed_in_as: self.current_user.as_ref().map(|u| u.username.clone()),
            contributions: self.store.contributions.len(),
            mentors: self.store.mentors.len(),
            villages: self.store.villages.len(),
            users: self.store.users.len(),
        }
    }

    // ========================================================================
    // USER CONTEXT
    // ========================================================================

    pub fn sign_in(&mut self, username: &str, password: &str) -> Result<&User> {
        let user = self
            .store
            .find_user(username)
            .filter(|u| u.password_matches(password))
            .cloned()
            .ok_or_else(|| FundError::Unauthorized("invalid username or password".to_string()))?;

        info!(username = %user.username, role = %user.role, "Signed in");
        let user = self.current_user.insert(user);
        Ok(&*user)
    }

    pub fn sign_out(&mut self) {
        if let Some(user) = self.current_user.take() {
            info!(username = %user.username, "Signed out");
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    /// Without a signed-in user the session acts as the operator (CLI) and
    /// every action is allowed.
    fn check(&self, action: Action<'_>) -> Result<()> {
        match &self.current_user {
            Some(user) => authorize(user, &action),
            None => Ok(()),
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Contributions the current user may see, narrowed by `filter`
    pub fn visible_contributions(&self, filter: &ContributionFilter) -> Vec<&Contribution> {
        let user = self.current_user.as_ref();
        let filter = filter.clone();
        self.store
            .query::<Contribution, _>(move |c| visible_to(user, &c.village) && filter.matches(c))
            .collect()
    }

    pub fn visible_villages(&self) -> Vec<&Village> {
        let user = self.current_user.as_ref();
        self.store
            .query::<Village, _>(move |v| visible_to(user, &v.name))
            .collect()
    }

    pub fn mentors(&self) -> &[Mentor] {
        self.store.mentors.as_slice()
    }

    pub fn dashboard(&self, today: NaiveDate) -> DashboardSummary {
        let contributions = self.visible_contributions(&ContributionFilter::default());
        let villages: Vec<Village> = self.visible_villages().into_iter().cloned().collect();
        DashboardSummary::compute(&contributions, &villages, today)
    }

    /// CSV of every visible contribution
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        self.check(Action::ViewTab(Tab::Reports))?;
        export::write_csv(writer, self.visible_contributions(&ContributionFilter::default()))
    }

    // ========================================================================
    // CONTRIBUTIONS
    // ========================================================================

    pub async fn submit_contribution(&mut self, draft: ContributionDraft) -> Result<(Contribution, MutationReport)> {
        self.check(Action::AccessVillage(draft.village.trim()))?;
        let contribution = draft.into_contribution(self.store.next_contribution_id()?)?;

        self.store.upsert(contribution.clone());
        let report = MutationReport {
            remote: self.mirror_append(&contribution).await,
            persisted: self.persist(),
        };

        info!(id = contribution.id, village = %contribution.village, remote = %report.remote, "Contribution submitted");
        Ok((contribution, report))
    }

    pub async fn update_contribution(&mut self, contribution: Contribution) -> Result<MutationReport> {
        let existing_village = self
            .store
            .get::<Contribution>(&contribution.id)
            .map(|c| c.village.clone())
            .ok_or_else(|| FundError::not_found(Contribution::KIND, contribution.id.to_string()))?;
        self.check(Action::AccessVillage(&existing_village))?;
        self.check(Action::AccessVillage(&contribution.village))?;
        validate(&contribution)?;

        self.store.upsert(contribution.clone());
        let report = MutationReport {
            remote: self.mirror_update(&contribution).await,
            persisted: self.persist(),
        };

        info!(id = contribution.id, remote = %report.remote, "Contribution updated");
        Ok(report)
    }

    pub async fn delete_contribution(&mut self, id: i64) -> Result<MutationReport> {
        let village = self
            .store
            .get::<Contribution>(&id)
            .map(|c| c.village.clone())
            .ok_or_else(|| FundError::not_found(Contribution::KIND, id.to_string()))?;
        self.check(Action::AccessVillage(&village))?;

        self.store.remove::<Contribution>(&id);
        let report = MutationReport {
            remote: self.mirror_delete::<Contribution>(&id).await,
            persisted: self.persist(),
        };

        info!(id, remote = %report.remote, "Contribution deleted");
        Ok(report)
    }

    // ========================================================================
    // MENTORS
    // ========================================================================

    pub async fn submit_mentor(&mut self, draft: MentorDraft) -> Result<(Mentor, MutationReport)> {
        self.check(Action::ViewTab(Tab::Mentors))?;
        let mentor = draft.into_mentor(self.store.next_mentor_id()?)?;

        self.store.upsert(mentor.clone());
        let report = MutationReport {
            remote: self.mirror_append(&mentor).await,
            persisted: self.persist(),
        };

        info!(id = mentor.id, remote = %report.remote, "Mentor added");
        Ok((mentor, report))
    }

    pub async fn update_mentor(&mut self, mentor: Mentor) -> Result<MutationReport> {
        self.check(Action::ViewTab(Tab::Mentors))?;
        if !self.store.mentors.contains(&mentor.id) {
            return Err(FundError::not_found(Mentor::KIND, mentor.id.to_string()));
        }
        validate(&mentor)?;

        self.store.upsert(mentor.clone());
        let report = MutationReport {
            remote: self.mirror_update(&mentor).await,
            persisted: self.persist(),
        };

        info!(id = mentor.id, remote = %report.remote, "Mentor updated");
        Ok(report)
    }

    pub async fn delete_mentor(&mut self, id: i64) -> Result<MutationReport> {
        self.check(Action::ViewTab(Tab::Mentors))?;
        if self.store.remove::<Mentor>(&id).is_none() {
            return Err(FundError::not_found(Mentor::KIND, id.to_string()));
        }

        let report = MutationReport {
            remote: self.mirror_delete::<Mentor>(&id).await,
            persisted: self.persist(),
        };

        info!(id, remote = %report.remote, "Mentor deleted");
        Ok(report)
    }

    // ========================================================================
    // USERS + VILLAGES (settings)
    // ========================================================================

    /// Create or replace an account
    pub async fn save_user(&mut self, user: User) -> Result<MutationReport> {
        self.check(Action::ManageUsers)?;
        validate(&user)?;

        self.store.upsert(user.clone());
        if let Some(current) = self.current_user.as_mut().filter(|u| u.username == user.username) {
            *current = user.clone();
        }
        let report = MutationReport {
            remote: self.mirror_upsert(&user).await,
            persisted: self.persist(),
        };

        info!(username = %user.username, role = %user.role, remote = %report.remote, "User saved");
        Ok(report)
    }

    /// Built-in accounts and the signed-in account cannot be deleted
    pub async fn delete_user(&mut self, username: &str) -> Result<MutationReport> {
        self.check(Action::ManageUsers)?;
        if User::defaults().iter().any(|u| u.username == username) {
            return Err(FundError::Validation(vec![format!("'{}' is a built-in account", username)]));
        }
        if self.current_user.as_ref().map_or(false, |u| u.username == username) {
            return Err(FundError::Validation(vec!["cannot delete the signed-in account".to_string()]));
        }
        let key = username.to_string();
        if self.store.remove::<User>(&key).is_none() {
            return Err(FundError::not_found(User::KIND, key));
        }

        let report = MutationReport {
            remote: self.mirror_delete::<User>(&key).await,
            persisted: self.persist(),
        };

        info!(username, remote = %report.remote, "User deleted");
        Ok(report)
    }

    /// Create or replace a village and its localities
    pub async fn save_village(&mut self, village: Village) -> Result<MutationReport> {
        self.check(Action::ManageVillages)?;
        let village = Village::new(&village.name, village.localities);
        validate(&village)?;

        self.store.upsert(village.clone());
        let report = MutationReport {
            remote: self.mirror_upsert(&village).await,
            persisted: self.persist(),
        };

        info!(village = %village.name, localities = village.localities.len(), remote = %report.remote, "Village saved");
        Ok(report)
    }

    /// Contributions naming the village are kept
    pub async fn delete_village(&mut self, name: &str) -> Result<MutationReport> {
        self.check(Action::ManageVillages)?;
        let key = name.to_string();
        if self.store.remove::<Village>(&key).is_none() {
            return Err(FundError::not_found(Village::KIND, key));
        }

        let report = MutationReport {
            remote: self.mirror_delete::<Village>(&key).await,
            persisted: self.persist(),
        };

        info!(village = name, remote = %report.remote, "Village deleted");
        Ok(report)
    }

    // ========================================================================
    // PIPELINE STAGES
    // ========================================================================

    fn persist(&self) -> bool {
        self.fallback.save(&self.store) == ALL_KEYS.len()
    }

    async fn mirror_append<T: SheetRow>(&self, record: &T) -> RemoteOutcome {
        if self.mode != SyncMode::RemoteActive {
            return RemoteOutcome::Skipped;
        }
        remote_outcome(T::KIND.as_str(), self.adapter.append(record).await)
    }

    async fn mirror_update<T: SheetRow>(&self, record: &T) -> RemoteOutcome {
        if self.mode != SyncMode::RemoteActive {
            return RemoteOutcome::Skipped;
        }
        remote_outcome(T::KIND.as_str(), self.adapter.update_by_key(&record.key(), record).await)
    }

    /// Update the keyed row, append when there is none
    async fn mirror_upsert<T: SheetRow>(&self, record: &T) -> RemoteOutcome {
        if self.mode != SyncMode::RemoteActive {
            return RemoteOutcome::Skipped;
        }
        let result = match self.adapter.update_by_key(&record.key(), record).await {
            Err(e) if e.is_not_found() => self.adapter.append(record).await,
            other => other,
        };
        remote_outcome(T::KIND.as_str(), result)
    }

    async fn mirror_delete<T: SheetRow>(&self, key: &T::Key) -> RemoteOutcome {
        if self.mode != SyncMode::RemoteActive {
            return RemoteOutcome::Skipped;
        }
        remote_outcome(T::KIND.as_str(), self.adapter.soft_delete::<T>(key).await)
    }
}

fn remote_outcome(kind: &str, result: Result<()>) -> RemoteOutcome {
    match result {
        Ok(()) => RemoteOutcome::Mirrored,
        Err(e) if e.is_not_found() => {
            warn!(kind, error = %e, "Remote row missing, local change kept");
            RemoteOutcome::NotFound
        }
        Err(e) => {
            warn!(kind, error = %e, "Remote write failed, local change kept");
            RemoteOutcome::Failed(e.to_string())
        }
    }
}
