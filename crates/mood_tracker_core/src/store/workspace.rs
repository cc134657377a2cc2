//! Both aggregate stores wired against one backing store.

use super::company_store::CompanyStore;
use super::mood_store::MoodStore;
use crate::config::AppConfig;
use crate::storage::KeyValueStore;
use log::info;
use std::sync::Arc;

/// What happens to a company's mood entries when the company is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompanyDeletePolicy {
    /// Leave the entries in place, orphaned.
    #[default]
    KeepMoodEntries,
    /// Delete the entries together with the company.
    PurgeMoodEntries,
}

pub struct Workspace {
    companies: CompanyStore,
    moods: MoodStore,
}

impl Workspace {
    pub fn open(config: &AppConfig, backing: Option<Arc<dyn KeyValueStore>>) -> Self {
        Self {
            companies: CompanyStore::with_key(config.company_store_key.clone(), backing.clone()),
            moods: MoodStore::with_key(config.mood_store_key.clone(), backing),
        }
    }

    pub fn companies(&self) -> &CompanyStore {
        &self.companies
    }

    pub fn moods(&self) -> &MoodStore {
        &self.moods
    }

    /// Deletes a company (with its users and tasks) and applies `policy`.
    pub fn delete_company(&self, company_id: &str, policy: CompanyDeletePolicy) {
        self.companies.delete_company(company_id);
        if policy == CompanyDeletePolicy::PurgeMoodEntries {
            let removed = self.moods.delete_entries_for_company(company_id);
            info!(
                "event=mood_purge module=store status=ok company_id={company_id} entries_removed={removed}"
            );
        }
    }
}
