//! Company/user/task store.
//!
//! # Responsibility
//! - Create, update and delete companies, departments, users and tasks.
//! - Apply department and company deletion cascades in a single step.
//!
//! # Invariants
//! - Update operations replace by id; a missing id changes no entity but the
//!   aggregate is still re-persisted.
//! - Updates keep the stored `created_at` and stamp `updated_at`.
//! - Cascades never touch mood entries; see `Workspace` for that policy.

use super::persisted::{PersistedStore, Subscription};
use super::{StoreError, StoreResult};
use crate::model::company::{
    Company, CompanyAggregate, Department, NewTask, NewUser, Task, User,
};
use crate::model::now_epoch_ms;
use crate::storage::KeyValueStore;
use log::{debug, info};
use std::sync::Arc;

pub const COMPANY_STORE_KEY: &str = "company-data";

pub struct CompanyStore {
    inner: PersistedStore<CompanyAggregate>,
}

impl CompanyStore {
    /// Loads the store under the default `company-data` key.
    pub fn new(backing: Option<Arc<dyn KeyValueStore>>) -> Self {
        Self::with_key(COMPANY_STORE_KEY, backing)
    }

    pub fn with_key(key: impl Into<String>, backing: Option<Arc<dyn KeyValueStore>>) -> Self {
        Self {
            inner: PersistedStore::load(key, backing),
        }
    }

    pub fn subscribe(&self) -> Subscription<CompanyAggregate> {
        self.inner.subscribe()
    }

    pub fn snapshot(&self) -> Arc<CompanyAggregate> {
        self.inner.snapshot()
    }

    pub fn persisted_text(&self) -> Option<String> {
        self.inner.persisted_text()
    }

    pub fn add_company(&self, name: impl Into<String>) -> Company {
        let company = Company::new(name);
        info!(
            "event=company_add module=store status=ok company_id={}",
            company.id
        );
        self.inner.update(|state| {
            state.companies.push(company.clone());
            company
        })
    }

    /// Removes the company with every user and task that belongs to it.
    pub fn delete_company(&self, company_id: &str) {
        self.inner.update(|state| {
            state.companies.retain(|c| c.id != company_id);
            let users_before = state.users.len();
            let tasks_before = state.tasks.len();
            state.users.retain(|u| u.company_id != company_id);
            state.tasks.retain(|t| t.company_id != company_id);
            info!(
                "event=company_delete module=store status=ok company_id={} users_removed={} tasks_removed={}",
                company_id,
                users_before - state.users.len(),
                tasks_before - state.tasks.len()
            );
        });
    }

    /// Appends a department; `None` when the company does not exist.
    pub fn add_department(&self, company_id: &str, name: impl Into<String>) -> Option<Department> {
        let department = Department::new(name);
        self.inner.update(|state| {
            let company = state.companies.iter_mut().find(|c| c.id == company_id)?;
            company.departments.push(department.clone());
            debug!(
                "event=department_add module=store status=ok company_id={} department_id={}",
                company_id, department.id
            );
            Some(department)
        })
    }

    /// Removes a department and clears every reference to it.
    ///
    /// 1. drop it from the company's department list;
    /// 2. clear `department_id` on users pointing at it;
    /// 3. filter it out of every task's `department_ids`.
    pub fn delete_department(&self, company_id: &str, department_id: &str) {
        self.inner.update(|state| {
            if let Some(company) = state.companies.iter_mut().find(|c| c.id == company_id) {
                company.departments.retain(|d| d.id != department_id);
            }
            for user in &mut state.users {
                if user.department_id.as_deref() == Some(department_id) {
                    user.department_id = None;
                }
            }
            for task in &mut state.tasks {
                task.department_ids.retain(|id| id != department_id);
            }
            info!(
                "event=department_delete module=store status=ok company_id={} department_id={}",
                company_id, department_id
            );
        });
    }

    pub fn update_department(&self, company_id: &str, department: Department) {
        self.inner.update(|state| {
            let existing = state
                .companies
                .iter_mut()
                .filter(|c| c.id == company_id)
                .flat_map(|c| c.departments.iter_mut())
                .find(|d| d.id == department.id);
            replace_stamped(existing, department, |d| &mut d.created_at, |d| &mut d.updated_at);
        });
    }

    /// Adds a user after checking its department belongs to its company.
    pub fn add_user(&self, new_user: NewUser) -> StoreResult<User> {
        self.inner.try_update(|state| {
            ensure_department(state, &new_user.company_id, new_user.department_id.as_deref())?;
            let user = new_user.into_user();
            debug!(
                "event=user_add module=store status=ok user_id={} company_id={}",
                user.id, user.company_id
            );
            state.users.push(user.clone());
            Ok(user)
        })
    }

    pub fn delete_user(&self, user_id: &str) {
        self.inner.update(|state| state.users.retain(|u| u.id != user_id));
    }

    /// Replaces a known user after checking its department; an unknown id is
    /// a no-op that still re-persists.
    pub fn update_user(&self, user: User) -> StoreResult<()> {
        self.inner.try_update(|state| {
            if state.user(&user.id).is_some() {
                ensure_department(state, &user.company_id, user.department_id.as_deref())?;
            }
            let existing = state.users.iter_mut().find(|u| u.id == user.id);
            replace_stamped(existing, user, |u| &mut u.created_at, |u| &mut u.updated_at);
            Ok(())
        })
    }

    pub fn add_task(&self, new_task: NewTask) -> Task {
        let task = new_task.into_task();
        debug!(
            "event=task_add module=store status=ok task_id={} company_id={}",
            task.id, task.company_id
        );
        self.inner.update(|state| {
            state.tasks.push(task.clone());
            task
        })
    }

    pub fn delete_task(&self, task_id: &str) {
        self.inner.update(|state| state.tasks.retain(|t| t.id != task_id));
    }

    pub fn update_task(&self, task: Task) {
        self.inner.update(|state| {
            let existing = state.tasks.iter_mut().find(|t| t.id == task.id);
            replace_stamped(existing, task, |t| &mut t.created_at, |t| &mut t.updated_at);
        });
    }

    /// Empties every collection and persists the empty aggregate.
    pub fn reset(&self) {
        info!("event=company_store_reset module=store status=ok");
        self.inner.set(CompanyAggregate::default());
    }
}

fn ensure_department(
    state: &CompanyAggregate,
    company_id: &str,
    department_id: Option<&str>,
) -> StoreResult<()> {
    let Some(department_id) = department_id else {
        return Ok(());
    };
    let known = state
        .company(company_id)
        .is_some_and(|company| company.has_department(department_id));
    if known {
        Ok(())
    } else {
        Err(StoreError::UnknownDepartment {
            company_id: company_id.to_string(),
            department_id: department_id.to_string(),
        })
    }
}

/// Swaps `replacement` into `slot`, carrying over `created_at`.
fn replace_stamped<T>(
    slot: Option<&mut T>,
    mut replacement: T,
    created_at: impl Fn(&mut T) -> &mut i64,
    updated_at: impl Fn(&mut T) -> &mut i64,
) {
    let Some(slot) = slot else {
        debug!("event=entity_update module=store status=miss");
        return;
    };
    *created_at(&mut replacement) = *created_at(&mut *slot);
    *updated_at(&mut replacement) = now_epoch_ms();
    *slot = replacement;
}
