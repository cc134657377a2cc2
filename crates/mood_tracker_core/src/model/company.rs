//! Company aggregate: companies with embedded departments, users and tasks.
//!
//! # Invariants
//! - Department ids are unique within one company.
//! - A user's `department_id`, when set, names a department of its company
//!   at the time it was assigned.
//! - A task's `department_ids` may be empty.

use super::{new_entity_id, now_epoch_ms, EntityId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Department {
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            id: new_entity_id(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            id: new_entity_id(),
            name: name.into(),
            departments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn department(&self, department_id: &str) -> Option<&Department> {
        self.departments.iter().find(|d| d.id == department_id)
    }

    pub fn has_department(&self, department_id: &str) -> bool {
        self.department(department_id).is_some()
    }
}

/// Advisory role; nothing in the data layer enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub company_id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<EntityId>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// Caller-supplied fields for a user; id and timestamps come from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub company_id: EntityId,
    pub name: String,
    pub email: String,
    pub department_id: Option<EntityId>,
    pub role: Role,
}

impl NewUser {
    pub(crate) fn into_user(self) -> User {
        let now = now_epoch_ms();
        User {
            id: new_entity_id(),
            company_id: self.company_id,
            name: self.name,
            email: self.email,
            department_id: self.department_id,
            role: self.role,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: EntityId,
    pub company_id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub department_ids: Vec<EntityId>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// Caller-supplied fields for a task; id and timestamps come from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub company_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub department_ids: Vec<EntityId>,
}

impl NewTask {
    pub(crate) fn into_task(self) -> Task {
        let now = now_epoch_ms();
        Task {
            id: new_entity_id(),
            company_id: self.company_id,
            title: self.title,
            description: self.description,
            department_ids: self.department_ids,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The whole company/user/task tree, persisted as one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyAggregate {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl CompanyAggregate {
    pub fn company(&self, company_id: &str) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == company_id)
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn users_in_company<'a>(&'a self, company_id: &'a str) -> impl Iterator<Item = &'a User> {
        self.users.iter().filter(move |u| u.company_id == company_id)
    }

    pub fn tasks_in_company<'a>(&'a self, company_id: &'a str) -> impl Iterator<Item = &'a Task> {
        self.tasks.iter().filter(move |t| t.company_id == company_id)
    }

    pub fn tasks_for_department<'a>(
        &'a self,
        department_id: &'a str,
    ) -> impl Iterator<Item = &'a Task> {
        self.tasks
            .iter()
            .filter(move |t| t.department_ids.iter().any(|id| id == department_id))
    }
}
