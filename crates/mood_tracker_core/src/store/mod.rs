//! Aggregate stores.
//!
//! # Responsibility
//! - Own the in-memory aggregates and their durable mirrors.
//! - Enforce the cascades that keep nested collections consistent.
//!
//! # Invariants
//! - Each store instance owns exactly one storage key.
//! - Stores are constructed explicitly with their backing handle; there are
//!   no process-wide store singletons.

use crate::model::EntityId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod company_store;
pub mod mood_store;
pub mod persisted;
pub mod workspace;

pub type StoreResult<T> = Result<T, StoreError>;

/// Mutation rejected before anything was published or persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UnknownDepartment {
        company_id: EntityId,
        department_id: EntityId,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownDepartment {
                company_id,
                department_id,
            } => write!(
                f,
                "department {department_id} does not exist in company {company_id}"
            ),
        }
    }
}

impl Error for StoreError {}
