//! Repository modules implementing operations for all Praxis entities.
//!
//! Each module adds methods to `PraxisService` via `impl PraxisService` blocks.
//! Tenant-owned rows are always filtered by `user_id`; a row belonging to
//! another doctor is reported as `DatabaseError::NoResult`.

pub mod analytics;
pub mod audit;
pub mod calendar;
pub mod chatbot;
pub mod checkpoint;
pub mod clinic;
pub mod eisenhower;
pub mod event;
pub mod habit;
pub mod indication;
pub mod lead;
pub mod page;
pub mod page_children;
pub mod patient;
pub mod pipeline;
pub mod quiz;
pub mod referral;
pub mod session;
pub mod user;
pub mod webhook;
