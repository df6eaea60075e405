//! # praxis-core
//!
//! Core types, ID generation, and domain logic for Praxis.
//!
//! This crate provides the foundational types shared across all Praxis crates:
//! - Entity structs for every tenant-owned record (patients, leads, pages, ...)
//! - Snake-case enums stored as TEXT in the database
//! - ID prefix constants
//! - Cross-cutting error types
//! - Pure data-shaping logic: quiz answer coercion, referral reward
//!   unlocking, pivot configuration, chatbot traversal, habit streaks,
//!   slugs and tracking path rules

pub mod audit_detail;
pub mod chatbot;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod habit;
pub mod identity;
pub mod ids;
pub mod pivot;
pub mod quiz;
pub mod referral;
pub mod slug;
pub mod tracking;
