//! Core library for the shop-floor KPI platform
//!
//! # Architecture
//! - `domain`: entities shared by every component (§3 of the spec)
//! - `tenant`: identity, role, and the isolation predicate (C1)
//! - `repository`: tenant-scoped persistence and unit-of-work (C2)
//! - `event_bus`: collect-on-txn, flush-on-commit dispatch (C3)
//! - `ingestion`: CSV parsing, validation, read-back, commit (C4)
//! - `workflow`: work-order status graph and transitions (C5)
//! - `hold`: hold/resume aging and disposition (C6)
//! - `kpi`: the ten KPI calculators, inference chain, OEE (C7)
//! - `forecast`: exponential smoothing with confidence bands (C8)
//! - `capacity`: workbook, MRP check, scenarios, undo/redo (C9)
//! - `reporting`: KPI aggregation and periodic scheduling (C10)
//! - `facade`: tenant-bound operation surface for external transports (C11)

#![deny(unsafe_code)]

pub mod cache;
pub mod capacity;
pub mod config;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod facade;
pub mod forecast;
pub mod hold;
pub mod ingestion;
pub mod kpi;
pub mod repository;
pub mod reporting;
pub mod tenant;
pub mod workflow;

pub use error::{DomainError, ErrorKind};
