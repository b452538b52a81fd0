// src/lib.rs

//! Timetable Sync Library
//!
//! Expands packed timetable rows into per-day course records and syncs
//! them incrementally into a document store.
//!
//! Document identities transliterate uppercase Turkish letters too, so
//! Wednesday keys end in `_Carsamba`. A collection written by the older
//! lowercase-only scheme (`_Çarsamba`) sees every Wednesday document as NEW
//! on the first sync; under `StalePolicy::Remove` the old keys are then
//! deleted as stale.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
