//! Cloud Firestore access
//!
//! A minimal REST client: service account authentication and document
//! creation, behind the [`DocumentStore`] trait so the loader can also run
//! against a dry-run store.

pub mod auth;
pub mod client;
pub mod constants;
pub mod store;

pub use client::{ClientOptions, Endpoint, FirestoreClient};
pub use store::{DocumentStore, DryRunStore};
