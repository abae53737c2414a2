//! # Enterprise Search Configuration Library
//!
//! This library composes the configuration file of an Enterprise Search
//! deployment from layered sources and keeps a managed secret holding the
//! rendered file converged with it. It backs the `ents-config` command-line
//! tool and can be embedded by any controller that owns a store of objects.
//!
//! ## Quick Example
//!
//! ```
//! use ents_config::association::StaticAssociationResolver;
//! use ents_config::config_secret::reconcile_config;
//! use ents_config::reconciler::Outcome;
//! use ents_config::resource::EnterpriseSearch;
//! use ents_config::store::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let resolver = StaticAssociationResolver::none();
//! let mut ents = EnterpriseSearch::new("default", "ents");
//! ents.metadata.uid = Some("ents-uid".to_string());
//!
//! let first = reconcile_config(&store, &resolver, &ents).unwrap();
//! assert_eq!(first.outcome, Outcome::Created);
//!
//! // Nothing changed, so nothing is written
//! let second = reconcile_config(&store, &resolver, &ents).unwrap();
//! assert_eq!(second.outcome, Outcome::Unchanged);
//! ```
//!
//! ## Core Concepts
//!
//! - **Settings (`settings`)**: `CanonicalConfig`, an ordered tree of dotted
//!   keys with deep merging and deterministic YAML rendering.
//! - **Composition (`composer`)**: defaults, association-derived settings and
//!   user settings, merged in that order so the user always wins.
//! - **Association (`association`)**: resolves the Elasticsearch endpoint and
//!   credentials an Enterprise Search deployment is linked to.
//! - **Convergence (`reconciler`)**: fetch, create, compare and update a
//!   stored object with at most one write per call.
//! - **Stores (`store`)**: the get/create/update interface plus in-memory and
//!   file-backed implementations.
//!
//! ## Execution Flow
//!
//! `config_secret::reconcile_config` ties the pieces together:
//!
//! 1.  **Compose**: build the layered configuration for the deployment.
//! 2.  **Render**: serialize it to bytes with sorted keys.
//! 3.  **Wrap**: place the bytes in the desired config secret.
//! 4.  **Converge**: create or update the stored secret if it differs.

pub mod association;
pub mod composer;
pub mod config_secret;
pub mod defaults;
pub mod error;
pub mod reconciler;
pub mod resource;
pub mod settings;
pub mod store;

#[cfg(test)]
mod settings_proptest;
