//! # Convergence Engine
//!
//! [`reconcile_resource`] drives a stored object toward a desired one with at
//! most one write per call:
//!
//! 1. fetch the object identified by the desired object's key;
//! 2. if it does not exist, create it from the desired object, with a
//!    controller reference to the owner;
//! 3. otherwise ask `needs_update` whether observed and desired differ;
//! 4. if they do, let `apply_update` copy the relevant fields onto the
//!    observed object and persist it as an update.
//!
//! The engine owns the fetch/create/compare/update branching; the caller
//! decides which fields matter for equality and which are copied. Because the
//! observed object is updated in place, fields the caller does not copy (uid,
//! resource version, annotations added by other writers) are preserved.
//!
//! The engine is stateless. Calls for different objects may run
//! concurrently; calls for the same object must be serialized by the caller.
//! Store errors are returned unchanged and never retried here.

use log::{debug, info};

use crate::error::Result;
use crate::resource::{Resource, Secret};
use crate::store::ObjectStore;

/// What a reconciliation did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Created => "created",
            Outcome::Updated => "updated",
            Outcome::Unchanged => "unchanged",
        }
    }
}

/// The observed object after reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<R> {
    pub object: R,
    pub outcome: Outcome,
}

/// Per-kind equality and field-copy rules.
pub trait Converge: Resource {
    /// Whether `observed` differs from `desired` in any field this kind
    /// manages.
    fn needs_update(observed: &Self, desired: &Self) -> bool;

    /// Copy the managed fields of `desired` onto `observed`.
    fn apply_update(observed: &mut Self, desired: &Self);
}

impl Converge for Secret {
    fn needs_update(observed: &Self, desired: &Self) -> bool {
        observed.data != desired.data || observed.metadata.labels != desired.metadata.labels
    }

    fn apply_update(observed: &mut Self, desired: &Self) {
        observed.metadata.labels.clone_from(&desired.metadata.labels);
        observed.data.clone_from(&desired.data);
    }
}

/// Reconcile `desired` using its kind's [`Converge`] rules.
pub fn reconcile<S, O, R>(store: &S, owner: &O, desired: &R) -> Result<Reconciled<R>>
where
    S: ObjectStore,
    O: Resource,
    R: Converge,
{
    reconcile_resource(store, owner, desired, R::needs_update, R::apply_update)
}

/// Converge the stored copy of `desired` toward it.
///
/// `needs_update(observed, desired)` decides whether a write is needed;
/// `apply_update(observed, desired)` copies the desired fields in place
/// before the update is persisted.
pub fn reconcile_resource<S, O, R, N, U>(
    store: &S,
    owner: &O,
    desired: &R,
    needs_update: N,
    apply_update: U,
) -> Result<Reconciled<R>>
where
    S: ObjectStore,
    O: Resource,
    R: Resource,
    N: FnOnce(&R, &R) -> bool,
    U: FnOnce(&mut R, &R),
{
    let key = desired.key();

    let Some(mut observed) = store.get::<R>(&key)? else {
        let mut created = desired.clone();
        if let Some(reference) = owner.controller_reference() {
            let references = &mut created.meta_mut().owner_references;
            references.retain(|r| !(r.controller || r.uid == reference.uid));
            references.push(reference);
        }
        info!("Creating {}", key);
        store.create(&mut created)?;
        return Ok(Reconciled {
            object: created,
            outcome: Outcome::Created,
        });
    };

    if !needs_update(&observed, desired) {
        debug!("{} is up to date", key);
        return Ok(Reconciled {
            object: observed,
            outcome: Outcome::Unchanged,
        });
    }

    info!("Updating {}", key);
    apply_update(&mut observed, desired);
    store.update(&mut observed)?;
    Ok(Reconciled {
        object: observed,
        outcome: Outcome::Updated,
    })
}
