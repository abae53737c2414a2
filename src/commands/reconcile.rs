//! Reconcile command implementation
//!
//! Loads an Enterprise Search manifest (and optionally credential secret
//! manifests) into a file-backed store, then converges the config secret of
//! the deployment. Running the command twice without changes performs no
//! writes the second time.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use ents_config::association::SecretAssociationResolver;
use ents_config::config_secret::reconcile_config;
use ents_config::defaults::resolve_state_dir;
use ents_config::reconciler::{reconcile, reconcile_resource, Outcome};
use ents_config::resource::{EnterpriseSearch, Resource, Secret};
use ents_config::store::FileStore;

/// Arguments for the reconcile command
#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Enterprise Search manifest (YAML)
    #[arg(short, long, value_name = "PATH")]
    pub manifest: PathBuf,

    /// Secret manifests to load first, e.g. the Elasticsearch credentials
    #[arg(long = "secret", value_name = "PATH")]
    pub secrets: Vec<PathBuf>,

    /// Directory holding the stored objects
    #[arg(long, value_name = "PATH", env = "ENTS_CONFIG_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

/// Execute the reconcile command
pub fn execute(args: ReconcileArgs) -> Result<()> {
    let state_dir = resolve_state_dir(args.state_dir);
    let store = FileStore::new(&state_dir);
    log::debug!("Using state directory {}", state_dir.display());

    for path in &args.secrets {
        let secret: Secret = load_manifest(path)?;
        // manifests are their own owners: no uid, so no owner reference
        let applied = reconcile(&store, &secret, &secret)?;
        report(&applied.object, applied.outcome);
    }

    let manifest: EnterpriseSearch = load_manifest(&args.manifest)?;
    let applied = reconcile_resource(
        &store,
        &manifest,
        &manifest,
        |observed, desired| observed.spec != desired.spec,
        |observed, desired| observed.spec = desired.spec.clone(),
    )?;
    report(&applied.object, applied.outcome);

    let resolver = SecretAssociationResolver::new(&store);
    let reconciled = reconcile_config(&store, &resolver, &applied.object)?;
    report(&reconciled.object, reconciled.outcome);
    Ok(())
}

/// Read a manifest, dropping store-managed metadata.
fn load_manifest<R: Resource>(path: &Path) -> Result<R> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let mut object: R = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest {}", path.display()))?;
    let meta = object.meta_mut();
    meta.uid = None;
    meta.resource_version = None;
    if meta.namespace.is_empty() {
        meta.namespace = "default".to_string();
    }
    Ok(object)
}

fn report<R: Resource>(object: &R, outcome: Outcome) {
    let meta = object.meta();
    println!("{} {}/{} {}", R::KIND, meta.namespace, meta.name, outcome.as_str());
}
