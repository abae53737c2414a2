//! Configuration secret reconciliation
//!
//! Composes the Enterprise Search configuration, renders it, and converges a
//! secret holding the rendered file. The secret is mounted into the
//! container at [`CONFIG_MOUNT_PATH`](crate::composer::CONFIG_MOUNT_PATH).

use std::collections::BTreeMap;

use log::info;

use crate::association::AssociationResolver;
use crate::composer::{new_config, CONFIG_FILENAME, CONFIG_MOUNT_PATH};
use crate::error::Result;
use crate::reconciler::{reconcile, Reconciled};
use crate::resource::{EnterpriseSearch, ObjectMeta, Secret};
use crate::store::ObjectStore;

/// Label identifying the type of the owning application.
pub const TYPE_LABEL_NAME: &str = "common.k8s.elastic.co/type";

/// Value of [`TYPE_LABEL_NAME`] for Enterprise Search objects.
pub const TYPE_LABEL_VALUE: &str = "enterprise-search";

/// Label carrying the name of the owning Enterprise Search.
pub const NAME_LABEL_NAME: &str = "enterprisesearch.k8s.elastic.co/name";

/// Name of the volume the config secret is mounted as.
pub const CONFIG_VOLUME_NAME: &str = "config";

/// Name of the config secret for the Enterprise Search named `ents_name`.
pub fn config_secret_name(ents_name: &str) -> String {
    format!("{}-ent-config", ents_name)
}

/// Labels applied to objects owned by the Enterprise Search `ents_name`.
pub fn new_labels(ents_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (TYPE_LABEL_NAME.to_string(), TYPE_LABEL_VALUE.to_string()),
        (NAME_LABEL_NAME.to_string(), ents_name.to_string()),
    ])
}

/// A secret mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretVolume {
    pub secret_name: String,
    pub volume_name: String,
    pub mount_path: String,
}

/// Volume mounting the config secret of `ents`.
pub fn config_secret_volume(ents: &EnterpriseSearch) -> SecretVolume {
    SecretVolume {
        secret_name: config_secret_name(&ents.metadata.name),
        volume_name: CONFIG_VOLUME_NAME.to_string(),
        mount_path: CONFIG_MOUNT_PATH.to_string(),
    }
}

/// The config secret `ents` should have, given its rendered configuration.
pub fn expected_config_secret(ents: &EnterpriseSearch, rendered: Vec<u8>) -> Secret {
    let mut metadata = ObjectMeta::new(
        &ents.metadata.namespace,
        &config_secret_name(&ents.metadata.name),
    );
    metadata.labels = new_labels(&ents.metadata.name);
    Secret {
        metadata,
        data: BTreeMap::from([(CONFIG_FILENAME.to_string(), rendered)]),
    }
}

/// Generate the configuration of `ents` and keep its config secret up to date.
pub fn reconcile_config<S, A>(
    store: &S,
    resolver: &A,
    ents: &EnterpriseSearch,
) -> Result<Reconciled<Secret>>
where
    S: ObjectStore,
    A: AssociationResolver,
{
    let cfg = new_config(resolver, ents)?;
    let rendered = cfg.render()?;
    let expected = expected_config_secret(ents, rendered);

    let reconciled = reconcile(store, ents, &expected)?;
    info!(
        "Config secret {}/{} {}",
        expected.metadata.namespace,
        expected.metadata.name,
        reconciled.outcome.as_str()
    );
    Ok(reconciled)
}
