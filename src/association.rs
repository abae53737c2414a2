//! Association with an Elasticsearch backend
//!
//! An Enterprise Search deployment may be linked to an Elasticsearch cluster.
//! The link is described by an [`AssociationConf`] on the owner's spec; an
//! [`AssociationResolver`] turns it into concrete connection settings,
//! including the credentials read from a backing secret.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::resource::{EnterpriseSearch, ObjectKey, Resource, Secret};
use crate::store::ObjectStore;

/// Link from an Enterprise Search deployment to an Elasticsearch cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationConf {
    /// Elasticsearch endpoint. An empty URL means the association is unset.
    #[serde(default)]
    pub url: String,
    /// Secret holding the credentials, in the owner's namespace.
    #[serde(default)]
    pub auth_secret_name: String,
    /// Key inside the secret; doubles as the username.
    #[serde(default)]
    pub auth_secret_key: String,
    /// Whether the cluster exposes a CA certificate to trust.
    #[serde(default)]
    pub ca_cert_provided: bool,
}

impl AssociationConf {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }
}

/// Connection settings for a configured association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAssociation {
    pub host: String,
    pub username: String,
    pub password: String,
    pub ca_configured: bool,
}

/// Produces the connection settings of an owner's association.
pub trait AssociationResolver {
    /// `Ok(None)` when no association is configured.
    fn resolve(&self, owner: &EnterpriseSearch) -> Result<Option<ResolvedAssociation>>;
}

/// Reads association credentials from a secret in an [`ObjectStore`].
///
/// The username is the secret key named by the association and the
/// password is the value stored under it.
#[derive(Debug)]
pub struct SecretAssociationResolver<'a, S> {
    store: &'a S,
}

impl<'a, S: ObjectStore> SecretAssociationResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: ObjectStore> AssociationResolver for SecretAssociationResolver<'_, S> {
    fn resolve(&self, owner: &EnterpriseSearch) -> Result<Option<ResolvedAssociation>> {
        let Some(conf) = owner.association_conf() else {
            return Ok(None);
        };

        let key = ObjectKey::new(
            Secret::KIND,
            &owner.meta().namespace,
            &conf.auth_secret_name,
        );
        let secret_ref = format!("{}/{}", key.namespace, key.name);
        let credential_error = |message: &str| Error::CredentialResolution {
            secret: secret_ref.clone(),
            message: message.to_string(),
        };

        let secret = self
            .store
            .get::<Secret>(&key)?
            .ok_or_else(|| credential_error("secret not found"))?;
        let raw = secret.data.get(&conf.auth_secret_key).ok_or_else(|| {
            credential_error(&format!("key '{}' not found in secret", conf.auth_secret_key))
        })?;
        let password = String::from_utf8(raw.clone())
            .map_err(|_| credential_error("password is not valid UTF-8"))?;

        Ok(Some(ResolvedAssociation {
            host: conf.url.clone(),
            username: conf.auth_secret_key.clone(),
            password,
            ca_configured: conf.ca_cert_provided,
        }))
    }
}

/// Resolver returning a fixed answer, independent of the owner.
#[derive(Debug, Clone, Default)]
pub struct StaticAssociationResolver {
    association: Option<ResolvedAssociation>,
}

impl StaticAssociationResolver {
    pub fn new(association: Option<ResolvedAssociation>) -> Self {
        Self { association }
    }

    /// Resolver for a deployment without an association.
    pub fn none() -> Self {
        Self::default()
    }
}

impl AssociationResolver for StaticAssociationResolver {
    fn resolve(&self, _owner: &EnterpriseSearch) -> Result<Option<ResolvedAssociation>> {
        Ok(self.association.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ObjectMeta;
    use crate::store::MemoryStore;
    use std::collections::BTreeMap;

    fn owner_with_association(ca: bool) -> EnterpriseSearch {
        let mut ents = EnterpriseSearch::new("ns", "ents");
        ents.spec.association = Some(AssociationConf {
            url: "https://es.ns.svc:9200".to_string(),
            auth_secret_name: "ents-es-user".to_string(),
            auth_secret_key: "ns-ents-user".to_string(),
            ca_cert_provided: ca,
        });
        ents
    }

    fn store_with_credentials(data: BTreeMap<String, Vec<u8>>) -> MemoryStore {
        let store = MemoryStore::new();
        let mut secret = Secret {
            metadata: ObjectMeta::new("ns", "ents-es-user"),
            data,
        };
        store.create(&mut secret).unwrap();
        store
    }

    #[test]
    fn test_unconfigured_association_resolves_to_none() {
        let store = MemoryStore::new();
        let resolver = SecretAssociationResolver::new(&store);
        let ents = EnterpriseSearch::new("ns", "ents");
        assert_eq!(resolver.resolve(&ents).unwrap(), None);
        assert_eq!(store.stats().unwrap().gets, 0);
    }

    #[test]
    fn test_resolves_credentials_from_secret() {
        let mut data = BTreeMap::new();
        data.insert("ns-ents-user".to_string(), b"s3cr3t".to_vec());
        let store = store_with_credentials(data);
        let resolver = SecretAssociationResolver::new(&store);

        let resolved = resolver
            .resolve(&owner_with_association(true))
            .unwrap()
            .unwrap();
        assert_eq!(resolved.host, "https://es.ns.svc:9200");
        assert_eq!(resolved.username, "ns-ents-user");
        assert_eq!(resolved.password, "s3cr3t");
        assert!(resolved.ca_configured);
    }

    #[test]
    fn test_missing_secret_is_credential_error() {
        let store = MemoryStore::new();
        let resolver = SecretAssociationResolver::new(&store);
        let err = resolver
            .resolve(&owner_with_association(false))
            .unwrap_err();
        match err {
            Error::CredentialResolution { secret, message } => {
                assert_eq!(secret, "ns/ents-es-user");
                assert!(message.contains("not found"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_key_is_credential_error() {
        let mut data = BTreeMap::new();
        data.insert("someone-else".to_string(), b"x".to_vec());
        let store = store_with_credentials(data);
        let resolver = SecretAssociationResolver::new(&store);
        let err = resolver
            .resolve(&owner_with_association(false))
            .unwrap_err();
        assert!(matches!(err, Error::CredentialResolution { .. }));
        assert!(err.to_string().contains("ns-ents-user"));
    }

    #[test]
    fn test_static_resolver() {
        let association = ResolvedAssociation {
            host: "http://es:9200".to_string(),
            username: "elastic".to_string(),
            password: "changeme".to_string(),
            ca_configured: false,
        };
        let resolver = StaticAssociationResolver::new(Some(association.clone()));
        let ents = EnterpriseSearch::new("ns", "ents");
        assert_eq!(resolver.resolve(&ents).unwrap(), Some(association));
        assert_eq!(StaticAssociationResolver::none().resolve(&ents).unwrap(), None);
    }
}
