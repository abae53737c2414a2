//! # Configuration Composition
//!
//! Builds the Enterprise Search configuration from three layers, merged in a
//! fixed order:
//!
//! 1. built-in defaults ([`default_config`]);
//! 2. settings derived from the Elasticsearch association
//!    ([`association_config`]);
//! 3. user-supplied settings from the deployment spec.
//!
//! User settings are merged last so operators can override anything that is
//! derived automatically, such as pointing at a different backend.

use std::path::Path;

use log::{debug, warn};

use crate::association::{AssociationResolver, ResolvedAssociation};
use crate::error::Result;
use crate::resource::EnterpriseSearch;
use crate::settings::{CanonicalConfig, SettingValue};

/// HTTP port Enterprise Search listens on.
pub const HTTP_PORT: u16 = 3002;

/// Name of the rendered configuration file inside the config secret.
pub const CONFIG_FILENAME: &str = "enterprise-search.yml";

/// Where the config secret is mounted in the container.
pub const CONFIG_MOUNT_PATH: &str = "/mnt/config";

/// Where the Elasticsearch CA certificate is mounted in the container.
pub const ES_CERTS_PATH: &str = "/mnt/es-certs";

/// File name of the CA certificate under [`ES_CERTS_PATH`].
pub const CA_CERT_FILE_NAME: &str = "tls.crt";

/// Authentication source used when an association is configured.
pub const AUTH_SOURCE_ELASTICSEARCH: &str = "elasticsearch-native";

/// Marker carried by the placeholder secret values in the defaults.
pub const PLACEHOLDER_MARKER: &str = "TODOCHANGEME";

/// Built-in defaults.
///
/// `secret_session_key` and `secret_management.encryption_keys` are
/// placeholders and are predictable; deployments must override them.
pub fn default_config(http_port: u16) -> Result<CanonicalConfig> {
    CanonicalConfig::from_entries([
        (
            "ent_search.external_url",
            SettingValue::from(format!("http://localhost:{}", http_port)),
        ),
        ("ent_search.listen_host", SettingValue::from("0.0.0.0")),
        ("allow_es_settings_modification", SettingValue::from(true)),
        (
            "secret_session_key",
            SettingValue::from(format!("{}secret_session_key", PLACEHOLDER_MARKER)),
        ),
        (
            "secret_management.encryption_keys",
            SettingValue::from(vec![format!(
                "{}secret_management.encryption_keys",
                PLACEHOLDER_MARKER
            )]),
        ),
    ])
}

/// Path of the Elasticsearch CA certificate inside the container.
pub fn es_ca_cert_path() -> String {
    Path::new(ES_CERTS_PATH)
        .join(CA_CERT_FILE_NAME)
        .to_string_lossy()
        .into_owned()
}

/// Settings derived from a resolved association; empty when there is none.
pub fn association_config(association: Option<&ResolvedAssociation>) -> Result<CanonicalConfig> {
    let Some(association) = association else {
        return Ok(CanonicalConfig::new());
    };

    let mut cfg = CanonicalConfig::from_entries([
        ("ent_search.auth.source", AUTH_SOURCE_ELASTICSEARCH),
        ("elasticsearch.host", association.host.as_str()),
        ("elasticsearch.username", association.username.as_str()),
        ("elasticsearch.password", association.password.as_str()),
    ])?;

    if association.ca_configured {
        let tls = CanonicalConfig::from_entries([
            ("elasticsearch.ssl.enabled", SettingValue::from(true)),
            (
                "elasticsearch.ssl.certificate_authority",
                SettingValue::from(es_ca_cert_path()),
            ),
        ])?;
        cfg.merge_with(&[&tls])?;
    }
    Ok(cfg)
}

/// Layer defaults, association settings and user settings, in that order.
pub fn compose(
    defaults: CanonicalConfig,
    association: &CanonicalConfig,
    user: &CanonicalConfig,
) -> Result<CanonicalConfig> {
    let mut cfg = defaults;
    // user settings last so they take precedence
    cfg.merge_with(&[association, user])?;
    Ok(cfg)
}

/// Compose the full configuration of `ents`.
///
/// Fails if the user settings are malformed or the association credentials
/// cannot be resolved; no partial configuration is returned.
pub fn new_config<A: AssociationResolver>(
    resolver: &A,
    ents: &EnterpriseSearch,
) -> Result<CanonicalConfig> {
    let user = match &ents.spec.config {
        Some(raw) => CanonicalConfig::from_value(raw)?,
        None => CanonicalConfig::new(),
    };

    let association = resolver.resolve(ents)?;
    debug!(
        "Composing configuration for {}/{} (association: {})",
        ents.metadata.namespace,
        ents.metadata.name,
        association.is_some()
    );
    let association_cfg = association_config(association.as_ref())?;

    let cfg = compose(default_config(HTTP_PORT)?, &association_cfg, &user)?;
    for path in placeholder_paths(&cfg) {
        warn!(
            "{}/{}: '{}' still uses the built-in placeholder value; set it in the spec config",
            ents.metadata.namespace, ents.metadata.name, path
        );
    }
    Ok(cfg)
}

/// Paths of settings still holding a placeholder value.
pub fn placeholder_paths(cfg: &CanonicalConfig) -> Vec<String> {
    cfg.leaf_paths()
        .into_iter()
        .filter(|path| cfg.get(path).is_some_and(is_placeholder))
        .collect()
}

fn is_placeholder(value: &SettingValue) -> bool {
    match value {
        SettingValue::String(s) => s.starts_with(PLACEHOLDER_MARKER),
        SettingValue::List(items) => items.iter().any(is_placeholder),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::StaticAssociationResolver;
    use crate::error::Error;

    fn association(ca: bool) -> ResolvedAssociation {
        ResolvedAssociation {
            host: "https://es.default.svc:9200".to_string(),
            username: "default-ents-user".to_string(),
            password: "pw".to_string(),
            ca_configured: ca,
        }
    }

    #[test]
    fn test_defaults_only() {
        let cfg = compose(
            default_config(HTTP_PORT).unwrap(),
            &CanonicalConfig::new(),
            &CanonicalConfig::new(),
        )
        .unwrap();
        assert_eq!(
            cfg.leaf_paths(),
            vec![
                "allow_es_settings_modification",
                "ent_search.external_url",
                "ent_search.listen_host",
                "secret_management.encryption_keys",
                "secret_session_key",
            ]
        );
        assert_eq!(
            cfg.get("ent_search.external_url").and_then(SettingValue::as_str),
            Some("http://localhost:3002")
        );
        assert_eq!(
            cfg.get("ent_search.listen_host").and_then(SettingValue::as_str),
            Some("0.0.0.0")
        );
        assert_eq!(
            cfg.get("allow_es_settings_modification")
                .and_then(SettingValue::as_bool),
            Some(true)
        );
        assert_eq!(
            cfg.get("secret_management.encryption_keys")
                .and_then(SettingValue::as_list)
                .map(|l| l.len()),
            Some(1)
        );
    }

    #[test]
    fn test_external_url_embeds_port() {
        let cfg = default_config(8080).unwrap();
        assert_eq!(
            cfg.get("ent_search.external_url").and_then(SettingValue::as_str),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn test_no_association_is_empty() {
        assert!(association_config(None).unwrap().is_empty());
    }

    #[test]
    fn test_association_without_ca() {
        let cfg = association_config(Some(&association(false))).unwrap();
        assert_eq!(
            cfg.leaf_paths(),
            vec![
                "elasticsearch.host",
                "elasticsearch.password",
                "elasticsearch.username",
                "ent_search.auth.source",
            ]
        );
        assert!(cfg.get("elasticsearch.ssl.enabled").is_none());
        assert_eq!(
            cfg.get("ent_search.auth.source").and_then(SettingValue::as_str),
            Some("elasticsearch-native")
        );
    }

    #[test]
    fn test_association_with_ca() {
        let cfg = association_config(Some(&association(true))).unwrap();
        assert_eq!(
            cfg.get("elasticsearch.ssl.enabled").and_then(SettingValue::as_bool),
            Some(true)
        );
        assert_eq!(
            cfg.get("elasticsearch.ssl.certificate_authority")
                .and_then(SettingValue::as_str),
            Some("/mnt/es-certs/tls.crt")
        );
        assert_eq!(cfg.leaf_paths().len(), 6);
    }

    #[test]
    fn test_user_settings_override_association() {
        let mut ents = EnterpriseSearch::new("default", "ents");
        ents.spec.config = Some(
            serde_yaml::from_str("elasticsearch.host: https://other:9200\nsecret_session_key: mine")
                .unwrap(),
        );
        let resolver = StaticAssociationResolver::new(Some(association(false)));
        let cfg = new_config(&resolver, &ents).unwrap();

        assert_eq!(
            cfg.get("elasticsearch.host").and_then(SettingValue::as_str),
            Some("https://other:9200")
        );
        assert_eq!(
            cfg.get("elasticsearch.username").and_then(SettingValue::as_str),
            Some("default-ents-user")
        );
        assert_eq!(
            cfg.get("secret_session_key").and_then(SettingValue::as_str),
            Some("mine")
        );
    }

    #[test]
    fn test_malformed_user_settings_fail() {
        let mut ents = EnterpriseSearch::new("default", "ents");
        ents.spec.config = Some(serde_yaml::from_str("ent_search: {listen_host: null}").unwrap());
        let err = new_config(&StaticAssociationResolver::none(), &ents).unwrap_err();
        match err {
            Error::ConfigParse { path, .. } => assert_eq!(path, "ent_search.listen_host"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_user_settings_conflicting_shape_fail() {
        let mut ents = EnterpriseSearch::new("default", "ents");
        ents.spec.config = Some(serde_yaml::from_str("ent_search: disabled").unwrap());
        let err = new_config(&StaticAssociationResolver::none(), &ents).unwrap_err();
        assert!(matches!(err, Error::ConfigMerge { .. }));
    }

    #[test]
    fn test_placeholder_paths() {
        let defaults = default_config(HTTP_PORT).unwrap();
        assert_eq!(
            placeholder_paths(&defaults),
            vec!["secret_management.encryption_keys", "secret_session_key"]
        );

        let user = CanonicalConfig::from_yaml_str(
            "secret_session_key: abc\nsecret_management.encryption_keys: [def]",
        )
        .unwrap();
        let cfg = compose(defaults, &CanonicalConfig::new(), &user).unwrap();
        assert!(placeholder_paths(&cfg).is_empty());
    }
}
