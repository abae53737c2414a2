//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//! ```

use std::collections::BTreeMap;

use ents_config::association::AssociationConf;
use ents_config::resource::{EnterpriseSearch, ObjectMeta, Secret};

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::manifests;
}

/// Manifest snippets for CLI tests.
#[allow(dead_code)]
pub mod manifests {
    /// Deployment without an association.
    pub const STANDALONE: &str = r#"
metadata:
  namespace: default
  name: ents
spec:
  version: 7.7.0
"#;

    /// Deployment linked to an Elasticsearch cluster with a CA.
    pub const WITH_ASSOCIATION: &str = r#"
metadata:
  namespace: default
  name: ents
spec:
  association:
    url: https://es-http.default.svc:9200
    authSecretName: ents-es-user
    authSecretKey: default-ents-user
    caCertProvided: true
"#;

    /// Credentials referenced by `WITH_ASSOCIATION`.
    pub const CREDENTIALS: &str = r#"
metadata:
  namespace: default
  name: ents-es-user
data:
  default-ents-user: s3cr3t
"#;
}

/// An Enterprise Search already persisted (it carries a uid).
#[allow(dead_code)]
pub fn persisted_ents(namespace: &str, name: &str) -> EnterpriseSearch {
    let mut ents = EnterpriseSearch::new(namespace, name);
    ents.metadata.uid = Some(format!("{}-uid", name));
    ents
}

/// Association pointing at `ents-es-user` in the deployment's namespace.
#[allow(dead_code)]
pub fn association(ca: bool) -> AssociationConf {
    AssociationConf {
        url: "https://es-http.default.svc:9200".to_string(),
        auth_secret_name: "ents-es-user".to_string(),
        auth_secret_key: "default-ents-user".to_string(),
        ca_cert_provided: ca,
    }
}

/// The credential secret matching [`association`].
#[allow(dead_code)]
pub fn credentials(password: &str) -> Secret {
    Secret {
        metadata: ObjectMeta::new("default", "ents-es-user"),
        data: BTreeMap::from([("default-ents-user".to_string(), password.as_bytes().to_vec())]),
    }
}
