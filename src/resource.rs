//! Object model for managed resources
//!
//! Objects are addressed by an [`ObjectKey`] of `(kind, namespace, name)`.
//! Every stored type implements [`Resource`], which gives the store and the
//! reconciler uniform access to its [`ObjectMeta`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::association::AssociationConf;

/// Identity of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

/// Back-reference from an owned object to its owner, used for garbage
/// collection when the owner goes away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub uid: String,
    #[serde(default)]
    pub controller: bool,
}

/// Metadata shared by all stored objects.
///
/// `uid` and `resource_version` are assigned by the store; callers leave
/// them empty on objects they have not fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// A kind of object the store can hold.
pub trait Resource: Clone + Serialize + DeserializeOwned {
    /// Kind name, the first component of every [`ObjectKey`] of this type.
    const KIND: &'static str;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        let meta = self.meta();
        ObjectKey::new(Self::KIND, &meta.namespace, &meta.name)
    }

    /// Controller reference pointing at this object.
    ///
    /// Returns `None` until the object has been persisted and carries a uid.
    fn controller_reference(&self) -> Option<OwnerReference> {
        let meta = self.meta();
        meta.uid.as_ref().map(|uid| OwnerReference {
            kind: Self::KIND.to_string(),
            name: meta.name.clone(),
            uid: uid.clone(),
            controller: true,
        })
    }
}

/// A key/value blob, the managed object that carries rendered configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub metadata: ObjectMeta,
    #[serde(default, with = "secret_data")]
    pub data: BTreeMap<String, Vec<u8>>,
}

impl Resource for Secret {
    const KIND: &'static str = "Secret";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Secret values are written as text when they are valid UTF-8 and as raw
/// byte lists otherwise, so persisted configuration stays readable.
///
/// On read, unquoted scalars in hand-written manifests (`user: 12345`) are
/// taken in their text form.
mod secret_data {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    #[derive(Serialize)]
    #[serde(untagged)]
    enum Blob {
        Text(String),
        Binary(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(
        data: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let blobs: BTreeMap<&String, Blob> = data
            .iter()
            .map(|(key, value)| {
                let blob = match String::from_utf8(value.clone()) {
                    Ok(text) => Blob::Text(text),
                    Err(err) => Blob::Binary(err.into_bytes()),
                };
                (key, blob)
            })
            .collect();
        blobs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| {
                let bytes = match value {
                    Value::String(text) => text.into_bytes(),
                    Value::Bool(flag) => flag.to_string().into_bytes(),
                    Value::Number(number) => number.to_string().into_bytes(),
                    Value::Array(items) => items
                        .iter()
                        .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                        .collect::<Option<Vec<u8>>>()
                        .ok_or_else(|| {
                            D::Error::custom(format!(
                                "secret key '{}': byte lists may only hold integers 0-255",
                                key
                            ))
                        })?,
                    Value::Null | Value::Object(_) => {
                        return Err(D::Error::custom(format!(
                            "secret key '{}': expected text or a byte list",
                            key
                        )))
                    }
                };
                Ok((key, bytes))
            })
            .collect()
    }
}

/// Desired state of an Enterprise Search deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterpriseSearchSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// User-supplied settings, merged last over everything else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association: Option<AssociationConf>,
}

/// The owner of the configuration secret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnterpriseSearch {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: EnterpriseSearchSpec,
}

impl EnterpriseSearch {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: EnterpriseSearchSpec::default(),
        }
    }

    /// Association settings, if an Elasticsearch backend is configured.
    pub fn association_conf(&self) -> Option<&AssociationConf> {
        self.spec
            .association
            .as_ref()
            .filter(|conf| conf.is_configured())
    }
}

impl Resource for EnterpriseSearch {
    const KIND: &'static str = "EnterpriseSearch";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
