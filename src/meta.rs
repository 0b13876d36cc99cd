use std::sync::LazyLock;

use k8s_openapi::Metadata;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use regex::Regex;

static TOO_OLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"too old resource version: \d+ \((\d+)\)").expect("pattern is valid")
});

/// Access to the resource version of a decoded watch payload
///
/// A blanket implementation covers every `k8s-openapi` kind (Pod, Event,
/// ConfigMap, CronJob, Namespace, …). Custom payload types implement the
/// trait directly.
pub trait ResourceMeta {
    /// `metadata.resourceVersion`, if present and non-empty
    fn resource_version(&self) -> Option<&str>;
}

impl<K> ResourceMeta for K
where
    K: Metadata<Ty = ObjectMeta>,
{
    fn resource_version(&self) -> Option<&str> {
        self.metadata()
            .resource_version
            .as_deref()
            .filter(|version| !version.is_empty())
    }
}

/// Extracts the server-suggested resume version from a `410 Gone` status
/// message of the form `too old resource version: <observed> (<current>)`.
pub fn too_old_resource_version(message: &str) -> Option<String> {
    TOO_OLD
        .captures(message)
        .map(|captures| captures[1].to_string())
}
