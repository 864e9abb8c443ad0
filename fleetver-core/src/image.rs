//! Container image reference grammar.
//!
//! A raw tag is the first run of characters after a colon that contains no
//! `:` or `@` and is followed by `-`, `@` or the end of the reference. When
//! a run is cut short by another colon (a registry port, for example) the
//! longest prefix ending right before a `-` is taken instead; failing that
//! the scan moves on to the next colon.
//!
//! ```text
//! registry/app:v1.2.3-beta        tag = 1.2.3-beta   version = 1.2.3
//! registry:5000/app:2.0@sha256:.. tag = 2.0          version = 2.0
//! registry/app                    tag = latest       version = latest
//! ```

use crate::entities::{ContainerDescriptor, ContainerSpec, VERSION_PLACEHOLDER};
use std::collections::HashSet;

/// Sentinel tag/version for references without an explicit tag.
pub const LATEST: &str = "latest";

/// Locate the raw tag of an image reference.
pub fn raw_tag(image: &str) -> Option<&str> {
    for (colon, _) in image.match_indices(':') {
        let rest = &image[colon + 1..];
        let run_end = rest.find(|c: char| c == ':' || c == '@').unwrap_or(rest.len());
        let run = &rest[..run_end];
        if run.is_empty() {
            continue;
        }

        if run_end == rest.len() || rest[run_end..].starts_with('@') {
            return Some(run);
        }

        // Run ended on ':'; the longest prefix followed by '-' still matches.
        if let Some(dash) = run.rfind('-') {
            if dash > 0 {
                return Some(&run[..dash]);
            }
        }
    }
    None
}

fn strip_v(tag: &str) -> &str {
    tag.strip_prefix('v').unwrap_or(tag)
}

fn version_of(tag: &str) -> &str {
    tag.split_once('-').map_or(tag, |(head, _)| head)
}

/// Parse one image reference into its tag/version descriptor.
pub fn extract(image: &str) -> ContainerDescriptor {
    let (image_tag, version) = match raw_tag(image) {
        Some(raw) => {
            let tag = strip_v(raw);
            (tag.to_string(), version_of(tag).to_string())
        }
        None => (LATEST.to_string(), LATEST.to_string()),
    };

    ContainerDescriptor {
        image: image.to_string(),
        image_tag,
        version,
        container: None,
    }
}

/// Parse a container's image, remembering which container referenced it.
pub fn extract_container(container: &ContainerSpec) -> ContainerDescriptor {
    ContainerDescriptor {
        container: Some(container.name.clone()),
        ..extract(&container.image)
    }
}

/// Drop descriptors whose `image:version` was already seen, keeping order.
pub fn dedupe(descriptors: Vec<ContainerDescriptor>) -> Vec<ContainerDescriptor> {
    let mut seen = HashSet::with_capacity(descriptors.len());
    descriptors
        .into_iter()
        .filter(|descriptor| seen.insert(descriptor.dedupe_key()))
        .collect()
}

/// Extract and deduplicate a container list.
pub fn process_containers(containers: &[ContainerSpec]) -> Vec<ContainerDescriptor> {
    dedupe(containers.iter().map(extract_container).collect())
}

// ============================================================================
// SPECIAL-CASED DEPLOYMENTS
// ============================================================================

/// Case-insensitive substring match against the special-case allow-list.
pub fn is_special(container_name: &str, special_deployments: &[String]) -> bool {
    let name = container_name.to_lowercase();
    special_deployments
        .iter()
        .any(|special| name.contains(&special.to_lowercase()))
}

/// Version for the microservice matrix.
///
/// Special-cased containers keep everything after the last colon (minus one
/// leading `v`) so multi-segment build ids survive. Everything else follows
/// the regular grammar. References without a tag yield `None`.
pub fn matrix_version(
    image: &str,
    container_name: &str,
    special_deployments: &[String],
) -> Option<String> {
    if is_special(container_name, special_deployments) {
        let (_, after) = image.rsplit_once(':')?;
        if after.is_empty() {
            return None;
        }
        return Some(strip_v(after).to_string());
    }

    raw_tag(image).map(|raw| version_of(strip_v(raw)).to_string())
}

/// Comma-joined matrix versions for a deployment's containers, or the
/// placeholder when no container carries a tag.
pub fn joined_versions(descriptors: &[ContainerDescriptor], special_deployments: &[String]) -> String {
    let versions: Vec<String> = descriptors
        .iter()
        .filter_map(|d| {
            matrix_version(&d.image, d.container.as_deref().unwrap_or(""), special_deployments)
        })
        .collect();

    if versions.is_empty() {
        VERSION_PLACEHOLDER.to_string()
    } else {
        versions.join(",")
    }
}
