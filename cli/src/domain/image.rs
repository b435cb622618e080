//! Node image descriptor, embedded at compile time.
//!
//! The `{{BASE_IMAGE}}` placeholder is substituted from configuration before
//! each build.

use anyhow::Result;

/// Node image descriptor template: OpenSSH server and client, root login by
/// key only, host keys generated on first start.
const NODE_DOCKERFILE: &str = include_str!("../../assets/node.Dockerfile");

const BASE_IMAGE_PLACEHOLDER: &str = "{{BASE_IMAGE}}";

/// Render the node image descriptor for `base_image`.
///
/// # Errors
///
/// Returns an error if `base_image` is empty or contains characters that
/// cannot appear in an image reference.
pub fn node_dockerfile(base_image: &str) -> Result<String> {
    anyhow::ensure!(!base_image.is_empty(), "base image must not be empty");
    anyhow::ensure!(
        base_image
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/' | ':' | '@')),
        "invalid base image reference: {base_image}"
    );
    Ok(NODE_DOCKERFILE.replace(BASE_IMAGE_PLACEHOLDER, base_image))
}
