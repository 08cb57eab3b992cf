// crates/pipeline-helpers-core/src/manifest.rs
// ============================================================================
// Module: Manifest Customization
// Description: Rewrites Kubernetes/OpenShift manifest templates per PR.
// Purpose: Label deployment, route, and service objects for a PR deployment.
// Dependencies: serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! Templates are parsed into a [`serde_yaml::Value`] tree and only the fields
//! that identify the deployment are rewritten: names, `service` labels,
//! selectors, and the container image. Everything else in the template is
//! carried over unchanged. A missing structural path fails with
//! [`ManifestError::MissingField`]; missing `labels` mappings are created.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_yaml::Mapping;
use serde_yaml::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Label key carrying the deployment label.
const SERVICE_LABEL: &str = "service";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Manifest customization errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    /// Template YAML could not be parsed.
    #[error("manifest parse error: {0}")]
    Parse(String),
    /// Customized manifest could not be serialized.
    #[error("manifest serialize error: {0}")]
    Serialize(String),
    /// A required field is absent.
    #[error("manifest field missing: {0}")]
    MissingField(String),
    /// A field expected to be a mapping has another shape.
    #[error("manifest field is not a mapping: {0}")]
    NotAMapping(String),
}

// ============================================================================
// SECTION: Manifest Kinds
// ============================================================================

/// Manifest templates customized per pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// `DeploymentConfig` or `Deployment`.
    Deployment,
    /// OpenShift route.
    Route,
    /// Kubernetes service.
    Service,
}

impl ManifestKind {
    /// All kinds in processing order.
    pub const ALL: [Self; 3] = [Self::Deployment, Self::Route, Self::Service];

    /// Returns the template file name.
    #[must_use]
    pub const fn template_file_name(self) -> &'static str {
        match self {
            Self::Deployment => "deploymentconfig.yaml",
            Self::Route => "route.yaml",
            Self::Service => "service.yaml",
        }
    }

    /// Returns the customized output file name.
    #[must_use]
    pub const fn output_file_name(self) -> &'static str {
        match self {
            Self::Deployment => "customized_deploymentconfig.yaml",
            Self::Route => "customized_route.yaml",
            Self::Service => "customized_service.yaml",
        }
    }

    /// Returns a stable label for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::Route => "route",
            Self::Service => "service",
        }
    }
}

// ============================================================================
// SECTION: Customization
// ============================================================================

/// Parses a manifest template.
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] when the template is not valid YAML.
pub fn parse_manifest(text: &str) -> Result<Value, ManifestError> {
    serde_yaml::from_str(text).map_err(|err| ManifestError::Parse(err.to_string()))
}

/// Serializes a customized manifest.
///
/// # Errors
///
/// Returns [`ManifestError::Serialize`] when serialization fails.
pub fn render_manifest(manifest: &Value) -> Result<String, ManifestError> {
    serde_yaml::to_string(manifest).map_err(|err| ManifestError::Serialize(err.to_string()))
}

/// Customizes a template of the given kind.
///
/// # Errors
///
/// Returns [`ManifestError`] when a required path is missing or malformed.
pub fn customize_manifest(
    kind: ManifestKind,
    template: &Value,
    label: &str,
    image: &str,
) -> Result<Value, ManifestError> {
    match kind {
        ManifestKind::Deployment => customize_deployment(template, label, image),
        ManifestKind::Route => customize_route(template, label),
        ManifestKind::Service => customize_service(template, label),
    }
}

/// Rewrites a deployment: names, labels, selector, and container image.
///
/// # Errors
///
/// Returns [`ManifestError`] when a required path is missing or malformed.
pub fn customize_deployment(
    template: &Value,
    label: &str,
    image: &str,
) -> Result<Value, ManifestError> {
    let mut manifest = template.clone();
    label_metadata(&mut manifest, label)?;

    let template_metadata = mapping_at_mut(&mut manifest, &["spec", "template", "metadata"])?;
    let template_labels =
        ensure_mapping(template_metadata, "labels", "spec.template.metadata.labels")?;
    set_string(template_labels, SERVICE_LABEL, label);

    let pod_spec = mapping_at_mut(&mut manifest, &["spec", "template", "spec"])?;
    let container = pod_spec
        .get_mut("containers")
        .and_then(Value::as_sequence_mut)
        .and_then(|containers| containers.first_mut())
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| {
            ManifestError::MissingField("spec.template.spec.containers[0]".to_string())
        })?;
    set_string(container, "name", label);
    set_string(container, "image", image);

    let spec = mapping_at_mut(&mut manifest, &["spec"])?;
    let selector = ensure_mapping(spec, "selector", "spec.selector")?;
    if selector.get("matchLabels").is_some_and(Value::is_mapping) {
        let match_labels =
            ensure_mapping(selector, "matchLabels", "spec.selector.matchLabels")?;
        set_string(match_labels, SERVICE_LABEL, label);
    } else {
        set_string(selector, SERVICE_LABEL, label);
    }
    Ok(manifest)
}

/// Rewrites a route: names, labels, and target service.
///
/// # Errors
///
/// Returns [`ManifestError`] when a required path is missing or malformed.
pub fn customize_route(template: &Value, label: &str) -> Result<Value, ManifestError> {
    let mut manifest = template.clone();
    label_metadata(&mut manifest, label)?;
    let target = mapping_at_mut(&mut manifest, &["spec", "to"])?;
    set_string(target, "name", label);
    Ok(manifest)
}

/// Rewrites a service: names, labels, and selector.
///
/// # Errors
///
/// Returns [`ManifestError`] when a required path is missing or malformed.
pub fn customize_service(template: &Value, label: &str) -> Result<Value, ManifestError> {
    let mut manifest = template.clone();
    label_metadata(&mut manifest, label)?;
    let spec = mapping_at_mut(&mut manifest, &["spec"])?;
    let selector = ensure_mapping(spec, "selector", "spec.selector")?;
    set_string(selector, SERVICE_LABEL, label);
    Ok(manifest)
}

// ============================================================================
// SECTION: Tree Helpers
// ============================================================================

/// Sets `metadata.name` and `metadata.labels.service`.
fn label_metadata(manifest: &mut Value, label: &str) -> Result<(), ManifestError> {
    let metadata = mapping_at_mut(manifest, &["metadata"])?;
    set_string(metadata, "name", label);
    let labels = ensure_mapping(metadata, "labels", "metadata.labels")?;
    set_string(labels, SERVICE_LABEL, label);
    Ok(())
}

/// Walks a mapping path and returns the mapping at its end.
fn mapping_at_mut<'a>(root: &'a mut Value, path: &[&str]) -> Result<&'a mut Mapping, ManifestError> {
    let mut current = root;
    for (index, segment) in path.iter().enumerate() {
        current = current
            .get_mut(*segment)
            .ok_or_else(|| ManifestError::MissingField(path[..= index].join(".")))?;
    }
    current.as_mapping_mut().ok_or_else(|| ManifestError::NotAMapping(path.join(".")))
}

/// Returns the mapping under `key`, creating it when absent or null.
fn ensure_mapping<'a>(
    parent: &'a mut Mapping,
    key: &str,
    path: &str,
) -> Result<&'a mut Mapping, ManifestError> {
    if parent.get(key).is_none_or(Value::is_null) {
        parent.insert(Value::String(key.to_string()), Value::Mapping(Mapping::new()));
    }
    parent
        .get_mut(key)
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| ManifestError::NotAMapping(path.to_string()))
}

/// Inserts or replaces a string field, keeping its position.
fn set_string(mapping: &mut Mapping, key: &str, value: &str) {
    mapping.insert(Value::String(key.to_string()), Value::String(value.to_string()));
}
