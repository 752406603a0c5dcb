use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ResourceRequirements as K8sResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use super::SpecBuildError;
use crate::models::schedule::{ResourceList, ResourceRequirements};

const SUFFIXES: [&str; 13] = [
    "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "n", "u", "m", "k", "M", "G", "T",
];

/// Checks `value` against the Kubernetes quantity grammar:
/// a signed decimal number followed by an optional binary or decimal SI
/// suffix, or by a decimal exponent (`1e3`, `5E-2`).
pub fn is_valid_quantity(value: &str) -> bool {
    let unsigned = value
        .strip_prefix('+')
        .or_else(|| value.strip_prefix('-'))
        .unwrap_or(value);
    let number_len = unsigned
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    let mut parts = number.splitn(2, '.');
    let integer = parts.next().unwrap_or_default();
    let fraction = parts.next();
    if fraction.is_some_and(|f| f.contains('.')) {
        return false;
    }
    let has_digits = !integer.is_empty() || fraction.is_some_and(|f| !f.is_empty());
    if !has_digits {
        return false;
    }

    if suffix.is_empty() || suffix == "P" || suffix == "E" || SUFFIXES.contains(&suffix) {
        return true;
    }
    match suffix.strip_prefix(['e', 'E']) {
        Some(exponent) => {
            let digits = exponent
                .strip_prefix('+')
                .or_else(|| exponent.strip_prefix('-'))
                .unwrap_or(exponent);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

pub fn parse_quantity(resource: &str, value: &str) -> Result<Quantity, SpecBuildError> {
    let trimmed = value.trim();
    if is_valid_quantity(trimmed) {
        Ok(Quantity(trimmed.to_string()))
    } else {
        Err(SpecBuildError::InvalidResourceQuantity {
            resource: resource.to_string(),
            value: value.to_string(),
        })
    }
}

fn parse_list(list: &ResourceList) -> Result<Option<BTreeMap<String, Quantity>>, SpecBuildError> {
    if list.is_empty() {
        return Ok(None);
    }
    list.iter()
        .map(|(resource, value)| Ok((resource.clone(), parse_quantity(resource, value)?)))
        .collect::<Result<BTreeMap<_, _>, _>>()
        .map(Some)
}

/// Resources of the container: the per-job override when given, otherwise the
/// component's declared resources
pub fn build_requirements(
    overridden: Option<&ResourceRequirements>,
    declared: Option<&ResourceRequirements>,
) -> Result<Option<K8sResourceRequirements>, SpecBuildError> {
    let Some(requirements) = overridden.or(declared) else {
        return Ok(None);
    };
    if requirements.is_empty() {
        return Ok(None);
    }
    Ok(Some(K8sResourceRequirements {
        limits: parse_list(&requirements.limits)?,
        requests: parse_list(&requirements.requests)?,
        ..Default::default()
    }))
}
