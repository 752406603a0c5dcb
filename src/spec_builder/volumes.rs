use std::collections::HashSet;

use k8s_openapi::api::core::v1::{EmptyDirVolumeSource, SecretVolumeSource, Volume, VolumeMount};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use super::SpecBuildError;
use super::resources::is_valid_quantity;
use crate::kubernetes_objects::radix_deployment::RadixVolumeMount;

/// Name of the volume carrying the payload secret
pub const PAYLOAD_VOLUME_NAME: &str = "scheduled-payload";

fn invalid(name: &str, reason: impl Into<String>) -> SpecBuildError {
    SpecBuildError::InvalidVolumeMount {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Scratch volumes declared by the job component, one emptyDir per mount
pub fn component_volumes(
    mounts: &[RadixVolumeMount],
) -> Result<(Vec<Volume>, Vec<VolumeMount>), SpecBuildError> {
    let mut seen = HashSet::new();
    let mut volumes = Vec::with_capacity(mounts.len());
    let mut volume_mounts = Vec::with_capacity(mounts.len());

    for mount in mounts {
        let name = mount.name.trim();
        if name.is_empty() {
            return Err(invalid(name, "name is empty"));
        }
        if name == PAYLOAD_VOLUME_NAME || !seen.insert(name) {
            return Err(invalid(name, "name is not unique"));
        }
        if !mount.path.starts_with('/') {
            return Err(invalid(name, format!("path '{}' is not absolute", mount.path)));
        }

        let size_limit = match mount.size_limit.as_deref().map(str::trim) {
            Some(limit) if !limit.is_empty() => {
                if !is_valid_quantity(limit) {
                    return Err(invalid(name, format!("size limit '{limit}' is not a quantity")));
                }
                Some(Quantity(limit.to_string()))
            }
            _ => None,
        };

        volumes.push(Volume {
            name: name.to_string(),
            empty_dir: Some(EmptyDirVolumeSource {
                size_limit,
                ..Default::default()
            }),
            ..Default::default()
        });
        volume_mounts.push(VolumeMount {
            name: name.to_string(),
            mount_path: mount.path.clone(),
            ..Default::default()
        });
    }

    Ok((volumes, volume_mounts))
}

/// Read-only mount of the payload secret at `mount_path`
pub fn payload_volume(secret_name: &str, mount_path: &str) -> (Volume, VolumeMount) {
    let volume = Volume {
        name: PAYLOAD_VOLUME_NAME.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    let mount = VolumeMount {
        name: PAYLOAD_VOLUME_NAME.to_string(),
        mount_path: mount_path.to_string(),
        read_only: Some(true),
        ..Default::default()
    };
    (volume, mount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(name: &str, path: &str, size_limit: Option<&str>) -> RadixVolumeMount {
        RadixVolumeMount {
            name: name.to_string(),
            path: path.to_string(),
            size_limit: size_limit.map(str::to_string),
        }
    }

    #[test]
    fn test_component_volumes_are_empty_dirs() {
        let (volumes, mounts) = component_volumes(&[
            mount("scratch", "/scratch", Some("1Gi")),
            mount("cache", "/var/cache", None),
        ])
        .unwrap();

        assert_eq!(volumes.len(), 2);
        assert_eq!(
            volumes[0].empty_dir.as_ref().unwrap().size_limit,
            Some(Quantity("1Gi".to_string()))
        );
        assert_eq!(volumes[1].empty_dir.as_ref().unwrap().size_limit, None);
        assert_eq!(mounts[1].mount_path, "/var/cache");
    }

    #[test]
    fn test_invalid_volume_mounts() {
        let cases = [
            vec![mount("scratch", "scratch", None)],
            vec![mount("a", "/a", None), mount("a", "/b", None)],
            vec![mount("", "/a", None)],
            vec![mount(PAYLOAD_VOLUME_NAME, "/a", None)],
            vec![mount("a", "/a", Some("huge"))],
        ];
        for mounts in cases {
            let err = component_volumes(&mounts).unwrap_err();
            assert!(matches!(err, SpecBuildError::InvalidVolumeMount { .. }));
        }
    }

    #[test]
    fn test_payload_volume_is_read_only() {
        let (volume, mount) = payload_volume("batch-1-payloads", "/mnt/secrets");

        assert_eq!(
            volume.secret.unwrap().secret_name.as_deref(),
            Some("batch-1-payloads")
        );
        assert_eq!(mount.read_only, Some(true));
        assert_eq!(mount.mount_path, "/mnt/secrets");
    }
}
