use k8s_openapi::api::core::v1::{
    Affinity, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm, Toleration,
};

use super::SpecBuildError;
use crate::kubernetes_objects::labels::{RADIX_NODE_GPU_COUNT_LABEL, RADIX_NODE_GPU_LABEL};
use crate::models::schedule::RadixNode;

/// Placement derived from a GPU request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuScheduling {
    pub affinity: Option<Affinity>,
    pub tolerations: Option<Vec<Toleration>>,
}

fn requirement(key: &str, operator: &str, values: Vec<String>) -> NodeSelectorRequirement {
    NodeSelectorRequirement {
        key: key.to_string(),
        operator: operator.to_string(),
        values: Some(values),
    }
}

fn parse_gpu_count(gpu_count: &str) -> Result<u32, SpecBuildError> {
    match gpu_count.trim().parse::<u32>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(SpecBuildError::InvalidGpuCount(gpu_count.to_string())),
    }
}

pub fn gpu_scheduling(node: Option<&RadixNode>) -> Result<GpuScheduling, SpecBuildError> {
    let Some(node) = node else {
        return Ok(GpuScheduling::default());
    };

    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for entry in node.gpu.as_deref().unwrap_or_default().split(',') {
        let entry = entry.trim();
        if let Some(gpu) = entry.strip_prefix('-') {
            let gpu = gpu.trim();
            if !gpu.is_empty() {
                excluded.push(gpu.to_string());
            }
        } else if !entry.is_empty() {
            included.push(entry.to_string());
        }
    }

    let mut requirements = Vec::new();
    if !included.is_empty() {
        requirements.push(requirement(RADIX_NODE_GPU_LABEL, "In", included));
    }
    if !excluded.is_empty() {
        requirements.push(requirement(RADIX_NODE_GPU_LABEL, "NotIn", excluded));
    }
    if let Some(gpu_count) = node.gpu_count.as_deref()
        && !gpu_count.trim().is_empty()
    {
        let count = parse_gpu_count(gpu_count)?;
        requirements.push(requirement(
            RADIX_NODE_GPU_COUNT_LABEL,
            "Gt",
            vec![(count - 1).to_string()],
        ));
    }

    if requirements.is_empty() {
        return Ok(GpuScheduling::default());
    }

    Ok(GpuScheduling {
        affinity: Some(Affinity {
            node_affinity: Some(NodeAffinity {
                required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                    node_selector_terms: vec![NodeSelectorTerm {
                        match_expressions: Some(requirements),
                        ..Default::default()
                    }],
                }),
                ..Default::default()
            }),
            ..Default::default()
        }),
        tolerations: Some(vec![Toleration {
            key: Some(RADIX_NODE_GPU_LABEL.to_string()),
            operator: Some("Exists".to_string()),
            effect: Some("NoSchedule".to_string()),
            ..Default::default()
        }]),
    })
}
