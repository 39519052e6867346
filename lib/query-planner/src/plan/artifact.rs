use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{PlanNodeId, QueryPlan};

/// Flat form of a plan for caching and cross-process reuse: one entry per
/// reachable operation, numbered breadth-first from the root, requirement
/// edges expressed through those numbers. A pure function of the plan, so
/// identical plans produce byte-identical artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanArtifact {
    pub nodes: Vec<ArtifactNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactNode {
    pub id: usize,
    pub schema: String,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<ArtifactRequirement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRequirement {
    pub name: String,
    #[serde(rename = "dependsOn")]
    pub depends_on: usize,
    pub field: Vec<String>,
    #[serde(rename = "type")]
    pub ty: String,
}

impl PlanArtifact {
    pub fn from_plan(plan: &QueryPlan) -> Self {
        let order = plan.operations_breadth_first();
        let ids: HashMap<PlanNodeId, usize> = order
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position))
            .collect();

        let mut nodes = Vec::with_capacity(order.len());
        for (position, id) in order.iter().enumerate() {
            let Some(operation) = plan.operation(*id) else {
                continue;
            };
            let requirements = operation
                .requirements
                .iter()
                .filter_map(|requirement_id| plan.requirement(*requirement_id))
                .map(|requirement| ArtifactRequirement {
                    name: requirement.name.clone(),
                    depends_on: ids[&requirement.depends_on],
                    field: requirement.field_path.clone(),
                    ty: requirement.ty.to_string(),
                })
                .collect();
            nodes.push(ArtifactNode {
                id: position,
                schema: operation.schema.to_string(),
                operation: plan.operation_document(*id),
                requirements,
            });
        }

        PlanArtifact { nodes }
    }
}
