use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::ast::indentation;

use super::{FieldNode, InlineFragmentNode, PlanNode, PlanNodeId, QueryPlan};

/// Renders one operation node as a GraphQL document on a single line, the
/// form that is dispatched to the source schema and embedded in the plan
/// artifact.
pub(super) fn render_operation_document(plan: &QueryPlan, id: PlanNodeId) -> String {
    OperationDocument { plan, id }.to_string()
}

struct OperationDocument<'a> {
    plan: &'a QueryPlan,
    id: PlanNodeId,
}

impl Display for OperationDocument<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let Some(operation) = self.plan.operation(self.id) else {
            return Ok(());
        };

        write!(f, "{}", operation.operation_kind)?;
        if !operation.variables.is_empty() {
            write!(f, "(")?;
            for (i, (name, ty)) in operation.variables.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "${}:{}", name, ty)?;
            }
            write!(f, ")")?;
        }
        write!(f, " ")?;

        match &operation.lookup {
            Some(lookup) => {
                write!(f, "{{{}", lookup.field)?;
                let extra = lookup
                    .extra_arguments
                    .as_ref()
                    .filter(|arguments| !arguments.is_empty());
                if !lookup.arguments.is_empty() || extra.is_some() {
                    write!(f, "(")?;
                    let mut first = true;
                    for argument in &lookup.arguments {
                        if !first {
                            write!(f, ", ")?;
                        }
                        first = false;
                        write!(f, "{}: ${}", argument.name, argument.variable)?;
                    }
                    if let Some(arguments) = extra {
                        for (name, value) in arguments.iter() {
                            if !first {
                                write!(f, ", ")?;
                            }
                            first = false;
                            write!(f, "{}: {}", name, value)?;
                        }
                    }
                    write!(f, ")")?;
                }
                if !operation.selections.is_empty() {
                    write!(f, " ")?;
                    fmt_selection_set(self.plan, f, &operation.selections)?;
                }
                write!(f, "}}")
            }
            None => fmt_selection_set(self.plan, f, &operation.selections),
        }
    }
}

fn fmt_selection_set(plan: &QueryPlan, f: &mut Formatter<'_>, ids: &[PlanNodeId]) -> FmtResult {
    write!(f, "{{")?;
    let mut first = true;
    for id in ids {
        if !first {
            write!(f, " ")?;
        }
        first = false;
        match plan.node(*id) {
            PlanNode::Field(field) => fmt_field(plan, f, field)?,
            PlanNode::InlineFragment(fragment) => fmt_inline_fragment(plan, f, fragment)?,
            _ => {}
        }
    }
    write!(f, "}}")
}

fn fmt_field(plan: &QueryPlan, f: &mut Formatter<'_>, field: &FieldNode) -> FmtResult {
    if let Some(alias) = &field.alias {
        write!(f, "{}: ", alias)?;
    }
    write!(f, "{}", field.name)?;
    if let Some(arguments) = &field.arguments {
        write!(f, "{}", arguments)?;
    }
    if let Some(var) = &field.skip_if {
        write!(f, " @skip(if: ${})", var)?;
    }
    if let Some(var) = &field.include_if {
        write!(f, " @include(if: ${})", var)?;
    }
    if !field.selections.is_empty() {
        write!(f, " ")?;
        fmt_selection_set(plan, f, &field.selections)?;
    }
    Ok(())
}

fn fmt_inline_fragment(
    plan: &QueryPlan,
    f: &mut Formatter<'_>,
    fragment: &InlineFragmentNode,
) -> FmtResult {
    write!(f, "... on {}", fragment.type_condition)?;
    if let Some(var) = &fragment.skip_if {
        write!(f, " @skip(if: ${})", var)?;
    }
    if let Some(var) = &fragment.include_if {
        write!(f, " @include(if: ${})", var)?;
    }
    write!(f, " ")?;
    fmt_selection_set(plan, f, &fragment.selections)
}

/// Multi-line tree rendering, the format snapshot tests assert against.
impl Display for QueryPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "RequestPlan {{")?;
        for root in self.roots() {
            fmt_plan_node(self, f, *root, 1)?;
        }
        write!(f, "}}")
    }
}

fn fmt_plan_node(
    plan: &QueryPlan,
    f: &mut Formatter<'_>,
    id: PlanNodeId,
    depth: usize,
) -> FmtResult {
    let indent = indentation(depth);
    match plan.node(id) {
        PlanNode::Operation(operation) => {
            write!(f, "{indent}{id} Operation(schema: \"{}\"", operation.schema)?;
            if !operation.context_path.is_root() {
                write!(f, ", path: \"{}\"", operation.context_path)?;
            }
            writeln!(f, ") {{")?;
            let inner = indentation(depth + 1);
            for requirement_id in &operation.requirements {
                if let PlanNode::Requirement(requirement) = plan.node(*requirement_id) {
                    writeln!(
                        f,
                        "{inner}require ${} = {}.{} ({})",
                        requirement.name,
                        requirement.depends_on,
                        requirement.field_path.join("."),
                        requirement.ty,
                    )?;
                }
            }
            writeln!(f, "{inner}{}", plan.operation_document(id))?;
            for child in &operation.children {
                fmt_plan_node(plan, f, *child, depth + 1)?;
            }
            writeln!(f, "{indent}}}")
        }
        PlanNode::Condition(condition) => {
            writeln!(
                f,
                "{indent}Condition(${} == {}) {{",
                condition.variable, condition.passing_value
            )?;
            for child in &condition.nodes {
                fmt_plan_node(plan, f, *child, depth + 1)?;
            }
            writeln!(f, "{indent}}}")
        }
        _ => Ok(()),
    }
}
