use std::fmt::Write;

use serde::Serialize;

use crate::routing::{RoutePlan, StepKind};

/// Step row of a [`RouteSummary`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryStep {
    pub index: usize,
    pub label: String,
    pub kind: StepKind,
    pub lat_deg: f64,
    pub lon_deg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leg_nm: Option<f64>,
}

/// Structured representation of a planned route that higher-level consumers
/// can serialize or render as text.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteSummary {
    pub route_type: crate::graph::RouteType,
    pub from: String,
    pub to: String,
    pub legs: usize,
    pub distance_nm: f64,
    pub steps: Vec<SummaryStep>,
}

impl RouteSummary {
    /// Build a summary from a plan, labelling steps by ident where known and
    /// by position otherwise.
    pub fn from_plan(plan: &RoutePlan) -> Self {
        let steps: Vec<SummaryStep> = plan
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| SummaryStep {
                index,
                label: step
                    .ident
                    .clone()
                    .unwrap_or_else(|| step.pos.to_string()),
                kind: step.kind,
                lat_deg: step.pos.lat_deg,
                lon_deg: step.pos.lon_deg,
                leg_nm: step.leg_nm,
            })
            .collect();

        let from = steps
            .first()
            .map(|step| step.label.clone())
            .unwrap_or_else(|| "<empty>".to_string());
        let to = steps
            .last()
            .map(|step| step.label.clone())
            .unwrap_or_else(|| "<empty>".to_string());

        Self {
            route_type: plan.route_type,
            from,
            to,
            legs: plan.leg_count(),
            distance_nm: plan.distance_nm,
            steps,
        }
    }

    /// Plain-text rendering for terminal output.
    pub fn render_plain(&self) -> String {
        let mut buffer = String::new();
        let _ = writeln!(
            buffer,
            "Route: {} -> {} ({} legs, {:.1} nm, type: {})",
            self.from, self.to, self.legs, self.distance_nm, self.route_type
        );
        for step in &self.steps {
            match step.leg_nm {
                Some(leg_nm) => {
                    let _ = writeln!(
                        buffer,
                        "{:>3}: {} [{}] +{:.1} nm",
                        step.index,
                        step.label,
                        kind_label(step.kind),
                        leg_nm
                    );
                }
                None => {
                    let _ = writeln!(
                        buffer,
                        "{:>3}: {} [{}]",
                        step.index,
                        step.label,
                        kind_label(step.kind)
                    );
                }
            }
        }
        buffer
    }
}

fn kind_label(kind: StepKind) -> &'static str {
    match kind {
        StepKind::Airport => "airport",
        StepKind::Vor => "vor",
        StepKind::Ndb => "ndb",
        StepKind::Waypoint => "waypoint",
        StepKind::UserPoint => "user point",
    }
}
