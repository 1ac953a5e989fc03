//! Route planning facade.
//!
//! [`plan_route`] ties the pieces together: resolve the requested endpoints,
//! build a [`NavGraph`] for the requested route type, run the search, and
//! translate the node chain into the ordered step list callers use to build
//! flight-plan entries.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::db::{fuzzy_ident_matches, FacilityKind, NavDataSource};
use crate::error::{Error, Result};
use crate::geo::Pos;
use crate::graph::{EndpointRole, GraphConfig, NavGraph, NodeId, RouteType};
use crate::search::{find_route, SearchConfig};

/// Number of fuzzy suggestions attached to an unknown-ident error.
const IDENT_SUGGESTIONS: usize = 3;

/// A requested route endpoint: either a raw position or a facility ident to
/// resolve against the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Position(Pos),
    Ident(String),
}

impl From<Pos> for Endpoint {
    fn from(pos: Pos) -> Self {
        Endpoint::Position(pos)
    }
}

impl From<&str> for Endpoint {
    fn from(ident: &str) -> Self {
        Endpoint::Ident(ident.to_string())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Position(pos) => write!(f, "{pos}"),
            Endpoint::Ident(ident) => f.write_str(ident),
        }
    }
}

/// High-level route planning request.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub from: Endpoint,
    pub to: Endpoint,
    pub route_type: RouteType,
    /// Cruise altitude floor in feet, consulted by
    /// [`RouteType::AirwayAltitude`].
    pub min_altitude_ft: Option<i32>,
    pub search: SearchConfig,
}

impl RouteRequest {
    pub fn new(from: impl Into<Endpoint>, to: impl Into<Endpoint>, route_type: RouteType) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            route_type,
            min_altitude_ft: None,
            search: SearchConfig::default(),
        }
    }

    /// Convenience constructor for a direct great-circle route.
    pub fn direct(from: impl Into<Endpoint>, to: impl Into<Endpoint>) -> Self {
        Self::new(from, to, RouteType::Direct)
    }

    pub fn with_min_altitude(mut self, floor_ft: i32) -> Self {
        self.min_altitude_ft = Some(floor_ft);
        self
    }
}

/// Flight-plan-entry classification of a route step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Airport,
    Vor,
    Ndb,
    Waypoint,
    /// Synthetic endpoint wrapping a raw position.
    UserPoint,
}

impl StepKind {
    fn from_node_id(id: NodeId) -> Self {
        match id.kind() {
            Some(FacilityKind::Airport) => StepKind::Airport,
            Some(FacilityKind::Vor) => StepKind::Vor,
            Some(FacilityKind::Ndb) => StepKind::Ndb,
            Some(FacilityKind::Waypoint) => StepKind::Waypoint,
            None => StepKind::UserPoint,
        }
    }
}

/// One node of a planned route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStep {
    pub id: NodeId,
    pub kind: StepKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ident: Option<String>,
    pub pos: Pos,
    /// Great-circle distance from the previous step; `None` on the first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leg_nm: Option<f64>,
}

/// Planned route returned by the library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub route_type: RouteType,
    pub steps: Vec<RouteStep>,
    /// Summed great-circle distance over the steps.
    pub distance_nm: f64,
}

impl RoutePlan {
    /// Number of legs in the route.
    pub fn leg_count(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }
}

/// Compute a route between two endpoints.
///
/// Builds a fresh graph per call; callers planning repeatedly with the same
/// route type and altitude floor can keep a [`NavGraph`] and use
/// [`find_route`] directly to reuse the populated cache.
pub fn plan_route(source: Arc<dyn NavDataSource>, request: &RouteRequest) -> Result<RoutePlan> {
    let graph = NavGraph::new(
        source,
        GraphConfig {
            route_type: request.route_type,
            min_altitude_ft: request.min_altitude_ft,
        },
    );
    plan_route_on(&graph, request)
}

/// [`plan_route`] against a caller-owned graph. The graph configuration must
/// match the request.
pub fn plan_route_on(graph: &NavGraph, request: &RouteRequest) -> Result<RoutePlan> {
    let source = graph.source().clone();
    let from_pos = resolve_endpoint(source.as_ref(), &request.from)?;
    let to_pos = resolve_endpoint(source.as_ref(), &request.to)?;

    let start = graph.node_near(&from_pos, EndpointRole::Departure)?;
    let dest = graph.node_near(&to_pos, EndpointRole::Destination)?;
    debug!(
        from = %start.label(),
        to = %dest.label(),
        route_type = %request.route_type,
        "planning route"
    );

    let outcome = find_route(graph, &start, &dest, &request.search)?;

    let mut steps = Vec::with_capacity(outcome.path.len());
    let mut distance_nm = 0.0;
    let mut previous: Option<Pos> = None;
    for node in &outcome.path {
        let leg_nm = previous.map(|prev| prev.distance_to(&node.pos));
        distance_nm += leg_nm.unwrap_or(0.0);
        steps.push(RouteStep {
            id: node.id,
            kind: StepKind::from_node_id(node.id),
            ident: node.ident.clone(),
            pos: node.pos,
            leg_nm,
        });
        previous = Some(node.pos);
    }

    Ok(RoutePlan {
        route_type: request.route_type,
        steps,
        distance_nm,
    })
}

/// Resolve an endpoint to a position, with fuzzy suggestions on unknown
/// idents.
fn resolve_endpoint(source: &dyn NavDataSource, endpoint: &Endpoint) -> Result<Pos> {
    match endpoint {
        Endpoint::Position(pos) => Ok(*pos),
        Endpoint::Ident(ident) => match source.facility_by_ident(ident)? {
            Some(facility) => Ok(facility.pos),
            None => {
                let known = source.idents()?;
                Err(Error::UnknownFacility {
                    ident: ident.clone(),
                    suggestions: fuzzy_ident_matches(&known, ident, IDENT_SUGGESTIONS),
                })
            }
        },
    }
}
