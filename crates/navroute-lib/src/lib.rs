//! Navroute library entry points.
//!
//! This crate exposes the aeronautical route-finding core: open a navigation
//! database, build a lazily populated navigation graph for a route type and
//! altitude floor, and run an A* search between two endpoints. Higher-level
//! consumers (CLI, map UIs) should only depend on the functions exported here
//! instead of reimplementing behavior.
//!

#![deny(warnings)]

pub mod db;
pub mod error;
pub mod geo;
pub mod graph;
pub mod output;
pub mod routing;
pub mod search;

pub use db::{
    fuzzy_ident_matches, AirwayLevel, AirwaySegment, Facility, FacilityId, FacilityKind,
    NavDataSource, NavDatabase,
};
pub use error::{Error, Result};
pub use geo::{Pos, Rect};
pub use graph::{EndpointRole, GraphConfig, NavGraph, Node, NodeId, RouteType};
pub use output::{RouteSummary, SummaryStep};
pub use routing::{
    plan_route, plan_route_on, Endpoint, RoutePlan, RouteRequest, RouteStep, StepKind,
};
pub use search::{find_route, SearchConfig, SearchOutcome};
