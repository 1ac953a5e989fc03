use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use serde::Serialize;
use tracing::debug;

use crate::db::{AirwayLevel, AirwaySegment, Facility, FacilityId, FacilityKind, NavDataSource};
use crate::error::{Error, Result};
use crate::geo::{chord_for_arc_nm, Pos, Rect};

/// Snap distance for endpoint resolution. An endpoint closer than this to a
/// stored facility is treated as that facility; otherwise it becomes a
/// synthetic node with no airway connectivity.
pub const SNAP_TOLERANCE_NM: f64 = 1.0;

/// Maximum length of a direct (off-airway) leg: airway entry and exit legs
/// and the jump to the destination are only offered within this distance.
pub const DIRECT_RANGE_NM: f64 = 200.0;

/// Radius of the candidate scan around an expanded node. Also the effective
/// cap on per-facility radio ranges.
const NEIGHBOR_SCAN_RADIUS_NM: f64 = 250.0;

/// Extra margin added to every region fetch so small frontier movements keep
/// hitting the cache.
const PREFETCH_MARGIN_NM: f64 = 100.0;

/// Cap the direct-leg fan-out so dense terminal areas do not flood the open
/// list; the nearest candidates are kept.
const MAX_DIRECT_NEIGHBORS: usize = 16;

/// Radio ranges assumed when the facility record carries none.
const DEFAULT_VOR_RANGE_NM: f64 = 130.0;
const DEFAULT_NDB_RANGE_NM: f64 = 75.0;

/// Cost multiplier for direct legs while airway routing, so the search only
/// leaves the airway system when it pays off. Stays small enough that every
/// edge cost remains at least the great-circle distance, keeping the search
/// heuristic admissible.
const DIRECT_LEG_COST_FACTOR: f64 = 1.3;

const BUCKET_SIZE: usize = 32;

/// Edge-class filter applied while routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteType {
    /// Straight great-circle leg to the destination, no intermediate nodes.
    Direct,
    /// Direct legs between radio facilities (VOR/NDB) within reception range.
    RadioNav,
    /// Low-altitude (victor) airways.
    AirwayLow,
    /// High-altitude (jet) airways.
    AirwayHigh,
    /// Airways of either band filtered by a minimum-altitude floor.
    AirwayAltitude,
}

impl RouteType {
    pub fn uses_airways(self) -> bool {
        matches!(
            self,
            RouteType::AirwayLow | RouteType::AirwayHigh | RouteType::AirwayAltitude
        )
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RouteType::Direct => "direct",
            RouteType::RadioNav => "radio-nav",
            RouteType::AirwayLow => "airway-low",
            RouteType::AirwayHigh => "airway-high",
            RouteType::AirwayAltitude => "airway-altitude",
        };
        f.write_str(value)
    }
}

/// Node identity. Facility ids are only unique within their kind, so the id
/// carries the kind tag; the synthetic endpoint nodes get their own variants
/// and can never collide with database facilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeId {
    Airport(FacilityId),
    Vor(FacilityId),
    Ndb(FacilityId),
    Waypoint(FacilityId),
    Departure,
    Destination,
}

impl NodeId {
    pub fn from_parts(kind: FacilityKind, id: FacilityId) -> Self {
        match kind {
            FacilityKind::Airport => NodeId::Airport(id),
            FacilityKind::Vor => NodeId::Vor(id),
            FacilityKind::Ndb => NodeId::Ndb(id),
            FacilityKind::Waypoint => NodeId::Waypoint(id),
        }
    }

    /// Facility kind, or `None` for the synthetic endpoint nodes.
    pub fn kind(self) -> Option<FacilityKind> {
        match self {
            NodeId::Airport(_) => Some(FacilityKind::Airport),
            NodeId::Vor(_) => Some(FacilityKind::Vor),
            NodeId::Ndb(_) => Some(FacilityKind::Ndb),
            NodeId::Waypoint(_) => Some(FacilityKind::Waypoint),
            NodeId::Departure | NodeId::Destination => None,
        }
    }

    pub fn facility_id(self) -> Option<FacilityId> {
        match self {
            NodeId::Airport(id)
            | NodeId::Vor(id)
            | NodeId::Ndb(id)
            | NodeId::Waypoint(id) => Some(id),
            NodeId::Departure | NodeId::Destination => None,
        }
    }

    pub fn is_synthetic(self) -> bool {
        matches!(self, NodeId::Departure | NodeId::Destination)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Departure => f.write_str("departure"),
            NodeId::Destination => f.write_str("destination"),
            other => {
                let kind = other.kind().map(FacilityKind::as_str).unwrap_or("node");
                match other.facility_id() {
                    Some(id) => write!(f, "{kind}:{id}"),
                    None => f.write_str(kind),
                }
            }
        }
    }
}

/// Which endpoint of the search a synthetic node stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    Departure,
    Destination,
}

impl EndpointRole {
    fn node_id(self) -> NodeId {
        match self {
            EndpointRole::Departure => NodeId::Departure,
            EndpointRole::Destination => NodeId::Destination,
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointRole::Departure => f.write_str("departure"),
            EndpointRole::Destination => f.write_str("destination"),
        }
    }
}

/// Materialized graph node: a facility row, or a synthetic endpoint wrapping
/// a raw position.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub pos: Pos,
    pub ident: Option<String>,
    pub nav_range_nm: Option<f64>,
}

impl Node {
    fn from_facility(facility: &Facility) -> Self {
        Self {
            id: NodeId::from_parts(facility.kind, facility.id),
            pos: facility.pos,
            ident: Some(facility.ident.clone()),
            nav_range_nm: facility.nav_range_nm,
        }
    }

    /// Ident when known, otherwise the raw position.
    pub fn label(&self) -> String {
        match &self.ident {
            Some(ident) => ident.clone(),
            None => self.pos.to_string(),
        }
    }

    fn radio_range_nm(&self) -> f64 {
        self.nav_range_nm.unwrap_or(match self.id.kind() {
            Some(FacilityKind::Ndb) => DEFAULT_NDB_RANGE_NM,
            _ => DEFAULT_VOR_RANGE_NM,
        })
    }
}

/// Immutable per-graph configuration. Airway eligibility depends on both
/// fields, so changing either means building a new graph (or calling
/// [`NavGraph::reset`] after a database reload).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphConfig {
    pub route_type: RouteType,
    /// Cruise altitude floor in feet; airway segments with a higher minimum
    /// enroute altitude are excluded in [`RouteType::AirwayAltitude`] mode.
    pub min_altitude_ft: Option<i32>,
}

#[derive(Debug, Clone)]
struct AirwayEdge {
    to: NodeId,
    airway: String,
    distance_nm: f64,
}

struct GraphCache {
    nodes: HashMap<NodeId, Node>,
    airways: HashMap<NodeId, Vec<AirwayEdge>>,
    covered: Vec<Rect>,
    tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32>,
    indexed: Vec<NodeId>,
}

impl Default for GraphCache {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            airways: HashMap::new(),
            covered: Vec::new(),
            tree: KdTree::new(),
            indexed: Vec::new(),
        }
    }
}

/// Lazily populated navigation graph scoped to one routing configuration.
///
/// Facility and airway rows are fetched from the data source the first time
/// a query touches a region and cached for the graph's lifetime. The cache is
/// safe to share across concurrent searches: reads run in parallel and the
/// population path re-checks coverage under the write lock, with inserts
/// keyed by [`NodeId`] so overlapping fetches cannot alias nodes.
pub struct NavGraph {
    source: Arc<dyn NavDataSource>,
    config: GraphConfig,
    cache: RwLock<GraphCache>,
}

impl NavGraph {
    pub fn new(source: Arc<dyn NavDataSource>, config: GraphConfig) -> Self {
        Self {
            source,
            config,
            cache: RwLock::new(GraphCache::default()),
        }
    }

    pub fn config(&self) -> GraphConfig {
        self.config
    }

    /// Shared handle to the underlying data source.
    pub fn source(&self) -> &Arc<dyn NavDataSource> {
        &self.source
    }

    /// Drop every cached row, e.g. after the underlying database was
    /// reloaded. The configuration is kept.
    pub fn reset(&self) {
        *self.write() = GraphCache::default();
        debug!("navigation graph cache cleared");
    }

    /// Resolve an endpoint position to a graph node: the nearest facility
    /// within [`SNAP_TOLERANCE_NM`], or a synthetic node wrapping the raw
    /// position. Fails only for coordinates outside the valid ranges.
    pub fn node_near(&self, pos: &Pos, role: EndpointRole) -> Result<Node> {
        if !pos.is_valid() {
            return Err(Error::UnresolvableEndpoint {
                role: role.to_string(),
                lat: pos.lat_deg,
                lon: pos.lon_deg,
            });
        }

        self.ensure_region(Rect::centered(pos, NEIGHBOR_SCAN_RADIUS_NM))?;

        let cache = self.read();
        if let Some((id, distance)) = nearest_nodes(&cache, pos, 1).into_iter().next() {
            if distance <= SNAP_TOLERANCE_NM {
                if let Some(node) = cache.nodes.get(&id) {
                    return Ok(node.clone());
                }
            }
        }

        Ok(Node {
            id: role.node_id(),
            pos: *pos,
            ident: None,
            nav_range_nm: None,
        })
    }

    /// Nearest stored facility to a position, with its great-circle distance.
    pub fn nearest_facility(&self, pos: &Pos) -> Result<Option<(Node, f64)>> {
        self.ensure_region(Rect::centered(pos, NEIGHBOR_SCAN_RADIUS_NM))?;
        let cache = self.read();
        Ok(nearest_nodes(&cache, pos, 1)
            .into_iter()
            .next()
            .and_then(|(id, distance)| {
                cache.nodes.get(&id).map(|node| (node.clone(), distance))
            }))
    }

    /// Candidate successors of `node` with their leg costs, filtered by the
    /// active route type. The destination is always offered as a candidate
    /// when it lies within direct range, so the search can terminate by
    /// jumping straight to the goal.
    pub fn neighbors(&self, node: &Node, dest: &Node) -> Result<Vec<(Node, f64)>> {
        if self.config.route_type == RouteType::Direct {
            return Ok(vec![(dest.clone(), node.pos.distance_to(&dest.pos))]);
        }

        self.ensure_region(Rect::centered(&node.pos, NEIGHBOR_SCAN_RADIUS_NM))?;

        let cache = self.read();
        let mut candidates = Vec::new();
        match self.config.route_type {
            RouteType::RadioNav => radio_candidates(&cache, node, dest, &mut candidates),
            _ => airway_candidates(&cache, node, dest, &mut candidates),
        }

        let to_dest = node.pos.distance_to(&dest.pos);
        if to_dest <= DIRECT_RANGE_NM {
            let factor = if self.config.route_type == RouteType::RadioNav {
                1.0
            } else {
                DIRECT_LEG_COST_FACTOR
            };
            candidates.push((dest.clone(), to_dest * factor));
        }

        Ok(candidates)
    }

    /// Cached node lookup.
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.read().nodes.get(&id).cloned()
    }

    /// Number of cached nodes, for diagnostics.
    pub fn cached_nodes(&self) -> usize {
        self.read().nodes.len()
    }

    fn segment_eligible(&self, segment: &AirwaySegment) -> bool {
        match self.config.route_type {
            RouteType::AirwayLow => segment.level == AirwayLevel::Victor,
            RouteType::AirwayHigh => segment.level == AirwayLevel::Jet,
            RouteType::AirwayAltitude => self
                .config
                .min_altitude_ft
                .map_or(true, |floor| segment.min_altitude_ft <= floor),
            RouteType::Direct | RouteType::RadioNav => false,
        }
    }

    fn ensure_region(&self, needed: Rect) -> Result<()> {
        {
            let cache = self.read();
            if cache.covered.iter().any(|rect| rect.contains_rect(&needed)) {
                return Ok(());
            }
        }

        let mut cache = self.write();
        // Re-check: another search may have populated this region while we
        // waited for the write lock.
        if cache.covered.iter().any(|rect| rect.contains_rect(&needed)) {
            return Ok(());
        }

        let fetch = needed.inflated(PREFETCH_MARGIN_NM);
        let facilities = self.source.facilities_within(&fetch)?;
        let mut added = 0usize;
        for facility in &facilities {
            let id = NodeId::from_parts(facility.kind, facility.id);
            if cache.nodes.contains_key(&id) {
                continue;
            }
            let index = cache.indexed.len();
            cache.tree.add(&facility.pos.to_cartesian(), index);
            cache.indexed.push(id);
            cache.nodes.insert(id, Node::from_facility(facility));
            added += 1;
        }

        let mut edges_added = 0usize;
        let mut deferred = 0usize;
        if self.config.route_type.uses_airways() {
            let segments = self.source.segments_within(&fetch)?;
            for segment in &segments {
                if !self.segment_eligible(segment) {
                    continue;
                }
                let from = NodeId::from_parts(segment.from.0, segment.from.1);
                let to = NodeId::from_parts(segment.to.0, segment.to.1);
                let from_pos = cache.nodes.get(&from).map(|node| node.pos);
                let to_pos = cache.nodes.get(&to).map(|node| node.pos);
                let (Some(from_pos), Some(to_pos)) = (from_pos, to_pos) else {
                    // Endpoint outside the fetched region; the segment is
                    // picked up again once a query reaches that area.
                    deferred += 1;
                    continue;
                };
                let distance_nm = from_pos.distance_to(&to_pos);
                edges_added += insert_edge(&mut cache.airways, from, to, segment, distance_nm);
                edges_added += insert_edge(&mut cache.airways, to, from, segment, distance_nm);
            }
        }

        cache.covered.push(fetch);
        debug!(
            nodes = added,
            edges = edges_added,
            deferred,
            "populated navigation graph region"
        );
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, GraphCache> {
        // A poisoned lock only means a search panicked mid-population; the
        // cache is insert-only and stays consistent.
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn insert_edge(
    adjacency: &mut HashMap<NodeId, Vec<AirwayEdge>>,
    from: NodeId,
    to: NodeId,
    segment: &AirwaySegment,
    distance_nm: f64,
) -> usize {
    let edges = adjacency.entry(from).or_default();
    if edges
        .iter()
        .any(|edge| edge.to == to && edge.airway == segment.airway)
    {
        return 0;
    }
    edges.push(AirwayEdge {
        to,
        airway: segment.airway.clone(),
        distance_nm,
    });
    1
}

/// K nearest cached nodes to a position, with great-circle distances.
fn nearest_nodes(cache: &GraphCache, pos: &Pos, k: usize) -> Vec<(NodeId, f64)> {
    if k == 0 || cache.indexed.is_empty() {
        return Vec::new();
    }
    cache
        .tree
        .nearest_n::<SquaredEuclidean>(&pos.to_cartesian(), k)
        .into_iter()
        .filter_map(|neighbor| {
            let id = *cache.indexed.get(neighbor.item)?;
            let node = cache.nodes.get(&id)?;
            Some((id, pos.distance_to(&node.pos)))
        })
        .collect()
}

/// Cached nodes within a great-circle radius of a position.
fn nodes_within(cache: &GraphCache, pos: &Pos, radius_nm: f64) -> Vec<(NodeId, f64)> {
    if cache.indexed.is_empty() {
        return Vec::new();
    }
    let chord = chord_for_arc_nm(radius_nm);
    cache
        .tree
        .within::<SquaredEuclidean>(&pos.to_cartesian(), chord * chord)
        .into_iter()
        .filter_map(|neighbor| {
            let id = *cache.indexed.get(neighbor.item)?;
            let node = cache.nodes.get(&id)?;
            let distance = pos.distance_to(&node.pos);
            (distance <= radius_nm).then_some((id, distance))
        })
        .collect()
}

/// Radio-navigation expansion: VOR/NDB facilities within reception range of
/// the candidate station.
fn radio_candidates(cache: &GraphCache, node: &Node, dest: &Node, out: &mut Vec<(Node, f64)>) {
    let mut legs: Vec<(Node, f64)> = nodes_within(cache, &node.pos, NEIGHBOR_SCAN_RADIUS_NM)
        .into_iter()
        .filter(|(id, _)| *id != node.id && *id != dest.id)
        .filter(|(id, _)| {
            matches!(
                id.kind(),
                Some(FacilityKind::Vor) | Some(FacilityKind::Ndb)
            )
        })
        .filter_map(|(id, distance)| {
            let candidate = cache.nodes.get(&id)?;
            (distance <= candidate.radio_range_nm())
                .then(|| (candidate.clone(), distance))
        })
        .collect();

    legs.sort_by(|a, b| a.1.total_cmp(&b.1));
    legs.truncate(MAX_DIRECT_NEIGHBORS);
    out.extend(legs);
}

/// Airway expansion: follow eligible airway edges; nodes without any airway
/// connectivity (the synthetic departure, airports off the airway system)
/// instead get direct entry legs to nearby airway fixes.
fn airway_candidates(cache: &GraphCache, node: &Node, dest: &Node, out: &mut Vec<(Node, f64)>) {
    if let Some(edges) = cache.airways.get(&node.id) {
        if !edges.is_empty() {
            for edge in edges {
                if let Some(next) = cache.nodes.get(&edge.to) {
                    out.push((next.clone(), edge.distance_nm));
                }
            }
            return;
        }
    }

    let mut entries: Vec<(Node, f64)> = nodes_within(cache, &node.pos, DIRECT_RANGE_NM)
        .into_iter()
        .filter(|(id, _)| *id != node.id && *id != dest.id)
        .filter(|(id, _)| cache.airways.get(id).is_some_and(|edges| !edges.is_empty()))
        .filter_map(|(id, distance)| {
            cache
                .nodes
                .get(&id)
                .map(|fix| (fix.clone(), distance * DIRECT_LEG_COST_FACTOR))
        })
        .collect();

    entries.sort_by(|a, b| a.1.total_cmp(&b.1));
    entries.truncate(MAX_DIRECT_NEIGHBORS);
    out.extend(entries);
}
