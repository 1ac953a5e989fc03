mod common;

use std::sync::Arc;

use common::FixtureBuilder;
use navroute_lib::{
    find_route, AirwayLevel, EndpointRole, FacilityKind, GraphConfig, NavGraph, NodeId, Pos,
    RouteType, SearchConfig,
};

fn graph(source: Arc<navroute_lib::NavDatabase>, route_type: RouteType) -> NavGraph {
    NavGraph::new(
        source,
        GraphConfig {
            route_type,
            min_altitude_ft: None,
        },
    )
}

#[test]
fn node_near_snaps_to_a_close_facility() {
    let mut fixture = FixtureBuilder::new();
    fixture.vor("TGO", 48.6, 9.2);
    let graph = graph(fixture.build(), RouteType::RadioNav);

    // Well inside the snap tolerance.
    let node = graph
        .node_near(&Pos::new(48.6001, 9.2001), EndpointRole::Departure)
        .expect("resolves");
    assert_eq!(node.ident.as_deref(), Some("TGO"));
    assert_eq!(node.id.kind(), Some(FacilityKind::Vor));
}

#[test]
fn node_near_falls_back_to_a_synthetic_node() {
    let mut fixture = FixtureBuilder::new();
    fixture.vor("TGO", 48.6, 9.2);
    let graph = graph(fixture.build(), RouteType::RadioNav);

    let pos = Pos::new(49.5, 9.2);
    let node = graph
        .node_near(&pos, EndpointRole::Destination)
        .expect("resolves");
    assert_eq!(node.id, NodeId::Destination);
    assert_eq!(node.pos, pos);
    assert!(node.ident.is_none());
}

#[test]
fn node_near_rejects_invalid_coordinates() {
    let graph = graph(FixtureBuilder::new().build(), RouteType::RadioNav);
    let result = graph.node_near(&Pos::new(95.0, 0.0), EndpointRole::Departure);
    assert!(result.is_err());
}

#[test]
fn radio_graph_ignores_waypoints_and_airports() {
    let mut fixture = FixtureBuilder::new();
    fixture.vor("VOR", 0.0, 1.0);
    fixture.ndb("NDB", 0.0, 0.8);
    fixture.waypoint("WPT", 0.0, 0.9);
    fixture.airport("APT", 0.0, 0.7);
    let graph = graph(fixture.build(), RouteType::RadioNav);

    let start = graph
        .node_near(&Pos::new(0.0, 0.0), EndpointRole::Departure)
        .expect("resolves");
    let dest = graph
        .node_near(&Pos::new(0.0, 5.0), EndpointRole::Destination)
        .expect("resolves");

    let kinds: Vec<Option<FacilityKind>> = graph
        .neighbors(&start, &dest)
        .expect("expansion")
        .iter()
        .map(|(node, _)| node.id.kind())
        .collect();
    assert!(kinds.contains(&Some(FacilityKind::Vor)));
    assert!(kinds.contains(&Some(FacilityKind::Ndb)));
    assert!(!kinds.contains(&Some(FacilityKind::Waypoint)));
    assert!(!kinds.contains(&Some(FacilityKind::Airport)));
}

#[test]
fn airway_graph_expands_along_the_airway() {
    let mut fixture = FixtureBuilder::new();
    let w1 = fixture.waypoint("ONE", 0.0, 1.0);
    let w2 = fixture.waypoint("TWO", 0.0, 2.0);
    let w3 = fixture.waypoint("TRE", 0.0, 3.0);
    fixture.airway("V1", AirwayLevel::Victor, 3000, &[w1, w2, w3]);
    let graph = graph(fixture.build(), RouteType::AirwayLow);

    let dest = graph
        .node_near(&Pos::new(0.0, 8.0), EndpointRole::Destination)
        .expect("resolves");
    let middle = graph
        .node_near(&Pos::new(0.0, 2.0), EndpointRole::Departure)
        .expect("snaps to TWO");
    assert_eq!(middle.ident.as_deref(), Some("TWO"));

    let neighbors = graph.neighbors(&middle, &dest).expect("expansion");
    let idents: Vec<Option<&str>> = neighbors
        .iter()
        .map(|(node, _)| node.ident.as_deref())
        .collect();
    assert!(idents.contains(&Some("ONE")));
    assert!(idents.contains(&Some("TRE")));
    // An airway fix expands along the airway only; the destination is out of
    // direct range here.
    assert_eq!(neighbors.len(), 2);
}

#[test]
fn jet_airways_are_invisible_to_low_altitude_routing() {
    let mut fixture = FixtureBuilder::new();
    let w1 = fixture.waypoint("ONE", 0.0, 1.0);
    let w2 = fixture.waypoint("TWO", 0.0, 2.0);
    fixture.airway("J13", AirwayLevel::Jet, 24_000, &[w1, w2]);
    let graph = graph(fixture.build(), RouteType::AirwayLow);

    let dest = graph
        .node_near(&Pos::new(0.0, 8.0), EndpointRole::Destination)
        .expect("resolves");
    let fix = graph
        .node_near(&Pos::new(0.0, 1.0), EndpointRole::Departure)
        .expect("snaps to ONE");

    // Without an eligible airway the fix is off-airway and has no entry
    // candidates either, since no other node carries eligible edges.
    let neighbors = graph.neighbors(&fix, &dest).expect("expansion");
    assert!(neighbors.is_empty());
}

#[test]
fn neighbor_expansion_is_idempotent() {
    let mut fixture = FixtureBuilder::new();
    fixture.vor("ONE", 0.0, 1.0);
    fixture.vor("TWO", 0.0, 2.0);
    let graph = graph(fixture.build(), RouteType::RadioNav);

    let start = graph
        .node_near(&Pos::new(0.0, 0.0), EndpointRole::Departure)
        .expect("resolves");
    let dest = graph
        .node_near(&Pos::new(0.0, 3.0), EndpointRole::Destination)
        .expect("resolves");

    let first = graph.neighbors(&start, &dest).expect("expansion");
    let cached = graph.cached_nodes();
    let second = graph.neighbors(&start, &dest).expect("expansion");

    assert_eq!(first, second);
    assert_eq!(graph.cached_nodes(), cached);
}

#[test]
fn reset_drops_the_cache() {
    let mut fixture = FixtureBuilder::new();
    fixture.vor("ONE", 0.0, 1.0);
    let graph = graph(fixture.build(), RouteType::RadioNav);

    graph
        .node_near(&Pos::new(0.0, 0.0), EndpointRole::Departure)
        .expect("resolves");
    assert!(graph.cached_nodes() > 0);

    graph.reset();
    assert_eq!(graph.cached_nodes(), 0);

    // Repopulates on the next query.
    let node = graph
        .node_near(&Pos::new(0.0, 1.0), EndpointRole::Departure)
        .expect("resolves");
    assert_eq!(node.ident.as_deref(), Some("ONE"));
}

#[test]
fn search_cost_matches_the_reported_leg_costs() {
    let mut fixture = FixtureBuilder::new();
    fixture.vor("ONE", 0.0, 1.5);
    fixture.vor("TWO", 0.0, 3.0);
    let graph = graph(fixture.build(), RouteType::RadioNav);

    let start = graph
        .node_near(&Pos::new(0.0, 0.0), EndpointRole::Departure)
        .expect("resolves");
    let dest = graph
        .node_near(&Pos::new(0.0, 4.5), EndpointRole::Destination)
        .expect("resolves");

    let outcome = find_route(&graph, &start, &dest, &SearchConfig::default())
        .expect("route exists");

    // Re-walk the path and sum the costs the graph reports for each leg.
    let mut replayed = 0.0;
    for pair in outcome.path.windows(2) {
        let candidates = graph.neighbors(&pair[0], &dest).expect("expansion");
        let leg = candidates
            .iter()
            .find(|(node, _)| node.id == pair[1].id)
            .expect("every leg of the result is a reported candidate");
        replayed += leg.1;
    }
    assert!((outcome.cost_nm - replayed).abs() < 1e-9);

    // The path starts and ends at the resolved endpoints.
    assert_eq!(outcome.path.first().map(|n| n.id), Some(start.id));
    assert_eq!(outcome.path.last().map(|n| n.id), Some(dest.id));
}

#[test]
fn concurrent_searches_share_one_graph() {
    let mut fixture = FixtureBuilder::new();
    fixture.vor("ONE", 0.0, 1.5);
    fixture.vor("TWO", 0.0, 3.0);
    fixture.vor("TRE", 1.0, 2.0);
    let graph = Arc::new(graph(fixture.build(), RouteType::RadioNav));

    let costs: Vec<f64> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let graph = Arc::clone(&graph);
                scope.spawn(move || {
                    let start = graph
                        .node_near(&Pos::new(0.0, 0.0), EndpointRole::Departure)
                        .expect("resolves");
                    let dest = graph
                        .node_near(&Pos::new(0.0, 4.5), EndpointRole::Destination)
                        .expect("resolves");
                    find_route(&graph, &start, &dest, &SearchConfig::default())
                        .expect("route exists")
                        .cost_nm
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("join")).collect()
    });

    for cost in &costs {
        assert!((cost - costs[0]).abs() < 1e-9);
    }
}
