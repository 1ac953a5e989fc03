use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use once_cell::sync::Lazy;

use navroute_lib::{
    plan_route, AirwayLevel, AirwaySegment, Facility, FacilityKind, NavDatabase, Pos,
    RouteRequest, RouteType,
};

/// 12x12 grid of VORs spaced one degree apart, with a victor airway along
/// the diagonal.
static SOURCE: Lazy<Arc<NavDatabase>> = Lazy::new(|| {
    let db = NavDatabase::open_in_memory().expect("in-memory schema");
    let mut id = 1i64;
    for row in 0..12 {
        for col in 0..12 {
            db.insert_facility(&Facility {
                kind: FacilityKind::Vor,
                id,
                ident: format!("V{row:02}{col:02}"),
                name: None,
                pos: Pos::new(row as f64, col as f64),
                nav_range_nm: Some(130.0),
                region: None,
            })
            .expect("insert facility");
            id += 1;
        }
    }

    let mut fix_id = 1000i64;
    for step in 0..12 {
        db.insert_facility(&Facility {
            kind: FacilityKind::Waypoint,
            id: fix_id,
            ident: format!("D{step:02}"),
            name: None,
            pos: Pos::new(step as f64, step as f64),
            nav_range_nm: None,
            region: None,
        })
        .expect("insert facility");
        if step > 0 {
            db.insert_segment(&AirwaySegment {
                airway: "V1".to_string(),
                level: AirwayLevel::Victor,
                from: (FacilityKind::Waypoint, fix_id - 1),
                to: (FacilityKind::Waypoint, fix_id),
                min_altitude_ft: 5000,
            })
            .expect("insert segment");
        }
        fix_id += 1;
    }

    Arc::new(db)
});

static RADIO_REQUEST: Lazy<RouteRequest> = Lazy::new(|| {
    RouteRequest::new(
        Pos::new(0.2, 0.2),
        Pos::new(10.8, 10.8),
        RouteType::RadioNav,
    )
});

static AIRWAY_REQUEST: Lazy<RouteRequest> = Lazy::new(|| {
    RouteRequest::new(
        Pos::new(0.2, 0.2),
        Pos::new(10.8, 10.8),
        RouteType::AirwayLow,
    )
});

fn benchmark_pathfinding(c: &mut Criterion) {
    let source = &*SOURCE;

    c.bench_function("radio_nav_grid", |b| {
        let request = &*RADIO_REQUEST;
        b.iter(|| {
            let plan = plan_route(source.clone(), request).expect("route exists");
            black_box(plan.leg_count())
        });
    });

    c.bench_function("airway_diagonal", |b| {
        let request = &*AIRWAY_REQUEST;
        b.iter(|| {
            let plan = plan_route(source.clone(), request).expect("route exists");
            black_box(plan.leg_count())
        });
    });

    c.bench_function("direct_leg", |b| {
        let request = RouteRequest::direct(Pos::new(0.2, 0.2), Pos::new(10.8, 10.8));
        b.iter(|| {
            let plan = plan_route(source.clone(), &request).expect("route exists");
            black_box(plan.distance_nm)
        });
    });
}

criterion_group!(benches, benchmark_pathfinding);
criterion_main!(benches);
