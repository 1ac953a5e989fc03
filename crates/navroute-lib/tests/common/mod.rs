// Shared fixture construction for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use navroute_lib::{
    AirwayLevel, AirwaySegment, Facility, FacilityId, FacilityKind, NavDatabase, Pos,
};

/// Builds an in-memory navigation database row by row.
pub struct FixtureBuilder {
    db: NavDatabase,
    next_id: FacilityId,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            db: NavDatabase::open_in_memory().expect("in-memory schema"),
            next_id: 1,
        }
    }

    pub fn airport(&mut self, ident: &str, lat: f64, lon: f64) -> (FacilityKind, FacilityId) {
        self.facility(FacilityKind::Airport, ident, lat, lon, None)
    }

    pub fn vor(&mut self, ident: &str, lat: f64, lon: f64) -> (FacilityKind, FacilityId) {
        self.facility(FacilityKind::Vor, ident, lat, lon, None)
    }

    pub fn vor_with_range(
        &mut self,
        ident: &str,
        lat: f64,
        lon: f64,
        range_nm: f64,
    ) -> (FacilityKind, FacilityId) {
        self.facility(FacilityKind::Vor, ident, lat, lon, Some(range_nm))
    }

    pub fn ndb(&mut self, ident: &str, lat: f64, lon: f64) -> (FacilityKind, FacilityId) {
        self.facility(FacilityKind::Ndb, ident, lat, lon, None)
    }

    pub fn waypoint(&mut self, ident: &str, lat: f64, lon: f64) -> (FacilityKind, FacilityId) {
        self.facility(FacilityKind::Waypoint, ident, lat, lon, None)
    }

    /// Insert an airway chaining the given fixes in order, one segment per
    /// consecutive pair.
    pub fn airway(
        &mut self,
        name: &str,
        level: AirwayLevel,
        min_altitude_ft: i32,
        fixes: &[(FacilityKind, FacilityId)],
    ) {
        for pair in fixes.windows(2) {
            self.db
                .insert_segment(&AirwaySegment {
                    airway: name.to_string(),
                    level,
                    from: pair[0],
                    to: pair[1],
                    min_altitude_ft,
                })
                .expect("insert segment");
        }
    }

    pub fn build(self) -> Arc<NavDatabase> {
        Arc::new(self.db)
    }

    fn facility(
        &mut self,
        kind: FacilityKind,
        ident: &str,
        lat: f64,
        lon: f64,
        nav_range_nm: Option<f64>,
    ) -> (FacilityKind, FacilityId) {
        let id = self.next_id;
        self.next_id += 1;
        self.db
            .insert_facility(&Facility {
                kind,
                id,
                ident: ident.to_string(),
                name: None,
                pos: Pos::new(lat, lon),
                nav_range_nm,
                region: None,
            })
            .expect("insert facility");
        (kind, id)
    }
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self::new()
    }
}
