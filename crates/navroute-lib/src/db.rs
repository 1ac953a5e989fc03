use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, Row};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::geo::{Pos, Rect};

/// Numeric identifier for a facility, unique within its kind.
pub type FacilityId = i64;

/// Facility classification. Identifiers are only unique within one kind, so
/// a facility is always addressed as a `(kind, id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityKind {
    Airport,
    Vor,
    Ndb,
    Waypoint,
}

impl FacilityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FacilityKind::Airport => "airport",
            FacilityKind::Vor => "vor",
            FacilityKind::Ndb => "ndb",
            FacilityKind::Waypoint => "waypoint",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "airport" => Some(FacilityKind::Airport),
            "vor" => Some(FacilityKind::Vor),
            "ndb" => Some(FacilityKind::Ndb),
            "waypoint" => Some(FacilityKind::Waypoint),
            _ => None,
        }
    }
}

/// Altitude band of an airway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AirwayLevel {
    /// Low-altitude (victor) airway.
    Victor,
    /// High-altitude (jet) airway.
    Jet,
}

impl AirwayLevel {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "victor" => Some(AirwayLevel::Victor),
            "jet" => Some(AirwayLevel::Jet),
            _ => None,
        }
    }
}

/// Facility record as stored in the navigation database.
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub kind: FacilityKind,
    pub id: FacilityId,
    pub ident: String,
    pub name: Option<String>,
    pub pos: Pos,
    /// Usable radio range in nautical miles, when the facility transmits.
    pub nav_range_nm: Option<f64>,
    pub region: Option<String>,
}

/// Airway segment record connecting two facilities.
#[derive(Debug, Clone, PartialEq)]
pub struct AirwaySegment {
    pub airway: String,
    pub level: AirwayLevel,
    pub from: (FacilityKind, FacilityId),
    pub to: (FacilityKind, FacilityId),
    /// Minimum enroute altitude for the segment in feet.
    pub min_altitude_ft: i32,
}

/// Read-only query surface over the facility/airway storage.
///
/// Implementations must be side-effect free: the navigation graph calls these
/// repeatedly, possibly from concurrent searches, and caches the results
/// itself.
pub trait NavDataSource: Send + Sync {
    /// All facilities whose position lies within the rect.
    fn facilities_within(&self, rect: &Rect) -> Result<Vec<Facility>>;

    /// All airway segments with at least one endpoint inside the rect.
    fn segments_within(&self, rect: &Rect) -> Result<Vec<AirwaySegment>>;

    /// Exact ident lookup.
    fn facility_by_ident(&self, ident: &str) -> Result<Option<Facility>>;

    /// Every distinct ident, used for fuzzy suggestions.
    fn idents(&self) -> Result<Vec<String>>;
}

/// Rank known idents by Jaro-Winkler similarity to a mistyped one.
pub fn fuzzy_ident_matches(idents: &[String], target: &str, limit: usize) -> Vec<String> {
    let mut scored: Vec<(f64, &String)> = idents
        .iter()
        .map(|ident| (strsim::jaro_winkler(ident, target), ident))
        .filter(|(score, _)| *score >= 0.7)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, ident)| ident.clone())
        .collect()
}

/// SQLite-backed navigation database.
///
/// The connection sits behind a mutex so one handle can serve concurrent
/// searches; queries are short region scans, so contention stays low.
pub struct NavDatabase {
    conn: Mutex<Connection>,
}

impl NavDatabase {
    /// Open a navigation database and validate its schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        validate_schema(&conn)?;
        debug!(path = %path.display(), "opened navigation database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an empty in-memory database with the expected schema, mainly for
    /// tests and benchmarks.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a facility row. Intended for fixture construction; the routing
    /// engine itself never writes.
    pub fn insert_facility(&self, facility: &Facility) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO facility (kind, id, ident, name, lat, lon, nav_range_nm, region) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                facility.kind.as_str(),
                facility.id,
                facility.ident,
                facility.name,
                facility.pos.lat_deg,
                facility.pos.lon_deg,
                facility.nav_range_nm,
                facility.region,
            ],
        )?;
        Ok(())
    }

    /// Insert an airway segment row. Intended for fixture construction.
    pub fn insert_segment(&self, segment: &AirwaySegment) -> Result<()> {
        let level = match segment.level {
            AirwayLevel::Victor => "victor",
            AirwayLevel::Jet => "jet",
        };
        let conn = self.lock();
        conn.execute(
            "INSERT INTO airway_segment (airway, level, from_kind, from_id, to_kind, to_id, min_altitude_ft) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                segment.airway,
                level,
                segment.from.0.as_str(),
                segment.from.1,
                segment.to.0.as_str(),
                segment.to.1,
                segment.min_altitude_ft,
            ],
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-query; the
        // connection itself is still usable for read-only work.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NavDataSource for NavDatabase {
    fn facilities_within(&self, rect: &Rect) -> Result<Vec<Facility>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT kind, id, ident, name, lat, lon, nav_range_nm, region FROM facility \
             WHERE lat BETWEEN ?1 AND ?2 AND lon BETWEEN ?3 AND ?4",
        )?;
        let rows = stmt.query_map(
            params![rect.south, rect.north, rect.west, rect.east],
            row_to_facility,
        )?;

        let mut facilities = Vec::new();
        let mut skipped = 0usize;
        for entry in rows {
            match entry? {
                Some(facility) => facilities.push(facility),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "ignored facility rows with unknown kind");
        }
        Ok(facilities)
    }

    fn segments_within(&self, rect: &Rect) -> Result<Vec<AirwaySegment>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT s.airway, s.level, s.from_kind, s.from_id, s.to_kind, s.to_id, s.min_altitude_ft \
             FROM airway_segment s \
             WHERE EXISTS (SELECT 1 FROM facility f WHERE f.kind = s.from_kind AND f.id = s.from_id \
                           AND f.lat BETWEEN ?1 AND ?2 AND f.lon BETWEEN ?3 AND ?4) \
                OR EXISTS (SELECT 1 FROM facility f WHERE f.kind = s.to_kind AND f.id = s.to_id \
                           AND f.lat BETWEEN ?1 AND ?2 AND f.lon BETWEEN ?3 AND ?4)",
        )?;
        let rows = stmt.query_map(
            params![rect.south, rect.north, rect.west, rect.east],
            row_to_segment,
        )?;

        let mut segments = Vec::new();
        let mut skipped = 0usize;
        for entry in rows {
            match entry? {
                Some(segment) => segments.push(segment),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "ignored airway rows with unknown kind or level");
        }
        Ok(segments)
    }

    fn facility_by_ident(&self, ident: &str) -> Result<Option<Facility>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT kind, id, ident, name, lat, lon, nav_range_nm, region FROM facility \
             WHERE ident = ?1 LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![ident], row_to_facility)?;
        match rows.next() {
            Some(entry) => Ok(entry?),
            None => Ok(None),
        }
    }

    fn idents(&self) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached("SELECT DISTINCT ident FROM facility")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut idents = Vec::new();
        for entry in rows {
            idents.push(entry?);
        }
        Ok(idents)
    }
}

const SCHEMA_SQL: &str = "
CREATE TABLE facility (
    kind TEXT NOT NULL,
    id INTEGER NOT NULL,
    ident TEXT NOT NULL,
    name TEXT,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    nav_range_nm REAL,
    region TEXT,
    PRIMARY KEY (kind, id)
);
CREATE INDEX facility_position ON facility (lat, lon);
CREATE INDEX facility_ident ON facility (ident);
CREATE TABLE airway_segment (
    airway TEXT NOT NULL,
    level TEXT NOT NULL,
    from_kind TEXT NOT NULL,
    from_id INTEGER NOT NULL,
    to_kind TEXT NOT NULL,
    to_id INTEGER NOT NULL,
    min_altitude_ft INTEGER NOT NULL
);
";

/// Map a facility row, returning `None` for rows whose kind text is not
/// recognised so callers can count and skip them.
fn row_to_facility(row: &Row<'_>) -> rusqlite::Result<Option<Facility>> {
    let kind_text: String = row.get(0)?;
    let Some(kind) = FacilityKind::parse(&kind_text) else {
        return Ok(None);
    };

    Ok(Some(Facility {
        kind,
        id: row.get(1)?,
        ident: row.get(2)?,
        name: row.get(3)?,
        pos: Pos {
            lat_deg: row.get(4)?,
            lon_deg: row.get(5)?,
        },
        nav_range_nm: row.get(6)?,
        region: row.get(7)?,
    }))
}

fn row_to_segment(row: &Row<'_>) -> rusqlite::Result<Option<AirwaySegment>> {
    let level_text: String = row.get(1)?;
    let from_kind_text: String = row.get(2)?;
    let to_kind_text: String = row.get(4)?;

    let (Some(level), Some(from_kind), Some(to_kind)) = (
        AirwayLevel::parse(&level_text),
        FacilityKind::parse(&from_kind_text),
        FacilityKind::parse(&to_kind_text),
    ) else {
        return Ok(None);
    };

    Ok(Some(AirwaySegment {
        airway: row.get(0)?,
        level,
        from: (from_kind, row.get(3)?),
        to: (to_kind, row.get(5)?),
        min_altitude_ft: row.get(6)?,
    }))
}

fn validate_schema(conn: &Connection) -> Result<()> {
    if !table_exists(conn, "facility")? || !table_exists(conn, "airway_segment")? {
        return Err(Error::UnsupportedSchema);
    }
    if !table_has_columns(
        conn,
        "facility",
        &["kind", "id", "ident", "lat", "lon"],
    )? {
        return Err(Error::UnsupportedSchema);
    }
    if !table_has_columns(
        conn,
        "airway_segment",
        &[
            "airway",
            "level",
            "from_kind",
            "from_id",
            "to_kind",
            "to_id",
            "min_altitude_ft",
        ],
    )? {
        return Err(Error::UnsupportedSchema);
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1")?;
    let mut rows = stmt.query([table])?;
    Ok(rows.next()?.is_some())
}

fn table_has_columns(conn: &Connection, table: &str, required: &[&str]) -> Result<bool> {
    let pragma = format!("PRAGMA table_info('{table}')");
    let mut stmt = conn.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        columns.push(name);
    }

    Ok(required.iter().all(|required| {
        columns
            .iter()
            .any(|column| column.eq_ignore_ascii_case(required))
    }))
}
