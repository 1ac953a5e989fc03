use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use navroute_lib::{
    plan_route, Endpoint, EndpointRole, GraphConfig, NavDatabase, NavGraph, Pos, RouteRequest,
    RouteSummary, RouteType, SearchConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Aeronautical route finding utilities")]
struct Cli {
    /// Path to the navigation database.
    #[arg(long, global = true, default_value = "navdata.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute a route between two endpoints.
    Route {
        /// Departure: facility ident or "lat,lon" in degrees.
        #[arg(long)]
        from: String,
        /// Destination: facility ident or "lat,lon" in degrees.
        #[arg(long)]
        to: String,
        /// Edge classes eligible during the search.
        #[arg(long, value_enum, default_value_t = RouteTypeArg::Direct)]
        route_type: RouteTypeArg,
        /// Cruise altitude floor in feet for altitude-filtered airway routing.
        #[arg(long)]
        min_altitude: Option<i32>,
        /// Abort the search once the frontier exceeds this multiple of the
        /// direct distance.
        #[arg(long, default_value_t = 4.0)]
        effort_ratio: f64,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show the facility closest to a position.
    Nearest {
        /// Position as "lat,lon" in degrees.
        #[arg(long)]
        pos: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RouteTypeArg {
    /// Straight great-circle leg.
    Direct,
    /// VOR/NDB legs within radio range.
    RadioNav,
    /// Low-altitude (victor) airways.
    AirwayLow,
    /// High-altitude (jet) airways.
    AirwayHigh,
    /// Airways filtered by the --min-altitude floor.
    AirwayAltitude,
}

impl From<RouteTypeArg> for RouteType {
    fn from(value: RouteTypeArg) -> Self {
        match value {
            RouteTypeArg::Direct => RouteType::Direct,
            RouteTypeArg::RadioNav => RouteType::RadioNav,
            RouteTypeArg::AirwayLow => RouteType::AirwayLow,
            RouteTypeArg::AirwayHigh => RouteType::AirwayHigh,
            RouteTypeArg::AirwayAltitude => RouteType::AirwayAltitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Route {
            from,
            to,
            route_type,
            min_altitude,
            effort_ratio,
            format,
        } => handle_route(
            &cli.database,
            &from,
            &to,
            route_type,
            min_altitude,
            effort_ratio,
            format,
        ),
        Command::Nearest { pos } => handle_nearest(&cli.database, &pos),
    }
}

fn handle_route(
    database: &PathBuf,
    from: &str,
    to: &str,
    route_type: RouteTypeArg,
    min_altitude: Option<i32>,
    effort_ratio: f64,
    format: OutputFormat,
) -> Result<()> {
    if effort_ratio < 1.0 {
        bail!("--effort-ratio must be at least 1.0");
    }

    let source = open_database(database)?;
    let request = RouteRequest {
        from: parse_endpoint(from),
        to: parse_endpoint(to),
        route_type: route_type.into(),
        min_altitude_ft: min_altitude,
        search: SearchConfig { effort_ratio },
    };

    let plan = plan_route(source, &request)
        .with_context(|| format!("failed to plan a route from {from} to {to}"))?;
    let summary = RouteSummary::from_plan(&plan);

    match format {
        OutputFormat::Text => print!("{}", summary.render_plain()),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)
                .context("failed to serialize the route summary")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn handle_nearest(database: &PathBuf, pos: &str) -> Result<()> {
    let position =
        parse_pos(pos).with_context(|| format!("expected --pos as \"lat,lon\", got {pos:?}"))?;

    let source = open_database(database)?;
    let graph = NavGraph::new(
        source,
        GraphConfig {
            route_type: RouteType::RadioNav,
            min_altitude_ft: None,
        },
    );

    // Resolve the way a search endpoint would, then report the raw nearest
    // facility regardless of the snap tolerance.
    let node = graph.node_near(&position, EndpointRole::Departure)?;
    match graph.nearest_facility(&position)? {
        Some((facility, distance_nm)) => {
            println!(
                "Nearest facility: {} ({}) at {:.1} nm",
                facility.label(),
                facility.id,
                distance_nm
            );
            if node.id == facility.id {
                println!("The position snaps to this facility.");
            }
        }
        None => println!("No facility within the scanned region."),
    }
    Ok(())
}

fn open_database(path: &PathBuf) -> Result<Arc<NavDatabase>> {
    let db = NavDatabase::open(path)
        .with_context(|| format!("failed to open navigation database {}", path.display()))?;
    Ok(Arc::new(db))
}

/// Interpret an endpoint argument as "lat,lon" when it parses as a pair of
/// numbers, otherwise as a facility ident.
fn parse_endpoint(value: &str) -> Endpoint {
    match parse_pos(value) {
        Some(pos) => Endpoint::Position(pos),
        None => Endpoint::Ident(value.to_string()),
    }
}

fn parse_pos(value: &str) -> Option<Pos> {
    let (lat, lon) = value.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    Some(Pos::new(lat, lon))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
