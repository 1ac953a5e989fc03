use thiserror::Error;

/// Convenient result alias for the navroute library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a start or destination position cannot be mapped to any
    /// graph node, including the synthetic fallback.
    #[error("could not resolve {role} endpoint at {lat},{lon} to a navigation node")]
    UnresolvableEndpoint { role: String, lat: f64, lon: f64 },

    /// Raised when the search space is exhausted without reaching the goal.
    #[error("no route found between {from} and {to}")]
    NoRouteFound { from: String, to: String },

    /// Raised when the search gives up after exploring a bounded multiple of
    /// the direct start-to-destination distance.
    #[error(
        "route search exceeded the effort bound ({explored_nm:.1} nm explored, {direct_nm:.1} nm direct)"
    )]
    SearchEffortExceeded { explored_nm: f64, direct_nm: f64 },

    /// Raised when a facility ident could not be found in the database.
    #[error("unknown facility ident: {ident}{}", format_suggestions(.suggestions))]
    UnknownFacility {
        ident: String,
        suggestions: Vec<String>,
    },

    /// Raised when the navigation database lacks the expected tables or
    /// columns.
    #[error("unsupported navigation database schema; expected facility and airway_segment tables")]
    UnsupportedSchema,

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else if suggestions.len() == 1 {
        format!(". Did you mean '{}'?", suggestions[0])
    } else {
        format!(
            ". Did you mean one of: {}?",
            suggestions
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
