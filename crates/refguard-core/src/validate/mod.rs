//! Configuration-time validation of route policies.

mod checker;
mod routes;

pub use checker::{validate, validate_routes, validate_tables};
pub use routes::{
    delete_routes, load_routes, parse_json_routes, parse_raw_routes, MappingRoute, RouteFormat,
    DELETE_METHOD, SUPPORTED_EXTENSIONS,
};
