//! RxLens HTTP boundary: routes, shared state and upload helpers.

pub mod media;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
