pub mod routes;
pub mod state;
pub mod viewer;

pub use routes::create_router;
pub use state::AppState;
