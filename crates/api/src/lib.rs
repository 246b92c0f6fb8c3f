mod env;
mod extract;
mod response;
mod utils;
mod routes;

pub use routes::{
    character_routes,
    item_routes,
    misc_routes,
};

pub use env::ApiServerEnv;
pub use extract::{FieldError, ValidatedJson};
pub use utils::setup_tracing;
pub use response::{timeout_envelope, AppError, AppSuccess};
