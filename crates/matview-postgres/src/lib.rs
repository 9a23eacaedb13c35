//! PostgreSQL implementation of the matview `Session`.

mod decode;
mod session;

pub use session::{PgSession, to_store_error};

pub use sqlx::postgres::PgConnectOptions;
