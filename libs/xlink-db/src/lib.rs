pub mod db;
pub mod models;
pub mod repositories;

pub use sqlx;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
