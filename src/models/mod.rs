pub mod config;
pub mod schema;
pub mod table;
pub mod value;
