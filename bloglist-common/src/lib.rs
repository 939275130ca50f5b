pub mod aggregate;
pub mod model;
pub mod snowflake;
