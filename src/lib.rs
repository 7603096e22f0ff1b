pub mod config;
pub mod discover;
pub mod export;
pub mod fetch;
pub mod flatten;
pub mod pipeline;
pub mod rows;
pub mod subject;
pub mod table;
