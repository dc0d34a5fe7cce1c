pub mod config_store;
pub mod connection_manager;
pub mod explorer;
pub mod query_result;
pub mod query_view;
pub mod schema;
pub mod sql_generator;
pub mod workbench;

#[cfg(test)]
mod test_support;
