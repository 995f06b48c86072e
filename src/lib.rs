// Library for tests to access modules

pub mod aggregate;
pub mod config;
pub mod history_repo;
pub mod identity;
pub mod ingest_worker;
pub mod maintenance_worker;
pub mod models;
pub mod producer;
pub mod rate;
pub mod routes;
pub mod service;
pub mod window;
