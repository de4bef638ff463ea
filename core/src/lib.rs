pub mod calculators;
pub mod chart;
pub mod db;
pub mod error;
pub mod flatfile;
pub mod models;
pub mod service;
pub mod units;
