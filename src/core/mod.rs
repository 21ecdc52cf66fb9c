pub mod date;
pub mod db;
