pub mod db;
pub mod permissions;
pub mod token;
