// handlers/protected/mod.rs - Bearer token required
//
// Product mutations additionally pass the `edit_products` assignment gate;
// reports pass the delegated `view_reports` gate (admins always pass both).
pub mod products;
pub mod profile;
pub mod reports;
