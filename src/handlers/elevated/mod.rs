// handlers/elevated/mod.rs - Administrator role required
//
// Every route here sits behind `authenticate` and `require_admin`. The
// delegation service re-checks the role itself, so the CLI path is guarded
// the same way.
pub mod access;
pub mod admin;
