pub mod cors;
pub mod role_guard;
