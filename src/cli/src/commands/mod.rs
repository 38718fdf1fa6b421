pub mod access;
pub mod check;
pub mod roles;
