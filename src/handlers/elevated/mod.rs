// handlers/elevated/mod.rs - Elevated handlers (root JWT required)
//
// Security Level: JWT authentication plus system administrator access
// Route Prefix: /api/alm_settings/*
// Middleware: jwt_auth_middleware injects AuthUser; each action checks root access
// itself so a non-admin is refused before its parameters are looked at.

pub mod alm_settings;

pub use alm_settings::*;
