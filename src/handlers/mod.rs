// handlers/mod.rs - Handler tiers
//
// Public (no auth, served from app.rs: / and /health) → Elevated (root JWT auth)

pub mod elevated;

pub use elevated::*;
