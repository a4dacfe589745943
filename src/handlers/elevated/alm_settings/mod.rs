// handlers/elevated/alm_settings/mod.rs - ALM integration settings handlers
//
// Administrative operations on ALM instance settings (GitHub App credentials and
// friends). Every action here requires a root access token.

pub mod update_github; // POST /api/alm_settings/update_github

pub use update_github::update_github;
