pub mod github;
pub mod token;
