pub mod actions;
pub mod alm_setting_service;

pub use actions::{alm_settings_actions, ActionDefinition, ActionParams, ParamDefinition, UPDATE_GITHUB};
pub use alm_setting_service::{AlmSettingError, AlmSettingService, UpdateGitHubRequest};
