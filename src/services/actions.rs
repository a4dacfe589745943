use serde::Serialize;
use std::collections::HashMap;

use super::alm_setting_service::AlmSettingError;

pub const PARAM_KEY: &str = "key";
pub const PARAM_NEW_KEY: &str = "newKey";
pub const PARAM_URL: &str = "url";
pub const PARAM_APP_ID: &str = "appId";
pub const PARAM_PRIVATE_KEY: &str = "privateKey";

/// Declared request parameter of a web service action
#[derive(Debug, Clone, Serialize)]
pub struct ParamDefinition {
    pub name: &'static str,
    pub required: bool,
    pub max_length: Option<usize>,
    pub description: &'static str,
}

/// Web service action: route key, metadata, and parameter table
#[derive(Debug, Clone, Serialize)]
pub struct ActionDefinition {
    pub key: &'static str,
    pub description: &'static str,
    pub since: &'static str,
    pub post: bool,
    pub params: &'static [ParamDefinition],
}

impl ActionDefinition {
    pub fn param(&self, name: &str) -> Option<&ParamDefinition> {
        self.params.iter().find(|p| p.name == name)
    }
}

pub static UPDATE_GITHUB: ActionDefinition = ActionDefinition {
    key: "update_github",
    description: "Update GitHub ALM instance Setting. Requires the 'Administer System' permission",
    since: "8.1",
    post: true,
    params: &[
        ParamDefinition {
            name: PARAM_KEY,
            required: true,
            max_length: Some(40),
            description: "Unique key of the GitHub instance setting",
        },
        ParamDefinition {
            name: PARAM_NEW_KEY,
            required: false,
            max_length: Some(40),
            description: "Optional new value for an unique key of the GitHub instance setting",
        },
        ParamDefinition {
            name: PARAM_URL,
            required: true,
            max_length: Some(2000),
            description: "GitHub API URL",
        },
        ParamDefinition {
            name: PARAM_APP_ID,
            required: true,
            max_length: Some(80),
            description: "GitHub API ID",
        },
        ParamDefinition {
            name: PARAM_PRIVATE_KEY,
            required: true,
            max_length: Some(2000),
            description: "GitHub App private key",
        },
    ],
};

/// Every action served under /api/alm_settings
pub fn alm_settings_actions() -> &'static [&'static ActionDefinition] {
    static ACTIONS: [&ActionDefinition; 1] = [&UPDATE_GITHUB];
    &ACTIONS
}

/// Raw form/query parameters of a single request
#[derive(Debug, Clone, Default)]
pub struct ActionParams(HashMap<String, String>);

impl ActionParams {
    /// Query parameters overlaid by body parameters
    pub fn merged(query: HashMap<String, String>, body: Option<HashMap<String, String>>) -> Self {
        let mut params = query;
        if let Some(body) = body {
            params.extend(body);
        }
        Self(params)
    }

    /// Value of a required parameter; absent, empty or blank values are rejected
    pub fn mandatory(&self, action: &ActionDefinition, name: &'static str) -> Result<String, AlmSettingError> {
        match self.0.get(name) {
            Some(value) if !value.trim().is_empty() => {
                check_length(action, name, value)?;
                Ok(value.clone())
            }
            _ => Err(AlmSettingError::MissingParameter(name)),
        }
    }

    pub fn optional(&self, action: &ActionDefinition, name: &'static str) -> Result<Option<String>, AlmSettingError> {
        match self.0.get(name) {
            Some(value) => {
                check_length(action, name, value)?;
                Ok(Some(value.clone()))
            }
            None => Ok(None),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ActionParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn check_length(action: &ActionDefinition, name: &'static str, value: &str) -> Result<(), AlmSettingError> {
    let Some(max) = action.param(name).and_then(|p| p.max_length) else {
        return Ok(());
    };
    let actual = value.chars().count();
    if actual > max {
        return Err(AlmSettingError::ParameterTooLong { param: name, max, actual });
    }
    Ok(())
}
