use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// External ALM platform a setting points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alm {
    Github,
    AzureDevops,
    Bitbucket,
}

impl Alm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alm::Github => "github",
            Alm::AzureDevops => "azure_devops",
            Alm::Bitbucket => "bitbucket",
        }
    }
}

impl fmt::Display for Alm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Alm::Github),
            "azure_devops" => Ok(Alm::AzureDevops),
            "bitbucket" => Ok(Alm::Bitbucket),
            other => Err(format!("unknown ALM '{}'", other)),
        }
    }
}

/// Stored ALM instance setting. `key` is unique across all settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlmSetting {
    pub uuid: Uuid,
    pub key: String,
    pub alm: Alm,
    pub url: String,
    pub app_id: String,
    pub private_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlmSetting {
    /// New GitHub setting with fresh identity and timestamps
    pub fn github(
        key: impl Into<String>,
        url: impl Into<String>,
        app_id: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4(),
            key: key.into(),
            alm: Alm::Github,
            url: url.into(),
            app_id: app_id.into(),
            private_key: private_key.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alm_parses_stored_names() {
        assert_eq!("github".parse::<Alm>().unwrap(), Alm::Github);
        assert_eq!("azure_devops".parse::<Alm>().unwrap(), Alm::AzureDevops);
        assert!("gitlab".parse::<Alm>().is_err());
        assert_eq!(Alm::Bitbucket.to_string(), "bitbucket");
    }

    #[test]
    fn github_constructor_sets_kind_and_timestamps() {
        let setting = AlmSetting::github("gh1", "https://api.github.com", "1", "pk");
        assert_eq!(setting.alm, Alm::Github);
        assert_eq!(setting.created_at, setting.updated_at);
    }
}
