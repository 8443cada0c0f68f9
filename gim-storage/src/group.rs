use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use validator::Validate;

use gim_slo::{errors, Result};

pub const GROUP_NAME_MAX_LENGTH: usize = 64;
pub const GROUP_DISPLAY_NAME_MAX_LENGTH: usize = 128;
pub const GROUP_DESCRIPTION_MAX_LENGTH: usize = 1024;
pub const GROUP_TYPE_PROPS_MAX_LENGTH: usize = 64000;

pub const GROUP_NAME_ERROR: &str = "model.group.name.app_error";
pub const GROUP_DISPLAY_NAME_ERROR: &str = "model.group.display_name.app_error";
pub const GROUP_DESCRIPTION_ERROR: &str = "model.group.description.app_error";
pub const GROUP_TYPE_PROPS_ERROR: &str = "model.group.type_props.app_error";
pub const GROUP_TYPE_ERROR: &str = "model.group.type.app_error";

// Checked in this order; the first failing field wins.
const FIELD_CHECKS: [(&str, &str, &str); 4] = [
    ("name", GROUP_NAME_ERROR, "group.name"),
    ("display_name", GROUP_DISPLAY_NAME_ERROR, "group.display_name"),
    ("description", GROUP_DESCRIPTION_ERROR, "group.description"),
    ("type_props", GROUP_TYPE_PROPS_ERROR, "group.type_props"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupType {
    Ldap,
}

impl GroupType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ldap => "ldap",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupType {
    type Err = errors::WithBacktrace;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ldap" => Ok(Self::Ldap),
            _ => Err(errors::validation(GROUP_TYPE_ERROR, "group.type")),
        }
    }
}

/// A named directory-style grouping of users.
///
/// `group_type` is kept as the raw string so that an unrecognised type can
/// be represented and rejected by [`Group::validate_for_create`].
/// `delete_at == 0` means the group is active.
#[derive(
    Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize, Validate,
)]
pub struct Group {
    #[serde(default)]
    pub id: String,
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1, max = 128))]
    pub display_name: String,
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub description: String,
    #[serde(rename = "type")]
    pub group_type: String,
    #[serde(default)]
    #[validate(length(max = 64000))]
    pub type_props: String,
    #[serde(default)]
    pub create_at: i64,
    #[serde(default)]
    pub update_at: i64,
    #[serde(default)]
    pub delete_at: i64,
}

impl Group {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        group_type: GroupType,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            group_type: group_type.to_string(),
            ..Default::default()
        }
    }

    /// Checks a candidate before it is persisted. Pure; never touches storage.
    pub fn validate_for_create(&self) -> Result<()> {
        if let Err(errs) = self.validate() {
            let failed = errs.errors();
            return match FIELD_CHECKS
                .iter()
                .find(|(field, _, _)| failed.contains_key(*field))
            {
                Some(&(_, id, code)) => Err(errors::validation(id, code)),
                None => Err(errors::any(errs)),
            };
        }
        self.group_type.parse::<GroupType>()?;
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.delete_at != 0
    }
}
