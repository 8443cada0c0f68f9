use serde::{Deserialize, Serialize};
use validator::Validate;

use gim_slo::{errors, Result};

pub const GROUP_MEMBER_GROUP_ID_ERROR: &str =
    "model.group_member.group_id.app_error";
pub const GROUP_MEMBER_USER_ID_ERROR: &str =
    "model.group_member.user_id.app_error";

/// Membership edge keyed by `(group_id, user_id)`.
#[derive(
    Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize, Validate,
)]
pub struct GroupMember {
    #[validate(length(min = 1, max = 26))]
    pub group_id: String,
    #[validate(length(min = 1, max = 26))]
    pub user_id: String,
    #[serde(default)]
    pub create_at: i64,
    #[serde(default)]
    pub delete_at: i64,
}

impl GroupMember {
    pub fn new(group_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn validate_for_create(&self) -> Result<()> {
        match self.validate() {
            Ok(()) => Ok(()),
            Err(errs) if errs.errors().contains_key("group_id") => Err(
                errors::validation(GROUP_MEMBER_GROUP_ID_ERROR, "group_member.group_id"),
            ),
            Err(errs) if errs.errors().contains_key("user_id") => Err(
                errors::validation(GROUP_MEMBER_USER_ID_ERROR, "group_member.user_id"),
            ),
            Err(errs) => Err(errors::any(errs)),
        }
    }
}
