use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GroupMemberRequest {
    pub username: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct GroupMembers {
    #[schema(value_type = Vec<String>)]
    pub usernames: Vec<String>,
}
