use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A group of channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Server {
    pub id: String,
    pub name: String,
}
