use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query string of the target query endpoint
///
/// The request body is the targeting document itself and is validated by the
/// expression parser, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TargetQueryParams {
    #[validate(range(min = 1, max = 10000))]
    #[serde(alias = "page_size", rename = "pageSize", default)]
    pub page_size: Option<u64>,
}
