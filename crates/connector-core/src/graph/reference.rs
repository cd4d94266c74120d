//! References to previously uploaded graph nodes.

use serde::{Deserialize, Serialize};

use crate::types::ApplicationId;

/// Pointer to a node that was already converted and uploaded.
///
/// Carries the node's content-derived id plus the host id it was converted
/// from, which is all a new tree needs to re-link it without uploading it
/// again. Immutable once cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// Content-derived id of the referenced node.
    pub referenced_id: String,
    /// Host id of the object the node was converted from.
    pub application_id: Option<ApplicationId>,
}

impl ObjectReference {
    /// Reference a node by content id.
    pub fn new(referenced_id: impl Into<String>, application_id: Option<ApplicationId>) -> Self {
        Self {
            referenced_id: referenced_id.into(),
            application_id,
        }
    }
}
