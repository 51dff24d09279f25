use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// Host-facing serialized tree
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TreeSnapshot {
    #[serde(default)]
    pub root_node_id: Option<NodeId>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "ComponentId")]
    pub type_tag: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub children_ids: Vec<NodeId>,
    #[serde(default = "default_true")]
    pub is_draggable: bool,
    #[serde(default = "default_true")]
    pub can_have_children: bool,
}

fn default_true() -> bool {
    true
}

impl TreeSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
