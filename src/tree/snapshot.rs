use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::node::{NodeId, NodeKind};

/// Serialized, point-in-time view of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub properties: Map<String, Value>,
    pub children: Vec<NodeId>,
}

impl NodeSnapshot {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.properties.get("visible"), Some(Value::Bool(true)))
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::Node;
    use serde_json::json;

    #[test]
    fn serializes_with_wire_field_names() {
        let parent = Node::container();
        let child = Node::label("hello");
        parent.attach(&child).unwrap();

        let value = serde_json::to_value(parent.snapshot()).unwrap();
        assert_eq!(value["type"], json!("Container"));
        assert_eq!(value["id"], json!(parent.id().as_str()));
        assert_eq!(value["children"], json!([child.id().as_str()]));
        assert_eq!(value["properties"], json!({}));

        let value = serde_json::to_value(child.snapshot()).unwrap();
        assert_eq!(value["type"], json!("Label"));
        assert_eq!(value["properties"]["text"], json!("hello"));
    }
}
