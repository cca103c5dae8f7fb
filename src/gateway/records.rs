//! Wire records for the durable store.
//!
//! These mirror the REST API's JSON shapes exactly; sync event payloads
//! reuse them so every client speaks one format. Node attribute payloads
//! travel as a raw JSON `data` object and are re-typed on ingest based on
//! the record's `type` tag.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    Connector, Edge, EdgeKind, Node, NodeAttributes, NodeKind, Position,
};

/// A node as the REST API and sync payloads carry it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub position: Position,
    pub data: serde_json::Value,
}

impl NodeRecord {
    pub fn from_node(node: &Node) -> Self {
        let data = match &node.attributes {
            NodeAttributes::Person(p) => serde_json::to_value(p).unwrap_or_default(),
            NodeAttributes::Family(f) => serde_json::to_value(f).unwrap_or_default(),
        };
        Self {
            id: node.id,
            kind: node.kind(),
            position: node.position,
            data,
        }
    }

    /// Re-type the record into a model node.
    pub fn into_node(self) -> Result<Node> {
        let attributes = match self.kind {
            NodeKind::Person => NodeAttributes::Person(
                serde_json::from_value(self.data)
                    .with_context(|| format!("malformed person data for node {}", self.id))?,
            ),
            NodeKind::Family => NodeAttributes::Family(
                serde_json::from_value(self.data)
                    .with_context(|| format!("malformed family data for node {}", self.id))?,
            ),
        };
        Ok(Node {
            id: self.id,
            position: self.position,
            attributes,
        })
    }
}

/// An edge as the REST API and sync payloads carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: Uuid,
    pub source: Uuid,
    pub target: Uuid,
    #[serde(rename = "sourceHandle")]
    pub source_handle: Connector,
    #[serde(rename = "targetHandle")]
    pub target_handle: Connector,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

impl EdgeRecord {
    pub fn from_edge(edge: &Edge) -> Self {
        Self {
            id: edge.id,
            source: edge.source,
            target: edge.target,
            source_handle: edge.source_connector,
            target_handle: edge.target_connector,
            kind: edge.kind,
        }
    }

    pub fn into_edge(self) -> Edge {
        Edge {
            id: self.id,
            source: self.source,
            target: self.target,
            source_connector: self.source_handle,
            target_connector: self.target_handle,
            kind: self.kind,
        }
    }
}

/// Body of `PUT /nodes/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeUpdateBody {
    pub position: Position,
    pub data: serde_json::Value,
}

impl NodeUpdateBody {
    pub fn from_record(record: &NodeRecord) -> Self {
        Self {
            position: record.position,
            data: record.data.clone(),
        }
    }
}

/// Response envelope of every mutation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationResponse {
    /// Turn a `success: false` envelope into an error.
    pub fn into_result(self) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            bail!(
                "store rejected the mutation: {}",
                self.error.unwrap_or_else(|| "no reason given".into())
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FamilyAttributes, PersonAttributes};

    #[test]
    fn test_node_record_roundtrip_person() {
        let node = Node::person(
            PersonAttributes::named("Ada").with_birth_date("1915-12-10"),
            Position::new(10.0, 20.0),
        );
        let record = NodeRecord::from_node(&node);
        assert_eq!(record.kind, NodeKind::Person);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "person");
        assert_eq!(json["data"]["name"], "Ada");

        let back: NodeRecord = serde_json::from_value(json).unwrap();
        let restored = back.into_node().unwrap();
        assert_eq!(restored, node);
    }

    #[test]
    fn test_node_record_roundtrip_family() {
        let node = Node::family(
            FamilyAttributes {
                label: "Lovelace".into(),
                establishment_year: Some(1835),
                ..Default::default()
            },
            Position::new(0.0, 150.0),
        );
        let record = NodeRecord::from_node(&node);
        let restored = record.into_node().unwrap();
        assert_eq!(restored, node);
    }

    #[test]
    fn test_node_record_rejects_mismatched_data() {
        let record = NodeRecord {
            id: Uuid::new_v4(),
            kind: NodeKind::Person,
            position: Position::default(),
            data: serde_json::json!({"unexpected": true}),
        };
        assert!(record.into_node().is_err());
    }

    #[test]
    fn test_edge_record_wire_field_names() {
        let edge = Edge::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Connector::Parent,
            Connector::FamilyChildSide,
            EdgeKind::Bloodline,
        );
        let record = EdgeRecord::from_edge(&edge);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sourceHandle"], "parent");
        assert_eq!(json["targetHandle"], "familyChildSide");
        assert_eq!(json["type"], "bloodline");

        let back: EdgeRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.into_edge(), edge);
    }

    #[test]
    fn test_mutation_response_failure_is_an_error() {
        let ok = MutationResponse {
            success: true,
            error: None,
        };
        assert!(ok.into_result().is_ok());

        let failed = MutationResponse {
            success: false,
            error: Some("node not found".into()),
        };
        let err = failed.into_result().unwrap_err();
        assert!(err.to_string().contains("node not found"));
    }
}
