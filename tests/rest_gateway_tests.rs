//! REST gateway integration tests.
//!
//! Run the gateway against a local mock HTTP server and verify the wire
//! shapes: paths, JSON field names, and the `{success: bool}` mutation
//! envelope.

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kinship_canvas::gateway::{EdgeRecord, NodeRecord, PersistenceGateway, RestGateway};
use kinship_canvas::model::{Connector, Edge, EdgeKind, Node, PersonAttributes, Position};

fn success() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": true}))
}

async fn gateway(server: &MockServer) -> RestGateway {
    RestGateway::new(&server.uri(), 5).unwrap()
}

#[tokio::test]
async fn test_fetch_nodes_parses_records() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": id,
                "type": "person",
                "position": {"x": 10.0, "y": 20.0},
                "data": {"name": "Ada", "on_bloodline": true}
            }
        ])))
        .mount(&server)
        .await;

    let nodes = gateway(&server).await.fetch_nodes().await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].id, id);
    let node = nodes[0].clone().into_node().unwrap();
    assert_eq!(node.as_person().unwrap().name, "Ada");
    assert!((node.position.x - 10.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_create_edge_sends_wire_field_names() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/edges"))
        .and(body_partial_json(json!({
            "sourceHandle": "parent",
            "targetHandle": "familyChildSide",
            "type": "bloodline"
        })))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;

    let edge = Edge::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        Connector::Parent,
        Connector::FamilyChildSide,
        EdgeKind::Bloodline,
    );
    gateway(&server)
        .await
        .create_edge(&EdgeRecord::from_edge(&edge))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_node_puts_position_and_data() {
    let server = MockServer::start().await;
    let node = Node::person(
        PersonAttributes::named("Ada"),
        Position::new(42.0, 7.0),
    );
    Mock::given(method("PUT"))
        .and(path(format!("/nodes/{}", node.id)))
        .and(body_partial_json(json!({
            "position": {"x": 42.0, "y": 7.0},
            "data": {"name": "Ada"}
        })))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;

    gateway(&server)
        .await
        .update_node(&NodeRecord::from_node(&node))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_endpoints_hit_the_right_paths() {
    let server = MockServer::start().await;
    let node_id = Uuid::new_v4();
    let edge_id = Uuid::new_v4();
    Mock::given(method("DELETE"))
        .and(path(format!("/nodes/{}", node_id)))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/edges/{}", edge_id)))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;

    let gw = gateway(&server).await;
    gw.delete_node(node_id).await.unwrap();
    gw.delete_edge(edge_id).await.unwrap();
}

#[tokio::test]
async fn test_success_false_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "duplicate id"
        })))
        .mount(&server)
        .await;

    let node = Node::person(PersonAttributes::named("Ada"), Position::default());
    let err = gateway(&server)
        .await
        .create_node(&NodeRecord::from_node(&node))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("duplicate id"));
}

#[tokio::test]
async fn test_http_error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/nodes"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let node = Node::person(PersonAttributes::named("Ada"), Position::default());
    assert!(gateway(&server)
        .await
        .create_node(&NodeRecord::from_node(&node))
        .await
        .is_err());
}
