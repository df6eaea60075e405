//! Chatbot flows and their node/edge graphs.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use serde::Deserialize;

use praxis_core::chatbot::{EdgeDraft, NodeDraft, collect_answers, validate_graph};
use praxis_core::entities::{ChatbotEdge, ChatbotFlow, ChatbotGraph, ChatbotNode, Lead};
use praxis_core::enums::{AuditAction, EntityType, EventKind, LeadField, LeadSource};
use praxis_core::ids::{PREFIX_CHATBOT_EDGE, PREFIX_CHATBOT_FLOW, PREFIX_CHATBOT_NODE};

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, ensure_affected, get_bool, get_opt_string, parse_datetime, parse_enum,
    parse_string_list,
};
use crate::repos::event::NewEvent;
use crate::repos::lead::{NewLead, ensure_owned_in};
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::chatbot::FlowUpdate;

const FLOW_COLS: &str = "id, user_id, name, description, active, created_at, updated_at";
const NODE_COLS: &str = "id, flow_id, kind, text, field, options, position_x, position_y";
const EDGE_COLS: &str = "id, flow_id, source_node_id, target_node_id, label";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFlow {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
}

fn row_to_flow(row: &libsql::Row) -> Result<ChatbotFlow, DatabaseError> {
    Ok(ChatbotFlow {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        name: row.get::<String>(2)?,
        description: get_opt_string(row, 3)?,
        active: get_bool(row, 4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
        updated_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

fn row_to_node(row: &libsql::Row) -> Result<ChatbotNode, DatabaseError> {
    let field = match get_opt_string(row, 4)? {
        Some(f) => Some(parse_enum(&f)?),
        None => None,
    };
    Ok(ChatbotNode {
        id: row.get::<String>(0)?,
        flow_id: row.get::<String>(1)?,
        kind: parse_enum(&row.get::<String>(2)?)?,
        text: row.get::<String>(3)?,
        field,
        options: parse_string_list(&row.get::<String>(5)?)?,
        position_x: row.get::<f64>(6)?,
        position_y: row.get::<f64>(7)?,
    })
}

fn row_to_edge(row: &libsql::Row) -> Result<ChatbotEdge, DatabaseError> {
    Ok(ChatbotEdge {
        id: row.get::<String>(0)?,
        flow_id: row.get::<String>(1)?,
        source_node_id: row.get::<String>(2)?,
        target_node_id: row.get::<String>(3)?,
        label: get_opt_string(row, 4)?,
    })
}

impl PraxisService {
    pub async fn create_flow(&self, user_id: &str, new: &NewFlow) -> Result<ChatbotFlow, DatabaseError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("flow name is required".into()));
        }

        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_CHATBOT_FLOW).await?;
        self.db()
            .execute(
                &format!("INSERT INTO chatbot_flows ({FLOW_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)"),
                libsql::params![
                    id.as_str(),
                    user_id,
                    name,
                    new.description.as_deref(),
                    i64::from(new.active),
                    now.to_rfc3339()
                ],
            )
            .await?;
        self.audit(user_id, EntityType::ChatbotFlow, &id, AuditAction::Created, None)
            .await?;

        Ok(ChatbotFlow {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: new.description.clone(),
            active: new.active,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_flow(&self, user_id: &str, id: &str) -> Result<ChatbotFlow, DatabaseError> {
        let sql = format!("SELECT {FLOW_COLS} FROM chatbot_flows WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_flow(&row)
    }

    pub async fn list_flows(&self, user_id: &str) -> Result<Vec<ChatbotFlow>, DatabaseError> {
        let sql = format!(
            "SELECT {FLOW_COLS} FROM chatbot_flows WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        );
        let rows = self.db().query(&sql, [user_id]).await?;
        collect_rows(rows, row_to_flow).await
    }

    pub async fn update_flow(
        &self,
        user_id: &str,
        id: &str,
        update: FlowUpdate,
    ) -> Result<ChatbotFlow, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref name) = update.name {
            if name.trim().is_empty() {
                return Err(DatabaseError::Validation("flow name is required".into()));
            }
            sets.set("name", name.trim());
        }
        if let Some(ref description) = update.description {
            sets.set_opt("description", description.as_deref());
        }
        if let Some(active) = update.active {
            sets.set_bool("active", active);
        }

        if sets.is_empty() {
            return self.get_flow(user_id, id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("chatbot_flows", id, Some(user_id));
        ensure_affected(self.db().execute(&sql, libsql::params_from_iter(params)).await?)?;
        self.audit(
            user_id,
            EntityType::ChatbotFlow,
            id,
            AuditAction::Updated,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_flow(user_id, id).await
    }

    /// Nodes and edges go with the flow (cascade).
    pub async fn delete_flow(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        ensure_affected(
            self.db()
                .execute(
                    "DELETE FROM chatbot_flows WHERE id = ?1 AND user_id = ?2",
                    [id, user_id],
                )
                .await?,
        )?;
        self.audit(user_id, EntityType::ChatbotFlow, id, AuditAction::Deleted, None)
            .await
    }

    pub async fn get_flow_graph(&self, user_id: &str, id: &str) -> Result<ChatbotGraph, DatabaseError> {
        let flow = self.get_flow(user_id, id).await?;
        self.graph_for(flow).await
    }

    /// Public lookup of an active flow with its graph.
    pub async fn get_active_flow(&self, id: &str) -> Result<ChatbotGraph, DatabaseError> {
        let sql = format!("SELECT {FLOW_COLS} FROM chatbot_flows WHERE id = ?1 AND active = 1");
        let mut rows = self.db().query(&sql, [id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let flow = row_to_flow(&row)?;
        self.graph_for(flow).await
    }

    /// Replace the whole graph of a flow with an editor draft.
    ///
    /// Edges in the draft refer to node `key`s; the stored rows get fresh ids.
    pub async fn save_flow_graph(
        &self,
        user_id: &str,
        id: &str,
        nodes: &[NodeDraft],
        edges: &[EdgeDraft],
    ) -> Result<ChatbotGraph, DatabaseError> {
        validate_graph(nodes, edges)?;

        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            ensure_owned_in(&tx, "chatbot_flows", id, user_id).await?;

            tx.execute("DELETE FROM chatbot_edges WHERE flow_id = ?1", [id]).await?;
            tx.execute("DELETE FROM chatbot_nodes WHERE flow_id = ?1", [id]).await?;

            let mut ids_by_key: HashMap<&str, String> = HashMap::with_capacity(nodes.len());
            for node in nodes {
                let node_id = self.db().generate_id(PREFIX_CHATBOT_NODE).await?;
                tx.execute(
                    &format!("INSERT INTO chatbot_nodes ({NODE_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                    libsql::params![
                        node_id.as_str(),
                        id,
                        node.kind.as_str(),
                        node.text.as_str(),
                        node.field.map(LeadField::as_str),
                        serde_json::to_string(&node.options)?,
                        node.position_x,
                        node.position_y
                    ],
                )
                .await?;
                ids_by_key.insert(node.key.as_str(), node_id);
            }

            for edge in edges {
                let (Some(source), Some(target)) = (
                    ids_by_key.get(edge.source.as_str()),
                    ids_by_key.get(edge.target.as_str()),
                ) else {
                    return Err(DatabaseError::Validation(format!(
                        "edge {} -> {} references an unknown node",
                        edge.source, edge.target
                    )));
                };
                let edge_id = self.db().generate_id(PREFIX_CHATBOT_EDGE).await?;
                tx.execute(
                    &format!("INSERT INTO chatbot_edges ({EDGE_COLS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                    libsql::params![
                        edge_id.as_str(),
                        id,
                        source.as_str(),
                        target.as_str(),
                        edge.label.as_deref()
                    ],
                )
                .await?;
            }

            tx.execute(
                "UPDATE chatbot_flows SET updated_at = ?1 WHERE id = ?2",
                libsql::params![Utc::now().to_rfc3339(), id],
            )
            .await?;
            self.audit_in(
                &tx,
                user_id,
                EntityType::ChatbotFlow,
                id,
                AuditAction::Updated,
                Some(serde_json::json!({ "nodes": nodes.len(), "edges": edges.len() })),
            )
            .await
        }
        .await;
        tx.finish(result).await?;
        self.get_flow_graph(user_id, id).await
    }

    /// Turn a finished public conversation into a `chatbot` lead.
    ///
    /// `answers` is keyed by node id. The conversation must have captured a
    /// name through an `input` node.
    pub async fn submit_chatbot(
        &self,
        flow_id: &str,
        answers: &BTreeMap<String, String>,
    ) -> Result<Lead, DatabaseError> {
        let graph = self.get_active_flow(flow_id).await?;
        let capture = collect_answers(&graph.nodes, answers);
        let name = capture
            .field(LeadField::Name)
            .ok_or_else(|| DatabaseError::Validation("the conversation did not capture a name".into()))?;
        let owned = |field| capture.field(field).map(String::from);

        let new = NewLead {
            name: name.to_string(),
            email: owned(LeadField::Email),
            phone: owned(LeadField::Phone),
            interest: owned(LeadField::Interest),
            notes: owned(LeadField::Notes),
            source: LeadSource::Chatbot,
            metadata: Some(serde_json::json!({
                "flow_id": flow_id,
                "transcript": capture.transcript,
            })),
            ..Default::default()
        };
        let user_id = graph.flow.user_id.as_str();

        let tx = self.db().transaction().await?;
        let result: Result<Lead, DatabaseError> = async {
            let lead = self.insert_lead_in(&tx, user_id, &new).await?;
            self.insert_event_in(
                &tx,
                &NewEvent {
                    user_id: user_id.to_string(),
                    kind: EventKind::ChatbotCompleted,
                    lead_id: Some(lead.id.clone()),
                    metadata: Some(serde_json::json!({ "flow_id": flow_id })),
                    ..Default::default()
                },
            )
            .await?;
            Ok(lead)
        }
        .await;
        tx.finish(result).await
    }

    async fn graph_for(&self, flow: ChatbotFlow) -> Result<ChatbotGraph, DatabaseError> {
        let sql = format!("SELECT {NODE_COLS} FROM chatbot_nodes WHERE flow_id = ?1 ORDER BY rowid");
        let rows = self.db().query(&sql, [flow.id.as_str()]).await?;
        let nodes = collect_rows(rows, row_to_node).await?;

        let sql = format!("SELECT {EDGE_COLS} FROM chatbot_edges WHERE flow_id = ?1 ORDER BY rowid");
        let rows = self.db().query(&sql, [flow.id.as_str()]).await?;
        let edges = collect_rows(rows, row_to_edge).await?;

        Ok(ChatbotGraph { flow, nodes, edges })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{create_test_user, service_with_user};
    use praxis_core::chatbot::{entry_node, next_node};
    use praxis_core::enums::ChatbotNodeKind;
    use pretty_assertions::assert_eq;

    fn draft(key: &str, kind: ChatbotNodeKind, field: Option<LeadField>) -> NodeDraft {
        NodeDraft {
            key: key.to_string(),
            kind,
            text: format!("text of {key}"),
            field,
            options: Vec::new(),
            position_x: 10.0,
            position_y: 20.0,
        }
    }

    fn link(source: &str, target: &str) -> EdgeDraft {
        EdgeDraft {
            source: source.to_string(),
            target: target.to_string(),
            label: None,
        }
    }

    fn sample_graph() -> (Vec<NodeDraft>, Vec<EdgeDraft>) {
        let nodes = vec![
            draft("start", ChatbotNodeKind::Start, None),
            draft("name", ChatbotNodeKind::Input, Some(LeadField::Name)),
            draft("phone", ChatbotNodeKind::Input, Some(LeadField::Phone)),
            draft("end", ChatbotNodeKind::End, None),
        ];
        let edges = vec![link("start", "name"), link("name", "phone"), link("phone", "end")];
        (nodes, edges)
    }

    async fn active_flow(svc: &PraxisService, user_id: &str) -> ChatbotFlow {
        svc.create_flow(
            user_id,
            &NewFlow {
                name: "Welcome".into(),
                active: true,
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn save_graph_maps_keys_to_ids() {
        let (svc, user_id) = service_with_user().await;
        let flow = active_flow(&svc, &user_id).await;
        let (nodes, edges) = sample_graph();

        let graph = svc.save_flow_graph(&user_id, &flow.id, &nodes, &edges).await.unwrap();
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.edges.len(), 3);
        assert!(graph.nodes.iter().all(|n| n.id.starts_with("cbn-")));

        let start = entry_node(&graph.nodes).unwrap();
        assert_eq!(start.kind, ChatbotNodeKind::Start);
        let next = next_node(&graph.nodes, &graph.edges, &start.id, None).unwrap();
        assert_eq!(next.field, Some(LeadField::Name));
    }

    #[tokio::test]
    async fn saving_again_replaces_the_graph() {
        let (svc, user_id) = service_with_user().await;
        let flow = active_flow(&svc, &user_id).await;
        let (nodes, edges) = sample_graph();
        svc.save_flow_graph(&user_id, &flow.id, &nodes, &edges).await.unwrap();

        let smaller = vec![draft("only", ChatbotNodeKind::Message, None)];
        let graph = svc.save_flow_graph(&user_id, &flow.id, &smaller, &[]).await.unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
    }

    #[tokio::test]
    async fn invalid_graph_leaves_existing_one() {
        let (svc, user_id) = service_with_user().await;
        let flow = active_flow(&svc, &user_id).await;
        let (nodes, edges) = sample_graph();
        svc.save_flow_graph(&user_id, &flow.id, &nodes, &edges).await.unwrap();

        let err = svc
            .save_flow_graph(&user_id, &flow.id, &nodes, &[link("start", "missing")])
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
        assert_eq!(svc.get_flow_graph(&user_id, &flow.id).await.unwrap().nodes.len(), 4);
    }

    #[tokio::test]
    async fn inactive_flow_is_not_public() {
        let (svc, user_id) = service_with_user().await;
        let flow = svc
            .create_flow(
                &user_id,
                &NewFlow {
                    name: "Draft".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(svc.get_active_flow(&flow.id).await, Err(DatabaseError::NoResult)));
    }

    #[tokio::test]
    async fn foreign_flow_graph_is_hidden() {
        let (svc, user_id) = service_with_user().await;
        let other = create_test_user(&svc, "Bruno Lima").await;
        let flow = active_flow(&svc, &user_id).await;
        let (nodes, edges) = sample_graph();

        let err = svc
            .save_flow_graph(&other.id, &flow.id, &nodes, &edges)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NoResult));
    }

    #[tokio::test]
    async fn submit_creates_chatbot_lead() {
        let (svc, user_id) = service_with_user().await;
        let flow = active_flow(&svc, &user_id).await;
        let (nodes, edges) = sample_graph();
        let graph = svc.save_flow_graph(&user_id, &flow.id, &nodes, &edges).await.unwrap();

        let id_of = |field| {
            graph
                .nodes
                .iter()
                .find(|n| n.field == Some(field))
                .map(|n| n.id.clone())
                .unwrap()
        };
        let answers = BTreeMap::from([
            (id_of(LeadField::Name), "Carla".to_string()),
            (id_of(LeadField::Phone), "+55 11 98888-7777".to_string()),
        ]);

        let lead = svc.submit_chatbot(&flow.id, &answers).await.unwrap();
        assert_eq!(lead.name, "Carla");
        assert_eq!(lead.source, LeadSource::Chatbot);
        assert_eq!(lead.phone.as_deref(), Some("+55 11 98888-7777"));
        let transcript = &lead.metadata.unwrap()["transcript"];
        assert_eq!(transcript.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn submit_without_name_is_rejected() {
        let (svc, user_id) = service_with_user().await;
        let flow = active_flow(&svc, &user_id).await;
        let (nodes, edges) = sample_graph();
        svc.save_flow_graph(&user_id, &flow.id, &nodes, &edges).await.unwrap();

        let err = svc.submit_chatbot(&flow.id, &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }
}
