//! 编排循环端到端测试：工具轮顺序、魔法链接判定、列表菜单合成

mod common;

use asi_track::agent::ChatRequest;
use asi_track::backend::MemoryBackend;
use asi_track::interactive::InteractivePayload;
use asi_track::llm::{LlmReply, ScriptedLlmClient};
use asi_track::memory::{Role, ToolCall};

use common::{assert_within_limits, harness, projects, stocks, PHONE};

fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments: arguments.into(),
    }
}

fn tool_round(calls: Vec<ToolCall>) -> ScriptedLlmClient {
    ScriptedLlmClient::new([LlmReply::tool_calls(calls), LlmReply::text("Voici la synthèse.")])
}

#[tokio::test]
async fn test_tool_results_follow_request_order() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(6)).with_stocks(stocks()),
        tool_round(vec![
            call("call_a", "get_projects", "{}"),
            call("call_b", "get_project_finances", r#"{"projet_id": "99"}"#),
            call("call_c", "get_stocks", "{}"),
        ]),
    );

    let response = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "Fais le point sur les projets et les stocks"))
        .await;
    assert!(response.response.starts_with("Voici la synthèse."));
    assert!(response.error.is_none());

    let requests = h.llm.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].tools.is_empty());
    assert!(requests[1].tools.is_empty());

    let tool_messages: Vec<_> = requests[1]
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    let ids: Vec<_> = tool_messages
        .iter()
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["call_a", "call_b", "call_c"]);
    assert!(tool_messages[1].content.contains("error"));
    assert!(tool_messages[1].content.contains("introuvable"));

    let assistant = requests[1]
        .messages
        .iter()
        .find(|m| m.role == Role::Assistant && !m.tool_calls.is_empty())
        .unwrap();
    assert_eq!(assistant.tool_calls.len(), 3);

    // 6 个项目：魔法链接 + 项目选择菜单
    assert!(response.response.contains("/share/"));
    assert_eq!(h.backend.magic_links().await.len(), 1);
    let menu = response.interactive.expect("project menu");
    assert!(matches!(menu, InteractivePayload::List { .. }));
    assert_eq!(menu.option_ids().len(), 6);
    assert_eq!(menu.option_ids()[0], "projet_1");
    assert_within_limits(&menu);

    let data = response.data.expect("data snapshot");
    assert!(data.get("get_projects").is_some());
    assert!(data.get("get_stocks").is_some());
    assert!(data.get("get_project_finances").is_none());
}

#[tokio::test]
async fn test_small_result_gets_no_link() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(4)),
        tool_round(vec![call("c1", "get_projects", "{}")]),
    );

    let response = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "Quels sont les projets ?"))
        .await;
    assert!(!response.response.contains("/share/"));
    assert!(h.backend.magic_links().await.is_empty());
    // 4 > 3：仍然合成选择菜单
    assert_eq!(response.interactive.unwrap().option_ids().len(), 4);
}

#[tokio::test]
async fn test_five_items_get_a_link() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(5)),
        tool_round(vec![call("c1", "get_projects", "{}")]),
    );

    let response = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "Quels sont les projets ?"))
        .await;
    assert!(response.response.contains("/share/"));
    let links = h.backend.magic_links().await;
    assert_eq!(links.len(), 1);
}

#[tokio::test]
async fn test_allowlisted_tool_always_links() {
    let h = harness(
        MemoryBackend::new(),
        tool_round(vec![call("c1", "get_global_kpis", "")]),
    );

    let response = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "Donne-moi les indicateurs"))
        .await;
    assert!(response.response.contains("/share/"));
    assert!(response.interactive.is_none());
}

#[tokio::test]
async fn test_link_failure_does_not_fail_reply() {
    let h = harness(
        MemoryBackend::new(),
        tool_round(vec![call("c1", "get_global_kpis", "{}")]),
    );
    h.backend.set_fail_writes(true);

    let response = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "Donne-moi les indicateurs"))
        .await;
    assert_eq!(response.response, "Voici la synthèse.");
    assert!(response.error.is_none());
}

#[tokio::test]
async fn test_web_channel_never_links() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(8)),
        tool_round(vec![call("c1", "get_projects", "{}")]),
    );

    let response = h
        .agent
        .process_query(ChatRequest::web("Liste les projets", Vec::new()))
        .await;
    assert_eq!(response.response, "Voici la synthèse.");
    assert!(h.backend.magic_links().await.is_empty());
    assert!(h.store.raw(PHONE).await.is_none());
}

#[tokio::test]
async fn test_unknown_tool_reported_to_model() {
    let h = harness(
        MemoryBackend::new(),
        tool_round(vec![call("c1", "delete_everything", "{}")]),
    );

    let response = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "Supprime tout"))
        .await;
    assert_eq!(response.response, "Voici la synthèse.");

    let second = &h.llm.requests()[1];
    let tool = second.messages.iter().find(|m| m.role == Role::Tool).unwrap();
    assert!(tool.content.contains("error"));
    assert!(response.data.is_none());
}

#[tokio::test]
async fn test_workflow_token_starts_workflow_without_llm() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(2)),
        ScriptedLlmClient::default(),
    );

    let response = h
        .agent
        .process_query_with_ai("[START_WORKFLOW:finances]", Some(PHONE), &[])
        .await;
    assert!(response.error.is_none());
    assert_eq!(h.llm.call_count(), 0);
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, "WAITING_FOR_PROJECT_ID_FINANCES");

    let web = h
        .agent
        .process_query_with_ai("[START_WORKFLOW:finances]", None, &[])
        .await;
    assert!(web.response.contains("WhatsApp"));
}

#[tokio::test]
async fn test_failed_allowlisted_call_still_links() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(2)),
        ScriptedLlmClient::new([
            LlmReply::tool_calls(vec![call("c1", "get_project_finances", r#"{"projet_id": "99"}"#)]),
            LlmReply::text("Synthèse."),
        ]),
    );

    let response = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "Finances du projet 99"))
        .await;
    assert!(response.response.starts_with("Synthèse."));
    assert!(response.response.contains("/share/"));
    assert!(response.data.is_none());

    let links = h.backend.magic_links().await;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].resource_type, "finances");
    assert_eq!(links[0].metadata["tool"], "get_project_finances");
}

#[tokio::test]
async fn test_resource_type_follows_first_invoked_tool() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(6)),
        tool_round(vec![
            call("c1", "get_project_finances", r#"{"projet_id": "99"}"#),
            call("c2", "get_projects", "{}"),
        ]),
    );

    h.agent
        .process_query(ChatRequest::whatsapp(PHONE, "Projets et finances"))
        .await;
    let links = h.backend.magic_links().await;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].resource_type, "finances");
    assert_eq!(links[0].metadata["tool"], "get_projects");
}
