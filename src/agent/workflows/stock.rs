//! 库存查询：选择（全部 / 低库存 / 搜索）→ 可选的搜索词

use crate::backend::StockItem;
use crate::interactive::{self, STOCK_ALL, STOCK_LOW, STOCK_SEARCH};
use crate::session::{SessionData, SessionTxn, WorkflowState};

use super::{backend_failure, AgentResponse, StepInput};
use crate::agent::command::normalize;
use crate::agent::Agent;

const MAX_LINES: usize = 10;

pub(super) fn start(txn: &mut SessionTxn) -> AgentResponse {
    txn.update(WorkflowState::StockMenuChoice, SessionData::new());
    AgentResponse::text("📦 Consultation des stocks").with_interactive(interactive::stock_menu())
}

fn format_items(title: &str, items: &[StockItem]) -> String {
    let mut lines = vec![title.to_string()];
    for item in items.iter().take(MAX_LINES) {
        let unite = item.unite.as_deref().unwrap_or("");
        let alert = if item.is_low() { " ⚠️" } else { "" };
        lines.push(format!("• {} : {} {}{}", item.designation, item.quantite, unite, alert).replace("  ", " "));
    }
    if items.len() > MAX_LINES {
        lines.push(format!("… et {} autres articles", items.len() - MAX_LINES));
    }
    lines.join("\n")
}

pub(super) async fn on_choice(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let choice = normalize(input.text);
    let low_only = if choice == STOCK_ALL || choice == "1" || choice.contains("tout") {
        false
    } else if choice == STOCK_LOW || choice == "2" || choice.contains("faible") {
        true
    } else if choice == STOCK_SEARCH || choice == "3" || choice.contains("recherch") {
        txn.update(WorkflowState::StockSearchQuery, txn.data().clone());
        return AgentResponse::text("🔍 Quel article recherchez-vous ? (désignation ou référence)");
    } else {
        return AgentResponse::text("⚠️ Choix non reconnu.").with_interactive(interactive::stock_menu());
    };

    match agent.backend.list_stocks(None).await {
        Ok(mut items) => {
            txn.clear();
            if low_only {
                items.retain(StockItem::is_low);
                if items.is_empty() {
                    return AgentResponse::text("✅ Aucun article sous le seuil d'alerte.");
                }
                return AgentResponse::text(format_items("⚠️ *Articles en stock faible*", &items));
            }
            if items.is_empty() {
                return AgentResponse::text("📦 Aucun article en stock.");
            }
            AgentResponse::text(format_items("📦 *État des stocks*", &items))
        }
        Err(e) => backend_failure(txn, "la consultation des stocks", e),
    }
}

pub(super) async fn on_search(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    if input.is_blank() {
        return AgentResponse::text("🔍 Quel article recherchez-vous ?");
    }
    let query = input.trimmed();
    match agent.backend.list_stocks(Some(query)).await {
        Ok(items) => {
            txn.clear();
            if items.is_empty() {
                AgentResponse::text(format!("🔍 Aucun article trouvé pour « {query} »."))
            } else {
                AgentResponse::text(format_items(&format!("🔍 *Résultats pour « {query} »*"), &items))
            }
        }
        Err(e) => backend_failure(txn, "la recherche en stock", e),
    }
}
