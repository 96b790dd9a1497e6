//! ASI-TRACK 控制台
//!
//! 用固定手机号在终端里驱动会话状态机，无需 Meta 即可调试 WhatsApp 流程。
//! 列表 / 按钮选项会打印出 id，直接输入 id 即等同于点击。
//! 手机号可用 ASITRACK_CONSOLE_PHONE 覆盖；输入 /web 切换到 Web 渠道，/quit 退出。

use anyhow::Context;
use asi_track::agent::{create_agent_builder, AgentResponse, ChatRequest};
use asi_track::interactive::InteractivePayload;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn render(response: &AgentResponse) -> String {
    let mut out = response.response.clone();
    match &response.interactive {
        Some(InteractivePayload::Button { buttons, .. }) => {
            for b in buttons {
                out.push_str(&format!("\n  [{}] {}", b.id, b.title));
            }
        }
        Some(InteractivePayload::List { button, sections, .. }) => {
            out.push_str(&format!("\n  ── {button} ──"));
            for section in sections {
                if let Some(title) = &section.title {
                    out.push_str(&format!("\n  {title}"));
                }
                for row in &section.rows {
                    out.push_str(&format!("\n    [{}] {}", row.id, row.title));
                }
            }
        }
        None => {}
    }
    if let Some(err) = &response.error {
        out.push_str(&format!("\n  (error: {err})"));
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    asi_track::observability::init();

    let agent = create_agent_builder(None).build_async().await;
    let phone = std::env::var("ASITRACK_CONSOLE_PHONE").unwrap_or_else(|_| "+22600000000".to_string());
    let mut web_mode = false;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(format!("ASI-TRACK console ({phone}). /web pour basculer, /quit pour sortir.\n").as_bytes())
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        match line.trim() {
            "/quit" => break,
            "/web" => {
                web_mode = !web_mode;
                let mode = if web_mode { "web" } else { "whatsapp" };
                stdout.write_all(format!("canal : {mode}\n").as_bytes()).await?;
                continue;
            }
            _ => {}
        }
        let request = if web_mode {
            ChatRequest::web(line, Vec::new())
        } else {
            ChatRequest::whatsapp(&phone, line)
        };
        let response = agent.process_query(request).await;
        stdout.write_all(format!("{}\n", render(&response)).as_bytes()).await?;
    }
    Ok(())
}
