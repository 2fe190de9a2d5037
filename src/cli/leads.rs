use anyhow::Result;

use super::{ui, App};
use crate::models::{EntityId, LeadThread};

/// Pull the lead's mailbox on the server and print its message.
pub async fn run_sync_mail(app: &App, lead_id: &str) -> Result<()> {
    let response = app.cache.sync_mail(&EntityId::from(lead_id.trim())).await?;
    ui::status(&response.message);
    Ok(())
}

pub async fn run_threads(app: &App, lead_id: &str) -> Result<()> {
    let threads = app
        .cache
        .mail_threads(&EntityId::from(lead_id.trim()))
        .await?;
    if threads.is_empty() {
        ui::status("No mail threads. Run `sync-mail` to fetch them.");
        return Ok(());
    }
    ui::print_table(&["subject", "last message", "status", "when"], &thread_rows(&threads));
    Ok(())
}

fn thread_rows(threads: &[LeadThread]) -> Vec<Vec<String>> {
    threads
        .iter()
        .map(|t| {
            vec![
                t.subject.clone(),
                t.snippet.clone().unwrap_or_else(|| t.last_message.clone()),
                ui::cell(Some(&t.status)),
                ui::format_timestamp(&t.last_message_at),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_thread_rows() {
        let threads: Vec<LeadThread> = serde_json::from_value(json!([{
            "id": "th1",
            "lead_id": "l1",
            "subject": "Pricing",
            "last_message": "Thanks, talk soon",
            "last_message_at": "2024-05-01T10:00:00"
        }]))
        .unwrap();

        let rows = thread_rows(&threads);
        assert_eq!(
            rows[0],
            vec!["Pricing", "Thanks, talk soon", "-", "May 01 10:00"]
        );
    }
}
