use anyhow::Result;
use serde_json::Value;

use super::{ui, App, DeleteArgs};
use crate::cache::Filter;
use crate::models::EntityId;

/// Execute the delete command
pub async fn run_delete(app: &App, args: &DeleteArgs) -> Result<()> {
    let id = EntityId::from(args.id.trim());

    if !args.yes {
        let name = describe(app, args, &id);
        if !ui::confirm(&format!("Delete {}?", name))? {
            return Ok(());
        }
    }

    app.cache.delete(args.entity, &id).await?;
    ui::status("Deleted.");
    Ok(())
}

/// A name for the confirmation prompt, from whatever is already cached.
fn describe(app: &App, args: &DeleteArgs, id: &EntityId) -> String {
    let records = app.cache.peek(args.entity, &Filter::new());
    let label = records.and_then(|records| {
        records
            .iter()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id.as_str()))
            .and_then(|r| {
                ["name", "title", "first_name"]
                    .iter()
                    .find_map(|field| r.get(*field).and_then(Value::as_str))
                    .map(str::to_string)
            })
    });
    match label {
        Some(label) => format!("{} {:?}", args.entity, label),
        None => format!("{} {}", args.entity, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::Method;
    use crate::auth::Session;
    use crate::config::Config;
    use crate::error::ApiError;
    use crate::models::EntityType;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_delete_with_yes_skips_prompt() {
        let mock = Arc::new(MockTransport::new());
        let app = App::from_parts(Config::default(), Session::signed_out(), mock.clone());

        let args = DeleteArgs {
            entity: EntityType::Company,
            id: "c1".to_string(),
            yes: true,
        };
        run_delete(&app, &args).await.unwrap();
        assert_eq!(mock.count(Method::Delete, "/companies/c1"), 1);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_rows() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(Method::Get, "/companies/", json!([{"id": "c1", "name": "Acme Corp"}]));
        mock.fail(
            Method::Delete,
            "/companies/c1",
            ApiError::from_response(409, r#"{"detail": "Company has open deals"}"#),
        );
        let app = App::from_parts(Config::default(), Session::signed_out(), mock.clone());
        app.cache.get(EntityType::Company, &Filter::new()).await.unwrap();

        let args = DeleteArgs {
            entity: EntityType::Company,
            id: "c1".to_string(),
            yes: true,
        };
        let err = run_delete(&app, &args).await.unwrap_err();
        assert_eq!(err.to_string(), "Company has open deals");

        let kept = app.cache.peek(EntityType::Company, &Filter::new()).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test]
    async fn test_describe_uses_cached_name() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(Method::Get, "/deals/", json!([{"id": "d1", "title": "Fleet"}]));
        let app = App::from_parts(Config::default(), Session::signed_out(), mock.clone());
        app.cache.get(EntityType::Deal, &Filter::new()).await.unwrap();

        let args = DeleteArgs {
            entity: EntityType::Deal,
            id: "d1".to_string(),
            yes: false,
        };
        assert_eq!(describe(&app, &args, &EntityId::from("d1")), "deal \"Fleet\"");
        assert_eq!(describe(&app, &args, &EntityId::from("d2")), "deal d2");
    }
}
