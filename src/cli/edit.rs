//! Create and update commands
//!
//! Fields come from `--set key=value`. Relations are picked by name with
//! `--company` and `--person`, the way the forms' comboboxes do it.

use anyhow::{anyhow, bail, Result};
use serde_json::{Map, Value};

use super::{ui, App, CreateArgs, UpdateArgs};
use crate::cache::{EntityCache, Filter, MutationOutcome};
use crate::combobox::{company_options, person_options, Combobox, Commit};
use crate::error::ApiError;
use crate::models::{
    Company, Deal, Entity, EntityId, EntityType, Lead, Lookup, Note, Person, Product, RelatedKind,
    Task,
};

/// Execute the create command
pub async fn run_create(app: &App, args: &CreateArgs) -> Result<()> {
    let mut record = parse_assignments(args.entity, &args.set)?;
    apply_relations(
        &app.cache,
        args.entity,
        &mut record,
        args.company.as_deref(),
        args.person.as_deref(),
    )
    .await?;
    warn_on_contact_mismatch(&app.cache, args.entity, &record).await?;

    let outcome = save_record(&app.cache, args.entity, Value::Object(record)).await?;
    match outcome.record.as_ref().and_then(|r| r.get("id")).and_then(Value::as_str) {
        Some(id) => ui::status(&format!("Created {} {}.", args.entity, id)),
        None => ui::status(&format!("Created {}.", args.entity)),
    }
    Ok(())
}

/// Execute the update command. The fetched record is sent back whole,
/// with the given fields replaced.
pub async fn run_update(app: &App, args: &UpdateArgs) -> Result<()> {
    let id = EntityId::from(args.id.as_str());
    let mut record = fetch_record(&app.cache, args.entity, &id).await?;

    for (key, value) in parse_assignments(args.entity, &args.set)? {
        record.insert(key, value);
    }
    apply_relations(
        &app.cache,
        args.entity,
        &mut record,
        args.company.as_deref(),
        args.person.as_deref(),
    )
    .await?;
    warn_on_contact_mismatch(&app.cache, args.entity, &record).await?;

    // The path carries the id. A `--set id=...` cannot move the record.
    record.insert("id".to_string(), Value::String(id.to_string()));
    save_record(&app.cache, args.entity, Value::Object(record)).await?;
    ui::status("Saved.");
    Ok(())
}

/// Turn `key=value` pairs into JSON fields. Numeric and boolean fields of
/// the type are converted; an empty value clears the field.
pub fn parse_assignments(entity: EntityType, pairs: &[String]) -> Result<Map<String, Value>> {
    let mut fields = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got {:?}", pair))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("missing field name in {:?}", pair);
        }

        let value = if raw.is_empty() {
            Value::Null
        } else if entity.numeric_fields().contains(&key) {
            let number: f64 = raw
                .trim()
                .parse()
                .map_err(|_| anyhow!("{} must be a number, got {:?}", key, raw))?;
            serde_json::Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(|| anyhow!("{} must be a finite number", key))?
        } else if entity.integer_fields().contains(&key) {
            let number: i64 = raw
                .trim()
                .parse()
                .map_err(|_| anyhow!("{} must be a whole number, got {:?}", key, raw))?;
            Value::from(number)
        } else if entity.bool_fields().contains(&key) {
            Value::Bool(parse_bool(raw).ok_or_else(|| anyhow!("{} must be yes or no, got {:?}", key, raw))?)
        } else {
            Value::String(raw.to_string())
        };
        fields.insert(key.to_string(), value);
    }
    Ok(fields)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

async fn fetch_record(
    cache: &EntityCache,
    entity: EntityType,
    id: &EntityId,
) -> Result<Map<String, Value>> {
    let records = cache.get(entity, &Filter::new()).await?;
    records
        .iter()
        .find(|r| r.get("id").and_then(Value::as_str) == Some(id.as_str()))
        .and_then(|r| r.as_object().cloned())
        .ok_or_else(|| ApiError::NotFound(format!("{} {}", entity, id)).into())
}

/// Resolve `--company` and `--person` to ids and write them into the
/// fields this type uses for them.
async fn apply_relations(
    cache: &EntityCache,
    entity: EntityType,
    record: &mut Map<String, Value>,
    company: Option<&str>,
    person: Option<&str>,
) -> Result<()> {
    if company.is_none() && person.is_none() {
        return Ok(());
    }

    let company_id = match company {
        Some(query) => Some(pick_company(cache, query).await?),
        None => None,
    };

    match entity {
        EntityType::Person | EntityType::Product => {
            if person.is_some() {
                bail!("--person does not apply to a {}", entity);
            }
            set_id(record, "company_id", company_id);
        }
        EntityType::Deal => {
            if let Some(query) = person {
                let scope = company_id
                    .clone()
                    .or_else(|| record_id(record, "company_id"));
                let contact = pick_person(cache, query, scope.as_ref()).await?;
                set_id(record, "contact_id", Some(contact));
            }
            if company_id.is_some() {
                set_id(record, "company_id", company_id);
            }
        }
        EntityType::Task | EntityType::Note => {
            let (kind, id) = match (company_id, person) {
                (Some(_), Some(_)) => bail!("a {} relates to a company or a person, not both", entity),
                (Some(id), None) => (RelatedKind::Company, id),
                (None, Some(query)) => (RelatedKind::Person, pick_person(cache, query, None).await?),
                (None, None) => return Ok(()),
            };
            record.insert("related_to_type".to_string(), Value::String(kind.as_str().to_string()));
            record.insert("related_to_id".to_string(), Value::String(id.to_string()));
        }
        EntityType::Company | EntityType::Lead => {
            bail!("--company and --person do not apply to a {}", entity);
        }
    }
    Ok(())
}

fn set_id(record: &mut Map<String, Value>, field: &str, id: Option<EntityId>) {
    let value = id.map(|id| Value::String(id.to_string())).unwrap_or(Value::Null);
    record.insert(field.to_string(), value);
}

fn record_id(record: &Map<String, Value>, field: &str) -> Option<EntityId> {
    record
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(EntityId::from)
}

async fn pick_company(cache: &EntityCache, query: &str) -> Result<EntityId> {
    let companies = cache.list::<Company>(&Filter::new()).await?;
    let commit = Combobox::new(company_options(&companies)).pick(query)?;
    commit
        .into_id()
        .ok_or_else(|| anyhow!("no company selected"))
}

/// Pick among the company's people first. Someone from another company is
/// still accepted, with a warning.
async fn pick_person(
    cache: &EntityCache,
    query: &str,
    company: Option<&EntityId>,
) -> Result<EntityId> {
    let people = cache.list::<Person>(&Filter::new()).await?;

    if company.is_some() {
        if let Ok(Commit::Set(id)) = Combobox::new(person_options(&people, company)).pick(query) {
            return Ok(id);
        }
    }

    let commit = Combobox::new(person_options(&people, None)).pick(query)?;
    commit
        .into_id()
        .ok_or_else(|| anyhow!("no person selected"))
}

/// A deal's contact should work at the deal's company. This is not
/// enforced, only reported.
async fn warn_on_contact_mismatch(
    cache: &EntityCache,
    entity: EntityType,
    record: &Map<String, Value>,
) -> Result<()> {
    if entity != EntityType::Deal {
        return Ok(());
    }
    let (Some(company), Some(contact)) = (
        record_id(record, "company_id"),
        record_id(record, "contact_id"),
    ) else {
        return Ok(());
    };

    let people = cache.list::<Person>(&Filter::new()).await?;
    if let Some(person) = Lookup::new(&people).find(&contact) {
        if !person.belongs_to(&company) {
            tracing::warn!(contact = %contact, company = %company, "deal contact belongs to another company");
            ui::warning(&format!(
                "{} is not listed as a contact of this company.",
                person.full_name()
            ));
        }
    }
    Ok(())
}

/// Decode into the typed record, run its checks and send it.
async fn save_record(
    cache: &EntityCache,
    entity: EntityType,
    record: Value,
) -> Result<MutationOutcome, ApiError> {
    match entity {
        EntityType::Company => save_as::<Company>(cache, record).await,
        EntityType::Person => save_as::<Person>(cache, record).await,
        EntityType::Deal => save_as::<Deal>(cache, record).await,
        EntityType::Product => save_as::<Product>(cache, record).await,
        EntityType::Task => save_as::<Task>(cache, record).await,
        EntityType::Note => save_as::<Note>(cache, record).await,
        EntityType::Lead => save_as::<Lead>(cache, record).await,
    }
}

async fn save_as<T: Entity>(cache: &EntityCache, record: Value) -> Result<MutationOutcome, ApiError> {
    let entity: T =
        serde_json::from_value(record).map_err(|e| ApiError::Validation(e.to_string()))?;
    cache.save(&entity).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::Method;
    use crate::auth::Session;
    use crate::config::Config;
    use serde_json::json;
    use std::sync::Arc;

    fn app_with(mock: &Arc<MockTransport>) -> App {
        App::from_parts(Config::default(), Session::signed_out(), mock.clone())
    }

    fn seed(mock: &MockTransport) {
        mock.respond(
            Method::Get,
            "/companies/",
            json!([{"id": "c1", "name": "Acme Corp"}, {"id": "c2", "name": "Globex"}]),
        );
        mock.respond(
            Method::Get,
            "/people/",
            json!([
                {"id": "p1", "first_name": "Ada", "last_name": "Lovelace", "email": "ada@acme.com", "company_id": "c1"},
                {"id": "p2", "first_name": "Hank", "last_name": "Scorpio", "email": "hank@globex.com", "company_id": "c2"}
            ]),
        );
    }

    fn sent(mock: &MockTransport, method: Method) -> Value {
        mock.requests()
            .into_iter()
            .find(|r| r.method == method)
            .and_then(|r| r.body)
            .unwrap()
    }

    #[test]
    fn test_parse_assignments() {
        let fields = parse_assignments(
            EntityType::Deal,
            &[
                "title=Fleet renewal".to_string(),
                "value=1200.5".to_string(),
                "probability=40".to_string(),
                "description=".to_string(),
                "expected_close_date=2024-06-30".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(fields["title"], "Fleet renewal");
        assert_eq!(fields["value"], json!(1200.5));
        assert_eq!(fields["probability"], json!(40));
        assert!(fields["probability"].is_i64());
        assert_eq!(fields["description"], Value::Null);

        let fields =
            parse_assignments(EntityType::Note, &["is_pinned=yes".to_string()]).unwrap();
        assert_eq!(fields["is_pinned"], json!(true));

        assert!(parse_assignments(EntityType::Deal, &["value=lots".to_string()]).is_err());
        assert!(parse_assignments(EntityType::Deal, &["probability=40.5".to_string()]).is_err());
        assert!(parse_assignments(EntityType::Deal, &["title".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_create_deal_resolves_company_and_contact() {
        let mock = Arc::new(MockTransport::new());
        seed(&mock);
        let app = app_with(&mock);

        let args = CreateArgs {
            entity: EntityType::Deal,
            set: vec!["title=Fleet renewal".to_string()],
            company: Some("acme".to_string()),
            person: Some("ada".to_string()),
        };
        run_create(&app, &args).await.unwrap();

        let body = sent(&mock, Method::Post);
        assert_eq!(body["company_id"], "c1");
        assert_eq!(body["contact_id"], "p1");
        assert_eq!(body["currency"], "INR");
        assert_eq!(body["stage"], "Qualification");
    }

    #[tokio::test]
    async fn test_contact_from_other_company_is_allowed() {
        let mock = Arc::new(MockTransport::new());
        seed(&mock);
        let app = app_with(&mock);

        let args = CreateArgs {
            entity: EntityType::Deal,
            set: vec!["title=Cross sell".to_string()],
            company: Some("acme".to_string()),
            person: Some("hank".to_string()),
        };
        run_create(&app, &args).await.unwrap();

        let body = sent(&mock, Method::Post);
        assert_eq!(body["company_id"], "c1");
        assert_eq!(body["contact_id"], "p2");
    }

    #[tokio::test]
    async fn test_note_relation_from_person() {
        let mock = Arc::new(MockTransport::new());
        seed(&mock);
        let app = app_with(&mock);

        let args = CreateArgs {
            entity: EntityType::Note,
            set: vec!["content=Call went well".to_string()],
            company: None,
            person: Some("lovelace".to_string()),
        };
        run_create(&app, &args).await.unwrap();

        let body = sent(&mock, Method::Post);
        assert_eq!(body["related_to_type"], "person");
        assert_eq!(body["related_to_id"], "p1");
    }

    #[tokio::test]
    async fn test_missing_required_field_is_not_sent() {
        let mock = Arc::new(MockTransport::new());
        let app = app_with(&mock);

        let args = CreateArgs {
            entity: EntityType::Company,
            set: vec!["name= ".to_string()],
            company: None,
            person: None,
        };
        let err = run_create(&app, &args).await.unwrap_err();
        assert_eq!(err.to_string(), "name: field required");
        assert_eq!(mock.count(Method::Post, "/companies/"), 0);
    }

    #[tokio::test]
    async fn test_update_keeps_unknown_fields() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(
            Method::Get,
            "/companies/",
            json!([{"_id": "c1", "name": "Acme", "created_at": "2024-05-01T10:00:00", "owner_id": "u9"}]),
        );
        let app = app_with(&mock);

        let args = UpdateArgs {
            entity: EntityType::Company,
            id: "c1".to_string(),
            set: vec!["name=Acme Corp".to_string()],
            company: None,
            person: None,
        };
        run_update(&app, &args).await.unwrap();

        let put = mock
            .requests()
            .into_iter()
            .find(|r| r.method == Method::Put)
            .unwrap();
        assert_eq!(put.path(), "/companies/c1");
        let body = put.body.unwrap();
        assert_eq!(body["name"], "Acme Corp");
        assert_eq!(body["owner_id"], "u9");
        assert_eq!(body["created_at"], "2024-05-01T10:00:00");
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let mock = Arc::new(MockTransport::new());
        let app = app_with(&mock);
        let args = UpdateArgs {
            entity: EntityType::Deal,
            id: "nope".to_string(),
            set: vec![],
            company: None,
            person: None,
        };
        let err = run_update(&app, &args).await.unwrap_err();
        assert_eq!(err.to_string(), "Not found: deal nope");
    }
}
