use anyhow::{anyhow, Result};

use super::{ui, App, ListArgs};
use crate::cache::Filter;
use crate::models::{
    Company, Deal, EntityId, EntityType, Lead, Lookup, Note, Person, Product, RelatedKind,
    RelatedTo, Task, INDIVIDUAL, UNKNOWN_COMPANY, UNKNOWN_PERSON,
};

/// Execute the list command
pub async fn run_list(app: &App, args: &ListArgs) -> Result<()> {
    let filter = list_filter(args)?;
    let cache = &app.cache;
    let all = Filter::new();

    let (headers, rows): (&[&str], Vec<Vec<String>>) = match args.entity {
        EntityType::Company => (
            &["name", "industry", "size", "website", "email"][..],
            company_rows(&cache.list::<Company>(&filter).await?),
        ),
        EntityType::Person => {
            let (people, companies) = tokio::try_join!(
                cache.list::<Person>(&filter),
                cache.list::<Company>(&all)
            )?;
            (
                &["name", "email", "job title", "company", "primary"][..],
                person_rows(&people, &companies),
            )
        }
        EntityType::Deal => {
            let (deals, companies, people) = tokio::try_join!(
                cache.list::<Deal>(&filter),
                cache.list::<Company>(&all),
                cache.list::<Person>(&all)
            )?;
            (
                &["title", "value", "stage", "prob", "company", "contact", "close"][..],
                deal_rows(&deals, &companies, &people),
            )
        }
        EntityType::Product => {
            let (products, companies) = tokio::try_join!(
                cache.list::<Product>(&filter),
                cache.list::<Company>(&all)
            )?;
            (
                &["product", "price", "category", "status", "company"][..],
                product_rows(&products, &companies),
            )
        }
        EntityType::Task => {
            let (tasks, companies, people) = tokio::try_join!(
                cache.list::<Task>(&filter),
                cache.list::<Company>(&all),
                cache.list::<Person>(&all)
            )?;
            (
                &["title", "priority", "status", "due", "related to"][..],
                task_rows(&tasks, &companies, &people),
            )
        }
        EntityType::Note => {
            let (notes, companies, people) = tokio::try_join!(
                cache.list::<Note>(&filter),
                cache.list::<Company>(&all),
                cache.list::<Person>(&all)
            )?;
            (
                &["note", "related to", "pinned", "created"][..],
                note_rows(&notes, &companies, &people),
            )
        }
        EntityType::Lead => (
            &["name", "email", "company", "source", "status"][..],
            lead_rows(&cache.list::<Lead>(&filter).await?),
        ),
    };

    if rows.is_empty() {
        ui::status(&format!("No {} records.", args.entity));
        return Ok(());
    }
    ui::print_table(headers, &rows);
    tracing::debug!(entity = %args.entity, rows = rows.len(), stats = ?cache.stats(), "listed");
    Ok(())
}

fn list_filter(args: &ListArgs) -> Result<Filter> {
    match (&args.related_type, &args.related_id) {
        (Some(kind), Some(id)) => {
            let kind = RelatedKind::parse(kind)
                .ok_or_else(|| anyhow!("--related-type must be company or person, got {:?}", kind))?;
            Ok(Filter::related(&RelatedTo::new(kind, EntityId::from(id.as_str()))))
        }
        (None, None) => Ok(Filter::new()),
        _ => Err(anyhow!("--related-type and --related-id go together")),
    }
}

fn company_rows(companies: &[Company]) -> Vec<Vec<String>> {
    companies
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                ui::cell(c.industry.as_ref().map(|i| i.as_str())),
                ui::cell(c.company_size.as_ref().map(|s| s.as_str())),
                ui::cell(c.website.as_deref()),
                ui::cell(c.email.as_deref()),
            ]
        })
        .collect()
}

fn person_rows(people: &[Person], companies: &[Company]) -> Vec<Vec<String>> {
    let companies = Lookup::new(companies);
    people
        .iter()
        .map(|p| {
            vec![
                p.full_name(),
                p.email.clone(),
                ui::cell(p.job_title.as_deref()),
                companies.label_or(p.company_id.as_ref(), INDIVIDUAL),
                if p.is_primary_contact { "yes" } else { "" }.to_string(),
            ]
        })
        .collect()
}

fn deal_rows(deals: &[Deal], companies: &[Company], people: &[Person]) -> Vec<Vec<String>> {
    let companies = Lookup::new(companies);
    let people = Lookup::new(people);
    deals
        .iter()
        .map(|d| {
            let contact = match &d.contact_id {
                Some(id) => people.label_or(Some(id), UNKNOWN_PERSON),
                None => "-".to_string(),
            };
            vec![
                d.title.clone(),
                ui::format_money(d.value, &d.currency),
                d.stage.to_string(),
                format!("{}%", d.probability),
                companies.label_or(d.company_id.as_ref(), INDIVIDUAL),
                contact,
                ui::cell(d.expected_close_date.as_deref()),
            ]
        })
        .collect()
}

fn product_rows(products: &[Product], companies: &[Company]) -> Vec<Vec<String>> {
    let companies = Lookup::new(companies);
    products
        .iter()
        .map(|p| {
            vec![
                format!("{} ({})", p.name, p.code),
                ui::format_money(p.price, &p.currency),
                ui::cell(p.category.as_ref().map(|c| c.as_str())),
                p.status.to_string(),
                companies.label_or(p.company_id.as_ref(), UNKNOWN_COMPANY),
            ]
        })
        .collect()
}

/// Name of whatever a task or note is attached to.
fn related_label(related: &RelatedTo, companies: &Lookup<Company>, people: &Lookup<Person>) -> String {
    match related.kind {
        RelatedKind::Company => companies.label_or(Some(&related.id), UNKNOWN_COMPANY),
        RelatedKind::Person => people.label_or(Some(&related.id), UNKNOWN_PERSON),
    }
}

fn task_rows(tasks: &[Task], companies: &[Company], people: &[Person]) -> Vec<Vec<String>> {
    let companies = Lookup::new(companies);
    let people = Lookup::new(people);
    tasks
        .iter()
        .map(|t| {
            vec![
                t.title.clone(),
                t.priority.to_string(),
                t.status.to_string(),
                ui::cell(t.due_date.as_deref()),
                t.related_to()
                    .map(|r| related_label(r, &companies, &people))
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect()
}

fn note_rows(notes: &[Note], companies: &[Company], people: &[Person]) -> Vec<Vec<String>> {
    let companies = Lookup::new(companies);
    let people = Lookup::new(people);
    let mut notes: Vec<&Note> = notes.iter().collect();
    // Pinned first, server order otherwise.
    notes.sort_by_key(|n| !n.is_pinned);
    notes
        .into_iter()
        .map(|n| {
            vec![
                crate::models::Entity::label(n),
                related_label(&n.related, &companies, &people),
                if n.is_pinned { "yes" } else { "" }.to_string(),
                n.created_at
                    .as_deref()
                    .map(ui::format_timestamp)
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect()
}

fn lead_rows(leads: &[Lead]) -> Vec<Vec<String>> {
    leads
        .iter()
        .map(|l| {
            vec![
                format!("{} {}", l.first_name, l.last_name).trim().to_string(),
                l.email.clone(),
                ui::cell(l.company.as_deref()),
                ui::cell(l.source.as_ref().map(|s| s.as_str())),
                l.status.to_string(),
            ]
        })
        .collect()
}
