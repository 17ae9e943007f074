//! Catalog, detail and event management commands.

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table};
use eventdeck_core::App;
use eventdeck_core::api::EventQuery;
use eventdeck_core::api::types::{Event, EventPatch, ResourceId};
use eventdeck_core::catalog::{Catalog, CatalogState, Category, DetailState, load_detail};
use eventdeck_core::manage::{self, EventForm, MyEvents};

use super::confirm;

/// Event fields as given on the command line.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct EventFields {
    /// Event title
    #[arg(long)]
    pub title: Option<String>,
    /// One or two line summary
    #[arg(long = "short-desc", value_name = "TEXT")]
    pub short_desc: Option<String>,
    /// Detailed description
    #[arg(long = "full-desc", value_name = "TEXT")]
    pub full_desc: Option<String>,
    /// Price as displayed, e.g. "$99"
    #[arg(long)]
    pub price: Option<String>,
    /// Date as displayed, e.g. "July 15-17, 2026"
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    /// Music, Conference, Sports, Food, Art or Entertainment
    #[arg(long)]
    pub category: Option<String>,
    /// Emoji shown next to the title
    #[arg(long)]
    pub image: Option<String>,
}

impl EventFields {
    fn into_form(self) -> EventForm {
        EventForm {
            title: self.title.unwrap_or_default(),
            short_desc: self.short_desc.unwrap_or_default(),
            full_desc: self.full_desc.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            date: self.date.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            image: self.image,
        }
    }

    fn into_patch(self) -> EventPatch {
        EventPatch {
            title: self.title,
            short_desc: self.short_desc,
            full_desc: self.full_desc,
            price: self.price,
            date: self.date,
            location: self.location,
            category: self.category,
            image: self.image,
        }
    }
}

fn events_table(events: &[Event]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "", "Title", "Category", "Date", "Location", "Price"]);
    for event in events {
        table.add_row(vec![
            event.id.to_string(),
            event.image_or_default().to_string(),
            event.title.clone(),
            event.category.clone(),
            event.date.clone(),
            event.location.clone(),
            event.price.clone(),
        ]);
    }
    table
}

pub async fn list(app: &App, category: Option<String>, search: Option<String>) -> Result<()> {
    let category = match category.as_deref() {
        Some(value) => Category::parse_filter(value)?,
        None => None,
    };
    let query = EventQuery {
        category: category.map(|c| c.as_str().to_string()),
        search,
    };

    let catalog = Catalog::new(app.api.clone());
    let state = catalog
        .refresh(query)
        .await
        .context("catalog refresh was superseded")?;

    match state {
        CatalogState::Loaded(events) => {
            println!("{}", events_table(&events));
            println!("{} event(s)", events.len());
        }
        CatalogState::Empty => println!("No events found matching your search."),
        CatalogState::Failed(message) => anyhow::bail!(message),
        CatalogState::Loading => {}
    }
    Ok(())
}

pub async fn show(app: &App, id: &str) -> Result<()> {
    let id = ResourceId::from(id);
    match load_detail(&app.api, &id).await {
        DetailState::Loaded(event) => {
            print_event(&event);
            Ok(())
        }
        DetailState::NotFound => anyhow::bail!("Event not found: {id}"),
        DetailState::Failed(message) => anyhow::bail!(message),
    }
}

fn print_event(event: &Event) {
    println!("{} {}", event.image_or_default(), event.title);
    println!();
    println!("  Category: {}", event.category);
    println!("  Date:     {}", event.date);
    println!("  Location: {}", event.location);
    println!("  Price:    {}", event.price);
    println!();
    println!("{}", event.short_desc);
    println!();
    println!("{}", event.full_desc);
}

pub async fn add(app: &App, fields: EventFields) -> Result<()> {
    let mutation = manage::create_event(&app.api, &fields.into_form()).await?;
    println!("✓ {}", mutation.message);
    if let Some(event) = mutation.event {
        println!("  {} ({})", event.title, event.id);
    }
    Ok(())
}

pub async fn update(app: &App, id: &str, fields: EventFields) -> Result<()> {
    let id = ResourceId::from(id);
    let mutation = manage::update_event(&app.api, &id, &fields.into_patch()).await?;
    println!("✓ {}", mutation.message);
    Ok(())
}

pub async fn mine(app: &App) -> Result<()> {
    let mine = MyEvents::load(&app.api).await?;
    if mine.is_empty() {
        println!("No events added yet.");
    } else {
        println!("{}", events_table(mine.events()));
    }
    Ok(())
}

pub async fn delete(app: &App, id: &str, yes: bool) -> Result<()> {
    let id = ResourceId::from(id);
    let mut mine = MyEvents::load(&app.api).await?;

    let outcome = mine
        .delete(&app.api, &id, |event| {
            if yes {
                return true;
            }
            let label = event.map_or_else(|| id.to_string(), |e| format!("'{}'", e.title));
            confirm(&format!("Delete {label}?"))
        })
        .await?;

    let Some(mutation) = outcome else {
        println!("Delete cancelled.");
        return Ok(());
    };
    println!("✓ {}", mutation.message);
    if mine.is_empty() {
        println!("No events added yet.");
    } else {
        println!("{}", events_table(mine.events()));
    }
    Ok(())
}
