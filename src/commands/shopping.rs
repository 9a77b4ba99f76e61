//! Shopping list CLI commands.
//!
//! Show the consolidated list per day, check items off across every list
//! they came from, and delete a whole day.

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};

use recipe_cart_core::{
    CancellationToken, ConsolidatedRow, DateGroup, ListSummary, RecordId, ShoppingListEngine,
    ShoppingListService,
};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum ShoppingSubcommand {
    /// Show the shopping list, merged per day
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Mark an item as purchased on every list it came from
    Check {
        /// Ingredient name
        name: String,

        /// Day (YYYY-MM-DD), defaults to the most recent day
        #[arg(long, short)]
        date: Option<String>,

        /// Unit, when the ingredient is listed in several units
        #[arg(long, short)]
        unit: Option<String>,
    },

    /// Mark an item as not purchased
    Uncheck {
        /// Ingredient name
        name: String,

        /// Day (YYYY-MM-DD), defaults to the most recent day
        #[arg(long, short)]
        date: Option<String>,

        /// Unit, when the ingredient is listed in several units
        #[arg(long, short)]
        unit: Option<String>,
    },

    /// Delete one shopping list by id (shown by `list`)
    DeleteList {
        /// Shopping list id
        id: i64,
    },

    /// Delete every shopping list of a day
    DeleteDay {
        /// Day (YYYY-MM-DD)
        #[arg(long, short)]
        date: String,
    },
}

impl ShoppingSubcommand {
    pub async fn run<S: ShoppingListService>(
        &self,
        engine: &mut ShoppingListEngine<S>,
        cancel: &CancellationToken,
    ) -> Result<(), Box<dyn std::error::Error>> {
        engine.load_view(cancel).await?;

        match self {
            ShoppingSubcommand::List { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(engine.view())?);
                    }
                    OutputFormat::Table => {
                        if engine.view().is_empty() {
                            println!("Your shopping list is empty.");
                        }
                        for group in engine.view() {
                            println!("{}", render_group(group));
                        }
                    }
                }
                Ok(())
            }

            ShoppingSubcommand::Check { name, date, unit } => {
                set_purchased(engine, name, date.as_deref(), unit.as_deref(), true, cancel).await
            }

            ShoppingSubcommand::Uncheck { name, date, unit } => {
                set_purchased(engine, name, date.as_deref(), unit.as_deref(), false, cancel).await
            }

            ShoppingSubcommand::DeleteList { id } => {
                let id = RecordId(*id);
                engine.delete_record(id, cancel).await?;
                println!("Deleted list #{}", id);
                Ok(())
            }

            ShoppingSubcommand::DeleteDay { date } => {
                let date = parse_date(date)?;
                let group = engine
                    .find_group(date)
                    .cloned()
                    .ok_or_else(|| format!("No shopping list for {}", date))?;

                engine.delete_group(&group, cancel).await?;
                println!(
                    "Deleted {} list(s) for {}",
                    group.record_ids.len(),
                    group.label
                );
                Ok(())
            }
        }
    }
}

async fn set_purchased<S: ShoppingListService>(
    engine: &mut ShoppingListEngine<S>,
    name: &str,
    date: Option<&str>,
    unit: Option<&str>,
    purchased: bool,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let group = resolve_group(engine.view(), date)?.clone();
    let row = select_row(&group, name, unit)?.clone();

    let already = if purchased {
        row.purchased
    } else {
        !row.purchased && !row.is_partially_purchased()
    };
    if already {
        let state = if purchased { "checked" } else { "not checked" };
        println!("'{}' is already {}", row.name, state);
        return Ok(());
    }

    engine.toggle_row(&row, &group, purchased, cancel).await?;

    if purchased {
        println!(
            "Checked '{}' on {} list(s) for {}",
            row.name,
            row.contributor_count(),
            group.label
        );
    } else {
        println!("Unchecked '{}' for {}", row.name, group.label);
    }
    Ok(())
}

/// Parse a day given as YYYY-MM-DD.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Use YYYY-MM-DD.", s))
}

/// The group for `date`, or the most recent one.
fn resolve_group<'a>(groups: &'a [DateGroup], date: Option<&str>) -> Result<&'a DateGroup, String> {
    match date {
        Some(s) => {
            let date = parse_date(s)?;
            groups
                .iter()
                .find(|g| g.date_key == date)
                .ok_or_else(|| format!("No shopping list for {}", date))
        }
        None => groups
            .first()
            .ok_or_else(|| "Your shopping list is empty".to_string()),
    }
}

/// Find a row by case-insensitive name, narrowed by unit when given.
fn select_row<'a>(
    group: &'a DateGroup,
    name: &str,
    unit: Option<&str>,
) -> Result<&'a ConsolidatedRow, String> {
    let name_lower = name.to_lowercase();
    let matches: Vec<&ConsolidatedRow> = group
        .rows
        .iter()
        .filter(|r| r.name.to_lowercase() == name_lower)
        .filter(|r| unit.map_or(true, |u| r.unit.as_deref() == Some(u)))
        .collect();

    match matches.as_slice() {
        [] => Err(format!("'{}' is not on the list for {}", name, group.label)),
        [row] => Ok(*row),
        _ => {
            let units: Vec<&str> = matches
                .iter()
                .map(|r| r.unit.as_deref().unwrap_or("-"))
                .collect();
            Err(format!(
                "'{}' is listed in several units on {} ({}); pass --unit",
                name,
                group.label,
                units.join(", ")
            ))
        }
    }
}

/// Render one day: pending items, then the purchased section.
fn render_group(group: &DateGroup) -> String {
    let mut out = Vec::new();
    out.push(format!("Shopping List - {}", group.label));
    out.push("=".repeat(44));
    for list in &group.lists {
        out.push(render_list(list));
    }

    if group.rows.is_empty() {
        out.push("No items.".to_string());
        return out.join("\n");
    }

    for row in group.pending_rows() {
        out.push(render_row(row));
    }

    let purchased: Vec<_> = group.purchased_rows().collect();
    if !purchased.is_empty() {
        out.push("-".repeat(44));
        out.push(format!("Purchased ({}):", purchased.len()));
        for row in &purchased {
            out.push(render_row(row));
        }
    }

    out.push("-".repeat(44));
    out.push(format!(
        "{} of {} items purchased",
        purchased.len(),
        group.rows.len()
    ));
    out.join("\n")
}

/// One backing list: id, title and planned day.
fn render_list(list: &ListSummary) -> String {
    let mut line = format!(
        "#{} {}",
        list.record_id,
        list.title.as_deref().unwrap_or("(untitled)")
    );
    if let Some(planned) = list.planned_date {
        line.push_str(&format!(" - planned {}", planned.format("%d/%m/%Y")));
    }
    line.push_str(&format!(" ({} items)", list.item_count));
    line
}

fn render_row(row: &ConsolidatedRow) -> String {
    let mut line = row.to_string();
    if row.is_partially_purchased() {
        let bought = row.provenance.iter().filter(|p| p.purchased).count();
        line.push_str(&format!(" ({} of {} lists bought)", bought, row.contributor_count()));
    }
    line
}
