//! # Command Line
//!
//! `stockroom [--config PATH] [--offline] [--json] <command>`
//!
//! Each command opens one page (or performs one action) and prints the
//! result, as text or as JSON with `--json`. Errors come back as
//! [`ApiError`] and are printed once by `main`.
//!
//! ```text
//! parse args ──► App::connect / App::offline ──► app.start()
//!                                                   │ (session restore,
//!                                                   │  route fix-up)
//!                                                   ▼
//!                                              execute(command)
//!                                                   │
//!                                                   ▼
//!                                       pages::* ──► print view
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use stockroom_backend::{ClientInput, TransferRequest};
use stockroom_core::order::{LineMatch, OrderDraft};
use stockroom_core::{ConversionRate, MovementKind, OrderStatus, Quantity};

use crate::error::ApiError;
use crate::state::{ConfigState, Route};
use crate::{demo, pages, App};

#[derive(Debug, Parser)]
#[command(name = "stockroom", version, about = "Inventory and order management")]
pub struct Cli {
    /// Config file (default: stockroom.toml in the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use a seeded in-memory backend; changes are lost on exit
    #[arg(long, global = true)]
    pub offline: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Signs in with e-mail and password.
    Login {
        email: String,
        /// Password (default: $STOCKROOM_PASSWORD)
        #[arg(long, env = "STOCKROOM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Signs out and forgets the saved session.
    Logout,

    /// Shows the signed-in user and their permissions.
    Whoami,

    /// Shows the current page and the back history.
    Route,

    /// Goes to a page: login, dashboard, clients, products, orders[/ID],
    /// inventory[/ID].
    Go {
        #[arg(value_parser = parse_route)]
        page: Route,
    },

    /// Goes back to the previous page.
    Back,

    /// Counts, revenue, low stock and recent orders.
    Dashboard,

    /// Lists clients.
    Clients {
        /// Only names containing this text
        #[arg(long)]
        search: Option<String>,
    },

    /// Adds a client.
    ClientAdd {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Deletes a client.
    ClientDelete { id: String },

    /// Lists products with their variants.
    Products,

    /// Lists orders, newest first.
    Orders {
        #[arg(long, value_parser = parse_status)]
        status: Option<OrderStatus>,
    },

    /// Shows one order with its lines matched to the catalog.
    Order { id: String },

    /// Creates an order from catalog variants.
    OrderNew {
        /// Client id
        #[arg(long)]
        client: Option<String>,
        /// VARIANT_ID:QUANTITY, repeatable
        #[arg(long = "line", required = true, value_parser = parse_line)]
        lines: Vec<(String, i64)>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Changes an order's status.
    OrderStatus {
        id: String,
        #[arg(value_parser = parse_status)]
        status: OrderStatus,
    },

    /// Stock levels, or one item's history when ITEM is given.
    Stock { item: Option<String> },

    /// Records a receipt or an issue.
    Move {
        item: String,
        #[arg(value_enum)]
        kind: MoveKind,
        #[arg(value_parser = parse_quantity)]
        quantity: Quantity,
        #[arg(long)]
        note: Option<String>,
    },

    /// Moves stock from one item to another.
    Transfer {
        from: String,
        to: String,
        /// Quantity in the source unit
        #[arg(value_parser = parse_quantity)]
        quantity: Quantity,
        /// FROM:TO units, e.g. 1:25 for one sack into 25 kg
        #[arg(long, value_parser = parse_rate, default_value = "1:1")]
        rate: ConversionRate,
        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MoveKind {
    In,
    Out,
}

impl From<MoveKind> for MovementKind {
    fn from(kind: MoveKind) -> Self {
        match kind {
            MoveKind::In => MovementKind::In,
            MoveKind::Out => MovementKind::Out,
        }
    }
}

// =============================================================================
// Argument Parsers
// =============================================================================

fn parse_route(s: &str) -> Result<Route, String> {
    s.parse()
}

fn parse_status(s: &str) -> Result<OrderStatus, String> {
    s.parse().map_err(|e: stockroom_core::ValidationError| e.to_string())
}

fn parse_quantity(s: &str) -> Result<Quantity, String> {
    let value: f64 = s.trim().parse().map_err(|_| format!("'{s}' is not a number"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err("quantity must be a positive number".to_string());
    }
    Ok(Quantity::from_decimal(value))
}

fn parse_rate(s: &str) -> Result<ConversionRate, String> {
    let (from, to) = s
        .split_once(':')
        .ok_or_else(|| format!("'{s}' is not FROM:TO"))?;
    let from: u32 = from.trim().parse().map_err(|_| format!("'{from}' is not a whole number"))?;
    let to: u32 = to.trim().parse().map_err(|_| format!("'{to}' is not a whole number"))?;
    ConversionRate::new(from, to).map_err(|e| e.to_string())
}

fn parse_line(s: &str) -> Result<(String, i64), String> {
    let (variant, quantity) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("'{s}' is not VARIANT_ID:QUANTITY"))?;
    let quantity: i64 = quantity
        .trim()
        .parse()
        .map_err(|_| format!("'{quantity}' is not a whole number"))?;
    Ok((variant.trim().to_string(), quantity))
}

// =============================================================================
// Running
// =============================================================================

/// Builds the app for the parsed arguments and runs the command.
pub async fn run(cli: Cli, config: ConfigState) -> Result<(), ApiError> {
    let app = if cli.offline {
        App::offline(config)?
    } else {
        App::connect(config)?
    };

    app.start().await;
    if cli.offline && !matches!(cli.command, Command::Login { .. }) {
        demo::ensure_signed_in(&app).await?;
    }

    let out = Output { json: cli.json };
    execute(&app, cli.command, &out).await
}

/// Where results go.
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Prints `value` as JSON, or the text from `text` otherwise.
    fn show<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<(), ApiError> {
        if self.json {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| ApiError::internal(format!("Cannot encode output: {e}")))?;
            println!("{json}");
        } else {
            let text = text();
            if !text.is_empty() {
                println!("{}", text.trim_end());
            }
        }
        Ok(())
    }
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

pub async fn execute(app: &App, command: Command, out: &Output) -> Result<(), ApiError> {
    match command {
        Command::Login { email, password } => {
            let user = pages::auth::sign_in(app, &email, &password).await?;
            out.show(&user, || format!("Signed in as {}", opt(&user.email)))
        }

        Command::Logout => {
            pages::auth::sign_out(app).await?;
            out.show(&serde_json::json!({ "signed_out": true }), || "Signed out".to_string())
        }

        Command::Whoami => {
            let user = pages::auth::current_user(app).ok_or_else(ApiError::unauthorized)?;
            let permissions = app.session.permissions().await;
            let view = serde_json::json!({ "user": user, "permissions": permissions });
            out.show(&view, || {
                format!(
                    "{} ({})\ncan delete records: {}\ncan view wholesale prices: {}",
                    opt(&user.email),
                    user.id,
                    permissions.can_delete,
                    permissions.can_view_wholesale
                )
            })
        }

        Command::Route => {
            let current = app.routes.current();
            let history = app.routes.history();
            let view = serde_json::json!({
                "current": current.path(),
                "history": history.iter().map(Route::path).collect::<Vec<_>>(),
            });
            out.show(&view, || {
                let mut text = format!("{current}\n");
                for route in history.iter().rev() {
                    text.push_str(&format!("  < {route}\n"));
                }
                text
            })
        }

        Command::Go { page } => {
            if page.requires_session() {
                pages::require_session(app)?;
            }
            let route = app.routes.navigate(page);
            out.show(&route.path(), || route.path())
        }

        Command::Back => {
            let route = app.routes.back().unwrap_or_else(|| app.routes.current());
            out.show(&route.path(), || route.path())
        }

        Command::Dashboard => {
            let view = pages::dashboard::load(app).await?;
            out.show(&view, || {
                let s = &view.summary;
                let mut text = format!(
                    "Clients {}   Products {}   Orders {} ({} pending)\nRevenue {}\n",
                    s.client_count, s.product_count, s.order_count, s.pending_orders, view.revenue
                );
                if !s.low_stock.is_empty() {
                    text.push_str("\nLow stock\n");
                    for level in &s.low_stock {
                        text.push_str(&format!(
                            "  {:<28} {} / {} {}\n",
                            level.item.label(),
                            level.on_hand,
                            level.item.min_quantity,
                            level.item.unit
                        ));
                    }
                }
                if !s.recent_orders.is_empty() {
                    text.push_str("\nRecent orders\n");
                    for order in &s.recent_orders {
                        text.push_str(&format!(
                            "  {}  {:<10} {:>12}  {}\n",
                            order.created_at.format("%Y-%m-%d"),
                            order.status,
                            app.config.format_currency(order.total_cents),
                            order.id
                        ));
                    }
                }
                text
            })
        }

        Command::Clients { search } => {
            let clients = pages::clients::list(app, search.as_deref()).await?;
            out.show(&clients, || {
                clients
                    .iter()
                    .map(|c| format!("{}  {:<24} {}\n", c.id, c.name, opt(&c.email)))
                    .collect()
            })
        }

        Command::ClientAdd {
            name,
            email,
            phone,
            address,
            notes,
        } => {
            let input = ClientInput {
                name,
                email,
                phone,
                address,
                notes,
            };
            let client = pages::clients::create(app, &input).await?;
            out.show(&client, || format!("Created client {} ({})", client.name, client.id))
        }

        Command::ClientDelete { id } => {
            pages::clients::delete(app, &id).await?;
            out.show(&serde_json::json!({ "deleted": id }), || format!("Deleted client {id}"))
        }

        Command::Products => {
            let view = pages::products::list(app).await?;
            out.show(&view, || {
                let mut text = String::new();
                for entry in &view.catalog.entries {
                    let status = if entry.product.is_active { "" } else { " (inactive)" };
                    text.push_str(&format!("{}{}  {}\n", entry.product.name, status, entry.product.id));
                    for v in &entry.variants {
                        let wholesale = match (view.show_wholesale, v.wholesale_price_cents) {
                            (true, Some(cents)) => format!("  wholesale {}", app.config.format_currency(cents)),
                            _ => String::new(),
                        };
                        text.push_str(&format!(
                            "  {:<16} {:<8} {:>10}{}  {}\n",
                            v.name,
                            v.unit,
                            app.config.format_currency(v.price_cents),
                            wholesale,
                            v.id
                        ));
                    }
                }
                text
            })
        }

        Command::Orders { status } => {
            let rows = pages::orders::list(app, status).await?;
            out.show(&rows, || {
                rows.iter()
                    .map(|r| {
                        format!(
                            "{}  {:<10} {:<20} {:>12}  {}\n",
                            r.order.created_at.format("%Y-%m-%d"),
                            r.order.status,
                            opt(&r.client_name),
                            r.total,
                            r.order.id
                        )
                    })
                    .collect()
            })
        }

        Command::Order { id } => {
            let view = pages::orders::open_order(app, &id).await?;
            out.show(&view, || {
                let mut text = format!(
                    "Order {}\nClient  {}\nStatus  {}\nNotes   {}\n\n",
                    view.order.id,
                    opt(&view.client_name),
                    view.order.status,
                    opt(&view.order.notes)
                );
                for r in &view.items {
                    let matched = match &r.matched {
                        LineMatch::Matched { .. } => "",
                        LineMatch::ProductOnly { .. } => "  [variant not in catalog]",
                        LineMatch::Unmatched => "  [not in catalog]",
                    };
                    text.push_str(&format!(
                        "  {:>4} x {} {} @ {} = {}{}\n",
                        r.item.quantity,
                        r.item.product_name,
                        r.item.variant_name.as_deref().unwrap_or(""),
                        app.config.format_currency(r.item.unit_price_cents),
                        app.config.format_currency(r.item.line_total_cents),
                        matched
                    ));
                }
                text.push_str(&format!("\nTotal {}\n", app.config.format_currency(view.draft.total().cents())));
                text
            })
        }

        Command::OrderNew { client, lines, notes } => {
            let catalog = pages::products::catalog(app).await?;
            let mut draft = OrderDraft::new(client);
            draft.notes = notes;
            for (variant_id, quantity) in &lines {
                draft.add_variant(&catalog, variant_id, *quantity)?;
            }
            let order = pages::orders::create(app, &draft).await?;
            out.show(&order, || {
                format!(
                    "Created order {} ({})",
                    order.id,
                    app.config.format_currency(order.total_cents)
                )
            })
        }

        Command::OrderStatus { id, status } => {
            let order = pages::orders::change_status(app, &id, status).await?;
            out.show(&order, || format!("Order {} is now {}", order.id, order.status))
        }

        Command::Stock { item: None } => {
            let levels = pages::inventory::stock(app).await?;
            out.show(&levels, || {
                levels
                    .iter()
                    .map(|l| {
                        format!(
                            "{:<28} {:>10} {:<8} min {:<8}{}  {}\n",
                            l.item.label(),
                            l.on_hand.to_string(),
                            l.item.unit,
                            l.item.min_quantity.to_string(),
                            if l.low { " LOW" } else { "" },
                            l.item.id
                        )
                    })
                    .collect()
            })
        }

        Command::Stock { item: Some(id) } => {
            let view = pages::inventory::item(app, &id).await?;
            out.show(&view, || {
                let mut text = format!(
                    "{}\nOn hand {} {} (min {}){}\n\n",
                    view.item.label(),
                    view.on_hand,
                    view.item.unit,
                    view.item.min_quantity,
                    if view.low { "  LOW" } else { "" }
                );
                for m in &view.movements {
                    text.push_str(&format!(
                        "  {}  {:<12} {:>10}  {}\n",
                        m.created_at.format("%Y-%m-%d %H:%M"),
                        m.kind.to_string(),
                        m.signed_quantity().to_string(),
                        opt(&m.note)
                    ));
                }
                text
            })
        }

        Command::Move {
            item,
            kind,
            quantity,
            note,
        } => {
            let movement =
                pages::inventory::record_movement(app, &item, kind.into(), quantity, note.as_deref()).await?;
            out.show(&movement, || {
                format!("Recorded {} {} for {}", movement.kind, movement.quantity, item)
            })
        }

        Command::Transfer {
            from,
            to,
            quantity,
            rate,
            note,
        } => {
            let request = TransferRequest {
                source_id: from,
                destination_id: to,
                quantity,
                rate,
                note,
            };
            let plan = pages::inventory::transfer(app, &request).await?;
            out.show(&plan, || {
                format!(
                    "Transferred {} out, {} in (transfer {})",
                    plan.outbound.quantity, plan.inbound.quantity, plan.transfer_id
                )
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["stockroom", "--offline", "go", "orders/o-1"]).unwrap();
        assert!(cli.offline);
        assert!(matches!(cli.command, Command::Go { page: Route::OrderDetail { .. } }));

        let cli = Cli::try_parse_from([
            "stockroom", "transfer", "a", "b", "2", "--rate", "1:25", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Transfer { quantity, rate, .. } => {
                assert_eq!(quantity, Quantity::from_units(2));
                assert_eq!(rate, ConversionRate::new(1, 25).unwrap());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_argument_parsers_reject_bad_input() {
        assert!(parse_quantity("-1").is_err());
        assert!(parse_quantity("abc").is_err());
        assert_eq!(parse_quantity("1.5").unwrap(), Quantity::from_milli(1_500));
        assert!(parse_rate("0:1").is_err());
        assert!(parse_rate("3").is_err());
        assert_eq!(parse_line("v-1:3").unwrap(), ("v-1".to_string(), 3));
        assert!(parse_status("shipped").is_err());
        assert!(Cli::try_parse_from(["stockroom", "go", "reports"]).is_err());
    }

    #[test]
    fn test_order_new_needs_a_line() {
        assert!(Cli::try_parse_from(["stockroom", "order-new"]).is_err());
        let cli = Cli::try_parse_from(["stockroom", "order-new", "--line", "v1:2", "--line", "v2:1"]).unwrap();
        match cli.command {
            Command::OrderNew { lines, .. } => assert_eq!(lines.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
