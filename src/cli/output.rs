//! Terminal rendering of inventories and transfer summaries

use std::time::Duration;

use tabled::builder::Builder;
use tabled::settings::object::{Columns, Rows};
use tabled::settings::{Alignment, Modify, Style};

use crate::catalog::{DatabaseInfo, DatabaseStats};
use crate::transfer::TransferResult;
use crate::utils::convert::format_bytes;
use crate::utils::time::format_duration;

/// Table of databases with their on-disk size
pub fn databases_table(databases: &[DatabaseInfo]) -> String {
    if databases.is_empty() {
        return "(no databases)".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["Database", "Size"]);
    for db in databases {
        builder.push_record([db.name.clone(), format_bytes(db.size_on_disk)]);
    }

    let mut table = builder.build();
    table
        .with(Style::modern())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .with(Modify::new(Columns::new(1..=1)).with(Alignment::right()));
    table.to_string()
}

/// Per-collection document counts followed by the totals
pub fn stats_table(stats: &DatabaseStats) -> String {
    let mut out = String::new();

    if !stats.collections.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Collection", "Documents"]);
        for coll in &stats.collections {
            builder.push_record([coll.name.clone(), coll.document_count.to_string()]);
        }

        let mut table = builder.build();
        table
            .with(Style::modern())
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .with(Modify::new(Columns::new(1..=1)).with(Alignment::right()));
        out.push_str(&table.to_string());
        out.push('\n');
    }

    out.push_str(&format!(
        "database: {}\ncollections: {}\ndocuments: {}",
        stats.database,
        stats.collection_count(),
        stats.total_documents
    ));
    out
}

/// Summary printed after a clone, export or import
pub fn transfer_summary(result: &TransferResult, elapsed: Duration) -> String {
    let mut lines = vec![
        format!("collections: {}", result.collections),
        format!("documents: {}", result.documents),
        format!("elapsed: {}", format_duration(elapsed)),
    ];
    if let Some(path) = &result.output_path {
        lines.push(format!("output: {}", path.display()));
    }
    lines.join("\n")
}
