//! PostgreSQL DDL rendered from a wired graph.

use super::{AssociationGraph, TableHandle};
use crate::schema::{ColumnDef, ColumnType};

/// Double-quote an identifier (`user` is reserved in PostgreSQL).
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl AssociationGraph {
    /// One `CREATE TABLE IF NOT EXISTS` statement per table, in creation order.
    pub fn ddl(&self) -> Vec<String> {
        self.creation_order()
            .map(|handle| self.create_table_sql(handle))
            .collect()
    }

    fn create_table_sql(&self, handle: &TableHandle) -> String {
        let mut lines = Vec::new();

        if !handle.junction {
            lines.push("\"id\" BIGSERIAL PRIMARY KEY".to_string());
        }
        lines.extend(handle.columns.iter().map(column_sql));

        for fk in &handle.foreign_keys {
            lines.push(format!(
                "{} BIGINT{} REFERENCES {} (\"id\") ON DELETE {}",
                quote_ident(fk.column),
                if fk.required { " NOT NULL" } else { "" },
                quote_ident(self.handle(fk.references).table),
                fk.on_delete.sql(),
            ));
        }

        for (left, right) in &handle.unique_pairs {
            lines.push(format!(
                "CONSTRAINT {} UNIQUE ({}, {})",
                quote_ident(&format!("uq_{}_{}_{}", handle.table, left, right)),
                quote_ident(left),
                quote_ident(right),
            ));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            quote_ident(handle.table),
            lines.join(",\n    ")
        )
    }
}

fn column_sql(column: &ColumnDef) -> String {
    let mut sql = format!("{} {}", quote_ident(column.name), column.ty.sql_type());
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    if let ColumnType::Enum(values) = column.ty {
        let allowed = values
            .iter()
            .map(|v| format!("'{}'", v.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" CHECK ({} IN ({allowed}))", quote_ident(column.name)));
    }
    sql
}
