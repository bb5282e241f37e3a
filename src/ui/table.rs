use crate::storage::DbStats;
use crate::Entity;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Rows")]
    pub rows: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            table: label.to_string(),
            rows: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Row counts per table, one line each
pub fn stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    for entity in Entity::ALL {
        builder.add_row(entity.as_str(), &stats.count(entity).to_string());
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_table_lists_every_entity() {
        let stats = DbStats {
            customers: 3,
            deliveries: 12,
            ..Default::default()
        };
        let table = stats_table(&stats);
        for entity in Entity::ALL {
            assert!(table.contains(entity.as_str()));
        }
        assert!(table.contains("12"));
    }

    #[test]
    fn test_empty_builder_renders_nothing() {
        assert!(TableBuilder::new().build().is_empty());
    }
}
