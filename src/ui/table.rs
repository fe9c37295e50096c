use tabled::{settings::Style, Table, Tabled};

use crate::hunter::Stored;

#[derive(Tabled)]
pub struct HunterRow {
    #[tabled(rename = "Id")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Age")]
    pub age: i64,
    #[tabled(rename = "Height")]
    pub height: String,
    #[tabled(rename = "Weight")]
    pub weight: String,
    #[tabled(rename = "Image")]
    pub image_url: String,
}

impl<Id: std::fmt::Display> From<&Stored<Id>> for HunterRow {
    fn from(stored: &Stored<Id>) -> Self {
        Self {
            id: stored.id.to_string(),
            name: stored.hunter.name.clone(),
            age: stored.hunter.age,
            height: format!("{:.1}", stored.hunter.height),
            weight: format!("{:.1}", stored.hunter.weight),
            image_url: stored.hunter.image_url.clone(),
        }
    }
}

pub fn hunters_table<Id: std::fmt::Display>(hunters: &[Stored<Id>]) -> String {
    if hunters.is_empty() {
        return String::new();
    }

    let rows: Vec<HunterRow> = hunters.iter().map(HunterRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunter::{Hunter, RowId};

    #[test]
    fn test_table_lists_every_hunter() {
        let hunters = vec![
            Stored::new(RowId(1), Hunter::new("Gon Freecss", 12, 154.0, 43.0, "http://x/gon.png")),
            Stored::new(RowId(2), Hunter::new("Killua Zoldyck", 12, 158.0, 45.0, "http://x/killua.png")),
        ];

        let table = hunters_table(&hunters);
        assert!(table.contains("Gon Freecss"));
        assert!(table.contains("Killua Zoldyck"));
        assert!(table.contains("154.0"));
    }

    #[test]
    fn test_empty_table_is_blank() {
        assert!(hunters_table::<RowId>(&[]).is_empty());
    }
}
