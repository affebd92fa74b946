//! CSV request sheet
//!
//! Mirrors the paper form procurement works from: a header block with who
//! asked for what and where, then one numbered row per item.

use super::error::DeliveryError;
use super::traits::{Artifact, Formatter};
use crate::request::{format_date, AttachmentKind, LineItem, RequestAggregate};
use chrono::{Local, NaiveDate};

const ITEM_COLUMNS: [&str; 7] = [
    "No.",
    "Name",
    "Unit",
    "Quantity",
    "Module",
    "Delivery date",
    "Attachments",
];

/// Renders requests as CSV
#[derive(Debug, Clone, Default)]
pub struct SheetFormatter {
    /// Fixed creation date; the local date is used when unset
    created_on: Option<NaiveDate>,
}

impl SheetFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn created_on(date: NaiveDate) -> Self {
        Self {
            created_on: Some(date),
        }
    }

    fn today(&self) -> NaiveDate {
        self.created_on
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

fn attachment_cell(item: &LineItem) -> String {
    item.attachments
        .iter()
        .map(|a| match a.kind {
            AttachmentKind::File => format!("See attached file: {}", a.describe()),
            AttachmentKind::Link => a.locator.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn file_name(request: &RequestAggregate, created: NaiveDate) -> String {
    let who: String = request
        .header
        .requester
        .id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let who = if who.is_empty() { "anonymous".to_string() } else { who };
    format!("request_{who}_{}.csv", created.format("%Y%m%d"))
}

impl Formatter for SheetFormatter {
    fn render(&self, request: &RequestAggregate) -> Result<Artifact, DeliveryError> {
        let created = self.today();
        let header = &request.header;
        let format_err = |e: csv::Error| DeliveryError::Format(e.to_string());

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());

        let created_text = format_date(created);
        let handle = header.requester.handle();
        let global = header.global_due_date.map(format_date).unwrap_or_default();
        let header_rows: [[&str; 2]; 7] = [
            ["Supply request", ""],
            ["Created", &created_text],
            ["Project", header.category.map_or("", |c| c.label())],
            ["Location", header.location.as_deref().unwrap_or_default()],
            ["Requested by", header.requester.display_name()],
            ["Contact", &handle],
            ["Delivery date", &global],
        ];
        for row in header_rows {
            writer.write_record(row).map_err(format_err)?;
        }
        writer.write_record([""]).map_err(format_err)?;
        writer.write_record(ITEM_COLUMNS).map_err(format_err)?;

        for (i, item) in request.items().iter().enumerate() {
            let date = request
                .effective_due_date(item)
                .map(format_date)
                .unwrap_or_default();
            writer
                .write_record([
                    (i + 1).to_string(),
                    item.name.clone(),
                    item.unit.to_string(),
                    item.quantity.to_string(),
                    item.module.to_string(),
                    date,
                    attachment_cell(item),
                ])
                .map_err(format_err)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DeliveryError::Format(e.to_string()))?;

        Ok(Artifact {
            file_name: file_name(request, created),
            content_type: "text/csv".to_string(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::fixtures::{aggregate_with, date};
    use crate::request::{Attachment, Category, HeaderField, ItemValue};

    fn rows(artifact: &Artifact) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(artifact.bytes.as_slice())
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_sheet_layout() {
        let mut agg = aggregate_with(&["Cable", "Pipe"]);
        agg.header.requester.full_name = Some("Anna Petrova".into());
        agg.header.requester.username = Some("anna".into());
        agg.set_header_field(HeaderField::Category(Category::Office))
            .unwrap();
        agg.set_header_field(HeaderField::Location("Site 7".into()))
            .unwrap();
        agg.set_item_field(0, ItemValue::DueDate(Some(date(2025, 3, 10))))
            .unwrap();
        agg.header.global_due_date = Some(date(2025, 4, 1));
        agg.replace_item_attachments(
            1,
            vec![
                Attachment::file("f1", Some("plan.pdf".into())),
                Attachment::link("https://example.com/pipe"),
            ],
        )
        .unwrap();

        let artifact = SheetFormatter::created_on(date(2025, 3, 1))
            .render(&agg)
            .unwrap();
        assert_eq!(artifact.file_name, "request_42_20250301.csv");
        assert_eq!(artifact.content_type, "text/csv");

        let rows = rows(&artifact);
        assert_eq!(rows[1], vec!["Created", "01.03.2025"]);
        assert_eq!(rows[2], vec!["Project", "Office"]);
        assert_eq!(rows[3], vec!["Location", "Site 7"]);
        assert_eq!(rows[4], vec!["Requested by", "Anna Petrova"]);
        assert_eq!(rows[5], vec!["Contact", "@anna"]);
        assert_eq!(rows[6], vec!["Delivery date", "01.04.2025"]);
        assert_eq!(rows[8][0], "No.");
        assert_eq!(
            rows[9],
            vec!["1", "Cable", "pcs", "1", "1", "10.03.2025", ""]
        );
        // Undated item falls back to the global date
        assert_eq!(rows[10][5], "01.04.2025");
        assert_eq!(
            rows[10][6],
            "See attached file: plan.pdf; https://example.com/pipe"
        );
    }

    #[test]
    fn test_file_name_strips_unsafe_characters() {
        let mut agg = aggregate_with(&[]);
        agg.header.requester.id = "../../etc".into();
        let artifact = SheetFormatter::created_on(date(2025, 1, 2))
            .render(&agg)
            .unwrap();
        assert_eq!(artifact.file_name, "request_etc_20250102.csv");
    }
}
