use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Deserialize;
use thiserror::Error;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const REPORT_DISPOSITION: &str = "attachment;filename=report.xlsx";

const SENTIMENT_SHEET: &str = "Employee Sentiments";
const COMMENT_SHEET: &str = "Voices Comment";
const DEFAULT_COMMENT: &str = "No comment provided";
const SENTIMENT_COLUMNS: [(&str, f64); 5] = [
    ("created_at", 20.0),
    ("title", 30.0),
    ("body", 80.0),
    ("likes", 10.0),
    ("manager_comment", 30.0),
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to build workbook: {0}")]
    Workbook(#[from] XlsxError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(rename = "tableData", default)]
    pub table_data: Vec<ExportRow>,
    #[serde(rename = "voicesComment", default)]
    pub voices_comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportRow {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub likes: Option<i64>,
    #[serde(default)]
    pub manager_comment: Option<String>,
}

/// Renders timestamps as `YYYY/MM/DD`; unparseable values pass through.
pub fn format_created_at(raw: &str) -> String {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format("%Y/%m/%d").to_string();
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, pattern) {
            return parsed.format("%Y/%m/%d").to_string();
        }
    }

    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return parsed.format("%Y/%m/%d").to_string();
    }

    raw.to_string()
}

pub fn format_voices_comment(comment: Option<&str>) -> String {
    comment
        .unwrap_or(DEFAULT_COMMENT)
        .replace('】', "】\n\n")
        .replace('。', "。\n\n")
}

pub fn build_report(request: &ExportRequest) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SENTIMENT_SHEET)?;
    for (col, (name, width)) in SENTIMENT_COLUMNS.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *name, &header)?;
        sheet.set_column_width(col, *width)?;
    }

    for (idx, row) in request.table_data.iter().enumerate() {
        let line = idx as u32 + 1;
        if let Some(created_at) = row.created_at.as_deref() {
            sheet.write_string(line, 0, format_created_at(created_at))?;
        }
        if let Some(title) = row.title.as_deref() {
            sheet.write_string(line, 1, title)?;
        }
        if let Some(body) = row.body.as_deref() {
            sheet.write_string(line, 2, body)?;
        }
        if let Some(likes) = row.likes {
            sheet.write_number(line, 3, likes as f64)?;
        }
        if let Some(comment) = row.manager_comment.as_deref() {
            sheet.write_string(line, 4, comment)?;
        }
    }

    let wrap = Format::new().set_text_wrap();
    let sheet = workbook.add_worksheet();
    sheet.set_name(COMMENT_SHEET)?;
    sheet.write_string_with_format(0, 0, COMMENT_SHEET, &header)?;
    sheet.write_string_with_format(0, 1, "Word Cloud", &header)?;
    sheet.write_string_with_format(
        1,
        0,
        format_voices_comment(request.voices_comment.as_deref()),
        &wrap,
    )?;
    sheet.set_row_height(1, 310)?;
    sheet.set_column_width(0, 60)?;
    sheet.set_column_width(1, 80)?;

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_at_formats() {
        assert_eq!(format_created_at("2024-04-07T15:01:15.549112Z"), "2024/04/07");
        assert_eq!(format_created_at("2024-04-07T15:01:15"), "2024/04/07");
        assert_eq!(format_created_at("2024-04-07 15:01:15.5"), "2024/04/07");
        assert_eq!(format_created_at("2024-04-07"), "2024/04/07");
        assert_eq!(format_created_at("last week"), "last week");
    }

    #[test]
    fn comment_gets_paragraph_breaks() {
        assert_eq!(
            format_voices_comment(Some("【概要】残業が多い。休みが少ない。")),
            "【概要】\n\n残業が多い。\n\n休みが少ない。\n\n"
        );
    }

    #[test]
    fn missing_comment_uses_default() {
        assert_eq!(format_voices_comment(None), "No comment provided");
    }

    #[test]
    fn request_uses_frontend_field_names() {
        let request: ExportRequest = serde_json::from_value(serde_json::json!({
            "tableData": [
                { "created_at": "2024-04-07", "title": "t", "body": "b", "likes": 3, "manager_comment": null, "emotion": 2 }
            ],
            "voicesComment": "ok"
        }))
        .unwrap();

        assert_eq!(request.table_data.len(), 1);
        assert_eq!(request.table_data[0].likes, Some(3));
        assert_eq!(request.voices_comment.as_deref(), Some("ok"));
    }

    #[test]
    fn workbook_is_a_zip_archive() {
        let request = ExportRequest {
            table_data: vec![ExportRow {
                created_at: Some("2024-04-07T10:00:00Z".to_string()),
                title: Some("Overtime".to_string()),
                body: Some("Too much overtime lately".to_string()),
                likes: Some(4),
                manager_comment: None,
            }],
            voices_comment: None,
        };

        let bytes = build_report(&request).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
