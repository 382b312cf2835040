//! HTML rendering of result tables for notification bodies.
//!
//! The output format is a legacy mail-client-friendly fragment: uppercase
//! table tags, inline colors, `&nbsp;` placeholders for blank cells.
//! Downstream alert consumers parse this shape, so column and row order
//! always match the source result set and the markup never changes.

use serde::{Deserialize, Serialize};

use crate::models::ResultTable;

/// Background color shared by the alternating-row presets.
const ALTERNATE_ROW_COLOR: &str = "F2F2F2";

/// Named color presets selectable per test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateScheme {
    /// Red header background with white font
    #[default]
    Default,
    /// Yellow header with black font
    Yellow,
    /// Red header with white font, alternating row colors
    RedReport,
    /// Yellow header with black font, alternating row colors
    YellowReport,
}

impl TemplateScheme {
    /// Resolves the scheme into its immutable template value.
    #[must_use]
    pub fn template(self) -> ReportTemplate {
        match self {
            Self::Default => ReportTemplate {
                header_font_color: "white".to_string(),
                header_background_color: "FF0000".to_string(),
                use_alternate_row_colors: false,
                alternate_row_color: String::new(),
            },
            Self::Yellow => ReportTemplate {
                header_font_color: "black".to_string(),
                header_background_color: "FFFF00".to_string(),
                use_alternate_row_colors: false,
                alternate_row_color: String::new(),
            },
            Self::RedReport => ReportTemplate {
                header_font_color: "white".to_string(),
                header_background_color: "FF0000".to_string(),
                use_alternate_row_colors: true,
                alternate_row_color: ALTERNATE_ROW_COLOR.to_string(),
            },
            Self::YellowReport => ReportTemplate {
                header_font_color: "black".to_string(),
                header_background_color: "FFFF00".to_string(),
                use_alternate_row_colors: true,
                alternate_row_color: ALTERNATE_ROW_COLOR.to_string(),
            },
        }
    }
}

/// Immutable color/styling value applied when rendering a result table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTemplate {
    /// Header font color
    pub header_font_color: String,
    /// Header background color
    pub header_background_color: String,
    /// Whether every other body row gets the alternate background
    pub use_alternate_row_colors: bool,
    /// Background color for alternating rows
    pub alternate_row_color: String,
}

impl Default for ReportTemplate {
    fn default() -> Self {
        TemplateScheme::Default.template()
    }
}

/// Renders a result table into an HTML fragment using the given template.
///
/// Produces a caption with the total row count, a header row styled from
/// the template, and one centered body row per source row. Blank or
/// whitespace-only values render as `&nbsp;` rather than an empty tag body.
/// When the template requests it, even body rows (1-indexed) carry the
/// alternate background color.
#[must_use]
pub fn render_html_table(table: &ResultTable, template: &ReportTemplate) -> String {
    let mut html = String::new();

    html.push_str("<caption> Total Rows = ");
    html.push_str(&table.row_count().to_string());
    html.push_str("  </caption>");

    html.push_str("<TABLE BORDER=1>");
    html.push_str("<TR ALIGN='CENTER'>");

    // First the column names.
    for column in &table.columns {
        html.push_str("<TD bgcolor=\"");
        html.push_str(&template.header_background_color);
        html.push_str("\"><B>");
        html.push_str("<font color=\"");
        html.push_str(&template.header_font_color);
        html.push_str("\">");
        html.push_str(column);
        html.push_str("</font></B></TD>");
    }

    html.push_str("</TR>");

    // Next, the row values.
    for (index, row) in table.rows.iter().enumerate() {
        let row_number = index + 1;

        if template.use_alternate_row_colors && row_number % 2 == 0 {
            html.push_str("<TR ALIGN='CENTER' bgcolor=\"");
            html.push_str(&template.alternate_row_color);
            html.push_str("\">");
        } else {
            html.push_str("<TR ALIGN='CENTER'>");
        }

        for cell in row {
            html.push_str("<TD>");
            if cell.trim().is_empty() {
                html.push_str("&nbsp;");
            } else {
                html.push_str(cell);
            }
            html.push_str("</TD>");
        }

        html.push_str("</TR>");
    }

    html.push_str("</TABLE>");

    html
}
