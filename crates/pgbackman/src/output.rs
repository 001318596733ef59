/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Result sets and their three renderings: TABLE, CSV, JSON.
//!
//! Column order is part of the contract: every rendering preserves the
//! insertion order of the columns, so the JSON variant is assembled by hand
//! rather than through a map type.

use std::fmt;
use std::str::FromStr;

use comfy_table::presets::ASCII_FULL_CONDENSED;
use comfy_table::Table;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Table => "table",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(ValidationError::OutputFormat(other.to_string())),
        }
    }
}

/// An ordered set of columns plus rows of stringified values.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn new<C: Into<String>>(columns: Vec<C>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<V: Into<String>>(&mut self, row: Vec<V>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => self.render_table(),
            OutputFormat::Csv => self.render_csv(),
            OutputFormat::Json => self.render_json(),
        }
    }

    fn render_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(ASCII_FULL_CONDENSED);
        table.set_header(self.columns.clone());
        for row in &self.rows {
            table.add_row(row.clone());
        }
        table.to_string()
    }

    fn render_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&csv_line(&self.columns));
        for row in &self.rows {
            out.push_str(&csv_line(row));
        }
        out
    }

    fn render_json(&self) -> String {
        let mut out = String::from("[");
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push('{');
            for (j, (column, value)) in self.columns.iter().zip(row).enumerate() {
                if j > 0 {
                    out.push(',');
                }
                // serde_json escapes both halves; order stays ours.
                out.push_str(&serde_json::Value::from(column.as_str()).to_string());
                out.push(':');
                out.push_str(&serde_json::Value::from(value.as_str()).to_string());
            }
            out.push('}');
        }
        out.push(']');
        out
    }
}

fn csv_line(fields: &[String]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&csv_escape(field));
    }
    line.push('\n');
    line
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        let mut rs = ResultSet::new(vec!["SrvID", "FQDN", "Remarks"]);
        rs.push_row(vec!["1", "bkp01.example.org", "primary"]);
        rs.push_row(vec!["2", "bkp02.example.org", "has, comma"]);
        rs
    }

    #[test]
    fn csv_escapes_embedded_commas_and_quotes() {
        let mut rs = ResultSet::new(vec!["a"]);
        rs.push_row(vec!["plain"]);
        rs.push_row(vec!["with, comma"]);
        rs.push_row(vec!["with \"quote\""]);

        let csv = rs.render(OutputFormat::Csv);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "plain");
        assert_eq!(lines[2], "\"with, comma\"");
        assert_eq!(lines[3], "\"with \"\"quote\"\"\"");
    }

    #[test]
    fn json_preserves_column_order() {
        let json = sample().render(OutputFormat::Json);
        let srv = json.find("\"SrvID\"").unwrap();
        let fqdn = json.find("\"FQDN\"").unwrap();
        let remarks = json.find("\"Remarks\"").unwrap();
        assert!(srv < fqdn && fqdn < remarks);

        // Still valid JSON.
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["FQDN"], "bkp01.example.org");
    }

    #[test]
    fn table_contains_headers_and_values() {
        let table = sample().render(OutputFormat::Table);
        assert!(table.contains("SrvID"));
        assert!(table.contains("bkp01.example.org"));
    }

    #[test]
    fn output_format_parses() {
        assert_eq!("TABLE".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
