//! Plain-text tables.

use std::collections::{BTreeMap, HashMap};

/// One table row, keyed by column.
pub type Row = BTreeMap<String, String>;

type Formatter = Box<dyn Fn(&str) -> String>;

/// Renders a list of rows as an aligned text table.
///
/// Column widths fit the widest of the title and every cell. Titles are
/// centred, cells are left aligned. An optional caption is centred over
/// the whole table and underlined with `=`.
pub struct DataSetRenderer {
    order: Vec<String>,
    titles: HashMap<String, String>,
    formatters: HashMap<String, Formatter>,
    caption: Option<String>,
    separator: String,
    header_separator: bool,
    empty: String,
}

impl Default for DataSetRenderer {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            titles: HashMap::new(),
            formatters: HashMap::new(),
            caption: None,
            separator: " ".to_string(),
            header_separator: false,
            empty: "There is no data to display".to_string(),
        }
    }
}

impl DataSetRenderer {
    /// A renderer with default settings; columns come out sorted.
    pub fn new() -> Self {
        Self::default()
    }

    /// The boxed style used by every listing command.
    pub fn pretty() -> Self {
        Self::new().with_separator(" | ").with_header_separator(true)
    }

    /// Shows only `columns`, in this order.
    pub fn with_order<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the title shown for `column`.
    pub fn with_title(mut self, column: &str, title: &str) -> Self {
        self.titles.insert(column.to_string(), title.to_string());
        self
    }

    /// Rewrites every cell of `column` through `format`.
    pub fn with_formatter(mut self, column: &str, format: impl Fn(&str) -> String + 'static) -> Self {
        self.formatters.insert(column.to_string(), Box::new(format));
        self
    }

    /// Sets the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Sets the column separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Draws a `-` line under the column titles.
    pub fn with_header_separator(mut self, enabled: bool) -> Self {
        self.header_separator = enabled;
        self
    }

    /// Sets the text printed for an empty dataset.
    pub fn with_empty(mut self, empty: impl Into<String>) -> Self {
        self.empty = empty.into();
        self
    }

    fn title<'a>(&'a self, column: &'a str) -> &'a str {
        self.titles.get(column).map_or(column, String::as_str)
    }

    /// Renders `rows`, one line per output line, each ending in `\n`.
    pub fn render(&self, rows: &[Row]) -> String {
        let Some(first) = rows.first() else {
            return format!("{}\n", self.empty);
        };
        let columns: Vec<&str> = if self.order.is_empty() {
            first.keys().map(String::as_str).collect()
        } else {
            self.order.iter().map(String::as_str).collect()
        };

        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        let value = row.get(*column).map_or("", String::as_str);
                        match self.formatters.get(*column) {
                            Some(format) => format(value),
                            None => value.to_string(),
                        }
                    })
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(self.title(column).chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let total = widths.iter().sum::<usize>()
            + self.separator.chars().count() * columns.len().saturating_sub(1);

        let mut out = String::new();
        if let Some(caption) = &self.caption {
            out.push_str(&format!("{caption:^total$}\n"));
            out.push_str(&"=".repeat(total));
            out.push('\n');
        }
        let header: Vec<String> = columns
            .iter()
            .zip(widths.iter().copied())
            .map(|(column, width)| format!("{:^width$}", self.title(column)))
            .collect();
        out.push_str(&header.join(&self.separator));
        out.push('\n');
        if self.header_separator {
            out.push_str(&"-".repeat(total));
            out.push('\n');
        }
        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(widths.iter().copied())
                .map(|(cell, width)| format!("{cell:width$}"))
                .collect();
            out.push_str(&line.join(&self.separator));
            out.push('\n');
        }
        out
    }
}

/// Builds a [`Row`] from `(column, value)` pairs.
pub fn row<I, K, V>(cells: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    cells.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
