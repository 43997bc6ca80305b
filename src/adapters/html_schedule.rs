use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use crate::adapters::{element_text, has_class, row_cells, Document, DocumentError, SourceAdapter};
use crate::roster::ScheduleRow;
use crate::ruleset::{Ruleset, ScheduleColumns};

static TABLE_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("static selector"));
static SCHEDULE_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse("div.schedule-row").expect("static selector"));
static BLOCK_TIME: Lazy<Selector> = Lazy::new(|| Selector::parse(".schedule-row__time").expect("static selector"));
static BLOCK_NAME: Lazy<Selector> = Lazy::new(|| Selector::parse(".schedule-row__name").expect("static selector"));
static BLOCK_CLASS: Lazy<Selector> = Lazy::new(|| Selector::parse(".schedule-row__initials").expect("static selector"));

fn data_cells(tr: ElementRef, min_cells: usize) -> Option<Vec<ElementRef>> {
    let cells: Vec<_> = row_cells(tr).into_iter()
        .filter(|cell| cell.value().name() == "td")
        .collect();
    (cells.len() >= min_cells).then_some(cells)
}

/// Reads published schedule pages, either `<table>` rows or `div.schedule-row` blocks.
pub struct HtmlScheduleAdapter {
    columns: ScheduleColumns,
    control_tokens: Vec<String>,
}

impl HtmlScheduleAdapter {
    pub fn new(rules: &Ruleset) -> Self {
        Self {
            columns: rules.schedule_columns.clone(),
            control_tokens: rules.control_tokens.clone(),
        }
    }

    fn is_control_row(&self, name: &str) -> bool {
        self.control_tokens.iter().any(|token| name.contains(token.as_str()))
    }

    fn make_row(&self, name: String, class_raw: String, time: String) -> Option<ScheduleRow> {
        if name.is_empty() || class_raw.is_empty() || self.is_control_row(&name) {
            return None
        }
        Some(ScheduleRow { competitor: name, class_raw, time })
    }

    fn table_row(&self, tr: ElementRef) -> Option<ScheduleRow> {
        let cells = data_cells(tr, self.columns.min_cells)?;
        let text = |col: usize| cells.get(col).map(|cell| element_text(*cell)).unwrap_or_default();
        self.make_row(text(self.columns.name_col), text(self.columns.class_col), text(self.columns.time_col))
    }

    fn block_row(&self, block: ElementRef) -> Option<ScheduleRow> {
        if has_class(block, "schedule-row--custom") {
            return None
        }
        let text = |selector: &Selector| block.select(selector).next().map(element_text).unwrap_or_default();
        self.make_row(text(&BLOCK_NAME), text(&BLOCK_CLASS), text(&BLOCK_TIME))
    }
}

impl SourceAdapter for HtmlScheduleAdapter {
    type Record = ScheduleRow;

    fn name(&self) -> &'static str {
        "HTML schedule adapter"
    }

    fn records<'d>(&'d self, doc: &'d Document) -> Result<Box<dyn Iterator<Item = ScheduleRow> + 'd>, DocumentError> {
        let html = doc.html(self.name())?;
        let rows = html.select(&TABLE_ROW).filter_map(move |tr| self.table_row(tr));
        let blocks = html.select(&SCHEDULE_BLOCK).filter_map(move |block| self.block_row(block));
        Ok(Box::new(rows.chain(blocks)))
    }
}

/// Finals schedules are read for their class column only; performer cells are often
/// still blank when the finals order is published.
pub struct HtmlFinalsAdapter {
    columns: ScheduleColumns,
    control_tokens: Vec<String>,
}

impl HtmlFinalsAdapter {
    pub fn new(rules: &Ruleset) -> Self {
        Self {
            columns: rules.schedule_columns.clone(),
            control_tokens: rules.control_tokens.clone(),
        }
    }

    fn class_label(&self, label: String) -> Option<String> {
        if !label.chars().any(char::is_alphanumeric) {
            return None
        }
        if self.control_tokens.iter().any(|token| label.contains(token.as_str())) {
            return None
        }
        Some(label)
    }

    fn table_label(&self, tr: ElementRef) -> Option<String> {
        let cells = data_cells(tr, self.columns.min_cells)?;
        self.class_label(element_text(*cells.get(self.columns.class_col)?))
    }

    fn block_label(&self, block: ElementRef) -> Option<String> {
        if has_class(block, "schedule-row--custom") {
            return None
        }
        self.class_label(block.select(&BLOCK_CLASS).next().map(element_text)?)
    }
}

impl SourceAdapter for HtmlFinalsAdapter {
    type Record = String;

    fn name(&self) -> &'static str {
        "HTML finals adapter"
    }

    fn records<'d>(&'d self, doc: &'d Document) -> Result<Box<dyn Iterator<Item = String> + 'd>, DocumentError> {
        let html = doc.html(self.name())?;
        let rows = html.select(&TABLE_ROW).filter_map(move |tr| self.table_label(tr));
        let blocks = html.select(&SCHEDULE_BLOCK).filter_map(move |block| self.block_label(block));
        Ok(Box::new(rows.chain(blocks)))
    }
}
