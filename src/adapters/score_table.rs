use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use crate::adapters::{element_text, has_class, row_cells, Document, DocumentError, SourceAdapter};
use crate::roster::{Phase, ScoreRow};
use crate::ruleset::{Ruleset, ScoreColumns};

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("static selector"));
static TABLE_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("static selector"));

enum RowKind {
    Header(String),
    Data { competitor: String, score: f64 },
    Skip,
}

/// Reads results tables where division headers precede the rows they apply to.
pub struct ScoreTableAdapter {
    columns: ScoreColumns,
    unknown_class: String,
}

impl ScoreTableAdapter {
    pub fn new(rules: &Ruleset) -> Self {
        Self {
            columns: rules.score_columns.clone(),
            unknown_class: rules.unknown_class.clone(),
        }
    }

    fn classify(&self, tr: ElementRef) -> RowKind {
        let cells = row_cells(tr);
        let header = |el: &ElementRef| {
            let text = element_text(*el);
            if text.is_empty() { RowKind::Skip } else { RowKind::Header(text) }
        };
        if let Some(marker) = cells.iter().find(|c| has_class(**c, &self.columns.division_marker)) {
            return header(marker)
        }
        let headings: Vec<_> = cells.iter().filter(|c| c.value().name() == "th").collect();
        if !headings.is_empty() {
            return match headings.as_slice() {
                [single] => header(*single),
                // column captions
                _ => RowKind::Skip,
            }
        }
        if let [single] = cells.as_slice() {
            return header(single)
        }
        if cells.len() < self.columns.min_cells {
            return RowKind::Skip
        }
        let text = |col: usize| cells.get(col).map(|cell| element_text(*cell)).unwrap_or_default();
        let competitor = text(self.columns.name_col);
        if competitor.is_empty() {
            return RowKind::Skip
        }
        match self.parse_score(&text(self.columns.score_col)) {
            Some(score) => RowKind::Data { competitor, score },
            None => RowKind::Skip,
        }
    }

    fn parse_score(&self, cell: &str) -> Option<f64> {
        let mut cell = cell.to_uppercase();
        for noise in &self.columns.score_noise {
            cell = cell.replace(&noise.to_uppercase(), "");
        }
        cell.trim().parse::<f64>().ok().filter(|score| score.is_finite())
    }
}

impl SourceAdapter for ScoreTableAdapter {
    type Record = ScoreRow;

    fn name(&self) -> &'static str {
        "score table adapter"
    }

    fn records<'d>(&'d self, doc: &'d Document) -> Result<Box<dyn Iterator<Item = ScoreRow> + 'd>, DocumentError> {
        let html = doc.html(self.name())?;
        let rows = html.select(&TABLE).flat_map(move |table| {
            let mut current_class = self.unknown_class.clone();
            table.select(&TABLE_ROW).filter_map(move |tr| match self.classify(tr) {
                RowKind::Header(class) => {
                    current_class = class;
                    None
                }
                RowKind::Data { competitor, score } => Some(ScoreRow {
                    competitor,
                    class_raw: current_class.clone(),
                    phase: Phase::from_class_label(&current_class),
                    score,
                }),
                RowKind::Skip => None,
            })
        });
        Ok(Box::new(rows))
    }
}
