//! CSV export of finalized audits: one row per audit, one column per rubric question.

use chrono::NaiveDate;

use crate::audit::record::FinalizedAuditRecord;
use crate::audit::rubric::Rubric;
use crate::core::error::AuditError;
use crate::core::time::{DATE_FORMAT, TIME_FORMAT};

pub const STATIC_HEADERS: [&str; 8] = [
    "Folio",
    "Fecha",
    "Hora",
    "Tienda",
    "Gerente",
    "Auditor",
    "Puntaje Total",
    "Estatus",
];

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn join_row<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| quote(v.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn header_row(rubric: &Rubric) -> String {
    let questions = rubric
        .questions()
        .map(|q| format!("{} ({})", q.id, q.category));
    join_row(
        STATIC_HEADERS
            .iter()
            .map(|h| h.to_string())
            .chain(questions),
    )
}

pub fn record_row(record: &FinalizedAuditRecord, rubric: &Rubric) -> String {
    let fixed = [
        record.folio().to_string(),
        record.date().format(DATE_FORMAT).to_string(),
        record.time().format(TIME_FORMAT).to_string(),
        record.store().name.clone(),
        record.manager().name.clone(),
        record.auditor().name.clone(),
        record.total_score().to_string(),
        record.status().to_string(),
    ];
    let scores = rubric.questions().map(|q| {
        record
            .answers()
            .get(&q.id)
            .map(|a| a.score)
            .unwrap_or(0)
            .to_string()
    });
    join_row(fixed.into_iter().chain(scores))
}

/// Header plus one row per record, newline separated. An empty list is rejected.
pub fn to_csv(records: &[FinalizedAuditRecord], rubric: &Rubric) -> Result<String, AuditError> {
    if records.is_empty() {
        return Err(AuditError::Validation("no records to export".to_string()));
    }
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(header_row(rubric));
    lines.extend(records.iter().map(|r| record_row(r, rubric)));
    Ok(lines.join("\n"))
}

/// `<prefix>_<YYYY-MM-DD>.csv`
pub fn export_file_name(prefix: &str, today: NaiveDate) -> String {
    format!("{}_{}.csv", prefix, today.format(DATE_FORMAT))
}
