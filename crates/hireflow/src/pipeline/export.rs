use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::domain::Candidate;

pub const CSV_HEADERS: [&str; 10] = [
    "Rank",
    "Name",
    "Email",
    "Phone",
    "Score",
    "Match Level",
    "Skills",
    "Matched Skills",
    "Experience",
    "Education",
];

/// A rendered CSV document ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
    pub rows: usize,
}

impl CsvExport {
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, self.content.as_bytes())?;
        Ok(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no candidates to export")]
    Empty,
    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write CSV: {0}")]
    Io(#[from] std::io::Error),
}

/// Render `candidates` in the given order; `Rank` is the 1-based position.
///
/// Every text field is quoted, even when it looks numeric, with embedded quotes doubled
/// and line breaks flattened to spaces. `Rank` and `Score` stay bare.
pub fn candidates_to_csv(candidates: &[Candidate]) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADERS.iter().map(|header| quoted(header)))?;

    for (index, candidate) in candidates.iter().enumerate() {
        let record = [
            (index + 1).to_string(),
            quoted(&candidate.name),
            quoted(&candidate.email),
            quoted(candidate.phone.as_deref().unwrap_or_default()),
            format!("{:.1}", candidate.score),
            quoted(candidate.match_level().label()),
            quoted(&candidate.skills.join(", ")),
            quoted(&candidate.skill_matches.join(", ")),
            quoted(candidate.experience.as_deref().unwrap_or_default()),
            quoted(candidate.education.as_deref().unwrap_or_default()),
        ];
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `<sanitized-job-title-or-"candidates">_candidates_<YYYY-MM-DD>.csv`
pub fn export_filename(job_title: Option<&str>, date: NaiveDate) -> String {
    let prefix = job_title
        .map(|title| {
            title
                .trim()
                .chars()
                .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
                .collect::<String>()
        })
        .filter(|sanitized| !sanitized.is_empty())
        .unwrap_or_else(|| "candidates".to_string());
    format!("{prefix}_candidates_{}.csv", date.format("%Y-%m-%d"))
}

pub fn build_export(
    candidates: &[Candidate],
    job_title: Option<&str>,
    date: NaiveDate,
) -> Result<CsvExport, ExportError> {
    if candidates.is_empty() {
        return Err(ExportError::Empty);
    }

    Ok(CsvExport {
        filename: export_filename(job_title, date),
        content: candidates_to_csv(candidates)?,
        rows: candidates.len(),
    })
}

/// The writer runs with `QuoteStyle::Never`, so quoting happens here.
fn quoted(value: &str) -> String {
    let flat = value.replace("\r\n", " ").replace(['\n', '\r'], " ");
    format!("\"{}\"", flat.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::CandidateId;

    fn candidate(id: &str, name: &str, score: f64) -> Candidate {
        Candidate {
            id: CandidateId::new(id),
            name: name.to_string(),
            email: format!("{id}@example.com"),
            phone: Some("+1 555 0100".to_string()),
            skills: vec!["Rust".to_string(), "Postgres".to_string()],
            education: Some("BSc Computer Science".to_string()),
            experience: Some("Led the payments team\nfor three years".to_string()),
            score,
            skill_matches: vec!["Rust".to_string()],
            job_id: None,
            job_title: None,
        }
    }

    #[test]
    fn csv_parses_back_to_ranked_rows() {
        let content = candidates_to_csv(&[
            candidate("c1", "Grace \"Amazing\" Hopper", 91.0),
            candidate("c2", "Alan Turing", 58.5),
        ])
        .expect("csv renders");

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let headers = reader.headers().expect("header row").clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADERS.to_vec());

        let rows: Vec<csv::StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .expect("rows parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "1");
        assert_eq!(&rows[0][1], "Grace \"Amazing\" Hopper");
        assert_eq!(rows[0][4].parse::<f64>().expect("numeric score"), 91.0);
        assert_eq!(&rows[0][5], "Excellent");
        assert_eq!(&rows[0][8], "Led the payments team for three years");
        assert_eq!(&rows[1][0], "2");
        assert_eq!(&rows[1][5], "Fair");
    }

    #[test]
    fn text_fields_are_quoted_and_rank_is_bare() {
        let content = candidates_to_csv(&[candidate("c1", "Ada", 80.0)]).expect("csv renders");
        let data_row = content.lines().nth(1).expect("data row");
        assert!(data_row.starts_with("1,\"Ada\",\"c1@example.com\""));
        assert!(!content.contains('\r'));
    }

    #[test]
    fn numeric_looking_text_is_still_quoted() {
        let mut row = candidate("c1", "1234", 80.0);
        row.phone = Some("5550100".to_string());
        row.education = Some("NaN".to_string());

        let content = candidates_to_csv(&[row]).expect("csv renders");
        let data_row = content.lines().nth(1).expect("data row");

        assert!(data_row
            .starts_with("1,\"1234\",\"c1@example.com\",\"5550100\",80.0,\"Excellent\","));
        assert!(data_row.ends_with(",\"NaN\""));
        assert!(content.starts_with("\"Rank\",\"Name\","));

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let record = reader
            .records()
            .next()
            .expect("data row")
            .expect("row parses");
        assert_eq!(&record[1], "1234");
        assert_eq!(&record[3], "5550100");
    }

    #[test]
    fn filename_sanitizes_title_and_falls_back() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date");
        assert_eq!(
            export_filename(Some("Senior Backend / Platform"), date),
            "Senior_Backend___Platform_candidates_2026-10-18.csv"
        );
        assert_eq!(
            export_filename(None, date),
            "candidates_candidates_2026-10-18.csv"
        );
        assert_eq!(
            export_filename(Some("   "), date),
            "candidates_candidates_2026-10-18.csv"
        );
    }

    #[test]
    fn empty_export_is_reported() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date");
        assert!(matches!(
            build_export(&[], None, date),
            Err(ExportError::Empty)
        ));
    }
}
