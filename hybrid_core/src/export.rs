//! CSV export of the program.
//!
//! One row per (week, day, exercise, set). Every field is quoted and
//! internal quotes are doubled, so exercise names survive spreadsheet
//! imports untouched.

use crate::{Day, ProgramWeek, Result};
use std::io::Write;
use std::path::Path;

/// Header row of the program export
pub const CSV_HEADER: [&str; 9] = [
    "Semaine", "Jour", "Exercice", "Série", "Reps", "Poids", "Repos", "Tempo", "RPE",
];

/// Write the program as CSV, returning the number of data rows written
pub fn write_program_csv<W: Write>(weeks: &[ProgramWeek], out: W) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    writer.write_record(CSV_HEADER)?;

    let mut rows = 0;
    for week in weeks {
        for day in Day::ALL {
            let Some(session) = week.session(day) else {
                continue;
            };
            for exercise in &session.exercises {
                for set in &exercise.sets {
                    writer.write_record([
                        week.week_number.to_string(),
                        day.to_string(),
                        exercise.name.clone(),
                        set.series_index.to_string(),
                        set.target_reps.to_string(),
                        set.target_weight_kg.to_string(),
                        set.rest_seconds.to_string(),
                        set.tempo.clone(),
                        set.target_rpe.to_string(),
                    ])?;
                    rows += 1;
                }
            }
        }
    }

    writer.flush()?;
    tracing::debug!("Wrote {} program rows as CSV", rows);
    Ok(rows)
}

/// The program as CSV bytes
pub fn program_csv(weeks: &[ProgramWeek]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_program_csv(weeks, &mut buf)?;
    Ok(buf)
}

/// Write the program CSV to a file, creating parent directories
pub fn export_program_csv(weeks: &[ProgramWeek], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let rows = write_program_csv(weeks, std::io::BufWriter::new(file))?;
    tracing::info!("Exported {} rows to {:?}", rows, path);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::standard_weeks;

    fn csv_text(weeks: &[ProgramWeek]) -> String {
        String::from_utf8(program_csv(weeks).unwrap()).unwrap()
    }

    #[test]
    fn test_header_and_first_row() {
        let text = csv_text(&standard_weeks());
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            r#""Semaine","Jour","Exercice","Série","Reps","Poids","Repos","Tempo","RPE""#
        );
        assert_eq!(
            lines.next().unwrap(),
            r#""1","Sunday","Trap Bar Deadlift","1","5","20","120","2-0-1","7""#
        );
        assert_eq!(
            lines.next().unwrap(),
            r#""1","Sunday","Trap Bar Deadlift","2","5","22","120","2-0-1","7.5""#
        );
    }

    #[test]
    fn test_row_count() {
        // 26 weeks × 3 days × 22 exercises × 3 sets
        let rows = write_program_csv(&standard_weeks(), Vec::new()).unwrap();
        assert_eq!(rows, 26 * 3 * 22 * 3);
    }

    #[test]
    fn test_quotes_are_doubled() {
        let mut weeks = standard_weeks();
        weeks.truncate(1);
        let session = weeks[0].sessions.get_mut(&Day::Sunday).unwrap();
        session.exercises[0].name = "The \"Big\" Lift".into();

        let text = csv_text(&weeks);
        assert!(text.contains(r#""The ""Big"" Lift""#));
    }

    #[test]
    fn test_export_to_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("out").join("program.csv");
        let rows = export_program_csv(&standard_weeks()[..2], &path).unwrap();
        assert_eq!(rows, 2 * 3 * 22 * 3);

        let reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.into_records().count(), rows);
    }
}
