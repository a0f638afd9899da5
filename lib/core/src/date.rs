use crate::{Error, Result};
use chrono::NaiveDate;

/// Format accepted for reported accident dates.
pub const REPORT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Parse a `DD/MM/YYYY` report date.
///
/// A blank input means the date is unknown and yields `Ok(None)`. Anything
/// else must be a real calendar date in that exact format.
pub fn parse_report_date(input: &str) -> Result<Option<NaiveDate>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // chrono accepts single-digit day/month for %d/%m; the report format
    // requires both digits and a four-digit year.
    let well_shaped = trimmed.len() == 10
        && trimmed
            .char_indices()
            .all(|(i, c)| if i == 2 || i == 5 { c == '/' } else { c.is_ascii_digit() });
    if !well_shaped {
        return Err(Error::InvalidDateFormat(input.to_string()));
    }

    NaiveDate::parse_from_str(trimmed, REPORT_DATE_FORMAT)
        .map(Some)
        .map_err(|_| Error::InvalidDateFormat(input.to_string()))
}

/// Render a date the way reports submit it.
pub fn format_report_date(date: &NaiveDate) -> String {
    date.format(REPORT_DATE_FORMAT).to_string()
}
