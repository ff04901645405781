use chrono::NaiveDate;
use rust_decimal::Decimal;
use spendsort_core::{Direction, Money, Transaction, TransactionBatch, TransactionId};
use std::fmt;
use std::io::Read;
use std::str::FromStr;
use thiserror::Error;

/// The only accepted date layout, e.g. `05 Jan 2024`. No fallbacks.
pub const DATE_FORMAT: &str = "%d %b %Y";

/// A required statement column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Date,
    Details,
    Amount,
    Direction,
}

impl Field {
    /// Header name as it appears in the CSV.
    pub fn column(self) -> &'static str {
        match self {
            Field::Date => "Date",
            Field::Details => "Details",
            Field::Amount => "Amount",
            Field::Direction => "Debit/Credit",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(Field),
    #[error("Row {row} has no {field} value")]
    MissingValue { field: Field, row: usize },
    #[error("Invalid {field} on row {row}: {value:?}")]
    InvalidField {
        field: Field,
        row: usize,
        value: String,
    },
}

impl ParseError {
    /// The column the failure is attributed to, if any.
    pub fn field(&self) -> Option<Field> {
        match self {
            ParseError::Csv(_) => None,
            ParseError::MissingColumn(field)
            | ParseError::MissingValue { field, .. }
            | ParseError::InvalidField { field, .. } => Some(*field),
        }
    }
}

/// Positions of the required columns within a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    date: usize,
    details: usize,
    amount: usize,
    direction: usize,
}

impl Columns {
    /// Header names are trimmed before lookup; extra columns are ignored.
    fn resolve<I, S>(header: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = header
            .into_iter()
            .map(|h| h.as_ref().trim().to_string())
            .collect();
        let find = |field: Field| {
            names
                .iter()
                .position(|n| n == field.column())
                .ok_or(ParseError::MissingColumn(field))
        };
        Ok(Columns {
            date: find(Field::Date)?,
            details: find(Field::Details)?,
            amount: find(Field::Amount)?,
            direction: find(Field::Direction)?,
        })
    }

    fn index(&self, field: Field) -> usize {
        match field {
            Field::Date => self.date,
            Field::Details => self.details,
            Field::Amount => self.amount,
            Field::Direction => self.direction,
        }
    }
}

pub struct StatementParser;

impl StatementParser {
    /// Parses a header row plus data rows already split into cells.
    pub fn parse_rows<H, S>(header: &[H], rows: &[Vec<S>]) -> Result<TransactionBatch, ParseError>
    where
        H: AsRef<str>,
        S: AsRef<str>,
    {
        let columns = Columns::resolve(header)?;
        let transactions = rows
            .iter()
            .enumerate()
            .map(|(position, row)| {
                build_transaction(&columns, position, |i| row.get(i).map(|c| c.as_ref()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(finish(transactions))
    }

    /// Parses comma-separated statement bytes with a header row.
    pub fn parse_csv<R: Read>(data: R) -> Result<TransactionBatch, ParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let columns = Columns::resolve(reader.headers()?.iter())?;

        let mut transactions = Vec::new();
        for (position, result) in reader.records().enumerate() {
            let record = result?;
            transactions.push(build_transaction(&columns, position, |i| record.get(i))?);
        }
        Ok(finish(transactions))
    }
}

fn finish(transactions: Vec<Transaction>) -> TransactionBatch {
    tracing::debug!(rows = transactions.len(), "parsed statement");
    TransactionBatch::new(transactions)
}

fn build_transaction<'a, F>(
    columns: &Columns,
    position: usize,
    cell: F,
) -> Result<Transaction, ParseError>
where
    F: Fn(usize) -> Option<&'a str>,
{
    let row = position + 1;
    let value = |field: Field| {
        cell(columns.index(field)).ok_or(ParseError::MissingValue { field, row })
    };
    let invalid = |field: Field, raw: &str| ParseError::InvalidField {
        field,
        row,
        value: raw.to_string(),
    };

    let raw_date = value(Field::Date)?;
    let date = parse_date(raw_date).ok_or_else(|| invalid(Field::Date, raw_date))?;

    let raw_amount = value(Field::Amount)?;
    let amount = parse_amount(raw_amount).ok_or_else(|| invalid(Field::Amount, raw_amount))?;

    let raw_direction = value(Field::Direction)?;
    let direction = Direction::from_str(raw_direction)
        .map_err(|_| invalid(Field::Direction, raw_direction))?;

    let details = value(Field::Details)?;

    Ok(Transaction::new(
        TransactionId(position),
        date,
        details,
        amount,
        direction,
    ))
}

/// Strict `%d %b %Y`; surrounding whitespace is tolerated, other layouts are not.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Thousands-separator commas are stripped before decimal parsing.
pub fn parse_amount(s: &str) -> Option<Money> {
    let cleaned = s.trim().replace(',', "");
    Decimal::from_str(&cleaned).ok().map(Money::from_decimal)
}

pub fn parse_rows<H, S>(header: &[H], rows: &[Vec<S>]) -> Result<TransactionBatch, ParseError>
where
    H: AsRef<str>,
    S: AsRef<str>,
{
    StatementParser::parse_rows(header, rows)
}

pub fn parse_csv<R: Read>(data: R) -> Result<TransactionBatch, ParseError> {
    StatementParser::parse_csv(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        Money::from_decimal(Decimal::from_str(s).unwrap())
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_plain() {
        assert_eq!(parse_amount("123.45"), Some(money("123.45")));
    }

    #[test]
    fn parse_amount_with_thousands_commas() {
        assert_eq!(parse_amount("1,234.56"), Some(money("1234.56")));
        assert_eq!(parse_amount("1,000,000"), Some(money("1000000")));
    }

    #[test]
    fn parse_amount_strips_every_comma() {
        // Commas are only ever thousands separators here.
        assert_eq!(parse_amount("15,00"), Some(money("1500")));
    }

    #[test]
    fn parse_amount_keeps_sub_cent_precision() {
        assert_eq!(parse_amount("0.125").unwrap().as_decimal().to_string(), "0.125");
    }

    #[test]
    fn sub_cent_amounts_add_up_exactly_in_totals() {
        let header = ["Date", "Details", "Amount", "Debit/Credit"];
        let rows = vec![
            vec!["05 Jan 2024", "Meter", "0.125", "Debit"],
            vec!["06 Jan 2024", "Meter", "0.125", "Debit"],
            vec!["07 Jan 2024", "Meter", "0.005", "Debit"],
        ];
        let batch = parse_rows(&header, &rows).unwrap();
        let totals = batch.category_totals();
        assert_eq!(
            totals.get("Uncategorized").unwrap().as_decimal().to_string(),
            "0.255"
        );
        assert_eq!(totals.total().as_decimal().to_string(), "0.255");
    }

    #[test]
    fn parse_amount_negative_and_padded() {
        assert_eq!(parse_amount("  -50.00 "), Some(money("-50")));
    }

    #[test]
    fn parse_amount_invalid() {
        assert_eq!(parse_amount("not_a_number"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("$12.00"), None);
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn parse_date_fixed_format() {
        assert_eq!(
            parse_date("05 Jan 2024"),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(
            parse_date("28 Feb 2023"),
            NaiveDate::from_ymd_opt(2023, 2, 28)
        );
    }

    #[test]
    fn parse_date_has_no_fallback() {
        assert_eq!(parse_date("2024-01-05"), None);
        assert_eq!(parse_date("01/05/2024"), None);
        assert_eq!(parse_date("31 Feb 2024"), None);
    }

    // ── full parse ────────────────────────────────────────────────────────────

    #[test]
    fn parse_csv_basic() {
        let data = b"Date,Details,Amount,Debit/Credit\n\
05 Jan 2024,Netflix,15.00,Debit\n\
06 Jan 2024,Salary,\"2,500.00\",Credit\n";
        let batch = parse_csv(data.as_ref()).unwrap();
        assert_eq!(batch.len(), 2);

        let first = batch.get(TransactionId(0)).unwrap();
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(first.details, "Netflix");
        assert_eq!(first.amount, money("15.00"));
        assert_eq!(first.direction, Direction::Debit);

        let second = batch.get(TransactionId(1)).unwrap();
        assert_eq!(second.amount, money("2500"));
        assert_eq!(second.direction, Direction::Credit);
    }

    #[test]
    fn parse_csv_initializes_every_category_to_uncategorized() {
        let data = b"Date,Details,Amount,Debit/Credit\n\
05 Jan 2024,A,1,Debit\n\
05 Jan 2024,B,2,Credit\n";
        let batch = parse_csv(data.as_ref()).unwrap();
        assert!(batch.iter().all(|t| t.is_uncategorized()));
    }

    #[test]
    fn parse_csv_trims_header_names_and_ignores_extra_columns() {
        let data = b" Date ,Reference,Details , Amount,Debit/Credit  ,Balance\n\
05 Jan 2024,R1,Tesco,42.30,Debit,100.00\n";
        let batch = parse_csv(data.as_ref()).unwrap();
        let tx = batch.get(TransactionId(0)).unwrap();
        assert_eq!(tx.details, "Tesco");
        assert_eq!(tx.amount, money("42.30"));
    }

    #[test]
    fn parse_csv_keeps_details_verbatim() {
        let data = b"Date,Details,Amount,Debit/Credit\n05 Jan 2024,  Coffee Shop ,3.50,Debit\n";
        let batch = parse_csv(data.as_ref()).unwrap();
        assert_eq!(batch.get(TransactionId(0)).unwrap().details, "  Coffee Shop ");
    }

    #[test]
    fn parse_csv_header_only_is_empty_batch() {
        let data = b"Date,Details,Amount,Debit/Credit\n";
        let batch = parse_csv(data.as_ref()).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn parse_csv_missing_column_fails_whole_parse() {
        let data = b"Date,Details,Amount\n05 Jan 2024,Netflix,15.00\n";
        let err = parse_csv(data.as_ref()).unwrap_err();
        assert!(matches!(err, ParseError::MissingColumn(Field::Direction)));
        assert_eq!(err.to_string(), "Missing required column: Debit/Credit");
    }

    #[test]
    fn parse_csv_empty_input_reports_missing_column() {
        let err = parse_csv(b"".as_ref()).unwrap_err();
        assert!(matches!(err, ParseError::MissingColumn(_)));
    }

    #[test]
    fn parse_csv_bad_date_names_date_field() {
        let data = b"Date,Details,Amount,Debit/Credit\n\
05 Jan 2024,Netflix,15.00,Debit\n\
2024-01-05,Spotify,9.99,Debit\n";
        let err = parse_csv(data.as_ref()).unwrap_err();
        assert_eq!(err.field(), Some(Field::Date));
        match err {
            ParseError::InvalidField { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "2024-01-05");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_csv_bad_amount_names_amount_field() {
        let data = b"Date,Details,Amount,Debit/Credit\n05 Jan 2024,Netflix,fifteen,Debit\n";
        let err = parse_csv(data.as_ref()).unwrap_err();
        assert_eq!(err.field(), Some(Field::Amount));
        assert_eq!(err.to_string(), "Invalid Amount on row 1: \"fifteen\"");
    }

    #[test]
    fn parse_csv_bad_direction_names_direction_field() {
        let data = b"Date,Details,Amount,Debit/Credit\n05 Jan 2024,Netflix,15.00,Transfer\n";
        let err = parse_csv(data.as_ref()).unwrap_err();
        assert_eq!(err.field(), Some(Field::Direction));
    }

    #[test]
    fn parse_csv_short_row_reports_missing_value() {
        let data = b"Date,Details,Amount,Debit/Credit\n05 Jan 2024,Netflix\n";
        let err = parse_csv(data.as_ref()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingValue { field: Field::Amount, row: 1 }
        ));
    }

    #[test]
    fn parse_rows_from_string_cells() {
        let header = ["Date", "Details", "Amount", "Debit/Credit "];
        let rows = vec![
            vec!["05 Jan 2024", "Netflix", "15.00", "Debit"],
            vec!["07 Jan 2024", "Refund", "1,200.50", "Credit"],
        ];
        let batch = parse_rows(&header, &rows).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.get(TransactionId(1)).unwrap().amount, money("1200.50"));
    }

    #[test]
    fn parse_rows_ids_follow_row_positions() {
        let header = ["Date", "Details", "Amount", "Debit/Credit"];
        let rows = vec![
            vec!["05 Jan 2024", "A", "1", "Debit"],
            vec!["05 Jan 2024", "B", "2", "Debit"],
            vec!["05 Jan 2024", "C", "3", "Credit"],
        ];
        let batch = parse_rows(&header, &rows).unwrap();
        let ids: Vec<_> = batch.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
