//! Fiscal period arithmetic: target months, cutoffs and month-column labels.
//!
//! The operating year runs April → March. Uploads carry a `_YYMM` suffix where
//! `YY` is the two-digit *fiscal* year, so January–March of fiscal year `YY`
//! fall in calendar year `2000 + YY + 1`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use regex::Regex;

// ── TargetMonth ───────────────────────────────────────────────────────────────

/// The calendar month an aggregation describes.
///
/// Stored as the first day of that month so every value is a valid date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetMonth(NaiveDate);

impl TargetMonth {
    /// Build from a calendar year and month (1–12).
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date - Days::new(u64::from(date.day0())))
    }

    /// Parse the store identifier form, e.g. `"2025-05"`.
    pub fn parse_id(id: &str) -> Option<Self> {
        let (year, month) = id.trim().split_once('-')?;
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// The month after this one.
    pub fn next(&self) -> Self {
        Self(self.0 + Months::new(1))
    }

    /// The month before this one.
    pub fn previous(&self) -> Self {
        Self(self.0 - Months::new(1))
    }

    /// Last calendar day of the preceding month: the as-of date for active
    /// enrollment.
    pub fn cutoff(&self) -> NaiveDate {
        self.0 - Days::new(1)
    }

    /// Store identifier, `"YYYY-MM"`.
    pub fn id(&self) -> String {
        self.0.format("%Y-%m").to_string()
    }

    /// The month-column label for this month, e.g. `5月`.
    pub fn label(&self) -> MonthLabel {
        MonthLabel(self.month())
    }
}

impl fmt::Display for TargetMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

// ── Filename parsing ──────────────────────────────────────────────────────────

/// Extract the target month from an upload's file name.
///
/// Looks for `_YYMM.` (exactly four digits between an underscore and a dot).
/// `YY` is the fiscal year: April–December keep calendar year `2000 + YY`,
/// January–March move to `2000 + YY + 1`.
///
/// Returns `None` when the suffix is missing, has the wrong digit count, or
/// names a month outside 1–12.
///
/// ```
/// use pivot_core::period::{parse_target_month, TargetMonth};
///
/// assert_eq!(parse_target_month("名簿_2504.xlsx"), TargetMonth::new(2025, 4));
/// assert_eq!(parse_target_month("名簿_2501.xlsx"), TargetMonth::new(2026, 1));
/// assert_eq!(parse_target_month("名簿_25041.xlsx"), None);
/// ```
pub fn parse_target_month(filename: &str) -> Option<TargetMonth> {
    let re = Regex::new(r"_(\d{2})(\d{2})\.").expect("regex is valid");
    let caps = re.captures(filename)?;
    let year_suffix: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;

    let fiscal_year = 2000 + year_suffix;
    let year = if month >= 4 {
        fiscal_year
    } else {
        fiscal_year + 1
    };
    TargetMonth::new(year, month)
}

// ── MonthLabel ────────────────────────────────────────────────────────────────

/// Calendar months in fiscal order, April first.
pub const FISCAL_MONTHS: [u32; 12] = [4, 5, 6, 7, 8, 9, 10, 11, 12, 1, 2, 3];

/// A month-column name such as `4月`.
///
/// Ordering follows the fiscal year: `4月 < 5月 < … < 12月 < 1月 < 2月 < 3月`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthLabel(u32);

impl MonthLabel {
    /// Label for calendar month `month` (1–12).
    pub fn new(month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self(month))
    }

    pub fn month(&self) -> u32 {
        self.0
    }

    /// Zero-based position within the fiscal year (April = 0, March = 11).
    pub fn fiscal_index(&self) -> usize {
        ((self.0 + 8) % 12) as usize
    }

    /// All twelve labels in fiscal order.
    pub fn fiscal_order() -> impl Iterator<Item = MonthLabel> {
        FISCAL_MONTHS.into_iter().map(MonthLabel)
    }
}

impl Ord for MonthLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fiscal_index().cmp(&other.fiscal_index())
    }
}

impl PartialOrd for MonthLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MonthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}月", self.0)
    }
}

impl FromStr for MonthLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .strip_suffix('月')
            .and_then(|n| n.parse::<u32>().ok())
            .and_then(MonthLabel::new)
            .ok_or_else(|| format!("not a month column: {s:?}"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> TargetMonth {
        TargetMonth::new(year, month).unwrap()
    }

    // ── parse_target_month ────────────────────────────────────────────────────

    #[test]
    fn test_april_to_december_keep_fiscal_year() {
        assert_eq!(parse_target_month("file_2504.xlsx"), Some(month(2025, 4)));
        assert_eq!(parse_target_month("file_2512.xlsx"), Some(month(2025, 12)));
    }

    #[test]
    fn test_january_to_march_move_to_next_year() {
        assert_eq!(parse_target_month("file_2501.xlsx"), Some(month(2026, 1)));
        assert_eq!(parse_target_month("file_2503.xlsx"), Some(month(2026, 3)));
    }

    #[test]
    fn test_december_january_boundary() {
        // 2601 is January of fiscal 2026, i.e. calendar 2027.
        assert_eq!(parse_target_month("file_2512.xlsx"), Some(month(2025, 12)));
        assert_eq!(parse_target_month("file_2601.xlsx"), Some(month(2027, 1)));
    }

    #[test]
    fn test_malformed_suffixes_return_none() {
        assert_eq!(parse_target_month("file_without_date.xlsx"), None);
        assert_eq!(parse_target_month("file_25.xlsx"), None);
        assert_eq!(parse_target_month("file_25041.xlsx"), None);
        assert_eq!(parse_target_month("file_2504"), None);
        assert_eq!(parse_target_month(""), None);
    }

    #[test]
    fn test_out_of_range_month_returns_none() {
        assert_eq!(parse_target_month("file_2500.xlsx"), None);
        assert_eq!(parse_target_month("file_2513.xlsx"), None);
    }

    #[test]
    fn test_suffix_anywhere_before_a_dot() {
        assert_eq!(
            parse_target_month("受講者一覧_2507.backup.xlsx"),
            Some(month(2025, 7))
        );
    }

    // ── TargetMonth ───────────────────────────────────────────────────────────

    #[test]
    fn test_cutoff_is_last_day_of_previous_month() {
        assert_eq!(
            month(2025, 5).cutoff(),
            NaiveDate::from_ymd_opt(2025, 4, 30).unwrap()
        );
        assert_eq!(
            month(2026, 1).cutoff(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
        assert_eq!(
            month(2024, 3).cutoff(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_from_date_and_next() {
        let d = NaiveDate::from_ymd_opt(2025, 12, 17).unwrap();
        let m = TargetMonth::from_date(d);
        assert_eq!(m, month(2025, 12));
        assert_eq!(m.next(), month(2026, 1));
        assert_eq!(m.previous(), month(2025, 11));
    }

    #[test]
    fn test_id_round_trip() {
        let m = month(2025, 5);
        assert_eq!(m.id(), "2025-05");
        assert_eq!(m.to_string(), "2025-05");
        assert_eq!(TargetMonth::parse_id("2025-05"), Some(m));
        assert_eq!(TargetMonth::parse_id("2025-13"), None);
        assert_eq!(TargetMonth::parse_id("results"), None);
    }

    // ── MonthLabel ────────────────────────────────────────────────────────────

    #[test]
    fn test_label_display_and_parse() {
        assert_eq!(month(2025, 5).label().to_string(), "5月");
        assert_eq!("12月".parse::<MonthLabel>(), Ok(MonthLabel(12)));
        assert!("13月".parse::<MonthLabel>().is_err());
        assert!("May".parse::<MonthLabel>().is_err());
    }

    #[test]
    fn test_labels_sort_in_fiscal_order() {
        let mut labels: Vec<MonthLabel> = [1, 12, 4, 3, 9]
            .into_iter()
            .filter_map(MonthLabel::new)
            .collect();
        labels.sort();
        let names: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        assert_eq!(names, vec!["4月", "9月", "12月", "1月", "3月"]);
    }

    #[test]
    fn test_fiscal_order_iterator() {
        let order: Vec<u32> = MonthLabel::fiscal_order().map(|l| l.month()).collect();
        assert_eq!(order, FISCAL_MONTHS.to_vec());
        assert_eq!(MonthLabel(4).fiscal_index(), 0);
        assert_eq!(MonthLabel(3).fiscal_index(), 11);
    }
}
