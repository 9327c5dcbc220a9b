//! Timestamp sub-scanner.
//!
//! Recognises `<DATE [Www] [HH:MM[-HH:MM]] [repeater]>` and the inactive `[...]`
//! form anchored at an offset. Impossible dates or times are "no match"; a
//! weekday that disagrees with the date only produces a warning.

use crate::core::{TimeRange, Timestamp};
use chrono::{NaiveDate, NaiveTime};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    error::VerboseError,
    sequence::{delimited, preceded, tuple},
};

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// A timestamp found at the scan offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanned {
    pub timestamp: Timestamp,
    /// Bytes consumed, brackets included.
    pub len: usize,
    /// Set when the written weekday disagrees with the date.
    pub warning: Option<String>,
}

/// Match a timestamp starting exactly at byte `offset` of `text`.
pub fn scan(text: &str, offset: usize) -> Option<Scanned> {
    let input = text.get(offset..)?;
    let (rest, (active, parts)) = timestamp(input).ok()?;
    let (date, weekday, time, repeater) = parts;

    let warning = weekday.and_then(|written| weekday_mismatch(date, written));
    let timestamp = Timestamp {
        active,
        date,
        weekday_shown: weekday.is_some(),
        time,
        repeater: repeater.map(str::to_string),
    };
    Some(Scanned {
        timestamp,
        len: input.len() - rest.len(),
        warning,
    })
}

fn weekday_mismatch(date: NaiveDate, written: &str) -> Option<String> {
    let actual = date.format("%a").to_string();
    if actual.eq_ignore_ascii_case(written) {
        None
    } else {
        Some(format!(
            "weekday {written} does not match {date}, which is a {actual}"
        ))
    }
}

/* ------------------------------- Grammar ------------------------------- */

type Parts<'a> = (
    NaiveDate,
    Option<&'a str>,
    Option<TimeRange>,
    Option<&'a str>,
);

fn timestamp(i: &str) -> PResult<'_, (bool, Parts<'_>)> {
    alt((
        map(delimited(char('<'), body, char('>')), |p| (true, p)),
        map(delimited(char('['), body, char(']')), |p| (false, p)),
    ))(i)
}

fn body(i: &str) -> PResult<'_, Parts<'_>> {
    tuple((
        date,
        opt(preceded(separator, weekday)),
        opt(preceded(separator, time_range)),
        opt(preceded(separator, repeater)),
    ))(i)
}

fn separator(i: &str) -> PResult<'_, char> {
    one_of(" \t")(i)
}

fn date(i: &str) -> PResult<'_, NaiveDate> {
    map_res(
        tuple((year, char('-'), two_digits, char('-'), two_digits)),
        |(y, _, m, _, d)| NaiveDate::from_ymd_opt(y, m, d).ok_or("invalid date"),
    )(i)
}

fn weekday(i: &str) -> PResult<'_, &str> {
    take_while_m_n(3, 3, |c: char| c.is_ascii_alphabetic())(i)
}

fn time_range(i: &str) -> PResult<'_, TimeRange> {
    map(
        tuple((clock, opt(preceded(char('-'), clock)))),
        |(start, end)| TimeRange { start, end },
    )(i)
}

fn clock(i: &str) -> PResult<'_, NaiveTime> {
    map_res(tuple((two_digits, char(':'), two_digits)), |(h, _, m)| {
        NaiveTime::from_hms_opt(h, m, 0).ok_or("invalid time")
    })(i)
}

/// `+1w`, `++2d`, `.+3m`, `.1w`, `4h`
fn repeater(i: &str) -> PResult<'_, &str> {
    recognize(tuple((
        opt(alt((tag("++"), tag(".+"), tag("+"), tag(".")))),
        digit1,
        one_of("hdwmy"),
    )))(i)
}

fn year(i: &str) -> PResult<'_, i32> {
    map_res(
        take_while_m_n(4, 4, |c: char| c.is_ascii_digit()),
        |s: &str| s.parse::<i32>(),
    )(i)
}

fn two_digits(i: &str) -> PResult<'_, u32> {
    map_res(
        take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
        |s: &str| s.parse::<u32>(),
    )(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("<2023-10-27 Fri>", true, ymd(2023, 10, 27), true, None, None)]
    #[case("[2024-01-15 Mon]", false, ymd(2024, 1, 15), true, None, None)]
    #[case(
        "<2023-12-25 10:00-11:00>",
        true,
        ymd(2023, 12, 25),
        false,
        Some(TimeRange { start: hm(10, 0), end: Some(hm(11, 0)) }),
        None
    )]
    #[case("<2023-10-27 Fri +1d>", true, ymd(2023, 10, 27), true, None, Some("+1d"))]
    #[case(
        "<2023-11-01 Wed 09:00>",
        true,
        ymd(2023, 11, 1),
        true,
        Some(TimeRange { start: hm(9, 0), end: None }),
        None
    )]
    #[case(
        "[2025-03-08 Sat 14:30]",
        false,
        ymd(2025, 3, 8),
        true,
        Some(TimeRange { start: hm(14, 30), end: None }),
        None
    )]
    #[case(
        "<2023-10-27 Fri 10:30 .1w>",
        true,
        ymd(2023, 10, 27),
        true,
        Some(TimeRange { start: hm(10, 30), end: None }),
        Some(".1w")
    )]
    #[case(
        "<2023-10-27 10:20>",
        true,
        ymd(2023, 10, 27),
        false,
        Some(TimeRange { start: hm(10, 20), end: None }),
        None
    )]
    #[case("<2023-10-26>", true, ymd(2023, 10, 26), false, None, None)]
    #[case("<2024-03-01 Fri .+2m>", true, ymd(2024, 3, 1), true, None, Some(".+2m"))]
    fn scans_exact_timestamps(
        #[case] input: &str,
        #[case] active: bool,
        #[case] date: NaiveDate,
        #[case] weekday_shown: bool,
        #[case] time: Option<TimeRange>,
        #[case] repeater: Option<&str>,
    ) {
        let scanned = scan(input, 0).expect("timestamp");
        assert_eq!(scanned.len, input.len());
        assert_eq!(scanned.warning, None);
        let ts = scanned.timestamp;
        assert_eq!(ts.active, active);
        assert_eq!(ts.date, date);
        assert_eq!(ts.weekday_shown, weekday_shown);
        assert_eq!(ts.time, time);
        assert_eq!(ts.repeater.as_deref(), repeater);
    }

    #[rstest]
    #[case("<2023-13-01 Mon>")]
    #[case("This is not a datetime")]
    #[case("<2024-02-30>")]
    #[case("<2024-01-15 Mon 25:00>")]
    #[case("<2024-01-15 Monday>")]
    #[case("<2024-01-15]")]
    #[case("2024-01-15")]
    fn rejects_non_timestamps(#[case] input: &str) {
        assert_eq!(scan(input, 0), None);
    }

    #[test]
    fn weekday_mismatch_is_only_a_warning() {
        let scanned = scan("<2024-01-15 Tue>", 0).expect("still a timestamp");
        assert_eq!(scanned.timestamp.date, ymd(2024, 1, 15));
        let warning = scanned.warning.expect("warning");
        assert!(warning.contains("Mon"), "{warning}");
    }

    #[test]
    fn scans_at_offset_without_consuming_trailing_text() {
        let text = "due <2024-01-15> soon";
        let scanned = scan(text, 4).expect("timestamp");
        assert_eq!(scanned.len, "<2024-01-15>".len());
        assert_eq!(scan(text, 0), None);
        assert_eq!(scan(text, 400), None);
    }
}
