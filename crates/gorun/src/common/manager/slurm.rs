use std::time::Duration;

use nom::branch::alt;
use nom::character::complete::char;
use nom::combinator::{map, verify};
use nom::multi::separated_list1;
use nom::sequence::separated_pair;
use nom_supreme::ParserExt;

use crate::common::manager::common::format_duration;
use crate::common::parser::{NomResult, consume_all, p_u64};

/// Format a duration as a Slurm time string, e.g. 01:05:02
pub fn format_slurm_duration(duration: &Duration) -> String {
    format_duration(duration)
}

pub fn parse_slurm_datetime(datetime: &str) -> chrono::ParseResult<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(datetime, "%Y-%m-%dT%H:%M:%S")
}

/// One to three colon separated fields.
fn p_clock_fields(input: &str) -> NomResult<Vec<u64>> {
    verify(separated_list1(char(':'), p_u64), |fields: &Vec<u64>| {
        fields.len() <= 3
    })(input)
}

/// Seconds of a clock value. A full `H:M:S` is unambiguous; shorter forms
/// start with hours after a day prefix and with minutes otherwise.
fn clock_seconds(fields: &[u64], after_days: bool) -> u64 {
    let (hours, minutes, seconds) = match (fields, after_days) {
        ([h, m, s], _) => (*h, *m, *s),
        ([h, m], true) => (*h, *m, 0),
        ([h], true) => (*h, 0, 0),
        ([m, s], false) => (0, *m, *s),
        ([m], false) => (0, *m, 0),
        _ => (0, 0, 0),
    };
    hours * 3600 + minutes * 60 + seconds
}

fn p_slurm_duration(input: &str) -> NomResult<Duration> {
    alt((
        map(
            separated_pair(p_u64, char('-'), p_clock_fields).context("D-H, D-H:M or D-H:M:S value"),
            |(days, fields)| Duration::from_secs(days * 24 * 3600 + clock_seconds(&fields, true)),
        ),
        map(
            p_clock_fields.context("M, M:S or H:M:S value"),
            |fields| Duration::from_secs(clock_seconds(&fields, false)),
        ),
    ))(input)
}

/// Parses a Slurm time limit as `sbatch --time` does: `M`, `M:S`, `H:M:S`,
/// `D-H`, `D-H:M` or `D-H:M:S`.
pub fn parse_slurm_duration(value: &str) -> anyhow::Result<Duration> {
    consume_all(p_slurm_duration, value.trim())
}

/// Clap value parser that accepts only valid Slurm time limits and keeps them verbatim.
pub fn parse_slurm_time_limit(value: &str) -> anyhow::Result<String> {
    parse_slurm_duration(value)?;
    Ok(value.trim().to_string())
}

#[cfg(test)]
mod test {
    use crate::common::manager::slurm::{
        format_slurm_duration, parse_slurm_datetime, parse_slurm_duration,
        parse_slurm_time_limit,
    };
    use std::time::Duration;

    #[test]
    fn test_parse_slurm_datetime() {
        let date = parse_slurm_datetime("2021-09-29T09:36:56").unwrap();
        assert_eq!(
            date.format("%d.%m.%Y %H:%M:%S").to_string(),
            "29.09.2021 09:36:56"
        );
        assert!(parse_slurm_datetime("2021-09-29 09:36:56").is_err());
    }

    #[test]
    fn test_parse_slurm_duration() {
        let date = parse_slurm_duration("10:20:30").unwrap();
        assert_eq!(date, Duration::from_secs(10 * 3600 + 20 * 60 + 30));
        let date = parse_slurm_duration("17-01:00:11").unwrap();
        assert_eq!(date, Duration::from_secs(17 * 24 * 3600 + 3600 + 11));
        assert!(parse_slurm_duration("x-01:00:00").is_err());
    }

    #[test]
    fn test_parse_slurm_duration_minutes() {
        assert_eq!(parse_slurm_duration("90").unwrap(), Duration::from_secs(90 * 60));
        assert_eq!(
            parse_slurm_duration("1440").unwrap(),
            Duration::from_secs(24 * 3600)
        );
        assert_eq!(
            parse_slurm_duration("10:30").unwrap(),
            Duration::from_secs(10 * 60 + 30)
        );
    }

    #[test]
    fn test_parse_slurm_duration_days() {
        assert_eq!(
            parse_slurm_duration("2-12").unwrap(),
            Duration::from_secs(2 * 24 * 3600 + 12 * 3600)
        );
        assert_eq!(
            parse_slurm_duration("1-12:30").unwrap(),
            Duration::from_secs(24 * 3600 + 12 * 3600 + 30 * 60)
        );
    }

    #[test]
    fn test_parse_slurm_duration_invalid() {
        assert!(parse_slurm_duration("").is_err());
        assert!(parse_slurm_duration("1:2:3:4").is_err());
        assert!(parse_slurm_duration("1-2:3:4:5").is_err());
        assert!(parse_slurm_duration("1-").is_err());
        assert!(parse_slurm_duration("10:").is_err());
    }

    #[test]
    fn test_slurm_duration_format_roundtrip() {
        let duration = parse_slurm_duration("2-00:00:00").unwrap();
        assert_eq!(format_slurm_duration(&duration), "48:00:00");
    }

    #[test]
    fn test_time_limit_value_parser() {
        assert_eq!(parse_slurm_time_limit(" 24:00:00").unwrap(), "24:00:00");
        assert!(parse_slurm_time_limit("tomorrow").is_err());
    }
}
