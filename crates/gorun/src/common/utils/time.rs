use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Interprets a scheduler timestamp in the local time zone. An ambiguous time
/// (DST fold) resolves to its earlier instant.
pub fn local_datetime(datetime: NaiveDateTime) -> anyhow::Result<DateTime<Local>> {
    Local
        .from_local_datetime(&datetime)
        .earliest()
        .ok_or_else(|| anyhow::anyhow!("Local time {datetime} does not exist"))
}

#[cfg(test)]
mod tests {
    use super::local_datetime;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_local_datetime_keeps_wall_clock() {
        let naive = NaiveDate::from_ymd_opt(2021, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let local = local_datetime(naive).unwrap();
        assert_eq!((local.hour(), local.minute()), (10, 30));
    }
}
