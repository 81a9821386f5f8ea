//! ISO-8601 duration parsing for `contentDetails.duration`.
//!
//! YouTube emits durations like `PT3M20S`, `PT1H2M3S` or (for live streams
//! and zero-length placeholders) `P0D`. Only day/hour/minute/second
//! designators are handled; year/month durations are ambiguous and never
//! appear in practice.

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_DAY: u64 = 86_400;

/// Parse an ISO-8601 duration into whole seconds.
///
/// Returns `None` for anything that isn't a duration this API produces.
pub fn parse_seconds(input: &str) -> Option<u64> {
    let rest = input.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, is)) => (date, is),
        None => (rest, ""),
    };
    if date_part.is_empty() && time_part.is_empty() {
        return None;
    }
    let mut total = parse_part(date_part, &[('D', SECONDS_PER_DAY)])?;
    total += parse_part(
        time_part,
        &[('H', SECONDS_PER_HOUR), ('M', SECONDS_PER_MINUTE), ('S', 1)],
    )?;
    Some(total)
}

/// Parse a designator sequence like `1H2M3S` against an ordered unit table.
fn parse_part(part: &str, units: &[(char, u64)]) -> Option<u64> {
    let mut total: u64 = 0;
    let mut value: Option<u64> = None;
    let mut next_unit = 0;
    for c in part.chars() {
        if let Some(digit) = c.to_digit(10) {
            value = Some(value.unwrap_or(0).checked_mul(10)?.checked_add(u64::from(digit))?);
            continue;
        }
        // Units must appear in order, each at most once, each with a value.
        let position = units[next_unit..].iter().position(|(unit, _)| *unit == c)?;
        let (_, multiplier) = units[next_unit + position];
        next_unit += position + 1;
        total = total.checked_add(value.take()?.checked_mul(multiplier)?)?;
    }
    // Trailing digits without a designator are malformed.
    match value {
        Some(_) => None,
        None => Some(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PT45S", 45)]
    #[case("PT3M20S", 200)]
    #[case("PT1H2M3S", 3723)]
    #[case("PT1H", 3600)]
    #[case("P1D", 86_400)]
    #[case("P1DT2H", 93_600)]
    #[case("P0D", 0)]
    #[case("PT0S", 0)]
    fn test_parse_valid(#[case] input: &str, #[case] expected: u64) {
        assert_eq!(parse_seconds(input), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("P")]
    #[case("PT")]
    #[case("3M20S")]
    #[case("PT3X")]
    #[case("PT20")]
    #[case("P1Y")]
    #[case("PT3S2M")] // out of order
    #[case("PT1M1M")] // repeated designator
    fn test_parse_invalid(#[case] input: &str) {
        assert_eq!(parse_seconds(input), None);
    }
}
