use crate::schema::WeekPeriod;
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

/// Returns the Monday-closing week that contains `date`.
/// A Monday closes its own week; Tuesday opens the next one.
pub fn week_period_for(date: NaiveDate) -> WeekPeriod {
    let days_to_monday = (7 - date.weekday().num_days_from_monday()) % 7;
    let end = date + Duration::days(days_to_monday as i64);
    WeekPeriod {
        start: end - Duration::days(6),
        end,
    }
}

pub fn next_week_period(period: WeekPeriod) -> WeekPeriod {
    WeekPeriod {
        start: period.start + Duration::days(7),
        end: period.end + Duration::days(7),
    }
}

/// Every week period from `first` through `last` inclusive.
pub fn week_periods_between(first: WeekPeriod, last: WeekPeriod) -> Vec<WeekPeriod> {
    let mut periods = Vec::new();
    let mut current = first;
    while current <= last {
        periods.push(current);
        current = next_week_period(current);
    }
    periods
}

/// `$1,234,567` with banker's rounding to whole dollars. Negative values keep
/// the sign after the currency symbol: `$-50,000`.
pub fn format_currency(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    let digits = rounded.abs().trunc().to_string();
    format!("${}{}", sign, group_thousands(&digits))
}

/// `+12.5%` / `-20.0%`, one decimal place.
pub fn format_signed_pct(value: Decimal) -> String {
    let rounded = round_one_decimal(value);
    let sign = if rounded >= Decimal::ZERO { "+" } else { "" };
    format!("{}{:.1}%", sign, rounded)
}

pub fn format_one_decimal(value: Decimal) -> String {
    format!("{:.1}", round_one_decimal(value))
}

fn round_one_decimal(value: Decimal) -> Decimal {
    let rounded = value.round_dp_with_strategy(1, RoundingStrategy::MidpointNearestEven);
    // drop the sign of a rounded negative zero
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
