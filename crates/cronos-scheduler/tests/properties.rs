// Calendar properties of the evaluator and projector, checked across whole
// years of dates through the public API.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use cronos_core::AlarmId;
use cronos_scheduler::{next_occurrence, Alarm, RecurrenceRule, SnoozeLedger, TimeOfDay};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Every date from 2023-01-01 through 2025-12-31 (includes a leap year).
fn all_dates() -> impl Iterator<Item = NaiveDate> {
    d(2023, 1, 1)
        .iter_days()
        .take_while(|date| *date <= d(2025, 12, 31))
}

fn sample_rules() -> Vec<RecurrenceRule> {
    vec![
        RecurrenceRule::Daily,
        RecurrenceRule::Weekdays,
        RecurrenceRule::Weekends,
        RecurrenceRule::OddDayOfMonth,
        RecurrenceRule::EvenDayOfMonth,
        RecurrenceRule::specific_weekdays([2, 4]).unwrap(),
        RecurrenceRule::WeeklyOnSameWeekday { reference_date: d(2024, 3, 4) },
        RecurrenceRule::MonthlyOnSameDayOfMonth { reference_date: d(2024, 1, 31) },
        RecurrenceRule::YearlyOnSameDate { reference_date: d(2024, 12, 25) },
        RecurrenceRule::shift_cycle(d(2024, 1, 1), 3).unwrap(),
    ]
}

#[test]
fn daily_matches_every_date() {
    assert!(all_dates().all(|date| RecurrenceRule::Daily.matches(date)));
}

#[test]
fn exactly_one_parity_rule_matches() {
    for date in all_dates() {
        let odd = RecurrenceRule::OddDayOfMonth.matches(date);
        let even = RecurrenceRule::EvenDayOfMonth.matches(date);
        assert!(odd != even, "{date}");
        assert_eq!(odd, date.day() % 2 == 1, "{date}");
    }
}

#[test]
fn shift_cycle_reference_always_matches() {
    let reference = d(2024, 2, 29);
    for n in 1..=30 {
        let rule = RecurrenceRule::shift_cycle(reference, n).unwrap();
        assert!(rule.matches(reference), "interval {n}");
    }
}

#[test]
fn shift_cycle_never_matches_before_reference() {
    let reference = d(2024, 6, 15);
    for n in [1, 2, 7] {
        let rule = RecurrenceRule::shift_cycle(reference, n).unwrap();
        assert!(all_dates()
            .filter(|date| *date < reference)
            .all(|date| !rule.matches(date)));
    }
}

#[test]
fn twelve_by_thirty_six_alternation() {
    let reference = d(2024, 1, 1);
    let rule = RecurrenceRule::shift_cycle(reference, 2).unwrap();
    assert!(!rule.matches(reference + Days::new(1)));
    assert!(rule.matches(reference + Days::new(2)));

    for day in [1, 3, 5] {
        assert!(rule.matches(d(2024, 1, day)));
    }
    for day in [2, 4] {
        assert!(!rule.matches(d(2024, 1, day)));
    }
}

#[test]
fn monthly_31_never_matches_in_february() {
    let rule = RecurrenceRule::MonthlyOnSameDayOfMonth { reference_date: d(2024, 1, 31) };
    assert!(all_dates()
        .filter(|date| date.month() == 2)
        .all(|date| !rule.matches(date)));
}

#[test]
fn weekly_matches_prior_weeks_too() {
    let rule = RecurrenceRule::WeeklyOnSameWeekday { reference_date: d(2024, 3, 4) };
    assert!(rule.matches(d(2024, 3, 11)));
    assert!(rule.matches(d(2024, 3, 18)));
    assert!(rule.matches(d(2024, 2, 26)));
}

#[test]
fn projection_lands_on_a_matching_date_after_from() {
    let time = TimeOfDay::new(7, 30).unwrap();
    let froms: Vec<NaiveDateTime> = all_dates()
        .step_by(17)
        .flat_map(|date| {
            [
                date.and_hms_opt(0, 0, 0).unwrap(),
                date.and_hms_opt(7, 30, 0).unwrap(),
                date.and_hms_opt(23, 59, 59).unwrap(),
            ]
        })
        .collect();

    for rule in sample_rules() {
        let alarm = Alarm::new(time, rule.clone());
        for from in &froms {
            let next = next_occurrence(&alarm, *from)
                .unwrap_or_else(|| panic!("{rule} from {from} not found"));
            assert!(next > *from, "{rule} from {from}");
            assert!(rule.matches(next.date()), "{rule} from {from} -> {next}");
            assert_eq!(next.time(), time.to_naive_time());
        }
    }
}

#[test]
fn projection_is_the_earliest_match() {
    let time = TimeOfDay::new(6, 0).unwrap();
    let from = d(2024, 5, 10).and_hms_opt(12, 0, 0).unwrap();
    for rule in sample_rules() {
        let alarm = Alarm::new(time, rule.clone());
        let next = next_occurrence(&alarm, from).unwrap();
        // No matching date strictly between `from`'s next day and `next`.
        let skipped = from
            .date()
            .succ_opt()
            .unwrap()
            .iter_days()
            .take_while(|date| *date < next.date())
            .find(|date| rule.matches(*date));
        assert_eq!(skipped, None, "{rule}");
    }
}

#[test]
fn daily_from_just_after_alarm_is_tomorrow() {
    let alarm = Alarm::new(TimeOfDay::new(7, 0).unwrap(), RecurrenceRule::Daily);
    let from = d(2024, 1, 1).and_hms_opt(7, 1, 0).unwrap();
    assert_eq!(
        next_occurrence(&alarm, from),
        Some(d(2024, 1, 2).and_hms_opt(7, 0, 0).unwrap())
    );
}

#[test]
fn snooze_ledger_lifecycle() {
    let mut ledger = SnoozeLedger::new();
    let id = AlarmId::from("morning");
    let t0 = 1_700_000_000_000;

    ledger.snooze(&id, 300, t0);
    assert_eq!(ledger.consume_due(t0 + 299_000), None);
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.consume_due(t0 + 300_000), Some(id));
    assert_eq!(ledger.consume_due(t0 + 300_000), None);
}
