use std::future::Future;
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use cronos_core::CronosConfig;
use cronos_scheduler::{
    preview, schedule::NOT_FOUND_TEXT, types::parse_date, Alarm, AlarmEngine, AlarmHandle,
    Clock, ConstructionError, FiredAlarm, Now,
};

/// clap value parser for `--date`.
pub fn parse_calendar_date(s: &str) -> Result<NaiveDate, ConstructionError> {
    parse_date(s)
}

/// clap value parser for `--from`: "YYYY-MM-DD HH:MM" or "YYYY-MM-DDTHH:MM".
pub fn parse_local_datetime(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("invalid local datetime {s:?} (expected YYYY-MM-DD HH:MM)"))
}

pub fn render_list(alarms: &[Alarm], now: NaiveDateTime) -> Vec<String> {
    alarms
        .iter()
        .map(|a| {
            let label = if a.label.is_empty() { "-" } else { a.label.as_str() };
            format!(
                "{:<12} {:<12} {}  {:<32} {}",
                a.id.as_str(),
                label,
                a.time,
                a.rule.to_string(),
                preview(a, now)
            )
        })
        .collect()
}

pub fn render_next(alarms: &[Alarm], from: NaiveDateTime) -> Vec<String> {
    alarms
        .iter()
        .map(|a| {
            let next = cronos_scheduler::next_occurrence(a, from)
                .map(|t| t.format("%a %Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| NOT_FOUND_TEXT.to_string());
            format!("{:<12} {}", a.id.as_str(), next)
        })
        .collect()
}

pub fn render_check(alarms: &[Alarm], date: NaiveDate) -> Vec<String> {
    alarms
        .iter()
        .filter(|a| a.enabled && a.rule.matches(date))
        .map(|a| format!("{:<12} {} ({})", a.id.as_str(), a.time, a.rule))
        .collect()
}

pub fn list(alarms: &[Alarm], now: NaiveDateTime) {
    if alarms.is_empty() {
        println!("no alarms configured");
    }
    for line in render_list(alarms, now) {
        println!("{line}");
    }
}

pub fn next(alarms: &[Alarm], from: NaiveDateTime) {
    for line in render_next(alarms, from) {
        println!("{line}");
    }
}

pub fn check(alarms: &[Alarm], date: NaiveDate) {
    let lines = render_check(alarms, date);
    if lines.is_empty() {
        println!("no alarms on {date}");
    }
    for line in lines {
        println!("{line}");
    }
}

/// Run the engine in the foreground. Typing `s` snoozes the ringing alarm,
/// `d` dismisses it; Ctrl-C exits.
pub async fn run(
    config: &CronosConfig,
    alarms: Vec<Alarm>,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<()> {
    let buffer = config.engine.delivery_buffer.max(1);
    let (fired_tx, fired_rx) = mpsc::channel::<FiredAlarm>(buffer);
    let engine = AlarmEngine::new(alarms, &config.engine, Some(fired_tx));
    let handle = engine.handle();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine_task = tokio::spawn(engine.run(Arc::clone(&clock), shutdown_rx));

    let input_rx = spawn_line_reader(std::io::stdin())?;
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
        }
        info!("interrupt received");
    };
    ring_loop(&handle, clock.as_ref(), fired_rx, input_rx, interrupt).await;

    let _ = shutdown_tx.send(true);
    engine_task.await?;
    Ok(())
}

/// Forward lines from a blocking reader over a channel.
///
/// The reader lives on its own OS thread: a pending blocking read cannot be
/// cancelled, and on the runtime's blocking pool it would hold up shutdown.
/// The thread is detached and ends with the process or at EOF.
pub fn spawn_line_reader<R>(reader: R) -> std::io::Result<mpsc::Receiver<std::io::Result<String>>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("cronos-input".into())
        .spawn(move || {
            for line in BufReader::new(reader).lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Interactive loop of `run`: prints fired alarms, applies snooze/dismiss
/// commands, and returns as soon as `shutdown` completes.
async fn ring_loop<F>(
    handle: &AlarmHandle,
    clock: &dyn Clock,
    mut fired_rx: mpsc::Receiver<FiredAlarm>,
    mut input_rx: mpsc::Receiver<std::io::Result<String>>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut input_open = true;
    let mut ringing: Option<FiredAlarm> = None;

    loop {
        tokio::select! {
            Some(fired) = fired_rx.recv() => {
                println!("{}", ring_banner(&fired));
                ringing = Some(fired);
            }
            line = input_rx.recv(), if input_open => match line {
                Some(Ok(input)) => {
                    ringing = apply_input(handle, clock.now(), input.trim(), ringing);
                }
                Some(Err(e)) => {
                    warn!("stdin read failed: {e}");
                    input_open = false;
                }
                None => input_open = false,
            },
            _ = &mut shutdown => break,
        }
    }
}

fn ring_banner(fired: &FiredAlarm) -> String {
    let name = if fired.label.is_empty() {
        fired.alarm_id.as_str()
    } else {
        fired.label.as_str()
    };
    let keys = if fired.snoozable {
        "s = snooze, d = dismiss"
    } else {
        "d = dismiss"
    };
    format!(
        "⏰ {} [{}] ringing until {} ({})",
        name,
        fired.source,
        fired.ring_until.format("%H:%M:%S"),
        keys
    )
}

/// Apply one line of user input to the ringing alarm. Returns what is still
/// ringing afterwards.
fn apply_input(
    handle: &AlarmHandle,
    now: Now,
    input: &str,
    ringing: Option<FiredAlarm>,
) -> Option<FiredAlarm> {
    // Ringing stops on its own once the ring window has passed.
    let ringing = ringing.filter(|r| now.local <= r.ring_until);
    match (input, ringing) {
        ("s" | "snooze", Some(fired)) => match handle.snooze(&fired.alarm_id, now) {
            Ok(wake_at_ms) => {
                let wake = Local
                    .timestamp_millis_opt(wake_at_ms)
                    .single()
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| wake_at_ms.to_string());
                println!("snoozed until {wake}");
                None
            }
            Err(e) => {
                println!("{e}");
                Some(fired)
            }
        },
        ("d" | "dismiss", Some(fired)) => {
            info!(alarm_id = %fired.alarm_id, "alarm dismissed");
            None
        }
        (_, None) => {
            println!("nothing is ringing");
            None
        }
        (_, still_ringing) => still_ringing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cronos_core::config::EngineConfig;
    use cronos_core::AlarmId;
    use cronos_scheduler::{FireSource, ManualClock, RecurrenceRule, TimeOfDay};
    use std::time::Duration;

    /// A reader whose `read` never returns, like an idle terminal.
    struct IdleTerminal;

    impl Read for IdleTerminal {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                std::thread::park();
            }
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn sample() -> Vec<Alarm> {
        vec![
            Alarm::new(TimeOfDay::new(7, 0).unwrap(), RecurrenceRule::Weekdays).with_id("work"),
            Alarm::new(
                TimeOfDay::new(19, 0).unwrap(),
                RecurrenceRule::shift_cycle(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 2)
                    .unwrap(),
            )
            .with_id("shift"),
            Alarm::new(TimeOfDay::new(9, 0).unwrap(), RecurrenceRule::Daily)
                .with_id("off")
                .disabled(),
        ]
    }

    #[test]
    fn datetime_parser_accepts_both_separators() {
        assert_eq!(parse_local_datetime("2024-01-01 07:30").unwrap(), at(2024, 1, 1, 7, 30));
        assert_eq!(parse_local_datetime("2024-01-01T07:30").unwrap(), at(2024, 1, 1, 7, 30));
        assert!(parse_local_datetime("tomorrow").is_err());
    }

    #[test]
    fn check_lists_enabled_matches_only() {
        // 2024-01-03: a Wednesday and a shift day.
        let lines = render_check(&sample(), NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("work"));
        assert!(lines[1].starts_with("shift"));

        // 2024-01-06: Saturday, not a shift day.
        let lines = render_check(&sample(), NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
        assert!(lines.is_empty());
    }

    #[test]
    fn next_shows_placeholder_for_disabled() {
        let lines = render_next(&sample(), at(2024, 1, 1, 8, 0));
        assert!(lines[0].ends_with("Tue 2024-01-02 07:00"));
        assert!(lines[1].ends_with("Mon 2024-01-01 19:00"));
        assert!(lines[2].ends_with(NOT_FOUND_TEXT));
    }

    #[test]
    fn list_includes_rule_and_preview() {
        let lines = render_list(&sample(), at(2024, 1, 1, 8, 0));
        assert!(lines[1].contains("Shift every 2d from 2024-01-01"));
        assert!(lines[1].ends_with("11h"));
        assert!(lines[2].ends_with("Disabled"));
    }

    #[tokio::test]
    async fn line_reader_forwards_lines_until_eof() {
        let mut rx = spawn_line_reader(std::io::Cursor::new(b"s\n dismiss \n".to_vec())).unwrap();
        assert_eq!(rx.recv().await.unwrap().unwrap(), "s");
        assert_eq!(rx.recv().await.unwrap().unwrap(), " dismiss ");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_is_not_held_up_by_pending_input() {
        let engine = AlarmEngine::new(sample(), &EngineConfig::default(), None);
        let clock = ManualClock::new(at(2024, 1, 1, 8, 0));
        let (_fired_tx, fired_rx) = mpsc::channel(1);
        let input_rx = spawn_line_reader(IdleTerminal).unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = engine.handle();
        let looping = ring_loop(&handle, &clock, fired_rx, input_rx, async {
            let _ = stop_rx.await;
        });
        stop_tx.send(()).unwrap();
        assert!(tokio::time::timeout(Duration::from_secs(2), looping).await.is_ok());
    }

    #[test]
    fn input_snoozes_or_dismisses_the_ringing_alarm() {
        let alarms = sample();
        let engine = AlarmEngine::new(alarms.clone(), &EngineConfig::default(), None);
        let handle = engine.handle();
        let now = Now::at(at(2024, 1, 1, 7, 0));
        let fired = FiredAlarm::new(&alarms[0], FireSource::Schedule, now.local);

        assert!(apply_input(&handle, now, "s", Some(fired.clone())).is_none());
        let pending = handle.pending_snoozes();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].alarm_id, AlarmId::from("work"));

        assert!(apply_input(&handle, now, "d", Some(fired.clone())).is_none());
        assert!(apply_input(&handle, now, "x", Some(fired.clone())).is_some());
        assert!(apply_input(&handle, now, "s", None).is_none());
    }

    #[test]
    fn input_after_ring_window_is_ignored() {
        let alarms = sample();
        let engine = AlarmEngine::new(alarms.clone(), &EngineConfig::default(), None);
        let handle = engine.handle();
        let fired = FiredAlarm::new(&alarms[0], FireSource::Schedule, at(2024, 1, 1, 7, 0));

        let later = Now::at(at(2024, 1, 1, 7, 6));
        assert!(apply_input(&handle, later, "s", Some(fired)).is_none());
        assert!(handle.pending_snoozes().is_empty());
    }
}
