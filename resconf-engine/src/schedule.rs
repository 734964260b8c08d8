//! The `Run` field kind: leading overrides followed by a calendar schedule
//!
//! ```text
//! Run = Level=Full Pool=Monthly 1st sun at 23:05
//! Run = Incremental mon-sat at 1:00am
//! Run = on 1/15 at 12:00pm
//! ```
//!
//! The schedule words narrow a [DateTimeMask] that starts out allowing every hour, day, month
//! and week. The first word touching a vector clears it; later words add to it.
use anyhow::{bail, Result};
use resconf_lexer::{ParseError, Token};
use resconf_schema::{
    find_field, BitField, DateTimeMask, FieldKind, Record, Run, RunSchema, Value,
};

use crate::store::{self, Context};

/// Words with a fixed meaning in a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Word {
    On,
    At,
    Last,
    Weekday(usize),
    Month(usize),
    WeekOfMonth(usize),
    Daily,
    Weekly,
    Monthly,
    Hourly,
}

const WORDS: &[(&str, Word)] = &[
    ("on", Word::On),
    ("at", Word::At),
    ("last", Word::Last),
    ("sun", Word::Weekday(0)),
    ("mon", Word::Weekday(1)),
    ("tue", Word::Weekday(2)),
    ("wed", Word::Weekday(3)),
    ("thu", Word::Weekday(4)),
    ("fri", Word::Weekday(5)),
    ("sat", Word::Weekday(6)),
    ("jan", Word::Month(0)),
    ("feb", Word::Month(1)),
    ("mar", Word::Month(2)),
    ("apr", Word::Month(3)),
    ("may", Word::Month(4)),
    ("jun", Word::Month(5)),
    ("jul", Word::Month(6)),
    ("aug", Word::Month(7)),
    ("sep", Word::Month(8)),
    ("oct", Word::Month(9)),
    ("nov", Word::Month(10)),
    ("dec", Word::Month(11)),
    ("sunday", Word::Weekday(0)),
    ("monday", Word::Weekday(1)),
    ("tuesday", Word::Weekday(2)),
    ("wednesday", Word::Weekday(3)),
    ("thursday", Word::Weekday(4)),
    ("friday", Word::Weekday(5)),
    ("saturday", Word::Weekday(6)),
    ("january", Word::Month(0)),
    ("february", Word::Month(1)),
    ("march", Word::Month(2)),
    ("april", Word::Month(3)),
    ("june", Word::Month(5)),
    ("july", Word::Month(6)),
    ("august", Word::Month(7)),
    ("september", Word::Month(8)),
    ("october", Word::Month(9)),
    ("november", Word::Month(10)),
    ("december", Word::Month(11)),
    ("daily", Word::Daily),
    ("weekly", Word::Weekly),
    ("monthly", Word::Monthly),
    ("hourly", Word::Hourly),
    ("1st", Word::WeekOfMonth(0)),
    ("2nd", Word::WeekOfMonth(1)),
    ("3rd", Word::WeekOfMonth(2)),
    ("4th", Word::WeekOfMonth(3)),
    ("5th", Word::WeekOfMonth(4)),
    ("first", Word::WeekOfMonth(0)),
    ("second", Word::WeekOfMonth(1)),
    ("third", Word::WeekOfMonth(2)),
    ("fourth", Word::WeekOfMonth(3)),
    ("fifth", Word::WeekOfMonth(4)),
];

fn lookup(word: &str) -> Option<Word> {
    WORDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(word))
        .map(|(_, word)| *word)
}

/// `wNN`, a week of the year
fn week_number(word: &str) -> Option<&str> {
    let digits = word.strip_prefix(['w', 'W'])?;
    (digits.len() == 2 && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
}

fn is_number(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit())
}

/// Clears a vector the first time a schedule word narrows it
fn narrow<const N: usize>(bits: &mut BitField<N>, touched: &mut bool) {
    if !*touched {
        bits.clear();
        *touched = true;
    }
}

/// Sets `first..=last`, wrapping past the end of the vector when `first` comes after `last`
fn set_wrapping<const N: usize>(bits: &mut BitField<N>, first: usize, last: usize) {
    if first <= last {
        bits.set_range(first, last);
    } else {
        bits.set_range(first, N - 1);
        bits.set_range(0, last);
    }
}

/// The schedule state machine, fed one word at a time
#[derive(Debug, Default)]
pub struct ScheduleParser {
    when: DateTimeMask,
    have_hour: bool,
    have_mday: bool,
    have_wday: bool,
    have_month: bool,
    have_wom: bool,
    have_woy: bool,
    have_at: bool,
}

impl ScheduleParser {
    pub fn feed(&mut self, word: &str) -> Result<()> {
        if is_number(word) {
            let day = day_index(word).ok_or_else(|| anyhow::anyhow!("Day number out of range (1-31)"))?;
            narrow(&mut self.when.mday, &mut self.have_mday);
            self.when.mday.set(day);
            return Ok(());
        }
        if let Some((first, last)) = word.split_once('-') {
            return self.range(first, last);
        }
        if word.contains(':') {
            return self.time(word);
        }
        if let Some((offset, modulo)) = word.split_once('/') {
            return self.modulo(offset, modulo);
        }
        if let Some(digits) = week_number(word) {
            let week = week_index(digits).ok_or_else(|| anyhow::anyhow!("Week number out of range (0-53)"))?;
            narrow(&mut self.when.woy, &mut self.have_woy);
            self.when.woy.set(week);
            return Ok(());
        }
        let Some(keyword) = lookup(word) else {
            bail!("Job type field: {} in run record not found", word);
        };
        match keyword {
            Word::On => {}
            Word::At => self.have_at = true,
            Word::Last => {
                self.when.last_week_of_month = true;
                narrow(&mut self.when.wom, &mut self.have_wom);
            }
            Word::Weekday(day) => {
                narrow(&mut self.when.wday, &mut self.have_wday);
                self.when.wday.set(day);
            }
            Word::Month(month) => {
                narrow(&mut self.when.month, &mut self.have_month);
                self.when.month.set(month);
            }
            Word::WeekOfMonth(week) => {
                narrow(&mut self.when.wom, &mut self.have_wom);
                self.when.wom.set(week);
            }
            Word::Hourly => {
                self.have_hour = true;
                self.when.hour.fill();
            }
            Word::Weekly => {
                self.have_mday = true;
                self.have_wom = true;
                self.have_woy = true;
                self.when.mday.fill();
                self.when.wom.fill();
                self.when.woy.fill();
            }
            Word::Daily => {
                self.have_mday = true;
                self.when.wday.fill();
            }
            Word::Monthly => {
                self.have_month = true;
                self.when.month.fill();
            }
        }
        Ok(())
    }

    /// `h:mm`, optionally followed by `am` or `pm`
    fn time(&mut self, word: &str) -> Result<()> {
        if !self.have_at {
            bail!("Time must be preceded by keyword AT.");
        }
        let Some((hour, rest)) = word.split_once(':') else {
            bail!("Bad time specification.");
        };
        let (minute, suffix) = match rest.get(..2) {
            Some(minute) => (minute, &rest[2..]),
            None => (rest, ""),
        };
        let (am, pm) = (suffix.eq_ignore_ascii_case("am"), suffix.eq_ignore_ascii_case("pm"));
        if !(am || pm) && rest.len() != 2 {
            bail!("Bad time specification.");
        }
        let (Ok(mut hour), Ok(minute)) = (hour.parse::<u8>(), minute.parse::<u8>()) else {
            bail!("Bad time specification.");
        };
        if (am || pm) && hour > 12 {
            bail!("Bad time specification.");
        }
        if pm && hour != 12 {
            hour += 12;
        } else if am && hour == 12 {
            hour = 0;
        }
        if hour > 23 || minute > 59 {
            bail!("Bad time specification.");
        }
        if !self.have_hour {
            self.when.hour.clear();
        }
        self.when.hour.set(usize::from(hour));
        self.when.minute = minute;
        self.have_hour = true;
        Ok(())
    }

    fn range(&mut self, first: &str, last: &str) -> Result<()> {
        if is_number(first) && is_number(last) {
            let (Some(first), Some(last)) = (day_index(first), day_index(last)) else {
                bail!("Bad day range specification.");
            };
            narrow(&mut self.when.mday, &mut self.have_mday);
            set_wrapping(&mut self.when.mday, first, last);
            return Ok(());
        }
        if let (Some(first), Some(last)) = (week_number(first), week_number(last)) {
            let (Some(first), Some(last)) = (week_index(first), week_index(last)) else {
                bail!("Week number out of range (0-53)");
            };
            narrow(&mut self.when.woy, &mut self.have_woy);
            set_wrapping(&mut self.when.woy, first, last);
            return Ok(());
        }
        let start = match lookup(first) {
            Some(word @ (Word::Weekday(_) | Word::Month(_) | Word::WeekOfMonth(_))) => word,
            _ => bail!("Invalid month, week or position day range"),
        };
        match (start, lookup(last)) {
            (Word::Weekday(first), Some(Word::Weekday(last))) if first != last => {
                narrow(&mut self.when.wday, &mut self.have_wday);
                set_wrapping(&mut self.when.wday, first, last);
            }
            (Word::Month(first), Some(Word::Month(last))) if first != last => {
                narrow(&mut self.when.month, &mut self.have_month);
                set_wrapping(&mut self.when.month, first, last);
            }
            (Word::WeekOfMonth(first), Some(Word::WeekOfMonth(last))) if first != last => {
                narrow(&mut self.when.wom, &mut self.have_wom);
                set_wrapping(&mut self.when.wom, first, last);
            }
            _ => bail!("Invalid month, weekday or position range"),
        }
        Ok(())
    }

    /// `d/m` sets every `m`th day from day `d`; `wNN/wMM` does the same for weeks of the year
    fn modulo(&mut self, offset: &str, modulo: &str) -> Result<()> {
        if is_number(offset) && is_number(modulo) {
            let (Some(offset), Ok(modulo)) = (day_index(offset), modulo.parse::<usize>()) else {
                bail!("Bad day specification in modulo.");
            };
            if modulo == 0 || modulo > 30 {
                bail!("Bad day specification in modulo.");
            }
            if offset > modulo {
                bail!("Bad day specification, offset must always be <= than modulo.");
            }
            narrow(&mut self.when.mday, &mut self.have_mday);
            set_every(&mut self.when.mday, offset, modulo);
            return Ok(());
        }
        if let (Some(offset), Some(modulo)) = (week_number(offset), week_number(modulo)) {
            let (Some(offset), Some(modulo)) = (week_index(offset), week_index(modulo)) else {
                bail!("Week number out of range (0-53) in modulo");
            };
            if modulo == 0 {
                bail!("Week number out of range (0-53) in modulo");
            }
            if offset > modulo {
                bail!("Bad week number specification in modulo, offset must always be <= than modulo.");
            }
            narrow(&mut self.when.woy, &mut self.have_woy);
            set_every(&mut self.when.woy, offset, modulo);
            return Ok(());
        }
        bail!("Bad modulo time specification. Format for weekdays is '01/02', for yearweeks is 'w01/w02'.")
    }

    pub fn finish(self) -> DateTimeMask {
        self.when
    }
}

/// A one based day of the month as a vector index
fn day_index(text: &str) -> Option<usize> {
    let day: usize = text.parse().ok()?;
    (1..=31).contains(&day).then(|| day - 1)
}

fn week_index(digits: &str) -> Option<usize> {
    let week: usize = digits.parse().ok()?;
    (week <= 53).then_some(week)
}

/// The last index of each vector is never a step start, so `1/1` leaves out day 31
fn set_every<const N: usize>(bits: &mut BitField<N>, offset: usize, modulo: usize) {
    for index in (0..N - 1).step_by(modulo) {
        bits.set(index + offset);
    }
}

/// Parses schedule text on its own, as it would follow the overrides of a `Run` directive
///
/// ```
/// use resconf_engine::parse_schedule;
///
/// let when = parse_schedule("mon-fri at 23:05")?;
/// assert_eq!(when.wday.iter().collect::<Vec<_>>(), [1, 2, 3, 4, 5]);
/// assert_eq!(when.hour.iter().collect::<Vec<_>>(), [23]);
/// assert_eq!(when.minute, 5);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn parse_schedule(text: &str) -> Result<DateTimeMask> {
    let mut parser = ScheduleParser::default();
    for word in text.split([' ', '\t', ',']).filter(|w| !w.is_empty()) {
        parser.feed(word)?;
    }
    Ok(parser.finish())
}

/// Stores one `Run` directive, appending it to the field's runs
pub(crate) fn store_run(
    cx: &mut Context<'_>,
    record: &mut Record,
    index: usize,
    run: &'static RunSchema,
) -> Result<(), ParseError> {
    let entry = match record.value(index) {
        Value::Runs(runs) => runs.len(),
        _ => 0,
    };
    let mut overrides = Record::new(run.fields);
    cx.nested(index, entry, |cx| store_overrides(cx, &mut overrides, run))?;

    let mut parser = ScheduleParser::default();
    while !cx.tokens.peek().ends_directive() {
        let spanned = cx.tokens.next_token();
        match &spanned.token {
            Token::Comma => continue,
            token => {
                let Some(word) = token.word() else {
                    return Err(cx.error_at(spanned.location, format!("Unexpected token: {token}")));
                };
                parser
                    .feed(word)
                    .map_err(|e| cx.error_at(spanned.location, e))?;
            }
        }
    }
    let when = parser.finish();
    tracing::debug!(%when, "Run schedule");

    let run = Run { overrides, when };
    match record.value_mut(index) {
        Value::Runs(runs) => runs.push(run),
        value => *value = Value::Runs(vec![run]),
    }
    Ok(())
}

/// Reads `Key=value` pairs, and bare words of the implicit keyword field, until the schedule starts
fn store_overrides(
    cx: &mut Context<'_>,
    overrides: &mut Record,
    run: &'static RunSchema,
) -> Result<(), ParseError> {
    let implicit = run.implicit.and_then(|name| {
        let index = overrides.index_of(name)?;
        match run.fields[index].kind {
            FieldKind::Keyword(table) => Some((index, table)),
            _ => None,
        }
    });
    loop {
        let Some(word) = cx.tokens.peek().word().map(str::to_owned) else {
            return Ok(());
        };
        if cx.tokens.peek_nth(1) == &Token::Equals {
            let Some((field, _)) = find_field(run.fields, &word, cx.warnings) else {
                cx.tokens.next_token();
                return Err(cx
                    .tokens
                    .error(format!("Run directive keyword \"{word}\" not permitted")));
            };
            cx.tokens.next_token();
            cx.tokens.next_token();
            let single_token = std::mem::replace(&mut cx.single_token, true);
            let stored = store::store(cx, overrides, field);
            cx.single_token = single_token;
            stored?;
            continue;
        }
        match implicit {
            Some((field, table)) => match table.lookup(&word) {
                Some(code) => {
                    cx.tokens.next_token();
                    *overrides.value_mut(field) = Value::Keyword(code);
                    overrides.mark_present(field);
                }
                None => return Ok(()),
            },
            None => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_schedule;
    use crate::tests::{parse_one, JOB, POOL, LEVELS};

    fn bits<const N: usize>(bits: &resconf_schema::BitField<N>) -> Vec<usize> {
        bits.iter().collect()
    }

    #[test]
    fn weekdays_accumulate_after_first_narrowing() {
        let when = parse_schedule("mon, wed").unwrap();
        assert_eq!(bits(&when.wday), [1, 3]);
        assert!(when.mday.is_full());
        assert!(when.hour.is_full());
    }

    #[test]
    fn weekday_range() {
        assert_eq!(bits(&parse_schedule("mon-fri").unwrap().wday), [1, 2, 3, 4, 5]);
        assert_eq!(bits(&parse_schedule("fri-mon").unwrap().wday), [0, 1, 5, 6]);
        assert_eq!(bits(&parse_schedule("nov-feb").unwrap().month), [0, 1, 10, 11]);
        assert_eq!(bits(&parse_schedule("2nd-4th").unwrap().wom), [1, 2, 3]);
    }

    #[test]
    fn day_modulo_uses_one_based_days() {
        let when = parse_schedule("1/15").unwrap();
        assert_eq!(bits(&when.mday), [0, 15]);
        let when = parse_schedule("2/10").unwrap();
        assert_eq!(bits(&when.mday), [1, 11, 21]);
        let when = parse_schedule("1/1").unwrap();
        assert_eq!(bits(&when.mday), (0..30).collect::<Vec<_>>());
        assert!(!when.mday.is_full());
        let when = parse_schedule("w00/w04").unwrap();
        assert_eq!(bits(&when.woy), (0..53).step_by(4).collect::<Vec<_>>());
    }

    #[test]
    fn days_and_week_ranges() {
        let when = parse_schedule("on 2 january at 23:45").unwrap();
        assert_eq!(bits(&when.mday), [1]);
        assert_eq!(bits(&when.month), [0]);
        assert_eq!(bits(&when.hour), [23]);
        assert_eq!(when.minute, 45);
        assert_eq!(bits(&parse_schedule("28-3").unwrap().mday), [0, 1, 2, 27, 28, 29, 30]);
        assert_eq!(bits(&parse_schedule("w01-w03").unwrap().woy), [1, 2, 3]);
        assert_eq!(bits(&parse_schedule("5-5").unwrap().mday), [4]);
    }

    #[test]
    fn twelve_hour_times() {
        let at = |text: &str| {
            let when = parse_schedule(text).unwrap();
            (bits(&when.hour), when.minute)
        };
        assert_eq!(at("at 12:00am"), (vec![0], 0));
        assert_eq!(at("at 12:30pm"), (vec![12], 30));
        assert_eq!(at("at 1:05PM"), (vec![13], 5));
        assert_eq!(at("at 1:05am"), (vec![1], 5));
        assert_eq!(at("at 1:00 at 13:15"), (vec![1, 13], 15));
    }

    #[test]
    fn twelve_hour_times_reject_hours_past_twelve() {
        let message = |text: &str| parse_schedule(text).unwrap_err().to_string();
        assert_eq!(message("at 13:00pm"), "Bad time specification.");
        assert_eq!(message("at 99999999999999999999:00pm"), "Bad time specification.");
        assert_eq!(message("at 18446744073709551615:00pm"), "Bad time specification.");
        assert_eq!(message("at 256:00"), "Bad time specification.");
    }

    #[test]
    fn last_and_shortcuts() {
        let when = parse_schedule("last fri").unwrap();
        assert!(when.last_week_of_month);
        assert_eq!(bits(&when.wom), Vec::<usize>::new());
        let when = parse_schedule("1st sun weekly").unwrap();
        assert!(when.wom.is_full());
        assert_eq!(bits(&when.wday), [0]);
        let when = parse_schedule("sun daily").unwrap();
        assert!(when.wday.is_full());
        let when = parse_schedule("jan monthly").unwrap();
        assert!(when.month.is_full());
        let when = parse_schedule("at 3:00 hourly").unwrap();
        assert!(when.hour.is_full());
        assert_eq!(when.minute, 0);
    }

    #[test]
    fn malformed_schedules() {
        let message = |text: &str| parse_schedule(text).unwrap_err().to_string();
        assert_eq!(message("23:45"), "Time must be preceded by keyword AT.");
        assert_eq!(message("at 24:00"), "Bad time specification.");
        assert_eq!(message("at 1:5"), "Bad time specification.");
        assert_eq!(message("at 1:60"), "Bad time specification.");
        assert_eq!(message("32"), "Day number out of range (1-31)");
        assert_eq!(message("w54"), "Week number out of range (0-53)");
        assert_eq!(message("mon-mon"), "Invalid month, weekday or position range");
        assert_eq!(message("mon-jan"), "Invalid month, weekday or position range");
        assert_eq!(message("daily-weekly"), "Invalid month, week or position day range");
        assert_eq!(message("0-4"), "Bad day range specification.");
        assert_eq!(message("1/0"), "Bad day specification in modulo.");
        assert_eq!(
            message("20/10"),
            "Bad day specification, offset must always be <= than modulo."
        );
        assert_eq!(message("fortnightly"), "Job type field: fortnightly in run record not found");
    }

    #[test]
    fn run_directives_append_with_overrides() -> anyhow::Result<()> {
        let job = parse_one(
            JOB,
            indoc::indoc!(
                "
                Job {
                  Name = Backup1
                  Run = Level=Full Pool=Monthly 1st sun at 2:05
                  Run = Incremental mon-sat at 23:00
                }
                Pool { Name = Monthly }
                "
            ),
        )?;
        let runs = job.get_runs("Run").unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].overrides.get_keyword("Level"), LEVELS.lookup("full"));
        assert_eq!(bits(&runs[0].when.wom), [0]);
        assert_eq!(bits(&runs[0].when.hour), [2]);
        assert_eq!(runs[1].overrides.get_keyword("Level"), LEVELS.lookup("incremental"));
        assert_eq!(bits(&runs[1].when.wday), [1, 2, 3, 4, 5, 6]);
        let pool = runs[0].overrides.get_reference("Pool").unwrap();
        assert_eq!(pool.name, "Monthly");
        assert_eq!(pool.target.map(|id| id.rcode), Some(POOL));
        Ok(())
    }

    #[test]
    fn unknown_override_key_is_fatal() {
        let error = parse_one(JOB, "Job {\n  Name = j\n  Run = Colour=red daily\n}\n").unwrap_err();
        assert!(
            error.to_string().contains("Run directive keyword \"Colour\" not permitted"),
            "{error}"
        );
        let error = parse_one(JOB, "Job {\n  Name = j\n  Run = at 25:00\n}\n").unwrap_err();
        assert!(error.to_string().contains("Bad time specification."), "{error}");
    }
}
