// src/services/fields.rs

//! Parsers for the packed multi-value cells of a timetable row.
//!
//! Source cells carry several weekdays, time spans and classrooms in one
//! piece of loosely delimited text. Each parser extracts what it can and
//! degrades to a passthrough or empty value instead of failing. The
//! `*_outcome` variants report when such a fallback was taken so callers
//! can count low-confidence parses.

use regex::Regex;

use crate::error::Result;
use crate::models::{ParsingConfig, TimeSpan};

/// Which degraded path a parser took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fallback {
    /// Time cell split on a single `-` because no pattern matched
    DashSplit,
    /// Classroom cell split on `/` and `,` because the token pattern missed
    DelimiterSplit,
    /// Cell text passed through unparsed
    Passthrough,
    /// End time could not be read as `H:M` and was left as is
    MinuteUnparsed,
}

/// A parsed value plus the fallback used to produce it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub value: T,
    pub fallback: Option<Fallback>,
}

impl<T> Parsed<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            fallback: None,
        }
    }

    fn degraded(value: T, fallback: Fallback) -> Self {
        Self {
            value,
            fallback: Some(fallback),
        }
    }
}

/// Compiled cell parsers for one parsing configuration.
#[derive(Debug, Clone)]
pub struct FieldParsers {
    weekdays: Vec<String>,
    time_patterns: Vec<Regex>,
    classroom_pattern: Regex,
}

impl FieldParsers {
    /// Compile parsers from configuration.
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        let time_patterns = config
            .time_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            weekdays: config.weekdays.clone(),
            time_patterns,
            classroom_pattern: Regex::new(&config.classroom_pattern)?,
        })
    }

    /// Weekdays mentioned in `text`, in canonical order.
    pub fn parse_days(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.weekdays
            .iter()
            .filter(|day| text.contains(day.as_str()))
            .cloned()
            .collect()
    }

    pub fn parse_time_spans(&self, text: &str) -> Vec<TimeSpan> {
        self.parse_time_spans_outcome(text).value
    }

    /// Time spans in `text`, using only the first pattern that matches.
    ///
    /// End times are advanced by one minute. When nothing matches, a cell with
    /// exactly one `-` between two non-empty parts is read as a single span.
    pub fn parse_time_spans_outcome(&self, text: &str) -> Parsed<Vec<TimeSpan>> {
        if text.is_empty() {
            return Parsed::clean(Vec::new());
        }

        for pattern in &self.time_patterns {
            let mut unparsed_end = false;
            let spans: Vec<TimeSpan> = pattern
                .captures_iter(text)
                .filter_map(|caps| {
                    let (span, unparsed) =
                        make_span(caps.get(1)?.as_str(), caps.get(2)?.as_str());
                    unparsed_end |= unparsed;
                    Some(span)
                })
                .collect();

            if !spans.is_empty() {
                return if unparsed_end {
                    Parsed::degraded(spans, Fallback::MinuteUnparsed)
                } else {
                    Parsed::clean(spans)
                };
            }
        }

        let parts: Vec<&str> = text.split('-').map(str::trim).collect();
        if let [start, end] = parts.as_slice() {
            if !start.is_empty() && !end.is_empty() {
                let (span, _) = make_span(start, end);
                return Parsed::degraded(vec![span], Fallback::DashSplit);
            }
        }

        Parsed::degraded(Vec::new(), Fallback::Passthrough)
    }

    pub fn parse_classrooms(&self, text: &str) -> Vec<String> {
        self.parse_classrooms_outcome(text).value
    }

    /// Classroom tokens in `text`.
    ///
    /// Only empty input yields an empty list.
    pub fn parse_classrooms_outcome(&self, text: &str) -> Parsed<Vec<String>> {
        if text.is_empty() {
            return Parsed::clean(Vec::new());
        }

        let matches: Vec<String> = self
            .classroom_pattern
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        if !matches.is_empty() {
            return Parsed::clean(matches);
        }

        if text.chars().count() > 2 {
            let split: Vec<String> = text
                .split(['/', ','])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !split.is_empty() {
                return Parsed::degraded(split, Fallback::DelimiterSplit);
            }
        }

        Parsed::degraded(vec![text.trim().to_string()], Fallback::Passthrough)
    }
}

/// Build a span, advancing the end; the flag is set when the end was malformed.
fn make_span(start: &str, end: &str) -> (TimeSpan, bool) {
    let advanced = advance_minute_outcome(end);
    let unparsed = advanced.fallback.is_some();
    (TimeSpan::new(start, advanced.value), unparsed)
}

/// Collapse a building name that was scraped twice in a row.
///
/// `"ABCABC"` becomes `"ABC"`. The check only runs when the length is a
/// multiple of the number of distinct characters.
pub fn clean_building(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return String::new();
    }

    let mut distinct = chars.clone();
    distinct.sort_unstable();
    distinct.dedup();

    if chars.len() % distinct.len() == 0 {
        let half = chars.len() / 2;
        if chars[..half] == chars[half..] {
            return chars[..half].iter().collect();
        }
    }
    text.to_string()
}

pub fn advance_minute(hhmm: &str) -> String {
    advance_minute_outcome(hhmm).value
}

/// Add one minute to an `H:M` time, wrapping at the hour and at midnight.
///
/// Malformed input, including numbers too large to advance, comes back
/// unchanged.
pub fn advance_minute_outcome(hhmm: &str) -> Parsed<String> {
    let advanced = hhmm.split_once(':').and_then(|(h, m)| {
        let hours: u32 = h.trim().parse().ok()?;
        let minutes: u32 = m.trim().parse().ok()?;
        next_minute(hours, minutes)
    });

    match advanced {
        Some((hours, minutes)) => Parsed::clean(format!("{hours:02}:{minutes:02}")),
        None => Parsed::degraded(hhmm.to_string(), Fallback::MinuteUnparsed),
    }
}

fn next_minute(hours: u32, minutes: u32) -> Option<(u32, u32)> {
    let minutes = minutes.checked_add(1)?;
    if minutes < 60 {
        return Some((hours, minutes));
    }
    let hours = hours.checked_add(1)?;
    Some((if hours >= 24 { 0 } else { hours }, 0))
}
