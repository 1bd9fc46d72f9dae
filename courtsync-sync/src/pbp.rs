//! Play-by-play link inference.
//!
//! After mapping, related events (assist -> made shot, rebound -> missed
//! shot, ...) are linked by scanning backward over a bounded window of prior
//! events in the same period. The clock counts down, so
//! `delta = prev_clock - current_clock` is positive when `prev` happened
//! earlier in wall time. First matching rule wins; period boundaries are
//! never crossed.

use crate::parse::parse_clock_seconds;
use crate::types::{EventType, RawPBPEvent};

/// Backward scan bound. Ten events is enough to cover any realistic
/// shot/rebound/putback cluster; only tests override it.
pub const LINK_WINDOW: usize = 10;

pub fn infer_links(events: &mut [RawPBPEvent]) {
    infer_links_windowed(events, LINK_WINDOW);
}

pub fn infer_links_windowed(events: &mut [RawPBPEvent], window: usize) {
    for i in 0..events.len() {
        let current = events[i].clone();
        let current_clock = parse_clock_seconds(&current.clock);

        let mut target = None;
        for j in (i.saturating_sub(window)..i).rev() {
            let prev = &events[j];
            if prev.period != current.period {
                continue;
            }

            let delta = parse_clock_seconds(&prev.clock) - current_clock;
            if linked(&current, prev, delta) {
                target = Some(prev.event_number);
                break;
            }
        }

        if let Some(event_number) = target {
            events[i].related_event_numbers = Some(vec![event_number]);
        }
    }
}

fn linked(current: &RawPBPEvent, prev: &RawPBPEvent, delta: f64) -> bool {
    match current.event_type {
        // Assist after a made shot by the same team.
        EventType::Assist => {
            prev.event_type == EventType::Shot
                && prev.success == Some(true)
                && current.team_external_id == prev.team_external_id
                && (0.0..=2.0).contains(&delta)
        }
        // Rebound after a missed shot, either team.
        EventType::Rebound => {
            prev.event_type == EventType::Shot
                && prev.success == Some(false)
                && (0.0..=3.0).contains(&delta)
        }
        // Steal after a turnover by the other team.
        EventType::Steal => {
            prev.event_type == EventType::Turnover
                && current.team_external_id != prev.team_external_id
                && (0.0..=2.0).contains(&delta)
        }
        // Block recorded alongside the missed shot it caused.
        EventType::Block => {
            prev.event_type == EventType::Shot
                && prev.success == Some(false)
                && delta.abs() <= 1.0
        }
        // Free throw following the foul that awarded it.
        EventType::FreeThrow => {
            prev.event_type == EventType::Foul && (0.0..=5.0).contains(&delta)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(
        number: i32,
        period: i32,
        clock: &str,
        kind: EventType,
        team: &str,
        success: Option<bool>,
    ) -> RawPBPEvent {
        let mut e = RawPBPEvent::new(number, period, clock, kind);
        e.team_external_id = Some(team.to_string());
        e.success = success;
        e
    }

    #[test]
    fn assist_rebound_and_steal_chains() {
        let mut events = vec![
            event(1, 1, "09:45", EventType::Shot, "100", Some(true)),
            event(2, 1, "09:44", EventType::Assist, "100", None),
            event(3, 1, "09:30", EventType::Shot, "101", Some(false)),
            event(4, 1, "09:28", EventType::Rebound, "101", None),
            event(5, 1, "05:30", EventType::Turnover, "100", None),
            event(6, 1, "05:29", EventType::Steal, "101", None),
        ];
        infer_links(&mut events);

        assert_eq!(events[1].related_event_numbers, Some(vec![1]));
        assert_eq!(events[3].related_event_numbers, Some(vec![3]));
        assert_eq!(events[5].related_event_numbers, Some(vec![5]));
        assert_eq!(events[0].related_event_numbers, None);
        assert_eq!(events[2].related_event_numbers, None);
        assert_eq!(events[4].related_event_numbers, None);
    }

    #[test]
    fn assist_requires_same_team_and_made_shot() {
        let mut events = vec![
            event(1, 1, "08:00", EventType::Shot, "100", Some(true)),
            event(2, 1, "07:59", EventType::Assist, "101", None),
        ];
        infer_links(&mut events);
        assert_eq!(events[1].related_event_numbers, None);

        let mut events = vec![
            event(1, 1, "08:00", EventType::Shot, "100", Some(false)),
            event(2, 1, "07:59", EventType::Assist, "100", None),
        ];
        infer_links(&mut events);
        assert_eq!(events[1].related_event_numbers, None);
    }

    #[test]
    fn block_links_at_identical_clock() {
        let mut events = vec![
            event(1, 2, "04:10", EventType::Shot, "100", Some(false)),
            event(2, 2, "04:10", EventType::Block, "101", None),
        ];
        infer_links(&mut events);
        assert_eq!(events[1].related_event_numbers, Some(vec![1]));
    }

    #[test]
    fn free_throw_links_to_foul_within_five_seconds() {
        let mut events = vec![
            event(1, 4, "01:30", EventType::Foul, "100", None),
            event(2, 4, "01:26", EventType::FreeThrow, "101", Some(true)),
        ];
        infer_links(&mut events);
        assert_eq!(events[1].related_event_numbers, Some(vec![1]));
    }

    #[test]
    fn links_never_cross_periods() {
        let mut events = vec![
            event(1, 1, "00:01", EventType::Shot, "100", Some(false)),
            event(2, 2, "10:00", EventType::Rebound, "101", None),
        ];
        infer_links(&mut events);
        assert_eq!(events[1].related_event_numbers, None);
    }

    #[test]
    fn scan_respects_the_window() {
        let mut events = vec![event(1, 1, "09:00", EventType::Shot, "100", Some(false))];
        for n in 2..=11 {
            events.push(event(n, 1, "09:00", EventType::Timeout, "100", None));
        }
        events.push(event(12, 1, "09:00", EventType::Rebound, "101", None));

        let mut narrow = events.clone();
        infer_links_windowed(&mut narrow, 5);
        assert_eq!(narrow[11].related_event_numbers, None);

        infer_links_windowed(&mut events, 11);
        assert_eq!(events[11].related_event_numbers, Some(vec![1]));
    }

    #[test]
    fn rebound_window_excludes_old_shots() {
        let mut events = vec![
            event(1, 1, "09:40", EventType::Shot, "100", Some(false)),
            event(2, 1, "09:30", EventType::Rebound, "101", None),
        ];
        infer_links(&mut events);
        // 10 seconds is past the 3-second rebound bound.
        assert_eq!(events[1].related_event_numbers, None);
    }
}
