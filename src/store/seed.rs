//! Sample event data
//! Fixtures scheduled relative to the current day so a fresh ledger has something to bet on

use crate::error::LedgerResult;
use crate::models::{Event, EventStatus, Market, Selection};
use crate::store::LedgerStore;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::info;
use uuid::Uuid;

fn market(name: &str, selections: &[(&str, f64)]) -> Market {
    Market {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        selections: selections
            .iter()
            .map(|(name, odds)| Selection::new(Uuid::new_v4().to_string(), *name, *odds))
            .collect(),
    }
}

fn event(
    name: &str,
    sport_type: &str,
    competition: &str,
    start_time: DateTime<Utc>,
    markets: Vec<Market>,
) -> Event {
    Event {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        sport_type: sport_type.to_string(),
        competition: competition.to_string(),
        start_time,
        status: EventStatus::Upcoming,
        markets,
    }
}

/// `days` after `now`, at the given UTC wall-clock time.
fn at(now: DateTime<Utc>, days: i64, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    (now + Duration::days(days))
        .date_naive()
        .and_time(time)
        .and_utc()
}

pub fn sample_events(now: DateTime<Utc>) -> Vec<Event> {
    vec![
        event(
            "Barcelona vs Real Madrid",
            "football",
            "La Liga",
            at(now, 1, 16, 0),
            vec![
                market(
                    "Match Winner",
                    &[("Barcelona", 2.1), ("Draw", 3.5), ("Real Madrid", 3.2)],
                ),
                market("Both Teams to Score", &[("Yes", 1.7), ("No", 2.1)]),
            ],
        ),
        event(
            "Lakers vs Celtics",
            "basketball",
            "NBA",
            at(now, 1, 18, 30),
            vec![
                market("Match Winner", &[("Lakers", 1.8), ("Celtics", 2.1)]),
                market("Total Points", &[("Over 215.5", 1.9), ("Under 215.5", 1.9)]),
            ],
        ),
        event(
            "Nadal vs Djokovic",
            "tennis",
            "ATP Masters",
            at(now, 1, 14, 0),
            vec![
                market("Match Winner", &[("Nadal", 2.2), ("Djokovic", 1.7)]),
                market(
                    "Set Betting",
                    &[
                        ("Nadal 2-0", 3.5),
                        ("Nadal 2-1", 4.2),
                        ("Djokovic 2-0", 2.7),
                        ("Djokovic 2-1", 3.8),
                    ],
                ),
            ],
        ),
        event(
            "Ferrari vs Red Bull Racing",
            "motorsport",
            "Formula 1",
            at(now, 1, 13, 0),
            vec![market(
                "Race Winner",
                &[
                    ("Leclerc (Ferrari)", 2.5),
                    ("Verstappen (Red Bull)", 1.8),
                    ("Hamilton (Mercedes)", 4.2),
                ],
            )],
        ),
        event(
            "Medvedev vs Alcaraz",
            "tennis",
            "ATP Masters",
            at(now, 6, 13, 30),
            vec![market("Match Winner", &[("Medvedev", 3.1), ("Alcaraz", 1.4)])],
        ),
        event(
            "Tyson vs Joshua",
            "boxing",
            "Heavyweight Championship",
            at(now, 6, 22, 0),
            vec![market(
                "Fight Outcome",
                &[("Tyson Win", 1.9), ("Joshua Win", 2.1), ("Draw", 15.0)],
            )],
        ),
    ]
}

/// Insert the sample events when the ledger holds no events yet.
/// Returns the number of events inserted.
pub fn seed_if_empty(store: &dyn LedgerStore, now: DateTime<Utc>) -> LedgerResult<usize> {
    if store.count_events()? > 0 {
        return Ok(0);
    }

    let events = sample_events(now);
    for event in &events {
        store.insert_event(event)?;
    }
    info!("🌱 Seeded {} sample events", events.len());
    Ok(events.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteLedgerStore;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_sample_events_are_well_formed() {
        let now = Utc.with_ymd_and_hms(2026, 5, 17, 9, 0, 0).unwrap();
        let events = sample_events(now);

        let mut selection_ids = HashSet::new();
        for event in &events {
            assert_eq!(event.status, EventStatus::Upcoming);
            assert!(event.start_time > now);
            assert!(!event.markets.is_empty());
            for market in &event.markets {
                assert!(market.selections.len() >= 2);
                for selection in &market.selections {
                    assert!(selection.odds > 1.0);
                    assert!(selection.result.is_none());
                    assert!(selection_ids.insert(selection.id.clone()));
                }
            }
        }

        let clasico = &events[0];
        assert_eq!(
            clasico.start_time,
            Utc.with_ymd_and_hms(2026, 5, 18, 16, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_seed_only_populates_empty_store() {
        let store = SqliteLedgerStore::in_memory().unwrap();
        let now = Utc::now();

        let inserted = seed_if_empty(&store, now).unwrap();
        assert_eq!(inserted, sample_events(now).len());
        assert_eq!(seed_if_empty(&store, now).unwrap(), 0);
        assert_eq!(store.count_events().unwrap(), inserted);
    }
}
