// libs/schedule-cell/src/services/generator.rs
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::{AvailabilityTemplate, SchedulingError, Slot};
use shared_store::{SlotStore, TemplateStore, TimelineLocks};

use crate::models::ProposedSlot;

/// Expand availability templates over `[from, to]` (inclusive) into slot
/// proposals.
///
/// For each date, the template matching that weekday (at most one) is walked
/// from its start time in slot-duration steps; a step whose end would pass
/// the template's end time is dropped, so no partial trailing slot is ever
/// proposed. A candidate whose exact boundaries already exist in `existing`
/// is skipped, which makes repeated generation idempotent.
///
/// Pure: no store access, no side effects. Callers persist the proposals.
pub fn generate(
    templates: &[AvailabilityTemplate],
    existing: &[Slot],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<ProposedSlot> {
    let mut proposals = Vec::new();

    let mut date = from;
    while date <= to {
        if let Some(template) = templates.iter().find(|t| t.day_of_week == date.weekday()) {
            propose_day(template, existing, date, &mut proposals);
        }
        date += Duration::days(1);
    }

    proposals
}

fn propose_day(
    template: &AvailabilityTemplate,
    existing: &[Slot],
    date: NaiveDate,
    proposals: &mut Vec<ProposedSlot>,
) {
    let step = i64::from(template.slot_duration_minutes);
    let mut current = template.start_time;

    loop {
        let (slot_end_time, wrapped) = current.overflowing_add_signed(Duration::minutes(step));
        if wrapped != 0 || slot_end_time > template.end_time {
            break;
        }

        let start = date.and_time(current).and_utc();
        let end = date.and_time(slot_end_time).and_utc();

        let already_exists = existing
            .iter()
            .any(|slot| slot.matches_range(start, end));
        if !already_exists {
            proposals.push(ProposedSlot {
                doctor_id: template.doctor_id,
                start_time: start,
                end_time: end,
            });
        }

        current = slot_end_time;
    }
}

/// Persisting wrapper around [`generate`]: resolves the doctor's templates
/// and existing slots, expands, and stores the proposals while holding the
/// doctor's timeline lock, so concurrent generation over overlapping ranges
/// cannot create duplicates.
pub struct SlotGenerationService {
    templates: Arc<dyn TemplateStore>,
    slots: Arc<dyn SlotStore>,
    locks: Arc<TimelineLocks>,
}

impl SlotGenerationService {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        slots: Arc<dyn SlotStore>,
        locks: Arc<TimelineLocks>,
    ) -> Self {
        Self { templates, slots, locks }
    }

    pub async fn materialize(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Slot>, SchedulingError> {
        if from > to {
            return Err(SchedulingError::validation("Start date must not be after end date"));
        }
        debug!("Generating slots for doctor {} from {} to {}", doctor_id, from, to);

        let _guard = self.locks.acquire(doctor_id).await;

        let templates = self.templates.list_for_doctor(doctor_id).await?;
        let existing = self
            .slots
            .list_overlapping(doctor_id, range_start(from), range_end(to))
            .await?;

        let proposals = generate(&templates, &existing, from, to);
        let new_slots: Vec<Slot> = proposals
            .into_iter()
            .map(|p| Slot::new(p.doctor_id, p.start_time, p.end_time))
            .collect();

        self.slots.insert_many(new_slots.clone()).await?;

        info!(
            "Generated {} new slots for doctor {} between {} and {}",
            new_slots.len(),
            doctor_id,
            from,
            to
        );
        Ok(new_slots)
    }
}

fn range_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc()
}

fn range_end(date: NaiveDate) -> DateTime<Utc> {
    (date + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .expect("midnight is valid")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};
    use shared_utils::test_support::dt;

    fn template(
        doctor_id: Uuid,
        day: Weekday,
        start: (u32, u32),
        end: (u32, u32),
        duration: u32,
    ) -> AvailabilityTemplate {
        AvailabilityTemplate {
            id: Uuid::new_v4(),
            doctor_id,
            day_of_week: day,
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            slot_duration_minutes: duration,
        }
    }

    // 2025-03-10 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn expands_window_into_consecutive_slots() {
        let doctor = Uuid::new_v4();
        let templates = vec![template(doctor, Weekday::Mon, (9, 0), (12, 0), 30)];

        let proposals = generate(&templates, &[], monday(), monday());

        assert_eq!(proposals.len(), 6);
        assert_eq!(proposals[0].start_time, dt(2025, 3, 10, 9, 0));
        assert_eq!(proposals[0].end_time, dt(2025, 3, 10, 9, 30));
        assert_eq!(proposals[5].start_time, dt(2025, 3, 10, 11, 30));
        assert_eq!(proposals[5].end_time, dt(2025, 3, 10, 12, 0));
        assert!(proposals.iter().all(|p| p.end_time <= dt(2025, 3, 10, 12, 0)));
    }

    #[test]
    fn drops_partial_trailing_slot() {
        let doctor = Uuid::new_v4();
        // 45-minute slots in a 2-hour window: 10:00 and 10:45 fit; the
        // 11:30 step would end past 12:00 and must not be proposed.
        let templates = vec![template(doctor, Weekday::Mon, (10, 0), (12, 0), 45)];

        let proposals = generate(&templates, &[], monday(), monday());

        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals.last().unwrap().end_time, dt(2025, 3, 10, 11, 30));
    }

    #[test]
    fn skips_days_without_a_template() {
        let doctor = Uuid::new_v4();
        let templates = vec![template(doctor, Weekday::Tue, (9, 0), (10, 0), 30)];

        // Monday through Wednesday, template only on Tuesday.
        let proposals = generate(&templates, &[], monday(), monday() + Duration::days(2));

        assert_eq!(proposals.len(), 2);
        assert!(proposals.iter().all(|p| p.start_time.date_naive() == monday() + Duration::days(1)));
    }

    #[test]
    fn existing_exact_boundaries_are_skipped() {
        let doctor = Uuid::new_v4();
        let templates = vec![template(doctor, Weekday::Mon, (9, 0), (10, 30), 30)];
        let first_pass = generate(&templates, &[], monday(), monday());
        assert_eq!(first_pass.len(), 3);

        let persisted: Vec<Slot> = first_pass
            .iter()
            .map(|p| Slot::new(p.doctor_id, p.start_time, p.end_time))
            .collect();

        let second_pass = generate(&templates, &persisted, monday(), monday());
        assert!(second_pass.is_empty());
    }

    #[test]
    fn overlapping_but_inexact_slot_does_not_suppress_generation() {
        let doctor = Uuid::new_v4();
        let templates = vec![template(doctor, Weekday::Mon, (9, 0), (10, 0), 30)];
        // Ad-hoc slot 9:15-9:45 overlaps both candidates but matches neither.
        let existing = vec![Slot::new(doctor, dt(2025, 3, 10, 9, 15), dt(2025, 3, 10, 9, 45))];

        let proposals = generate(&templates, &existing, monday(), monday());
        assert_eq!(proposals.len(), 2);
    }

    #[test]
    fn range_is_inclusive_of_both_endpoints() {
        let doctor = Uuid::new_v4();
        let templates = vec![
            template(doctor, Weekday::Mon, (9, 0), (9, 30), 30),
            template(doctor, Weekday::Fri, (9, 0), (9, 30), 30),
        ];

        let friday = monday() + Duration::days(4);
        let proposals = generate(&templates, &[], monday(), friday);

        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].start_time.date_naive(), monday());
        assert_eq!(proposals[1].start_time.date_naive(), friday);
    }
}
