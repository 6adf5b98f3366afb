// libs/schedule-cell/tests/schedule_test.rs

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, NaiveTime, Weekday};
use uuid::Uuid;

use schedule_cell::models::{
    CreateBlockedIntervalRequest, CreateSlotRequest, SetAvailabilityRequest,
};
use schedule_cell::{
    AvailabilityTemplateService, BlockedIntervalService, SlotCalendarService,
    SlotGenerationService,
};
use shared_models::collaborators::InMemoryDirectory;
use shared_models::{AppointmentStatus, SchedulingError, SlotViewStatus};
use shared_store::{
    AppointmentStore, BlockedIntervalStore, InMemoryAppointmentStore,
    InMemoryBlockedIntervalStore, InMemorySlotStore, InMemoryTemplateStore, SlotStore,
    TemplateStore, TimelineLocks,
};
use shared_utils::test_support::{appointment, blocked_interval, dt};

struct TestCell {
    templates: Arc<InMemoryTemplateStore>,
    slots: Arc<InMemorySlotStore>,
    blocked: Arc<InMemoryBlockedIntervalStore>,
    appointments: Arc<InMemoryAppointmentStore>,
    directory: Arc<InMemoryDirectory>,
    availability: AvailabilityTemplateService,
    generation: Arc<SlotGenerationService>,
    calendar: SlotCalendarService,
    blocking: BlockedIntervalService,
    doctor: Uuid,
}

async fn setup() -> TestCell {
    let templates = Arc::new(InMemoryTemplateStore::new());
    let slots = Arc::new(InMemorySlotStore::new());
    let blocked = Arc::new(InMemoryBlockedIntervalStore::new());
    let appointments = Arc::new(InMemoryAppointmentStore::new());
    let directory = Arc::new(InMemoryDirectory::new());
    let locks = Arc::new(TimelineLocks::new());

    let doctor = directory.add_doctor("Dr. Test").await;

    TestCell {
        availability: AvailabilityTemplateService::new(templates.clone(), directory.clone()),
        generation: Arc::new(SlotGenerationService::new(
            templates.clone(),
            slots.clone(),
            locks.clone(),
        )),
        calendar: SlotCalendarService::new(
            slots.clone(),
            blocked.clone(),
            appointments.clone(),
            directory.clone(),
        ),
        blocking: BlockedIntervalService::new(blocked.clone(), directory.clone()),
        templates,
        slots,
        blocked,
        appointments,
        directory,
        doctor,
    }
}

fn monday() -> NaiveDate {
    // 2025-03-10 is a Monday.
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn morning_template(doctor: Uuid) -> SetAvailabilityRequest {
    SetAvailabilityRequest {
        doctor_id: doctor,
        day_of_week: Weekday::Mon,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        slot_duration_minutes: 30,
    }
}

#[tokio::test]
async fn setting_availability_twice_replaces_in_place() {
    let cell = setup().await;

    let first = cell.availability.set_availability(morning_template(cell.doctor)).await.unwrap();

    let mut changed = morning_template(cell.doctor);
    changed.start_time = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
    changed.slot_duration_minutes = 20;
    let second = cell.availability.set_availability(changed).await.unwrap();

    assert_eq!(first.id, second.id);

    let listed = cell.availability.get_for_doctor(cell.doctor).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].start_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    assert_eq!(listed[0].slot_duration_minutes, 20);
}

#[tokio::test]
async fn availability_window_is_validated() {
    let cell = setup().await;

    let mut inverted = morning_template(cell.doctor);
    inverted.end_time = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
    assert_matches!(
        cell.availability.set_availability(inverted).await,
        Err(SchedulingError::Validation(_))
    );

    let mut zero = morning_template(cell.doctor);
    zero.slot_duration_minutes = 0;
    assert_matches!(
        cell.availability.set_availability(zero).await,
        Err(SchedulingError::Validation(_))
    );

    let mut unknown = morning_template(cell.doctor);
    unknown.doctor_id = Uuid::new_v4();
    assert_matches!(
        cell.availability.set_availability(unknown).await,
        Err(SchedulingError::NotFound(_))
    );
}

#[tokio::test]
async fn materialize_expands_and_is_idempotent() {
    let cell = setup().await;
    cell.availability.set_availability(morning_template(cell.doctor)).await.unwrap();

    let first = cell.generation.materialize(cell.doctor, monday(), monday()).await.unwrap();
    assert_eq!(first.len(), 6);
    assert_eq!(first[0].start_time, dt(2025, 3, 10, 9, 0));
    assert!(first.iter().all(|s| s.available));

    let second = cell.generation.materialize(cell.doctor, monday(), monday()).await.unwrap();
    assert!(second.is_empty());

    let stored = cell.slots.list_for_doctor(cell.doctor).await.unwrap();
    assert_eq!(stored.len(), 6);
}

#[tokio::test]
async fn concurrent_materialize_does_not_duplicate_slots() {
    let cell = setup().await;
    cell.availability.set_availability(morning_template(cell.doctor)).await.unwrap();

    let (a, b) = futures::join!(
        cell.generation.materialize(cell.doctor, monday(), monday()),
        cell.generation.materialize(cell.doctor, monday(), monday()),
    );
    a.unwrap();
    b.unwrap();

    let stored = cell.slots.list_for_doctor(cell.doctor).await.unwrap();
    assert_eq!(stored.len(), 6);
}

#[tokio::test]
async fn blocked_intervals_validate_and_answer_overlap_queries() {
    let cell = setup().await;

    assert_matches!(
        cell.blocking
            .create(CreateBlockedIntervalRequest {
                doctor_id: cell.doctor,
                start_time: dt(2025, 3, 10, 12, 0),
                end_time: dt(2025, 3, 10, 12, 0),
                reason: "Nothing".to_string(),
            })
            .await,
        Err(SchedulingError::Validation(_))
    );

    cell.blocking
        .create(CreateBlockedIntervalRequest {
            doctor_id: cell.doctor,
            start_time: dt(2025, 3, 10, 9, 0),
            end_time: dt(2025, 3, 10, 9, 30),
            reason: "Lunch".to_string(),
        })
        .await
        .unwrap();

    assert!(cell
        .blocking
        .is_blocked(cell.doctor, dt(2025, 3, 10, 9, 15), dt(2025, 3, 10, 9, 45))
        .await
        .unwrap());
    // Half-open ranges: touching the boundary is not blocked.
    assert!(!cell
        .blocking
        .is_blocked(cell.doctor, dt(2025, 3, 10, 9, 30), dt(2025, 3, 10, 10, 0))
        .await
        .unwrap());
}

#[tokio::test]
async fn schedule_view_ranks_blocked_over_booked_over_free() {
    let cell = setup().await;
    let patient = cell.directory.add_patient("Pat").await;

    for hour in [9, 10, 11] {
        cell.calendar
            .create_slot(CreateSlotRequest {
                doctor_id: cell.doctor,
                start_time: dt(2025, 3, 10, hour, 0),
                end_time: dt(2025, 3, 10, hour, 30),
            })
            .await
            .unwrap();
    }

    // 9:00 is blocked for lunch even though an appointment also overlaps it.
    cell.blocked
        .insert(blocked_interval(
            cell.doctor,
            dt(2025, 3, 10, 9, 0),
            dt(2025, 3, 10, 9, 30),
            "Lunch",
        ))
        .await
        .unwrap();
    cell.appointments
        .insert(appointment(
            patient,
            cell.doctor,
            dt(2025, 3, 10, 9, 0),
            dt(2025, 3, 10, 9, 30),
            AppointmentStatus::Confirmed,
        ))
        .await
        .unwrap();
    let booked = appointment(
        patient,
        cell.doctor,
        dt(2025, 3, 10, 10, 0),
        dt(2025, 3, 10, 10, 30),
        AppointmentStatus::Pending,
    );
    cell.appointments.insert(booked.clone()).await.unwrap();

    let views = cell
        .calendar
        .schedule_with_status(cell.doctor, dt(2025, 3, 10, 0, 0), dt(2025, 3, 11, 0, 0))
        .await
        .unwrap();
    assert_eq!(views.len(), 3);

    assert_eq!(views[0].status, SlotViewStatus::Blocked);
    assert_eq!(views[0].blocked_reason.as_deref(), Some("Lunch"));
    assert!(!views[0].available);

    assert_eq!(views[1].status, SlotViewStatus::Booked);
    assert_eq!(views[1].appointment_id, Some(booked.id));
    assert!(!views[1].available);

    assert_eq!(views[2].status, SlotViewStatus::Free);
    assert!(views[2].available);
}

#[tokio::test]
async fn bulk_delete_is_all_or_nothing() {
    let cell = setup().await;
    let patient = cell.directory.add_patient("Pat").await;

    let free = cell
        .calendar
        .create_slot(CreateSlotRequest {
            doctor_id: cell.doctor,
            start_time: dt(2025, 3, 10, 9, 0),
            end_time: dt(2025, 3, 10, 9, 30),
        })
        .await
        .unwrap();
    let taken = cell
        .calendar
        .create_slot(CreateSlotRequest {
            doctor_id: cell.doctor,
            start_time: dt(2025, 3, 10, 10, 0),
            end_time: dt(2025, 3, 10, 10, 30),
        })
        .await
        .unwrap();
    cell.appointments
        .insert(appointment(
            patient,
            cell.doctor,
            dt(2025, 3, 10, 10, 0),
            dt(2025, 3, 10, 10, 30),
            AppointmentStatus::Confirmed,
        ))
        .await
        .unwrap();

    let err = cell.calendar.delete_slots(&[free.id, taken.id]).await.unwrap_err();
    match err {
        SchedulingError::Conflict(message) => {
            assert!(message.contains(&taken.id.to_string()));
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    // Neither slot was deleted.
    let remaining = cell.slots.list_for_doctor(cell.doctor).await.unwrap();
    assert_eq!(remaining.len(), 2);

    // Without the conflicting slot the batch goes through.
    cell.calendar.delete_slots(&[free.id]).await.unwrap();
    let remaining = cell.slots.list_for_doctor(cell.doctor).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, taken.id);
}

#[tokio::test]
async fn availability_toggles_and_range_listing() {
    let cell = setup().await;

    let slot = cell
        .calendar
        .create_slot(CreateSlotRequest {
            doctor_id: cell.doctor,
            start_time: dt(2025, 3, 10, 9, 0),
            end_time: dt(2025, 3, 10, 9, 30),
        })
        .await
        .unwrap();

    cell.calendar.mark_unavailable(slot.id).await.unwrap();
    let open = cell
        .calendar
        .available_slots(cell.doctor, dt(2025, 3, 10, 0, 0), dt(2025, 3, 11, 0, 0))
        .await
        .unwrap();
    assert!(open.is_empty());

    cell.calendar.mark_available(slot.id).await.unwrap();
    let open = cell
        .calendar
        .available_slots(cell.doctor, dt(2025, 3, 10, 0, 0), dt(2025, 3, 11, 0, 0))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);

    assert_matches!(
        cell.calendar.mark_available(Uuid::new_v4()).await,
        Err(SchedulingError::NotFound(_))
    );
}

#[tokio::test]
async fn deleting_availability_for_day_stops_future_generation() {
    let cell = setup().await;
    cell.availability.set_availability(morning_template(cell.doctor)).await.unwrap();
    cell.availability.delete_for_day(cell.doctor, Weekday::Mon).await.unwrap();

    let generated = cell
        .generation
        .materialize(cell.doctor, monday(), monday() + Duration::days(6))
        .await
        .unwrap();
    assert!(generated.is_empty());

    assert!(cell.templates.find_for_day(cell.doctor, Weekday::Mon).await.unwrap().is_none());
}
