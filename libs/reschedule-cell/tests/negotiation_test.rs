// libs/reschedule-cell/tests/negotiation_test.rs

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use appointment_cell::{AppointmentBookingService, BookAppointmentRequest};
use reschedule_cell::{
    BestEffortReconciler, CreateRescheduleRequest, RescheduleDecision,
    RescheduleNegotiationService,
};
use shared_config::AppConfig;
use shared_models::collaborators::{
    InMemoryDirectory, NotificationCategory, RecordingNotifier, StaticCatalog,
};
use shared_models::{Appointment, RescheduleStatus, SchedulingError, Slot};
use shared_store::{
    InMemoryAppointmentStore, InMemoryRescheduleRequestStore, InMemorySlotStore, SlotStore,
    TimelineLocks,
};
use shared_utils::test_support::{booked_slot, dt, slot};
use shared_utils::{Clock, FixedClock};

struct TestCell {
    negotiation: RescheduleNegotiationService,
    booking: Arc<AppointmentBookingService>,
    slots: Arc<InMemorySlotStore>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<FixedClock>,
    doctor: Uuid,
    patient: Uuid,
}

/// Clock starts at 2025-03-01 09:00; appointments are booked for 2025-03-10.
async fn setup() -> TestCell {
    let appointments = Arc::new(InMemoryAppointmentStore::new());
    let slots = Arc::new(InMemorySlotStore::new());
    let requests = Arc::new(InMemoryRescheduleRequestStore::new());
    let directory = Arc::new(InMemoryDirectory::new());
    let catalog = Arc::new(StaticCatalog::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(FixedClock::at(dt(2025, 3, 1, 9, 0)));
    let locks = Arc::new(TimelineLocks::new());

    let doctor = directory.add_doctor("Dr. Test").await;
    let patient = directory.add_patient("Pat Example").await;

    let booking = Arc::new(AppointmentBookingService::new(
        appointments.clone(),
        directory.clone(),
        catalog,
        notifier.clone(),
        locks.clone(),
        clock.clone() as Arc<dyn Clock>,
        AppConfig::default(),
    ));

    let negotiation = RescheduleNegotiationService::new(
        requests,
        appointments.clone(),
        slots.clone(),
        booking.clone(),
        Arc::new(BestEffortReconciler),
        directory,
        notifier.clone(),
        locks,
        clock.clone() as Arc<dyn Clock>,
        AppConfig::default(),
    );

    TestCell { negotiation, booking, slots, notifier, clock, doctor, patient }
}

async fn booked(cell: &TestCell, start: DateTime<Utc>, end: DateTime<Utc>) -> Appointment {
    cell.booking
        .create_appointment(BookAppointmentRequest {
            patient_id: cell.patient,
            doctor_id: cell.doctor,
            service_id: None,
            start_time: start,
            end_time: end,
            notes: None,
        })
        .await
        .unwrap()
}

fn move_to(
    appointment: &Appointment,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CreateRescheduleRequest {
    CreateRescheduleRequest {
        appointment_id: appointment.id,
        requested_start: start,
        requested_end: end,
        patient_reason: Some("Conflicting meeting".to_string()),
    }
}

#[tokio::test]
async fn create_request_persists_pending_and_notifies_doctor() {
    let cell = setup().await;
    let appointment = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;

    let request = cell
        .negotiation
        .create_request(move_to(&appointment, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30)))
        .await
        .unwrap();

    assert_eq!(request.status, RescheduleStatus::Pending);
    assert_eq!(request.original_start, dt(2025, 3, 10, 10, 0));
    assert_eq!(request.created_at, dt(2025, 3, 1, 9, 0));
    assert!(request.responded_at.is_none());

    let last = cell.notifier.sent().await.pop().unwrap();
    assert_eq!(last.user_id, cell.doctor);
    assert_eq!(last.title, "New Reschedule Request");
    assert!(last.message.contains("Pat Example"));
    assert_eq!(last.category, NotificationCategory::SystemNotification);
}

#[tokio::test]
async fn only_one_pending_request_per_appointment() {
    let cell = setup().await;
    let appointment = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;

    cell.negotiation
        .create_request(move_to(&appointment, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30)))
        .await
        .unwrap();

    assert_matches!(
        cell.negotiation
            .create_request(move_to(&appointment, dt(2025, 3, 10, 15, 0), dt(2025, 3, 10, 15, 30)))
            .await,
        Err(SchedulingError::InvalidState(_))
    );
}

#[tokio::test]
async fn requested_time_honors_the_clock_skew_tolerance() {
    let cell = setup().await;
    let appointment = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;
    let now = cell.clock.now();

    // Six minutes in the past is beyond the 5-minute tolerance.
    assert_matches!(
        cell.negotiation
            .create_request(move_to(
                &appointment,
                now - Duration::minutes(6),
                now + Duration::minutes(24),
            ))
            .await,
        Err(SchedulingError::Validation(_))
    );

    // Four minutes in the past is within it.
    cell.negotiation
        .create_request(move_to(
            &appointment,
            now - Duration::minutes(4),
            now + Duration::minutes(26),
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn requested_range_must_be_free_of_other_appointments() {
    let cell = setup().await;
    let appointment = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;
    booked(&cell, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30)).await;

    assert_matches!(
        cell.negotiation
            .create_request(move_to(&appointment, dt(2025, 3, 10, 14, 15), dt(2025, 3, 10, 14, 45)))
            .await,
        Err(SchedulingError::Conflict(_))
    );
}

#[tokio::test]
async fn own_booking_is_excluded_from_the_conflict_check() {
    let cell = setup().await;
    let appointment = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;

    // Shifting 15 minutes into the appointment's own range is fine.
    cell.negotiation
        .create_request(move_to(&appointment, dt(2025, 3, 10, 10, 15), dt(2025, 3, 10, 10, 45)))
        .await
        .unwrap();
}

#[tokio::test]
async fn approval_swaps_slots_and_moves_the_appointment() {
    let cell = setup().await;
    let appointment = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;

    let old_slot = booked_slot(cell.doctor, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30));
    let new_slot = slot(cell.doctor, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30));
    cell.slots.insert(old_slot.clone()).await.unwrap();
    cell.slots.insert(new_slot.clone()).await.unwrap();

    let request = cell
        .negotiation
        .create_request(move_to(&appointment, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30)))
        .await
        .unwrap();

    cell.clock.advance(Duration::minutes(30));
    let responded = cell
        .negotiation
        .respond(request.id, RescheduleDecision::Approved, Some("Fine by me".to_string()))
        .await
        .unwrap();

    assert_eq!(responded.status, RescheduleStatus::Approved);
    assert_eq!(responded.responded_at, Some(dt(2025, 3, 1, 9, 30)));
    assert_eq!(responded.doctor_response.as_deref(), Some("Fine by me"));

    let freed = cell.slots.get(old_slot.id).await.unwrap().unwrap();
    assert!(freed.available);
    assert!(freed.appointment_id.is_none());

    let reserved = cell.slots.get(new_slot.id).await.unwrap().unwrap();
    assert!(!reserved.available);
    assert_eq!(reserved.appointment_id, Some(appointment.id));

    let moved = cell.booking.get_appointment(appointment.id).await.unwrap();
    assert_eq!(moved.start_time, dt(2025, 3, 10, 14, 0));
    assert_eq!(moved.end_time, dt(2025, 3, 10, 14, 30));

    let last = cell.notifier.sent().await.pop().unwrap();
    assert_eq!(last.user_id, cell.patient);
    assert_eq!(last.title, "Reschedule Request Approved");
    assert!(last.message.contains("Fine by me"));
}

#[tokio::test]
async fn approval_synthesizes_a_slot_when_none_exists() {
    let cell = setup().await;
    let appointment = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;

    let request = cell
        .negotiation
        .create_request(move_to(&appointment, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30)))
        .await
        .unwrap();
    cell.negotiation
        .respond(request.id, RescheduleDecision::Approved, None)
        .await
        .unwrap();

    let created: Vec<Slot> = cell
        .slots
        .list_overlapping(cell.doctor, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30))
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert!(!created[0].available);
    assert_eq!(created[0].start_time, dt(2025, 3, 10, 14, 0));
    assert_eq!(created[0].end_time, dt(2025, 3, 10, 14, 30));
}

#[tokio::test]
async fn approval_fails_cleanly_when_the_slot_raced_away() {
    let cell = setup().await;
    let appointment = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;

    let request = cell
        .negotiation
        .create_request(move_to(&appointment, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30)))
        .await
        .unwrap();

    // Another booking takes the requested range before the doctor responds.
    booked(&cell, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30)).await;

    assert_matches!(
        cell.negotiation
            .respond(request.id, RescheduleDecision::Approved, None)
            .await,
        Err(SchedulingError::InvalidState(_))
    );

    // Nothing was mutated: the appointment keeps its time and the request
    // stays pending.
    let unchanged = cell.booking.get_appointment(appointment.id).await.unwrap();
    assert_eq!(unchanged.start_time, dt(2025, 3, 10, 10, 0));
    let request = cell.negotiation.get_request(request.id).await.unwrap();
    assert_eq!(request.status, RescheduleStatus::Pending);
    assert!(request.responded_at.is_none());
}

#[tokio::test]
async fn rejection_touches_nothing_but_the_request() {
    let cell = setup().await;
    let appointment = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;

    let old_slot = booked_slot(cell.doctor, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30));
    cell.slots.insert(old_slot.clone()).await.unwrap();

    let request = cell
        .negotiation
        .create_request(move_to(&appointment, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30)))
        .await
        .unwrap();
    cell.clock.advance(Duration::minutes(10));

    let responded = cell
        .negotiation
        .respond(request.id, RescheduleDecision::Rejected, Some("Fully booked that day".to_string()))
        .await
        .unwrap();

    assert_eq!(responded.status, RescheduleStatus::Rejected);
    assert_eq!(responded.responded_at, Some(dt(2025, 3, 1, 9, 10)));

    let unchanged = cell.booking.get_appointment(appointment.id).await.unwrap();
    assert_eq!(unchanged.start_time, dt(2025, 3, 10, 10, 0));
    let untouched = cell.slots.get(old_slot.id).await.unwrap().unwrap();
    assert!(!untouched.available);

    let last = cell.notifier.sent().await.pop().unwrap();
    assert_eq!(last.title, "Reschedule Request Rejected");
    assert!(last.message.contains("Fully booked that day"));
    assert_eq!(last.category, NotificationCategory::SystemNotification);
}

#[tokio::test]
async fn resolved_requests_are_immutable() {
    let cell = setup().await;
    let appointment = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;

    let request = cell
        .negotiation
        .create_request(move_to(&appointment, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30)))
        .await
        .unwrap();
    cell.negotiation
        .respond(request.id, RescheduleDecision::Rejected, None)
        .await
        .unwrap();

    assert_matches!(
        cell.negotiation
            .respond(request.id, RescheduleDecision::Approved, None)
            .await,
        Err(SchedulingError::InvalidState(_))
    );
    assert_matches!(
        cell.negotiation.cancel_request(request.id).await,
        Err(SchedulingError::InvalidState(_))
    );
}

#[tokio::test]
async fn pending_requests_can_be_withdrawn() {
    let cell = setup().await;
    let appointment = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;

    let request = cell
        .negotiation
        .create_request(move_to(&appointment, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30)))
        .await
        .unwrap();

    cell.negotiation.cancel_request(request.id).await.unwrap();
    assert_matches!(
        cell.negotiation.get_request(request.id).await,
        Err(SchedulingError::NotFound(_))
    );

    // With the pending request gone, a new one is allowed.
    cell.negotiation
        .create_request(move_to(&appointment, dt(2025, 3, 10, 15, 0), dt(2025, 3, 10, 15, 30)))
        .await
        .unwrap();
}

#[tokio::test]
async fn request_listings_join_through_appointments() {
    let cell = setup().await;
    let first = booked(&cell, dt(2025, 3, 10, 10, 0), dt(2025, 3, 10, 10, 30)).await;
    let second = booked(&cell, dt(2025, 3, 11, 10, 0), dt(2025, 3, 11, 10, 30)).await;

    let pending = cell
        .negotiation
        .create_request(move_to(&first, dt(2025, 3, 10, 14, 0), dt(2025, 3, 10, 14, 30)))
        .await
        .unwrap();
    cell.clock.advance(Duration::minutes(1));
    let resolved = cell
        .negotiation
        .create_request(move_to(&second, dt(2025, 3, 11, 14, 0), dt(2025, 3, 11, 14, 30)))
        .await
        .unwrap();
    cell.negotiation
        .respond(resolved.id, RescheduleDecision::Rejected, None)
        .await
        .unwrap();

    let for_patient = cell.negotiation.requests_for_patient(cell.patient).await.unwrap();
    assert_eq!(for_patient.len(), 2);
    // Newest first.
    assert_eq!(for_patient[0].id, resolved.id);

    let for_doctor = cell.negotiation.requests_for_doctor(cell.doctor).await.unwrap();
    assert_eq!(for_doctor.len(), 2);

    let pending_only = cell.negotiation.pending_for_doctor(cell.doctor).await.unwrap();
    assert_eq!(pending_only.len(), 1);
    assert_eq!(pending_only[0].id, pending.id);
    assert_eq!(cell.negotiation.count_pending_for_doctor(cell.doctor).await.unwrap(), 1);

    assert_matches!(
        cell.negotiation.requests_for_patient(Uuid::new_v4()).await,
        Err(SchedulingError::NotFound(_))
    );
}

#[tokio::test]
async fn unknown_request_and_appointment_ids_are_not_found() {
    let cell = setup().await;
    assert_matches!(
        cell.negotiation
            .create_request(CreateRescheduleRequest {
                appointment_id: Uuid::new_v4(),
                requested_start: dt(2025, 3, 10, 14, 0),
                requested_end: dt(2025, 3, 10, 14, 30),
                patient_reason: None,
            })
            .await,
        Err(SchedulingError::NotFound(_))
    );
    assert_matches!(
        cell.negotiation
            .respond(Uuid::new_v4(), RescheduleDecision::Approved, None)
            .await,
        Err(SchedulingError::NotFound(_))
    );
}
