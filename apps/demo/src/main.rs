use std::sync::Arc;

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveTime, Utc, Weekday};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appointment_cell::{AppointmentBookingService, BookAppointmentRequest};
use reschedule_cell::{
    BestEffortReconciler, CreateRescheduleRequest, RescheduleDecision,
    RescheduleNegotiationService,
};
use schedule_cell::models::{CreateBlockedIntervalRequest, SetAvailabilityRequest};
use schedule_cell::{
    AvailabilityTemplateService, BlockedIntervalService, SlotCalendarService,
    SlotGenerationService,
};
use shared_config::AppConfig;
use shared_models::collaborators::{InMemoryDirectory, StaticCatalog, TracingNotifier};
use shared_models::AppointmentStatus;
use shared_store::{
    InMemoryAppointmentStore, InMemoryBlockedIntervalStore, InMemoryRescheduleRequestStore,
    InMemorySlotStore, InMemoryTemplateStore, TimelineLocks,
};
use shared_utils::{Clock, SystemClock};

/// Walks one doctor's calendar through the whole lifecycle: weekly
/// availability, slot generation, a blocked lunch, a booking, and a
/// negotiated reschedule.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting scheduling core demo");
    let config = AppConfig::from_env();

    // Stores and collaborators.
    let templates = Arc::new(InMemoryTemplateStore::new());
    let slots = Arc::new(InMemorySlotStore::new());
    let blocked = Arc::new(InMemoryBlockedIntervalStore::new());
    let appointments = Arc::new(InMemoryAppointmentStore::new());
    let requests = Arc::new(InMemoryRescheduleRequestStore::new());
    let locks = Arc::new(TimelineLocks::new());
    let directory = Arc::new(InMemoryDirectory::new());
    let catalog = Arc::new(StaticCatalog::new());
    let notifier = Arc::new(TracingNotifier);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let availability =
        AvailabilityTemplateService::new(templates.clone(), directory.clone());
    let generation =
        SlotGenerationService::new(templates.clone(), slots.clone(), locks.clone());
    let calendar = SlotCalendarService::new(
        slots.clone(),
        blocked.clone(),
        appointments.clone(),
        directory.clone(),
    );
    let blocking = BlockedIntervalService::new(blocked.clone(), directory.clone());
    let booking = Arc::new(AppointmentBookingService::new(
        appointments.clone(),
        directory.clone(),
        catalog.clone(),
        notifier.clone(),
        locks.clone(),
        clock.clone(),
        config.clone(),
    ));
    let negotiation = RescheduleNegotiationService::new(
        requests.clone(),
        appointments.clone(),
        slots.clone(),
        booking.clone(),
        Arc::new(BestEffortReconciler),
        directory.clone(),
        notifier.clone(),
        locks.clone(),
        clock.clone(),
        config,
    );

    let doctor = directory.add_doctor("Dr. Maria Ionescu").await;
    let patient = directory.add_patient("Andrei Popa").await;

    // Weekly template: Mondays 09:00-12:00, 30-minute slots.
    availability
        .set_availability(SetAvailabilityRequest {
            doctor_id: doctor,
            day_of_week: Weekday::Mon,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            slot_duration_minutes: 30,
        })
        .await?;

    // Materialize the coming week.
    let today = Utc::now().date_naive();
    let generated = generation
        .materialize(doctor, today, today + Duration::days(7))
        .await?;
    info!("Materialized {} slots", generated.len());

    let monday = next_weekday(today, Weekday::Mon);

    // Lunch is off the table.
    blocking
        .create(CreateBlockedIntervalRequest {
            doctor_id: doctor,
            start_time: monday.and_hms_opt(11, 30, 0).unwrap().and_utc(),
            end_time: monday.and_hms_opt(12, 0, 0).unwrap().and_utc(),
            reason: "Lunch".to_string(),
        })
        .await?;

    // Book and confirm the 09:00 slot.
    let appointment = booking
        .create_appointment(BookAppointmentRequest {
            patient_id: patient,
            doctor_id: doctor,
            service_id: None,
            start_time: monday.and_hms_opt(9, 0, 0).unwrap().and_utc(),
            end_time: monday.and_hms_opt(9, 30, 0).unwrap().and_utc(),
            notes: Some("First consultation".to_string()),
        })
        .await?;
    booking
        .update_status(appointment.id, AppointmentStatus::Confirmed, None)
        .await?;

    // The patient asks for 10:00 instead; the doctor approves.
    let request = negotiation
        .create_request(CreateRescheduleRequest {
            appointment_id: appointment.id,
            requested_start: monday.and_hms_opt(10, 0, 0).unwrap().and_utc(),
            requested_end: monday.and_hms_opt(10, 30, 0).unwrap().and_utc(),
            patient_reason: Some("Conflicting meeting".to_string()),
        })
        .await?;
    negotiation
        .respond(request.id, RescheduleDecision::Approved, Some("Works for me".to_string()))
        .await?;

    // Render the Monday calendar with statuses.
    let views = calendar
        .schedule_with_status(
            doctor,
            monday.and_hms_opt(0, 0, 0).unwrap().and_utc(),
            (monday + Duration::days(1)).and_hms_opt(0, 0, 0).unwrap().and_utc(),
        )
        .await?;
    for view in views {
        info!(
            "{} - {}: {:?}{}",
            view.start_time.format("%H:%M"),
            view.end_time.format("%H:%M"),
            view.status,
            view.blocked_reason.map(|r| format!(" ({r})")).unwrap_or_default()
        );
    }

    Ok(())
}

fn next_weekday(from: chrono::NaiveDate, target: Weekday) -> chrono::NaiveDate {
    let mut date = from + Duration::days(1);
    while date.weekday() != target {
        date += Duration::days(1);
    }
    date
}
