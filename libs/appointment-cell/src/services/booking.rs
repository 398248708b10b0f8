use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use doctor_cell::models::{Doctor, DoctorLeave, SlotBlock};
use doctor_cell::services::AvailabilityService;
use package_cell::models::ConsumeVisitRequest;
use package_cell::services::PackageLedger;
use package_cell::PackageError;
use shared_config::SchedulingConfig;
use shared_database::DbError;
use shared_models::time_format;
use shared_utils::clock::Clock;

use crate::error::AppointmentError;
use crate::models::{
    Appointment, AppointmentFilter, AppointmentResponse, AppointmentStatus, AppointmentType,
    BookingPreferences, BookingWarning, CancelAppointmentRequest, CreateAppointmentRequest,
    Patient, PostponeAppointmentRequest, UpdateAppointmentRequest, WarningCode,
};
use crate::services::lifecycle::{StatusStateMachine, Transition};
use crate::services::repository::{AppointmentRepository, PatientDirectory, ACTIVE_SLOT_CONSTRAINT};

pub fn format_appointment_number(sequence: u64) -> String {
    format!("APT-{:06}", sequence)
}

/// Booking fields after preferences have filled the gaps.
struct ResolvedBooking {
    doctor_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
    appointment_type: AppointmentType,
}

pub struct BookingService {
    appointments: Arc<dyn AppointmentRepository>,
    patients: Arc<dyn PatientDirectory>,
    availability: Arc<AvailabilityService>,
    ledger: Arc<PackageLedger>,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
}

impl BookingService {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        patients: Arc<dyn PatientDirectory>,
        availability: Arc<AvailabilityService>,
        ledger: Arc<PackageLedger>,
        clock: Arc<dyn Clock>,
        config: SchedulingConfig,
    ) -> Self {
        Self {
            appointments,
            patients,
            availability,
            ledger,
            clock,
            config,
        }
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    pub async fn get(&self, hospital_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .get(appointment_id)
            .await?
            .filter(|appointment| appointment.hospital_id == hospital_id)
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    pub async fn list(
        &self,
        hospital_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments for hospital {} with {:?}", hospital_id, filter);
        Ok(self.appointments.list(hospital_id, filter).await?)
    }

    // ==========================================================================
    // CREATE
    // ==========================================================================

    pub async fn create(
        &self,
        hospital_id: Uuid,
        request: CreateAppointmentRequest,
        preferences: &BookingPreferences,
    ) -> Result<AppointmentResponse, AppointmentError> {
        let booking = self.resolve_request(&request, preferences)?;
        info!(
            "Booking patient {} with doctor {} on {} at {}",
            request.patient_id, booking.doctor_id, booking.date, booking.time
        );

        self.ensure_not_past(booking.date)?;
        let doctor = self.resolve_doctor(hospital_id, booking.doctor_id).await?;
        self.resolve_patient(hospital_id, request.patient_id).await?;
        if let Some(assignment_id) = request.package_assignment_id {
            self.resolve_package(hospital_id, request.patient_id, assignment_id).await?;
        }

        let mut warnings = Vec::new();
        self.ensure_slot_open(&doctor, booking.date, booking.time, None).await?;
        self.warn_on_leave(&doctor, booking.date, &mut warnings).await?;

        let sequence = self.appointments.next_appointment_number(hospital_id).await?;
        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            hospital_id,
            appointment_number: format_appointment_number(sequence),
            doctor_id: doctor.id,
            patient_id: request.patient_id,
            appointment_date: booking.date,
            appointment_time: booking.time,
            appointment_type: booking.appointment_type,
            status: AppointmentStatus::Scheduled,
            notes: request.notes,
            reason: request.reason,
            diagnosis: None,
            status_reason: None,
            fee: request.fee.or(doctor.consultation_fee),
            is_paid: request.is_paid,
            package_assignment_id: request.package_assignment_id,
            package_visit_consumed: false,
            created_at: now,
            updated_at: now,
        };

        let mut appointment = self.appointments
            .insert(appointment)
            .await
            .map_err(|e| Self::slot_error(e, doctor.id, booking.date, booking.time))?;

        info!(
            "Created appointment {} ({}) for doctor {}",
            appointment.appointment_number, appointment.id, doctor.id
        );

        if request.consume_package {
            appointment = self.consume_visit(appointment, &mut warnings).await;
        }

        Ok(AppointmentResponse { appointment, warnings })
    }

    // ==========================================================================
    // UPDATES
    // ==========================================================================

    /// Free-form fields are written as given; a status goes through the state
    /// machine and a date/time change is a postpone.
    pub async fn update(
        &self,
        hospital_id: Uuid,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<AppointmentResponse, AppointmentError> {
        let current = self.get(hospital_id, appointment_id).await?;
        let transition = Self::plan_transition(&current, &request)?;
        let mut warnings = Vec::new();

        let mut touched = transition.is_some();
        let mut next = match transition {
            Some(transition) => self.prepare_transition(&current, transition, &mut warnings).await?,
            None => current.clone(),
        };

        if let Some(notes) = request.notes {
            next.notes = Some(notes);
            touched = true;
        }
        if let Some(diagnosis) = request.diagnosis {
            next.diagnosis = Some(diagnosis);
            touched = true;
        }
        if let Some(fee) = request.fee {
            next.fee = Some(fee);
            touched = true;
        }
        if let Some(is_paid) = request.is_paid {
            next.is_paid = is_paid;
            touched = true;
        }

        if !touched {
            debug!("Update of appointment {} changed nothing", appointment_id);
            return Ok(AppointmentResponse {
                appointment: current,
                warnings,
            });
        }

        let saved = self.persist(next, current.status).await?;
        let appointment = self.after_transition(&current, saved, &mut warnings).await;

        Ok(AppointmentResponse { appointment, warnings })
    }

    pub async fn postpone(
        &self,
        hospital_id: Uuid,
        appointment_id: Uuid,
        request: PostponeAppointmentRequest,
    ) -> Result<AppointmentResponse, AppointmentError> {
        let transition = Transition::Postpone {
            date: request.appointment_date,
            time: request.appointment_time,
            reason: request.reason,
        };
        self.transition(hospital_id, appointment_id, transition).await
    }

    pub async fn cancel(
        &self,
        hospital_id: Uuid,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<AppointmentResponse, AppointmentError> {
        if request.reason.trim().is_empty() {
            return Err(AppointmentError::Validation("A cancellation reason is required".to_string()));
        }

        let update = UpdateAppointmentRequest {
            status: Some(AppointmentStatus::Cancelled),
            reason: Some(request.reason),
            ..Default::default()
        };
        self.update(hospital_id, appointment_id, update).await
    }

    /// Check-in, optionally tagging the visit against the attached package.
    pub async fn check_in(
        &self,
        hospital_id: Uuid,
        appointment_id: Uuid,
        consume_package: bool,
    ) -> Result<AppointmentResponse, AppointmentError> {
        let mut response = self.transition(hospital_id, appointment_id, Transition::CheckIn).await?;

        if consume_package {
            response.appointment = self.consume_visit(response.appointment, &mut response.warnings).await;
        }

        Ok(response)
    }

    pub async fn start(&self, hospital_id: Uuid, appointment_id: Uuid) -> Result<AppointmentResponse, AppointmentError> {
        self.transition(hospital_id, appointment_id, Transition::Start).await
    }

    pub async fn complete(
        &self,
        hospital_id: Uuid,
        appointment_id: Uuid,
        diagnosis: Option<String>,
    ) -> Result<AppointmentResponse, AppointmentError> {
        self.transition(hospital_id, appointment_id, Transition::Complete { diagnosis }).await
    }

    pub async fn mark_no_show(
        &self,
        hospital_id: Uuid,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> Result<AppointmentResponse, AppointmentError> {
        self.transition(hospital_id, appointment_id, Transition::NoShow { reason }).await
    }

    pub async fn transition(
        &self,
        hospital_id: Uuid,
        appointment_id: Uuid,
        transition: Transition,
    ) -> Result<AppointmentResponse, AppointmentError> {
        let current = self.get(hospital_id, appointment_id).await?;
        let mut warnings = Vec::new();

        let next = self.prepare_transition(&current, transition, &mut warnings).await?;
        let saved = self.persist(next, current.status).await?;
        let appointment = self.after_transition(&current, saved, &mut warnings).await;

        Ok(AppointmentResponse { appointment, warnings })
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    fn resolve_request(
        &self,
        request: &CreateAppointmentRequest,
        preferences: &BookingPreferences,
    ) -> Result<ResolvedBooking, AppointmentError> {
        let smart = preferences.smart_defaults;

        let doctor_id = request.doctor_id
            .or_else(|| preferences.preferred_doctor_id.filter(|_| smart))
            .ok_or_else(|| AppointmentError::Validation("doctor_id is required".to_string()))?;
        let date = request.appointment_date
            .or_else(|| smart.then(|| self.clock.today()))
            .ok_or_else(|| AppointmentError::Validation("appointment_date is required".to_string()))?;
        let appointment_type = request.appointment_type
            .or_else(|| smart.then_some(preferences.default_type))
            .ok_or_else(|| AppointmentError::Validation("appointment_type is required".to_string()))?;

        Ok(ResolvedBooking {
            doctor_id,
            date,
            time: request.appointment_time,
            appointment_type,
        })
    }

    fn plan_transition(
        current: &Appointment,
        request: &UpdateAppointmentRequest,
    ) -> Result<Option<Transition>, AppointmentError> {
        let new_date = request.appointment_date.filter(|date| *date != current.appointment_date);
        let new_time = request.appointment_time.filter(|time| *time != current.appointment_time);

        if new_date.is_some() || new_time.is_some() {
            return match request.status {
                None | Some(AppointmentStatus::Postponed) => Ok(Some(Transition::Postpone {
                    date: new_date.unwrap_or(current.appointment_date),
                    time: new_time.unwrap_or(current.appointment_time),
                    reason: request.reason.clone(),
                })),
                Some(other) => Err(AppointmentError::Validation(format!(
                    "A date or time change cannot be combined with status {}",
                    other
                ))),
            };
        }

        match request.status {
            None => Ok(None),
            Some(AppointmentStatus::Postponed) => Err(AppointmentError::Validation(
                "Postponing requires a new appointment_date or appointment_time".to_string(),
            )),
            Some(target) => Transition::towards(target, request.reason.clone(), request.diagnosis.clone())
                .map(Some)
                .ok_or(AppointmentError::IllegalTransition {
                    from: current.status,
                    to: target,
                }),
        }
    }

    async fn prepare_transition(
        &self,
        current: &Appointment,
        transition: Transition,
        warnings: &mut Vec<BookingWarning>,
    ) -> Result<Appointment, AppointmentError> {
        let target = transition.target();
        let next = StatusStateMachine::apply(current, transition)?;

        match target {
            AppointmentStatus::Postponed => {
                self.ensure_not_past(next.appointment_date)?;
                let doctor = self.resolve_doctor(current.hospital_id, current.doctor_id).await?;
                self.ensure_slot_open(&doctor, next.appointment_date, next.appointment_time, Some(current.id))
                    .await?;
                self.warn_on_leave(&doctor, next.appointment_date, warnings).await?;
            }
            AppointmentStatus::InProgress => self.ensure_in_progress_capacity(current).await?,
            _ => {}
        }

        Ok(next)
    }

    async fn persist(&self, mut next: Appointment, expected: AppointmentStatus) -> Result<Appointment, AppointmentError> {
        next.updated_at = Utc::now();
        let (id, doctor_id, date, time) = (next.id, next.doctor_id, next.appointment_date, next.appointment_time);

        let saved = self.appointments
            .update(next, expected)
            .await
            .map_err(|e| Self::slot_error(e, doctor_id, date, time))?
            .ok_or(AppointmentError::ConcurrentModification(id))?;

        if saved.status != expected {
            info!("Appointment {} moved {} -> {}", saved.appointment_number, expected, saved.status);
        }
        Ok(saved)
    }

    async fn after_transition(
        &self,
        previous: &Appointment,
        saved: Appointment,
        warnings: &mut Vec<BookingWarning>,
    ) -> Appointment {
        let refund_due = saved.status == AppointmentStatus::Cancelled
            && previous.status != AppointmentStatus::Cancelled
            && previous.status != AppointmentStatus::InProgress
            && saved.package_visit_consumed
            && self.config.refund_package_on_cancel;

        match saved.package_assignment_id {
            Some(assignment_id) if refund_due => self.refund_visit(saved, assignment_id, warnings).await,
            _ => saved,
        }
    }

    async fn consume_visit(&self, appointment: Appointment, warnings: &mut Vec<BookingWarning>) -> Appointment {
        let Some(assignment_id) = appointment.package_assignment_id else {
            warnings.push(BookingWarning::new(
                WarningCode::PackageNotConsumed,
                "No package assignment is attached to this appointment",
            ));
            return appointment;
        };
        if appointment.package_visit_consumed {
            debug!("Package visit already consumed for {}", appointment.id);
            return appointment;
        }

        let request = ConsumeVisitRequest {
            appointment_id: Some(appointment.id),
            notes: Some(format!("Visit {}", appointment.appointment_number)),
        };

        match self.ledger.consume(appointment.hospital_id, assignment_id, request).await {
            Ok(_) => self.persist_flag(appointment, assignment_id, true).await,
            Err(e) => {
                warn!("Package {} not consumed for appointment {}: {}", assignment_id, appointment.id, e);
                warnings.push(Self::package_warning(WarningCode::PackageNotConsumed, &e));
                appointment
            }
        }
    }

    async fn refund_visit(
        &self,
        appointment: Appointment,
        assignment_id: Uuid,
        warnings: &mut Vec<BookingWarning>,
    ) -> Appointment {
        match self.ledger.refund(appointment.hospital_id, assignment_id).await {
            Ok(_) => self.persist_flag(appointment, assignment_id, false).await,
            Err(e) => {
                warn!("Package {} not refunded for appointment {}: {}", assignment_id, appointment.id, e);
                warnings.push(Self::package_warning(WarningCode::PackageNotRefunded, &e));
                appointment
            }
        }
    }

    /// Record whether the ledger holds a visit for this appointment.
    ///
    /// The ledger write already happened. A lost race gets one retry against
    /// the re-read row; after that the mismatch is logged for reconciliation.
    async fn persist_flag(&self, appointment: Appointment, assignment_id: Uuid, consumed: bool) -> Appointment {
        let mut marked = appointment.clone();
        marked.package_visit_consumed = consumed;

        let first = match self.persist(marked, appointment.status).await {
            Ok(saved) => return saved,
            Err(e) => e,
        };
        if !matches!(first, AppointmentError::ConcurrentModification(_)) {
            return self.flag_unrecorded(appointment, assignment_id, consumed, &first);
        }

        debug!("Appointment {} changed before its package flag was written, retrying", appointment.id);
        match self.reflag(&appointment, consumed).await {
            Ok(saved) => {
                if consumed && saved.status == AppointmentStatus::Cancelled {
                    warn!(
                        "Appointment {} was cancelled while its visit on package {} was consumed; refund it manually",
                        saved.id, assignment_id
                    );
                }
                saved
            }
            Err(e) => self.flag_unrecorded(appointment, assignment_id, consumed, &e),
        }
    }

    async fn reflag(&self, appointment: &Appointment, consumed: bool) -> Result<Appointment, AppointmentError> {
        let mut fresh = self.get(appointment.hospital_id, appointment.id).await?;
        let expected = fresh.status;
        fresh.package_visit_consumed = consumed;
        self.persist(fresh, expected).await
    }

    fn flag_unrecorded(
        &self,
        appointment: Appointment,
        assignment_id: Uuid,
        consumed: bool,
        error: &AppointmentError,
    ) -> Appointment {
        error!(
            "Package {} {} for appointment {} but the flag was not saved ({}); the credit needs manual reconciliation",
            assignment_id,
            if consumed { "consumed" } else { "refunded" },
            appointment.id,
            error
        );
        appointment
    }

    fn ensure_not_past(&self, date: NaiveDate) -> Result<(), AppointmentError> {
        let today = self.clock.today();
        if !self.config.allow_past_dates && date < today {
            return Err(AppointmentError::Validation(format!(
                "Appointment date {} is before today ({})",
                date, today
            )));
        }
        Ok(())
    }

    async fn ensure_in_progress_capacity(&self, current: &Appointment) -> Result<(), AppointmentError> {
        let Some(limit) = self.config.max_in_progress_per_doctor else {
            return Ok(());
        };

        let filter = AppointmentFilter {
            date: Some(current.appointment_date),
            doctor_id: Some(current.doctor_id),
            statuses: vec![AppointmentStatus::InProgress],
        };
        let running = self.appointments.list(current.hospital_id, &filter).await?.len();

        if running >= limit as usize {
            warn!("Doctor {} already has {} consultation(s) in progress", current.doctor_id, running);
            return Err(AppointmentError::InProgressLimitReached {
                doctor_id: current.doctor_id,
                limit,
            });
        }
        Ok(())
    }

    async fn resolve_doctor(&self, hospital_id: Uuid, doctor_id: Uuid) -> Result<Doctor, AppointmentError> {
        let doctor = self.availability
            .find_doctor(doctor_id)
            .await?
            .ok_or(AppointmentError::DoctorNotFound(doctor_id))?;

        if doctor.hospital_id != hospital_id {
            return Err(AppointmentError::CrossHospitalReference(format!("Doctor {}", doctor_id)));
        }
        if !doctor.is_active {
            return Err(AppointmentError::Validation(format!(
                "Dr. {} is not accepting appointments",
                doctor.full_name()
            )));
        }
        Ok(doctor)
    }

    async fn resolve_patient(&self, hospital_id: Uuid, patient_id: Uuid) -> Result<Patient, AppointmentError> {
        let patient = self.patients
            .get_patient(patient_id)
            .await?
            .ok_or(AppointmentError::PatientNotFound(patient_id))?;

        if patient.hospital_id != hospital_id {
            return Err(AppointmentError::CrossHospitalReference(format!("Patient {}", patient_id)));
        }
        Ok(patient)
    }

    async fn resolve_package(
        &self,
        hospital_id: Uuid,
        patient_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<(), AppointmentError> {
        let assignment = self.ledger
            .lookup(assignment_id)
            .await?
            .ok_or(PackageError::NotFound(assignment_id))?;

        if assignment.hospital_id != hospital_id {
            return Err(AppointmentError::CrossHospitalReference(format!(
                "Package assignment {}",
                assignment_id
            )));
        }
        if assignment.patient_id != patient_id {
            return Err(AppointmentError::Validation(format!(
                "Package assignment {} belongs to another patient",
                assignment_id
            )));
        }
        Ok(())
    }

    /// Pre-check against the calendar. Leave never blocks a booking here.
    async fn ensure_slot_open(
        &self,
        doctor: &Doctor,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let slots = self.availability.slots_for(doctor, date, exclude).await?;

        let slot = slots.iter().find(|slot| slot.time == time).ok_or_else(|| {
            AppointmentError::Validation(format!(
                "{} is not a slot start in Dr. {}'s calendar",
                time_format::format(&time),
                doctor.full_name()
            ))
        })?;

        if slot.is_blocked_by(SlotBlock::DayOff) {
            return Err(AppointmentError::Validation(format!(
                "Dr. {} does not work on {}",
                doctor.full_name(),
                date.weekday()
            )));
        }
        if slot.is_blocked_by(SlotBlock::Booked) {
            warn!("Slot {} {} for doctor {} is already booked", date, time, doctor.id);
            return Err(AppointmentError::SlotConflict {
                doctor_id: doctor.id,
                date,
                time,
            });
        }

        Ok(())
    }

    async fn warn_on_leave(
        &self,
        doctor: &Doctor,
        date: NaiveDate,
        warnings: &mut Vec<BookingWarning>,
    ) -> Result<(), AppointmentError> {
        if let Some(leave) = self.availability.leave_on(doctor, date).await?.leave {
            warnings.push(Self::leave_warning(doctor, &leave));
        }
        Ok(())
    }

    fn slot_error(error: DbError, doctor_id: Uuid, date: NaiveDate, time: NaiveTime) -> AppointmentError {
        if error.violates(ACTIVE_SLOT_CONSTRAINT) {
            warn!("Lost the race for doctor {} on {} at {}", doctor_id, date, time);
            AppointmentError::SlotConflict { doctor_id, date, time }
        } else {
            AppointmentError::Storage(error)
        }
    }

    fn leave_warning(doctor: &Doctor, leave: &DoctorLeave) -> BookingWarning {
        warn!("Booking doctor {} on {} during approved leave", doctor.id, leave.leave_date);
        let window = match (leave.covers_whole_day(), leave.start_time, leave.end_time) {
            (false, Some(start), Some(end)) => format!(
                "from {} to {}",
                time_format::format(&start),
                time_format::format(&end)
            ),
            _ => "all day".to_string(),
        };
        BookingWarning::new(
            WarningCode::DoctorOnLeave,
            format!("Dr. {} has approved leave on {} ({})", doctor.full_name(), leave.leave_date, window),
        )
    }

    fn package_warning(code: WarningCode, error: &PackageError) -> BookingWarning {
        BookingWarning::new(code, format!("{} ({})", error, error.code()))
    }
}
