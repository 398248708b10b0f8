use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AvailabilityError;
use crate::models::{BookedSlot, Doctor, DoctorAvailability, DoctorLeave, LeaveCheck, Slot, SlotBlock};
use crate::services::repository::DoctorRepository;

/// Pure slot generation over a doctor's calendar, leave and bookings.
pub struct AvailabilityCalculator;

impl AvailabilityCalculator {
    /// Candidate start times in `[available_from, available_to)`, stepped by the
    /// slot length. A trailing slot that would run past `available_to` is dropped.
    pub fn candidate_times(availability: &DoctorAvailability, default_slot_minutes: u32) -> Vec<NaiveTime> {
        let step = Duration::minutes(i64::from(availability.slot_minutes(default_slot_minutes)));
        let mut times = Vec::new();
        let mut start = availability.available_from;

        loop {
            let (end, wrapped) = start.overflowing_add_signed(step);
            if wrapped != 0 || end > availability.available_to {
                break;
            }
            times.push(start);
            start = end;
        }

        times
    }

    /// Every configured slot on `date`, each marked with why it is blocked.
    ///
    /// On a non-working weekday the slots are still returned, all unavailable,
    /// so an empty list only ever means "no slots configured".
    pub fn compute(
        availability: &DoctorAvailability,
        default_slot_minutes: u32,
        date: NaiveDate,
        leaves: &[DoctorLeave],
        booked: &[NaiveTime],
    ) -> Vec<Slot> {
        let working_day = availability.works_on(date.weekday());

        Self::candidate_times(availability, default_slot_minutes)
            .into_iter()
            .map(|time| {
                let mut blocked_by = Vec::new();
                if !working_day {
                    blocked_by.push(SlotBlock::DayOff);
                }
                if leaves.iter().any(|leave| leave.covers(date, time)) {
                    blocked_by.push(SlotBlock::Leave);
                }
                if booked.contains(&time) {
                    blocked_by.push(SlotBlock::Booked);
                }

                Slot {
                    time,
                    available: blocked_by.is_empty(),
                    blocked_by,
                }
            })
            .collect()
    }
}

pub struct AvailabilityService {
    repository: Arc<dyn DoctorRepository>,
    default_slot_minutes: u32,
}

impl AvailabilityService {
    pub fn new(repository: Arc<dyn DoctorRepository>, default_slot_minutes: u32) -> Self {
        Self {
            repository,
            default_slot_minutes,
        }
    }

    /// Unscoped lookup for callers that must tell a foreign doctor from a missing one.
    pub async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, AvailabilityError> {
        Ok(self.repository.get_doctor(doctor_id).await?)
    }

    /// Doctor within the caller's hospital; other tenants' doctors read as missing.
    pub async fn get_doctor(&self, hospital_id: Uuid, doctor_id: Uuid) -> Result<Doctor, AvailabilityError> {
        self.repository
            .get_doctor(doctor_id)
            .await?
            .filter(|doctor| doctor.hospital_id == hospital_id)
            .ok_or(AvailabilityError::DoctorNotFound(doctor_id))
    }

    pub async fn get_slots(
        &self,
        hospital_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, AvailabilityError> {
        debug!("Calculating slots for doctor {} on {}", doctor_id, date);

        let doctor = self.get_doctor(hospital_id, doctor_id).await?;
        if !doctor.is_active {
            info!("Doctor {} is inactive, reporting no slots", doctor_id);
            return Ok(Vec::new());
        }

        self.slots_for(&doctor, date, None).await
    }

    /// Slots for an already resolved doctor. `exclude` drops one appointment from
    /// the booked set so a reschedule does not collide with itself.
    pub async fn slots_for(
        &self,
        doctor: &Doctor,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Slot>, AvailabilityError> {
        let leaves = self.repository.approved_leaves(doctor.id, date).await?;
        let booked: Vec<NaiveTime> = self.repository
            .booked_slots(doctor.hospital_id, doctor.id, date)
            .await?
            .into_iter()
            .filter(|slot: &BookedSlot| Some(slot.appointment_id) != exclude)
            .map(|slot| slot.time)
            .collect();

        Ok(AvailabilityCalculator::compute(
            &doctor.availability,
            self.default_slot_minutes,
            date,
            &leaves,
            &booked,
        ))
    }

    pub async fn check_leave(
        &self,
        hospital_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<LeaveCheck, AvailabilityError> {
        let doctor = self.get_doctor(hospital_id, doctor_id).await?;
        self.leave_on(&doctor, date).await
    }

    /// Approved leave of an already resolved doctor anywhere on `date`.
    pub async fn leave_on(&self, doctor: &Doctor, date: NaiveDate) -> Result<LeaveCheck, AvailabilityError> {
        let leaves = self.repository.approved_leaves(doctor.id, date).await?;

        Ok(Self::leave_check(leaves))
    }

    /// Full-day leave wins over partial leave when both exist.
    pub fn leave_check(mut leaves: Vec<DoctorLeave>) -> LeaveCheck {
        leaves.sort_by_key(|leave| !leave.covers_whole_day());
        let leave = leaves.into_iter().next();

        LeaveCheck {
            on_leave: leave.is_some(),
            leave,
        }
    }
}
