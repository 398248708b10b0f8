use std::collections::HashMap;
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use uuid::Uuid;

use doctor_cell::models::{BookedSlot, Doctor, DoctorAvailability, DoctorLeave, LeaveStatus, SlotBlock};
use doctor_cell::services::{AvailabilityCalculator, AvailabilityService, DoctorRepository};
use doctor_cell::AvailabilityError;
use shared_database::DbError;

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

// 2024-01-10 is a Wednesday.
fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

fn weekday_calendar(from: NaiveTime, to: NaiveTime, minutes: Option<u32>) -> DoctorAvailability {
    DoctorAvailability {
        available_days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
        available_from: from,
        available_to: to,
        slot_duration_minutes: minutes,
    }
}

fn leave(date: NaiveDate, window: Option<(NaiveTime, NaiveTime)>, status: LeaveStatus) -> DoctorLeave {
    DoctorLeave {
        id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        leave_date: date,
        is_full_day: window.is_none(),
        start_time: window.map(|(start, _)| start),
        end_time: window.map(|(_, end)| end),
        status,
        reason: Some("Conference".to_string()),
    }
}

#[test]
fn scenario_a_open_morning_has_four_free_slots() {
    let calendar = weekday_calendar(t(9, 0), t(11, 0), Some(30));

    let slots = AvailabilityCalculator::compute(&calendar, 30, wednesday(), &[], &[]);

    let rendered: Vec<(NaiveTime, bool)> = slots.iter().map(|s| (s.time, s.available)).collect();
    assert_eq!(
        rendered,
        vec![(t(9, 0), true), (t(9, 30), true), (t(10, 0), true), (t(10, 30), true)]
    );
}

#[test]
fn scenario_b_booked_slot_is_the_only_one_marked_unavailable() {
    let calendar = weekday_calendar(t(9, 0), t(11, 0), Some(30));

    let slots = AvailabilityCalculator::compute(&calendar, 30, wednesday(), &[], &[t(9, 30)]);

    let unavailable: Vec<NaiveTime> = slots.iter().filter(|s| !s.available).map(|s| s.time).collect();
    assert_eq!(unavailable, vec![t(9, 30)]);
    assert_eq!(slots[1].blocked_by, vec![SlotBlock::Booked]);
    assert_eq!(slots.len(), 4);
}

#[test]
fn slots_partition_the_working_window() {
    for (from, to, minutes) in [
        (t(8, 0), t(17, 0), 15),
        (t(9, 0), t(12, 0), 45),
        (t(13, 30), t(18, 10), 20),
    ] {
        let calendar = weekday_calendar(from, to, Some(minutes));
        let step = Duration::minutes(i64::from(minutes));

        let times = AvailabilityCalculator::candidate_times(&calendar, 30);

        assert_eq!(times.first(), Some(&from));
        for pair in times.windows(2) {
            assert_eq!(pair[1] - pair[0], step, "slots must be contiguous and equal length");
        }
        let last_end = *times.last().unwrap() + step;
        assert!(last_end <= to);
        assert!(last_end + step > to, "no further whole slot fits before {}", to);
    }
}

#[test]
fn trailing_partial_slot_is_excluded() {
    let calendar = weekday_calendar(t(9, 0), t(10, 10), Some(30));

    let times = AvailabilityCalculator::candidate_times(&calendar, 30);

    assert_eq!(times, vec![t(9, 0), t(9, 30)]);
}

#[test]
fn zero_or_missing_duration_uses_the_default() {
    let unset = weekday_calendar(t(9, 0), t(10, 0), None);
    let zero = weekday_calendar(t(9, 0), t(10, 0), Some(0));

    assert_eq!(AvailabilityCalculator::candidate_times(&unset, 30).len(), 2);
    assert_eq!(AvailabilityCalculator::candidate_times(&zero, 20).len(), 3);
}

#[test]
fn late_window_does_not_wrap_past_midnight() {
    let calendar = weekday_calendar(t(22, 0), t(23, 59), Some(60));

    assert_eq!(AvailabilityCalculator::candidate_times(&calendar, 30), vec![t(22, 0)]);
}

#[test]
fn day_off_returns_every_slot_marked_unavailable() {
    let calendar = weekday_calendar(t(9, 0), t(11, 0), Some(30));
    let saturday = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();
    assert_eq!(saturday.weekday(), Weekday::Sat);

    let slots = AvailabilityCalculator::compute(&calendar, 30, saturday, &[], &[]);

    assert_eq!(slots.len(), 4, "day off still lists the configured slots");
    assert!(slots.iter().all(|s| !s.available && s.is_blocked_by(SlotBlock::DayOff)));
}

#[test]
fn empty_window_means_no_slots_configured() {
    let calendar = weekday_calendar(t(9, 0), t(9, 0), Some(30));

    assert!(AvailabilityCalculator::compute(&calendar, 30, wednesday(), &[], &[]).is_empty());
}

#[test]
fn full_day_leave_blocks_every_slot() {
    let calendar = weekday_calendar(t(9, 0), t(11, 0), Some(30));
    let leaves = vec![leave(wednesday(), None, LeaveStatus::Approved)];

    let slots = AvailabilityCalculator::compute(&calendar, 30, wednesday(), &leaves, &[]);

    assert!(slots.iter().all(|s| s.is_blocked_by(SlotBlock::Leave)));
}

#[test]
fn partial_leave_is_half_open() {
    let calendar = weekday_calendar(t(9, 0), t(11, 0), Some(30));
    let leaves = vec![leave(wednesday(), Some((t(9, 30), t(10, 30))), LeaveStatus::Approved)];

    let slots = AvailabilityCalculator::compute(&calendar, 30, wednesday(), &leaves, &[]);

    let free: Vec<NaiveTime> = slots.iter().filter(|s| s.available).map(|s| s.time).collect();
    assert_eq!(free, vec![t(9, 0), t(10, 30)]);
}

#[test]
fn only_approved_leave_on_the_same_date_counts() {
    let calendar = weekday_calendar(t(9, 0), t(11, 0), Some(30));
    let leaves = vec![
        leave(wednesday(), None, LeaveStatus::Pending),
        leave(wednesday(), None, LeaveStatus::Rejected),
        leave(wednesday().succ_opt().unwrap(), None, LeaveStatus::Approved),
    ];

    let slots = AvailabilityCalculator::compute(&calendar, 30, wednesday(), &leaves, &[]);

    assert!(slots.iter().all(|s| s.available));
}

#[test]
fn leave_check_prefers_full_day_leave() {
    let partial = leave(wednesday(), Some((t(9, 0), t(10, 0))), LeaveStatus::Approved);
    let full = leave(wednesday(), None, LeaveStatus::Approved);
    let full_id = full.id;

    let check = AvailabilityService::leave_check(vec![partial, full]);

    assert!(check.on_leave);
    assert_eq!(check.leave.map(|l| l.id), Some(full_id));
    assert!(!AvailabilityService::leave_check(Vec::new()).on_leave);
}

// ---------------------------------------------------------------------------
// Service over a fake repository
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeDoctors {
    doctors: HashMap<Uuid, Doctor>,
    leaves: Vec<DoctorLeave>,
    booked: Vec<(Uuid, NaiveDate, BookedSlot)>,
}

#[async_trait]
impl DoctorRepository for FakeDoctors {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, DbError> {
        Ok(self.doctors.get(&doctor_id).cloned())
    }

    async fn approved_leaves(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<DoctorLeave>, DbError> {
        Ok(self.leaves.iter()
            .filter(|l| l.doctor_id == doctor_id && l.leave_date == date && l.status == LeaveStatus::Approved)
            .cloned()
            .collect())
    }

    async fn booked_slots(&self, _hospital_id: Uuid, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<BookedSlot>, DbError> {
        Ok(self.booked.iter()
            .filter(|(d, on, _)| *d == doctor_id && *on == date)
            .map(|(_, _, slot)| slot.clone())
            .collect())
    }
}

fn doctor(hospital_id: Uuid, is_active: bool) -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        hospital_id,
        first_name: "Asha".to_string(),
        last_name: "Menon".to_string(),
        specialization: Some("General Medicine".to_string()),
        is_active,
        consultation_fee: Some(500.0),
        availability: weekday_calendar(t(9, 0), t(11, 0), Some(30)),
    }
}

#[tokio::test]
async fn service_marks_booked_slots_and_can_exclude_an_appointment() {
    let hospital_id = Uuid::new_v4();
    let doc = doctor(hospital_id, true);
    let appointment_id = Uuid::new_v4();
    let mut repo = FakeDoctors::default();
    repo.booked.push((doc.id, wednesday(), BookedSlot { appointment_id, time: t(10, 0) }));
    repo.doctors.insert(doc.id, doc.clone());
    let service = AvailabilityService::new(Arc::new(repo), 30);

    let slots = service.get_slots(hospital_id, doc.id, wednesday()).await.unwrap();
    assert!(!slots[2].available);

    let rescheduling = service.slots_for(&doc, wednesday(), Some(appointment_id)).await.unwrap();
    assert!(rescheduling.iter().all(|s| s.available));
}

#[tokio::test]
async fn inactive_doctor_yields_an_empty_list() {
    let hospital_id = Uuid::new_v4();
    let doc = doctor(hospital_id, false);
    let mut repo = FakeDoctors::default();
    repo.doctors.insert(doc.id, doc.clone());
    let service = AvailabilityService::new(Arc::new(repo), 30);

    let slots = service.get_slots(hospital_id, doc.id, wednesday()).await.unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn unknown_or_foreign_doctor_is_not_found() {
    let hospital_id = Uuid::new_v4();
    let foreign = doctor(Uuid::new_v4(), true);
    let mut repo = FakeDoctors::default();
    repo.doctors.insert(foreign.id, foreign.clone());
    let service = AvailabilityService::new(Arc::new(repo), 30);

    assert_matches!(
        service.get_slots(hospital_id, Uuid::new_v4(), wednesday()).await,
        Err(AvailabilityError::DoctorNotFound(_))
    );
    assert_matches!(
        service.get_slots(hospital_id, foreign.id, wednesday()).await,
        Err(AvailabilityError::DoctorNotFound(id)) if id == foreign.id
    );
}

#[tokio::test]
async fn check_leave_reports_approved_leave() {
    let hospital_id = Uuid::new_v4();
    let doc = doctor(hospital_id, true);
    let mut on_leave = leave(wednesday(), None, LeaveStatus::Approved);
    on_leave.doctor_id = doc.id;
    let mut repo = FakeDoctors::default();
    repo.leaves.push(on_leave);
    repo.doctors.insert(doc.id, doc.clone());
    let service = AvailabilityService::new(Arc::new(repo), 30);

    let check = service.check_leave(hospital_id, doc.id, wednesday()).await.unwrap();
    assert!(check.on_leave);

    let next_day = service.check_leave(hospital_id, doc.id, wednesday().succ_opt().unwrap()).await.unwrap();
    assert!(!next_day.on_leave);
    assert!(next_day.leave.is_none());
}
