use points_ledger::{
    AttendanceStatus, EmployeeId, LedgerError, MilestoneTier, TaskPriority, TaskStatus,
    TransactionMetadata, UpdateKind,
};
use points_test_utils::{ids, setup_ledger};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn task_completion_is_capped_at_monthly_limit() {
    let t = setup_ledger();
    t.seed("e1", 198, 198).await;

    let award = t
        .ledger
        .award_task_completion(&EmployeeId::new("e1"), "task-9", TaskPriority::High)
        .await
        .unwrap();

    assert_eq!(award.points, 2);
    assert_eq!(
        award.description,
        "Task Completed - Priority: HIGH (Base: 4 + Bonus: 5) (Capped at monthly limit)"
    );

    let record = t.record("e1").await;
    assert_eq!(record.monthly_points, 200);
    assert_eq!(record.total_points, 200);

    let log = t.store.log(&EmployeeId::new("e1"));
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].points, 2);
    assert_eq!(log[0].description, award.description);
}

#[tokio::test]
async fn full_month_still_records_zero_point_transaction() {
    let t = setup_ledger();
    t.seed("e1", 500, 200).await;

    let award = t
        .ledger
        .award_daily_update(&EmployeeId::new("e1"), UpdateKind::Rich)
        .await
        .unwrap();

    assert_eq!(award.points, 0);
    assert!(award.description.ends_with("(Capped at monthly limit)"));
    assert_eq!(t.record("e1").await.total_points, 500);
    assert_eq!(t.record("e1").await.transaction_count, 1);
}

#[tokio::test]
async fn attendance_values() {
    let t = setup_ledger();
    let id = EmployeeId::new("e1");

    let present = t
        .ledger
        .award_attendance(&id, AttendanceStatus::Present, true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(present.points, 7);
    assert_eq!(present.description, "Attendance - Present (On Time)");

    let wfh = t
        .ledger
        .award_attendance(&id, AttendanceStatus::Wfh, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(wfh.points, 5);

    let half = t
        .ledger
        .award_attendance(&id, AttendanceStatus::HalfDay, true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(half.points, 2);
    assert_eq!(half.description, "Attendance - Half Day");

    assert_eq!(t.record("e1").await.total_points, 14);
}

#[tokio::test]
async fn late_attendance_is_floored_at_zero() {
    let t = setup_ledger();
    let id = EmployeeId::new("e1");

    let late = t
        .ledger
        .award_attendance(&id, AttendanceStatus::Late, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(late.points, 0);
    assert_eq!(late.description, "Attendance - Late (Floored at zero balance)");

    t.seed("e1", 10, 4).await;
    let late = t
        .ledger
        .award_attendance(&id, AttendanceStatus::Late, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(late.points, -1);
    let record = t.record("e1").await;
    assert_eq!((record.total_points, record.monthly_points), (9, 3));
}

#[tokio::test]
async fn absent_and_on_leave_record_nothing() {
    let t = setup_ledger();
    let id = EmployeeId::new("e1");

    for status in [AttendanceStatus::Absent, AttendanceStatus::OnLeave] {
        let award = t.ledger.award_attendance(&id, status, true).await.unwrap();
        assert!(award.is_none());
    }
    assert!(t.store.is_empty());
}

#[tokio::test]
async fn daily_update_kinds() {
    let t = setup_ledger();
    let id = EmployeeId::new("e1");

    let rich = t
        .ledger
        .award_daily_update(&id, UpdateKind::classify(false, true))
        .await
        .unwrap();
    let simple = t
        .ledger
        .award_daily_update(&id, UpdateKind::classify(false, false))
        .await
        .unwrap();

    assert_eq!(rich.points, 3);
    assert_eq!(simple.points, 1);
    assert_eq!(simple.description, "Daily Update - Simple");
}

#[tokio::test]
async fn task_transition_scores_only_into_completed() {
    let t = setup_ledger();
    let id = EmployeeId::new("e1");

    let moved = t
        .ledger
        .award_task_transition(&id, "t-1", TaskPriority::Medium, TaskStatus::Pending, TaskStatus::InProgress)
        .await
        .unwrap();
    assert!(moved.is_none());

    let done = t
        .ledger
        .award_task_transition(&id, "t-1", TaskPriority::Medium, TaskStatus::InProgress, TaskStatus::Completed)
        .await
        .unwrap();
    assert_eq!(done.unwrap().points, 6);

    let again = t
        .ledger
        .award_task_transition(&id, "t-1", TaskPriority::Medium, TaskStatus::Completed, TaskStatus::Completed)
        .await
        .unwrap();
    assert!(again.is_none());

    let log = t.store.log(&id);
    assert_eq!(log.len(), 1);
    assert_eq!(
        log[0].metadata,
        TransactionMetadata::Task {
            task_id: "t-1".to_string(),
            priority: TaskPriority::Medium,
        }
    );
}

#[tokio::test]
async fn project_completion_scores_everyone_once() {
    let t = setup_ledger();
    t.seed("b", 195, 195).await;

    let awards = t
        .ledger
        .award_project_completion(&ids(&["a", "b", "a", "c"]), "proj-1", true)
        .await;

    let points: Vec<(&str, i64)> = awards
        .iter()
        .map(|award| (award.employee_id.as_str(), award.points()))
        .collect();
    assert_eq!(points, vec![("a", 20), ("b", 5), ("c", 20)]);
    assert!(awards.iter().all(|award| award.outcome.is_ok()));

    assert_eq!(t.store.log(&EmployeeId::new("a")).len(), 1);
}

#[tokio::test]
async fn project_completion_on_time() {
    let t = setup_ledger();
    let awards = t
        .ledger
        .award_project_completion(&ids(&["a"]), "proj-2", false)
        .await;

    let award = awards[0].outcome.as_ref().unwrap();
    assert_eq!(award.points, 10);
    assert_eq!(award.description, "Project Completed - 10 points");
}

#[tokio::test]
async fn project_completion_reports_failures_per_employee() {
    let t = setup_ledger();
    t.store.set_fail_on_commit(true);

    let awards = t
        .ledger
        .award_project_completion(&ids(&["a", "b"]), "proj-3", false)
        .await;

    assert_eq!(awards.len(), 2);
    assert!(awards
        .iter()
        .all(|award| matches!(award.outcome, Err(LedgerError::Persistence(_)))));
    assert!(awards.iter().all(|award| award.points() == 0));
}

#[tokio::test]
async fn milestone_keeps_caller_text() {
    let t = setup_ledger();
    let award = t
        .ledger
        .award_milestone(&EmployeeId::new("e1"), MilestoneTier::Premium, "Shipped v2")
        .await
        .unwrap();

    assert_eq!(award.points, 30);
    assert_eq!(award.description, "Milestone: Shipped v2 (Premium - 30 points)");
}

#[tokio::test]
async fn penalty_magnitude_is_clamped() {
    let t = setup_ledger();
    t.seed("e1", 1000, 150).await;
    let id = EmployeeId::new("e1");

    let small = t.ledger.apply_penalty(&id, 5, "late report").await.unwrap();
    assert_eq!(small.points, -20);

    let large = t.ledger.apply_penalty(&id, 500, "policy breach").await.unwrap();
    assert_eq!(large.points, -100);

    let signed = t.ledger.apply_penalty(&id, -30, "missed standup").await.unwrap();
    assert_eq!(signed.points, -30);

    let record = t.record("e1").await;
    assert_eq!(record.total_points, 850);
    assert_eq!(record.monthly_points, 0);
}

#[tokio::test]
async fn penalty_ignores_cap_and_floors_counters() {
    let t = setup_ledger();
    t.seed("e1", 40, 30).await;

    let award = t
        .ledger
        .apply_penalty(&EmployeeId::new("e1"), 60, "tardiness")
        .await
        .unwrap();

    assert_eq!(award.points, -60);
    assert_eq!(
        award.description,
        "Penalty: tardiness (-60 points) (Floored at zero balance)"
    );
    let record = t.record("e1").await;
    assert_eq!((record.total_points, record.monthly_points), (0, 0));
}

#[tokio::test]
async fn empty_penalty_reason_is_rejected() {
    let t = setup_ledger();
    let err = t
        .ledger
        .apply_penalty(&EmployeeId::new("e1"), 30, "")
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InvalidInput(_)));
    assert!(t.store.is_empty());
}

#[test]
fn unknown_labels_are_invalid_input() {
    assert!(matches!(
        "urgent".parse::<TaskPriority>(),
        Err(LedgerError::InvalidInput(_))
    ));
    assert!(matches!(
        "Sick".parse::<AttendanceStatus>(),
        Err(LedgerError::InvalidInput(_))
    ));
    assert_eq!("On Leave".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::OnLeave);
}

#[tokio::test]
async fn persistence_failure_propagates() {
    let t = setup_ledger();
    t.seed("e1", 10, 10).await;
    t.store.set_fail_on_commit(true);

    let err = t
        .ledger
        .award_daily_update(&EmployeeId::new("e1"), UpdateKind::Simple)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Persistence(_)));
    assert!(!err.is_retryable());

    t.store.set_fail_on_commit(false);
    assert_eq!(t.record("e1").await.total_points, 10);
    assert!(t.store.log(&EmployeeId::new("e1")).is_empty());
}
