//! Tests for outcome sinks

use chrono::NaiveDate;
use slot_sniper::core::{
    outcome_json, CourseSummary, InMemoryOutcomeSink, OutcomeSink, ReasonCode, RunOutcome,
    RunStatus, TracingOutcomeSink,
};

fn outcome(account: &str, task: &str, reason: ReasonCode) -> RunOutcome {
    let date = NaiveDate::from_ymd_opt(2024, 11, 8).unwrap();
    RunOutcome::new(account, task, date, reason, date.and_hms_opt(17, 0, 0).unwrap())
}

#[test]
fn test_in_memory_outcome_sink() {
    let sink = InMemoryOutcomeSink::new(10);
    sink.record(&outcome("alice", "swim", ReasonCode::Ok));

    let outcomes = sink.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].account, "alice");
    assert_eq!(outcomes[0].task_id, "swim");
    assert_eq!(outcomes[0].status, RunStatus::Success);
}

#[test]
fn test_outcome_sink_overflow() {
    let sink = InMemoryOutcomeSink::new(2);
    sink.record(&outcome("a", "t1", ReasonCode::Ok));
    sink.record(&outcome("a", "t2", ReasonCode::NoMatch));
    sink.record(&outcome("a", "t3", ReasonCode::CourseFull));

    let outcomes = sink.outcomes();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].task_id, "t2"); // First one popped
    assert_eq!(outcomes[1].task_id, "t3");
}

#[test]
fn test_outcome_json_fields() {
    let mut o = outcome("alice", "swim", ReasonCode::Ok);
    o.http_status = Some(200);
    o.platform_code = Some(200);
    o.platform_message = Some("预约成功".to_string());
    o.request_id = Some("req-42".to_string());
    o.course = Some(CourseSummary {
        id: "89007443".to_string(),
        title: "游泳馆（午）".to_string(),
        time_label: "12:30 - 14:00".to_string(),
    });

    let value = outcome_json(&o);
    assert_eq!(value["ts"], "2024-11-08T17:00:00.000");
    assert_eq!(value["account"], "alice");
    assert_eq!(value["task"]["id"], "swim");
    assert_eq!(value["task"]["title"], "游泳馆（午）");
    assert_eq!(value["status"], "SUCCESS");
    assert_eq!(value["reason"], "OK");
    assert_eq!(value["code"], 200);
    assert_eq!(value["msg"], "预约成功");
    assert_eq!(value["req_id"], "req-42");
}

#[test]
fn test_tracing_sink_without_subscriber() {
    let sink = TracingOutcomeSink::new(true);
    sink.record(&outcome("alice", "swim", ReasonCode::RateLimit));
}
