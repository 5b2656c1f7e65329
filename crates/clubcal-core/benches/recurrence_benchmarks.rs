use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use clubcal_core::models::{
    ExceptionType, OccurrenceException, OccurrenceOverrides, RecurrencePattern, Session, SessionStatus,
    SessionTemplate, WeekdaySet,
};
use clubcal_core::recurrence::Recurrence;
use clubcal_core::resolver;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

fn anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn create_test_template(pattern: RecurrencePattern, days: &[u8]) -> SessionTemplate {
    SessionTemplate {
        id: Uuid::now_v7(),
        club_id: Uuid::now_v7(),
        season_id: None,
        title: "Benchmark Training".to_string(),
        description: None,
        session_type: "training".to_string(),
        status: SessionStatus::Scheduled,
        anchor_date: anchor(),
        start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
        location: None,
        coach_id: None,
        max_participants: None,
        is_recurring: true,
        recurrence_pattern: Some(pattern),
        recurrence_days: WeekdaySet::from_ordinals(days.iter().copied()).unwrap(),
        recurrence_month_day: None,
        recurrence_end_date: Some(anchor() + Duration::days(730)),
        split_from_id: None,
        lock_version: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn bench_expansion(c: &mut Criterion) {
    let patterns = [
        ("daily", create_test_template(RecurrencePattern::Daily, &[])),
        ("weekly", create_test_template(RecurrencePattern::Weekly, &[1, 3, 5])),
        ("biweekly", create_test_template(RecurrencePattern::Biweekly, &[2])),
        ("monthly", create_test_template(RecurrencePattern::Monthly, &[])),
    ];

    let mut group = c.benchmark_group("expansion");
    for (name, template) in patterns.iter() {
        let recurrence = Recurrence::from_template(template).unwrap();
        for days in [7i64, 90, 365] {
            let end = anchor() + Duration::days(days);
            group.bench_with_input(BenchmarkId::new(*name, days), &end, |b, end| {
                b.iter(|| recurrence.expand(black_box(anchor()), black_box(*end)))
            });
        }
    }
    group.finish();
}

fn bench_resolution_with_exceptions(c: &mut Criterion) {
    let template = create_test_template(RecurrencePattern::Daily, &[]);
    let template_id = template.id;
    let session = Session {
        template,
        team_ids: vec![Uuid::now_v7()],
    };

    // An exception on every 5th day, alternating cancel and modify
    let exceptions: Vec<OccurrenceException> = (0..365)
        .step_by(5)
        .map(|i| OccurrenceException {
            template_id,
            occurrence_date: anchor() + Duration::days(i),
            exception_type: if i % 10 == 0 {
                ExceptionType::Cancelled
            } else {
                ExceptionType::Modified
            },
            overrides: OccurrenceOverrides {
                location: Some("Indoor hall".to_string()),
                ..Default::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .collect();

    let end = anchor() + Duration::days(365);
    c.bench_function("resolution_with_exceptions", |b| {
        b.iter(|| {
            resolver::resolve(
                black_box(&session),
                black_box(&exceptions),
                anchor(),
                end,
                false,
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_expansion, bench_resolution_with_exceptions);
criterion_main!(benches);
