use criterion::{black_box, criterion_group, criterion_main, Criterion};
use evergreen::model::{ChatLog, ChatMessage, CtaButton, CtaSet, Offset, Timestamp, WebinarSchedule};
use evergreen::timeline::evaluate;

fn bench_evaluate(c: &mut Criterion) {
    let start = Timestamp::parse("2024-05-01T18:00:00Z").unwrap();
    let end = Timestamp::parse("2024-05-01T21:00:00Z").unwrap();
    let schedule = WebinarSchedule::new(start, end).unwrap();

    let messages = (0..5_000)
        .map(|i| ChatMessage::new(format!("viewer{i}"), "hello!".to_string(), Offset::from_secs(i * 2)))
        .collect();
    let chat = ChatLog::new(messages).unwrap();

    let buttons = (0..50)
        .map(|i| {
            CtaButton::new("Buy now", "https://example.com/offer", "#3B82F6", Offset::from_secs(i * 200), Offset::from_secs(300))
                .unwrap()
        })
        .collect();
    let ctas = CtaSet::new(buttons).unwrap();

    let live = Timestamp::parse("2024-05-01T20:00:00Z").unwrap();
    c.bench_function("timeline.evaluate.live", |b| {
        b.iter(|| evaluate(black_box(&schedule), black_box(&chat), black_box(&ctas), black_box(live)));
    });

    let before = Timestamp::parse("2024-05-01T17:00:00Z").unwrap();
    c.bench_function("timeline.evaluate.countdown", |b| {
        b.iter(|| evaluate(black_box(&schedule), black_box(&chat), black_box(&ctas), black_box(before)));
    });
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
