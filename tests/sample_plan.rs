use grisaille::{SamplePlan, SampleRate};

fn plan(duration_secs: f64) -> SamplePlan {
    SamplePlan::new(duration_secs, 10.0, SampleRate::new(10).unwrap()).unwrap()
}

#[test]
fn sample_count_is_ceil_of_capped_duration_times_rate() {
    for (duration, expected) in [
        (0.35, 4),
        (0.3, 3),
        (1.0, 10),
        (9.95, 100),
        (10.0, 100),
        (25.0, 100),
        (0.0, 0),
    ] {
        assert_eq!(
            plan(duration).total_samples(),
            expected,
            "duration {duration}"
        );
    }
}

#[test]
fn iterator_length_always_matches_the_ceil_formula() {
    // Sweep a range of durations, including values past the cap.
    for i in 0..240 {
        let duration = i as f64 * 0.05;
        let p = plan(duration);
        assert_eq!(
            p.timestamps().count(),
            p.total_samples() as usize,
            "duration {duration}"
        );
    }
}

#[test]
fn timestamps_are_monotonic_and_evenly_spaced_from_zero() {
    let ts: Vec<f64> = plan(2.0).timestamps().collect();
    assert_eq!(ts[0], 0.0);
    for (i, t) in ts.iter().enumerate() {
        assert_eq!(*t, i as f64 / 10.0);
    }
    for pair in ts.windows(2) {
        assert!(pair[1] > pair[0]);
        assert!((pair[1] - pair[0] - 0.1).abs() < 1e-12);
    }
}

#[test]
fn short_source_samples_while_t_is_below_duration() {
    assert_eq!(plan(0.35).timestamps().collect::<Vec<_>>(), vec![
        0.0, 0.1, 0.2, 0.3
    ]);
}

#[test]
fn long_source_is_capped_to_one_hundred_samples_below_ten_seconds() {
    let ts: Vec<f64> = plan(25.0).timestamps().collect();
    assert_eq!(ts.len(), 100);
    assert_eq!(ts[0], 0.0);
    assert!(*ts.last().unwrap() < 10.0);
}

#[test]
fn other_rates_follow_the_same_rule() {
    let p = SamplePlan::new(1.0, 10.0, SampleRate::new(4).unwrap()).unwrap();
    assert_eq!(p.total_samples(), 4);
    assert_eq!(p.timestamps().collect::<Vec<_>>(), vec![0.0, 0.25, 0.5, 0.75]);
}
