#[cfg(test)]
mod tests {
    use etude_core::analytics::{AttemptRecord, SessionAnalytics};
    use etude_core::clock::{Clock, ManualClock};
    use etude_core::config::{EngineConfig, GeneratorConfig, QueueConfig};
    use etude_core::generator::Generator;
    use etude_core::queue::PatternQueue;
    use etude_core::scheduler::CooperativeScheduler;
    use etude_core::theory::{NotePool, PoolTier};
    use etude_core::types::{DifficultyLevel, PatternNote, PatternNotes};
    use etude_core::validator::Validator;
    use etude_core::{next_difficulty, AdaptiveThresholds, Pattern, PerformanceMetrics, PracticeEngine};
    use std::rc::Rc;
    use std::time::Instant;

    fn seeded(seed: u64, pool: PoolTier) -> GeneratorConfig {
        GeneratorConfig {
            seed: Some(seed),
            pool,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_structure_holds_for_every_pool_and_difficulty() {
        for (seed, pool) in [
            (1, PoolTier::WhiteKeys),
            (2, PoolTier::CommonBlackKeys),
            (3, PoolTier::FullChromatic),
        ] {
            let mut generator = Generator::new(&seeded(seed, pool));
            for level in DifficultyLevel::ALL {
                for _ in 0..200 {
                    let pattern = generator.generate(level, 0.0);
                    assert_eq!(pattern.notes().len(), level.note_count());
                    assert!(pattern.midi_notes().iter().all(|&m| m <= 127));
                    // The notation payload embeds exactly the pattern's notes
                    assert_eq!(pattern.notation().matches("<pitch>").count(), level.note_count());
                }
            }
        }
    }

    #[test]
    fn test_pool_of_one_still_terminates() {
        let mut generator = Generator::with_pool(
            &seeded(9, PoolTier::WhiteKeys),
            NotePool::from_notes(vec![67], false),
        );
        let first = generator.generate(DifficultyLevel::SingleNote, 0.0);
        let second = generator.generate(DifficultyLevel::SingleNote, 0.0);
        assert_eq!(first.midi_notes(), vec![67]);
        assert_eq!(second.midi_notes(), vec![67]);
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_queue_fifo_and_emergency_generation() {
        let clock = Rc::new(ManualClock::new(0.0));
        let scheduler = Rc::new(CooperativeScheduler::new(clock.clone()));
        let mut queue = PatternQueue::new(
            &QueueConfig {
                capacity: 3,
                refill_threshold: 0,
            },
            Generator::new(&seeded(4, PoolTier::WhiteKeys)),
            clock.clone(),
            scheduler.clone(),
        );
        queue.initialize(DifficultyLevel::Interval);

        let served: Vec<String> = (0..3).map(|_| queue.get_next().id().to_string()).collect();
        assert_eq!(served, vec!["pattern-1", "pattern-2", "pattern-3"]);

        let fourth = queue.get_next();
        assert_eq!(fourth.difficulty(), DifficultyLevel::Interval);
        assert_eq!(fourth.notes().len(), 2);
        assert_eq!(queue.stats().emergency_generations, 1);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_validator_poisoning() {
        let notes = PatternNotes::Interval([
            PatternNote::quarter(60, 0).unwrap(),
            PatternNote::quarter(64, 1).unwrap(),
        ]);
        let pattern = Pattern::new("poison", notes, 0.0);
        let mut validator = Validator::new();
        validator.reset_for_new_pattern(&pattern, 0.0);

        assert!(validator.validate(Some(60), 100.0).correct);
        assert!(!validator.validate(Some(61), 200.0).correct);
        let third = validator.validate(Some(64), 300.0);
        assert!(!third.correct);
        assert!(!third.pattern_complete);
    }

    #[test]
    fn test_validator_completion() {
        let notes = PatternNotes::SingleNote([PatternNote::quarter(60, 0).unwrap()]);
        let pattern = Pattern::new("single", notes, 0.0);
        let mut validator = Validator::new();
        validator.reset_for_new_pattern(&pattern, 0.0);
        let result = validator.validate(Some(60), 420.0);
        assert!(result.correct);
        assert!(result.pattern_complete);
    }

    #[test]
    fn test_analytics_plateau() {
        let mut analytics = SessionAnalytics::default();
        let times = [1480.0, 1510.0, 1495.0, 1505.0, 1490.0];
        for (i, time) in times.iter().enumerate() {
            analytics.record(&AttemptRecord {
                pattern_id: "single-note:60".to_string(),
                difficulty: DifficultyLevel::SingleNote,
                correct: i % 2 == 0,
                midi_notes: vec![60],
                attempt_time_ms: *time,
                timestamp_ms: i as f64 * 2000.0,
            });
        }
        let progress = analytics.pattern_progress("single-note:60").unwrap();
        assert!(progress.plateau);
    }

    #[test]
    fn test_difficulty_monotonicity() {
        let thresholds = AdaptiveThresholds::default();
        let accuracies = [0.0, 0.5, 0.85, 1.0];
        let times = [50.0, 120.0, 500.0];
        let streaks = [0, 9, 10, 40];
        for level in DifficultyLevel::ALL {
            for &accuracy in &accuracies {
                for &average_response_ms in &times {
                    for &streak in &streaks {
                        for total_notes in [0, 9, 10, 100] {
                            let metrics = PerformanceMetrics {
                                total_notes,
                                accuracy,
                                average_response_ms,
                                streak,
                            };
                            let next = next_difficulty(level, &metrics, true, &thresholds);
                            assert!(next >= level);
                            assert!(next.index() <= level.index() + 1);
                            if total_notes < 10 {
                                assert_eq!(next, level);
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_analytics_round_trip_through_engine() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut config = EngineConfig::default();
        config.generator.seed = Some(31);
        let mut engine = PracticeEngine::with_clock(config.clone(), clock.clone()).unwrap();
        engine.start_session(DifficultyLevel::Interval);

        for round in 0..25 {
            let pattern = engine.get_next_pattern();
            for (i, midi) in pattern.midi_notes().into_iter().enumerate() {
                clock.advance(150.0 + round as f64 * 7.0);
                // Every fifth pattern gets a wrong second note
                let played = if round % 5 == 0 && i == 1 { midi.saturating_sub(1) } else { midi };
                engine.validate_note(Some(played), clock.now_ms());
            }
            engine.run_idle(8.0);
        }

        let snapshot = engine.export_analytics();
        let mut fresh = PracticeEngine::with_clock(config, clock.clone()).unwrap();
        fresh.import_analytics(snapshot).unwrap();
        assert_eq!(fresh.session_summary(), engine.session_summary());
        assert_eq!(fresh.session_summary().total_attempts, 25);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_snapshot_json_round_trip() {
        use etude_core::analytics::AnalyticsSnapshot;

        let mut analytics = SessionAnalytics::default();
        for i in 0..15u32 {
            analytics.record(&AttemptRecord {
                pattern_id: format!("triad:{}", i % 4),
                difficulty: DifficultyLevel::Triad,
                correct: i % 3 != 0,
                midi_notes: vec![60 + (i % 4) as u8, 64, 67],
                attempt_time_ms: 913.37 + i as f64 * 0.1,
                timestamp_ms: i as f64 * 1500.0,
            });
        }
        let json = analytics.export().to_json().unwrap();
        let restored = AnalyticsSnapshot::from_json(&json).unwrap();
        let mut other = SessionAnalytics::default();
        other.import(restored).unwrap();
        assert_eq!(other.session_summary(), analytics.session_summary());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_snapshot_json_round_trip_random_times() {
        use etude_core::analytics::AnalyticsSnapshot;
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let levels = [
            DifficultyLevel::SingleNote,
            DifficultyLevel::Interval,
            DifficultyLevel::Triad,
        ];
        for seed in 0..100u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut analytics = SessionAnalytics::default();
            for i in 0..40u32 {
                let difficulty = levels[rng.gen_range(0..levels.len())];
                let base = rng.gen_range(48u8..72);
                let notes: Vec<u8> = (0..difficulty.note_count() as u8).map(|k| base + k * 4).collect();
                analytics.record(&AttemptRecord {
                    pattern_id: format!("{}:{}", difficulty, base),
                    difficulty,
                    correct: rng.gen_bool(0.7),
                    midi_notes: notes,
                    attempt_time_ms: rng.gen_range(100.0..4000.0),
                    timestamp_ms: i as f64 * 1000.0 + rng.gen::<f64>(),
                });
            }

            let exported = analytics.export();
            let restored = AnalyticsSnapshot::from_json(&exported.to_json().unwrap()).unwrap();
            assert_eq!(restored, exported, "seed {}", seed);

            let mut other = SessionAnalytics::default();
            other.import(restored).unwrap();
            assert_eq!(other.session_summary(), analytics.session_summary(), "seed {}", seed);
        }
    }

    #[test]
    fn test_generation_and_validation_are_fast() {
        // Generous bounds; these guard against accidental quadratic work
        let mut generator = Generator::new(&seeded(77, PoolTier::FullChromatic));
        let start = Instant::now();
        for _ in 0..300 {
            generator.generate(DifficultyLevel::Triad, 0.0);
        }
        let per_pattern_ms = start.elapsed().as_secs_f64() * 1000.0 / 300.0;
        assert!(per_pattern_ms < 5.0, "generation took {:.3} ms", per_pattern_ms);

        let pattern = generator.generate(DifficultyLevel::Triad, 0.0);
        let mut validator = Validator::new();
        let start = Instant::now();
        for i in 0..1000 {
            validator.reset_for_new_pattern(&pattern, 0.0);
            for midi in pattern.midi_notes() {
                validator.validate(Some(midi), i as f64);
            }
        }
        let per_note_ms = start.elapsed().as_secs_f64() * 1000.0 / 3000.0;
        assert!(per_note_ms < 1.0, "validation took {:.3} ms", per_note_ms);
    }
}
