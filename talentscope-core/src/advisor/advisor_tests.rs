use std::sync::Arc;

use super::profile::{self, MEMORY_BUDGET_FRACTION};
use super::ConcurrencyAdvisor;
use crate::error::AdvisorError;
use crate::task::{ConcurrencyRequest, TaskClass};
use crate::telemetry::{FixedTelemetry, MemoryStats};

/// Helper: advisor over a fake host, plus the handle to change its readings
fn make_advisor(cores: usize, cpu: f64, total_gb: f64, available_gb: f64) -> (ConcurrencyAdvisor, Arc<FixedTelemetry>) {
    let telemetry = Arc::new(FixedTelemetry::new(cores, cpu, total_gb, available_gb));
    (ConcurrencyAdvisor::new(telemetry.clone()), telemetry)
}

fn request(task_count: usize, class: TaskClass, memory_mb: f64) -> ConcurrencyRequest {
    ConcurrencyRequest::new(task_count, class).with_memory_per_task_mb(memory_mb)
}

#[test]
fn test_idle_host_io_batch() {
    let (advisor, _) = make_advisor(8, 20.0, 32.0, 16.0);
    let workers = advisor
        .get_optimal_workers(&request(100, TaskClass::IoBound, 50.0))
        .expect("valid request");
    assert_eq!(workers, 60);
}

#[test]
fn test_saturated_host_cpu_batch() {
    let (advisor, _) = make_advisor(4, 85.0, 8.0, 2.0);
    let workers = advisor
        .get_optimal_workers(&request(20, TaskClass::CpuBound, 200.0))
        .expect("valid request");
    assert_eq!(workers, 2);
}

#[test]
fn test_candidates_capped_by_pool() {
    let (advisor, _) = make_advisor(8, 40.0, 32.0, 16.0);
    let workers = advisor
        .get_candidate_processing_workers(5, 10, true)
        .expect("valid request");
    assert!(workers <= 5);
    assert_eq!(workers, 5);
}

#[test]
fn test_candidates_over_fetch_margin() {
    let (advisor, _) = make_advisor(8, 40.0, 64.0, 64.0);
    // max(2 * 2, 2 + 3) = 5 tasks, mixed class without homepages
    let workers = advisor
        .get_candidate_processing_workers(50, 2, false)
        .expect("valid request");
    assert_eq!(workers, 5);

    // max(20 * 2, 23) = 40 tasks, IO baseline 40, ceiling 80
    let workers = advisor
        .get_candidate_processing_workers(100, 20, true)
        .expect("valid request");
    assert_eq!(workers, 40);
}

#[test]
fn test_homepage_candidates_bounded_by_memory() {
    // 4GB * 1024 * 0.8 / 1000MB = 3 workers
    let (advisor, _) = make_advisor(8, 40.0, 8.0, 4.0);
    let workers = advisor
        .get_candidate_processing_workers(30, 10, true)
        .expect("valid request");
    assert_eq!(workers, 3);
}

#[test]
fn test_zero_tasks_rejected() {
    let (advisor, _) = make_advisor(8, 40.0, 32.0, 16.0);
    let err = advisor
        .get_optimal_workers(&request(0, TaskClass::Mixed, 500.0))
        .unwrap_err();
    assert_eq!(err, AdvisorError::InvalidTaskCount(0));

    assert!(advisor.get_extraction_workers(0).is_err());
    assert!(advisor.get_llm_processing_workers(0).is_err());
    assert!(advisor.get_candidate_processing_workers(0, 3, true).is_err());
}

#[test]
fn test_non_positive_memory_rejected() {
    let (advisor, _) = make_advisor(8, 40.0, 32.0, 16.0);
    let err = advisor
        .get_optimal_workers(&request(10, TaskClass::Mixed, -1.0))
        .unwrap_err();
    assert_eq!(err, AdvisorError::InvalidMemoryPerTask(-1.0));
}

#[test]
fn test_single_task_always_one_worker() {
    let (advisor, telemetry) = make_advisor(16, 10.0, 64.0, 32.0);
    for cpu in [5.0, 45.0, 70.0, 95.0] {
        telemetry.set_cpu_percent(Some(cpu));
        for available in [0.0, 0.1, 32.0] {
            telemetry.set_available_gb(available);
            for class in TaskClass::ALL {
                let workers = advisor
                    .get_optimal_workers(&request(1, class, 500.0))
                    .expect("valid request");
                assert_eq!(workers, 1, "class={class} cpu={cpu} available={available}");
            }
        }
    }
}

#[test]
fn test_bounds_hold_across_inputs() {
    let (advisor, telemetry) = make_advisor(6, 50.0, 32.0, 16.0);
    for cpu in [0.0, 29.0, 45.0, 70.0, 100.0] {
        telemetry.set_cpu_percent(Some(cpu));
        for class in TaskClass::ALL {
            for task_count in [1, 2, 3, 7, 50, 500] {
                for memory_mb in [50.0, 500.0, 4000.0] {
                    let workers = advisor
                        .get_optimal_workers(&request(task_count, class, memory_mb))
                        .expect("valid request");
                    assert!(workers >= 1);
                    assert!(workers <= task_count);
                    assert!(workers <= profile::class_ceiling(class, 6));
                    if task_count >= 2 {
                        assert!(workers >= 2);
                    }

                    let budget_mb = 16.0 * 1024.0 * MEMORY_BUDGET_FRACTION;
                    if profile::memory_ceiling(16.0, memory_mb) >= 2 {
                        assert!(workers as f64 * memory_mb <= budget_mb + 1e-6);
                    }
                }
            }
        }
    }
}

#[test]
fn test_cpu_bound_ceiling() {
    let (advisor, telemetry) = make_advisor(4, 0.0, 256.0, 256.0);
    for cpu in [0.0, 50.0, 90.0] {
        telemetry.set_cpu_percent(Some(cpu));
        for task_count in [5, 50, 5000] {
            let workers = advisor
                .get_optimal_workers(&request(task_count, TaskClass::CpuBound, 10.0))
                .expect("valid request");
            assert!(workers <= 4 + 2);
        }
    }
}

#[test]
fn test_load_response_is_monotonic() {
    let (advisor, telemetry) = make_advisor(8, 0.0, 64.0, 64.0);
    for class in TaskClass::ALL {
        for prefer_speed in [true, false] {
            let mut previous = usize::MAX;
            for cpu in [10.0, 45.0, 70.0, 90.0] {
                telemetry.set_cpu_percent(Some(cpu));
                let workers = advisor
                    .get_optimal_workers(&request(200, class, 100.0).with_prefer_speed(prefer_speed))
                    .expect("valid request");
                assert!(workers <= previous, "class={class} cpu={cpu}");
                previous = workers;
            }
        }
    }
}

#[test]
fn test_same_snapshot_same_answer() {
    let (advisor, _) = make_advisor(8, 65.0, 32.0, 12.0);
    let req = request(37, TaskClass::Mixed, 300.0);
    let first = advisor.get_optimal_workers(&req).expect("valid request");
    let second = advisor.get_optimal_workers(&req).expect("valid request");
    assert_eq!(first, second);
}

#[test]
fn test_readings_are_not_cached() {
    let (advisor, telemetry) = make_advisor(8, 20.0, 32.0, 16.0);
    let req = request(100, TaskClass::IoBound, 50.0);
    assert_eq!(advisor.get_optimal_workers(&req), Ok(60));

    telemetry.set_cpu_percent(Some(90.0));
    assert_eq!(advisor.get_optimal_workers(&req), Ok(32));
}

#[test]
fn test_zero_memory_keeps_floor() {
    let (advisor, _) = make_advisor(8, 40.0, 16.0, 0.0);
    assert_eq!(advisor.get_optimal_workers(&request(10, TaskClass::IoBound, 500.0)), Ok(2));
    assert_eq!(advisor.get_optimal_workers(&request(1, TaskClass::IoBound, 500.0)), Ok(1));
}

#[test]
fn test_cpu_failure_uses_neutral_load() {
    let (advisor, telemetry) = make_advisor(8, 20.0, 32.0, 16.0);
    telemetry.set_cpu_percent(None);
    // 50% lands in the neutral bucket: baseline 40 unchanged
    assert_eq!(advisor.get_optimal_workers(&request(100, TaskClass::IoBound, 50.0)), Ok(40));
}

#[test]
fn test_cpu_failure_reuses_last_good_reading() {
    let (advisor, telemetry) = make_advisor(8, 20.0, 32.0, 16.0);
    let req = request(100, TaskClass::IoBound, 50.0);
    assert_eq!(advisor.get_optimal_workers(&req), Ok(60));

    telemetry.set_cpu_percent(None);
    assert_eq!(advisor.get_optimal_workers(&req), Ok(60));

    telemetry.set_cpu_percent(Some(f64::NAN));
    assert_eq!(advisor.get_optimal_workers(&req), Ok(60));

    telemetry.set_cpu_percent(Some(250.0));
    assert_eq!(advisor.get_optimal_workers(&req), Ok(60));
}

#[test]
fn test_memory_failure_assumes_half_of_total() {
    let (advisor, telemetry) = make_advisor(8, 45.0, 4.0, 4.0);
    telemetry.set_memory(None);
    // 2GB * 1024 * 0.8 / 500MB = 3
    assert_eq!(advisor.get_optimal_workers(&request(100, TaskClass::IoBound, 500.0)), Ok(3));
}

#[test]
fn test_implausible_memory_treated_as_failure() {
    let (advisor, telemetry) = make_advisor(8, 45.0, 4.0, 4.0);
    telemetry.set_memory(Some(MemoryStats::from_gb(1.0, 64.0)));
    assert_eq!(advisor.get_optimal_workers(&request(100, TaskClass::IoBound, 500.0)), Ok(3));
}

#[test]
fn test_unknown_total_skips_memory_budget() {
    let telemetry = Arc::new(FixedTelemetry::new(8, 45.0, 0.0, 0.0));
    telemetry.set_memory(None);
    let advisor = ConcurrencyAdvisor::new(telemetry);
    assert_eq!(advisor.total_memory_gb(), 0.0);
    assert_eq!(advisor.get_optimal_workers(&request(100, TaskClass::IoBound, 500.0)), Ok(40));
}

#[test]
fn test_extraction_and_llm_defaults() {
    let (advisor, _) = make_advisor(8, 45.0, 32.0, 16.0);
    assert_eq!(advisor.get_extraction_workers(500), Ok(40));
    assert_eq!(advisor.get_llm_processing_workers(500), Ok(8));
    assert_eq!(advisor.get_llm_processing_workers(3), Ok(3));
}

#[test]
fn test_sizing_by_label() {
    // 64GB keeps the 500MB default from capping the pool (104 workers)
    let (advisor, _) = make_advisor(8, 45.0, 128.0, 64.0);
    assert_eq!(advisor.get_workers_for_label(100, "io"), Ok(40));
    assert_eq!(advisor.get_workers_for_label(100, "mixed"), Ok(16));
    assert_eq!(
        advisor.get_workers_for_label(100, "quantum"),
        Err(AdvisorError::UnknownTaskClass("quantum".to_string()))
    );
}

#[test]
fn test_registry_does_not_affect_sizing() {
    let (advisor, _) = make_advisor(8, 45.0, 32.0, 16.0);
    let req = request(100, TaskClass::Mixed, 100.0);
    let before = advisor.get_optimal_workers(&req).expect("valid request");

    advisor.register_active(TaskClass::Mixed, 1_000);
    let _guard = advisor.track_active(TaskClass::IoBound, 80);
    assert_eq!(advisor.get_optimal_workers(&req), Ok(before));
}

#[test]
fn test_system_status_report() {
    let (advisor, _) = make_advisor(8, 35.0, 32.0, 8.0);
    advisor.register_active(TaskClass::CpuBound, 4);
    let guard = advisor.track_active(TaskClass::IoBound, 40);

    let status = advisor.get_system_status();
    assert_eq!(status.logical_cpu_count, 8);
    assert_eq!(status.cpu_utilization_percent, 35.0);
    assert_eq!(status.memory_utilization_percent, 75.0);
    assert_eq!(status.available_memory_gb, 8.0);
    assert_eq!(status.total_memory_gb, 32.0);
    assert_eq!(status.active_workers_by_class.get(&TaskClass::IoBound), Some(&40));
    assert_eq!(status.active_workers_by_class.get(&TaskClass::CpuBound), Some(&4));

    drop(guard);
    advisor.unregister_active(TaskClass::CpuBound);
    assert!(advisor.get_system_status().active_workers_by_class.is_empty());
}

#[test]
fn test_default_memory_caps_label_sizing() {
    // 16GB * 1024 * 0.8 / 500MB = 26, below the IO baseline of 40
    let (advisor, _) = make_advisor(8, 45.0, 32.0, 16.0);
    assert_eq!(advisor.get_workers_for_label(100, "io_bound"), Ok(26));
}

#[test]
fn test_overlapping_pools_of_one_class() {
    let (advisor, _) = make_advisor(8, 45.0, 32.0, 16.0);
    let first = advisor.track_active(TaskClass::IoBound, 10);
    let second = advisor.track_active(TaskClass::IoBound, 20);
    assert_eq!(advisor.get_system_status().active_workers_by_class.get(&TaskClass::IoBound), Some(&30));

    drop(first);
    assert_eq!(advisor.get_system_status().active_workers_by_class.get(&TaskClass::IoBound), Some(&20));

    drop(second);
    assert!(advisor.get_system_status().active_workers_by_class.is_empty());
}

#[test]
fn test_status_memory_matches_sizing_fallback() {
    let (advisor, telemetry) = make_advisor(8, 35.0, 32.0, 8.0);
    telemetry.set_memory(None);

    let status = advisor.get_system_status();
    assert_eq!(status.available_memory_gb, 16.0);
    assert_eq!(status.memory_utilization_percent, 50.0);
    assert_eq!(status.total_memory_gb, 32.0);
}

#[test]
fn test_cpu_count_read_once() {
    let (advisor, _) = make_advisor(12, 45.0, 32.0, 16.0);
    assert_eq!(advisor.cpu_count(), 12);

    let advisor = ConcurrencyAdvisor::new(Arc::new(FixedTelemetry::new(0, 45.0, 32.0, 16.0)));
    assert_eq!(advisor.cpu_count(), 1);
}

#[test]
fn test_status_serializes_class_labels() {
    let (advisor, _) = make_advisor(2, 35.0, 4.0, 2.0);
    advisor.register_active(TaskClass::Lightweight, 3);
    let json = serde_json::to_value(advisor.get_system_status()).expect("status serializes");
    assert_eq!(json["active_workers_by_class"]["lightweight"], 3);
    assert_eq!(json["logical_cpu_count"], 2);
}

#[test]
fn test_concurrent_callers() {
    let (advisor, _) = make_advisor(8, 45.0, 32.0, 16.0);
    let advisor = Arc::new(advisor);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let advisor = advisor.clone();
            std::thread::spawn(move || {
                let _guard = advisor.track_active(TaskClass::ALL[i % 4], i + 1);
                advisor.get_extraction_workers(100)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().expect("thread panicked"), Ok(40));
    }
    assert!(advisor.get_system_status().active_workers_by_class.is_empty());
}
