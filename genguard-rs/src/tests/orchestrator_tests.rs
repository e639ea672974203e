//! Tests for the invocation orchestrator
//!
//! Time is paused in every test, so backoff delays and deadlines elapse
//! instantly while keeping their exact durations.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::core::{GenerationRequest, GenerationService, ServiceCall};
    use crate::error::{FailureKind, GenGuardError};
    use crate::resilience::{
        AttemptOutcome, BackoffSchedule, Invocation, InvocationState, Orchestrator, RetryPolicy,
    };
    use crate::tests::support::{PanickingObserver, RecordingObserver, ScriptedService, Step};

    fn request(max_attempts: u32, timeout: Option<Duration>) -> GenerationRequest {
        GenerationRequest::new("test", ServiceCall::text("payload", "prompt"))
            .with_max_attempts(max_attempts)
            .with_timeout(timeout)
    }

    async fn run(
        orchestrator: &Orchestrator,
        service: &Arc<ScriptedService>,
        request: &GenerationRequest,
    ) -> Invocation<String> {
        let service = Arc::clone(service);
        let call = request.call().clone();

        orchestrator
            .invoke(request, move |_| {
                let service = Arc::clone(&service);
                let call = call.clone();
                async move { service.generate(&call).await?.into_content() }
            })
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_backoff() {
        let service = Arc::new(ScriptedService::new(vec![
            Step::fail(),
            Step::fail(),
            Step::content("summary text"),
        ]));
        let orchestrator = Orchestrator::default();

        let started = Instant::now();
        let invocation = run(&orchestrator, &service, &request(3, None)).await;
        let elapsed = started.elapsed();

        assert_eq!(invocation.result.as_deref().unwrap(), "summary text");
        assert_eq!(service.call_count(), 3);
        assert_eq!(invocation.attempt_count(), 3);

        let delays: Vec<_> = invocation.attempts.iter().map(|a| a.delay_before_next).collect();
        assert_eq!(
            delays,
            vec![Some(Duration::from_secs(1)), Some(Duration::from_secs(2)), None]
        );
        assert_eq!(invocation.total_delay(), Duration::from_secs(3));
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_millis(3100));
        assert!(invocation.attempts[2].outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_service_times_out_every_attempt() {
        let service = Arc::new(ScriptedService::new(vec![Step::Hang, Step::Hang, Step::Hang]));
        let orchestrator = Orchestrator::default();

        let started = Instant::now();
        let invocation = run(&orchestrator, &service, &request(3, Some(Duration::from_secs(45)))).await;

        assert_eq!(service.call_count(), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(45 * 3 + 1 + 2));
        assert!(elapsed < Duration::from_secs(45 * 3 + 1 + 2 + 1));

        match invocation.result {
            Err(GenGuardError::Exhausted { attempts, last_error }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last_error, GenGuardError::Timeout(_)));
            }
            other => panic!("expected exhausted, got {:?}", other),
        }

        for record in &invocation.attempts {
            assert!(matches!(
                record.outcome,
                AttemptOutcome::Failure { kind: FailureKind::Timeout, .. }
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_max_attempts() {
        let service = Arc::new(ScriptedService::new(vec![
            Step::fail(),
            Step::fail(),
            Step::fail(),
            Step::content("too late"),
        ]));

        let invocation = run(&Orchestrator::default(), &service, &request(3, None)).await;

        assert_eq!(service.call_count(), 3);
        assert!(matches!(invocation.result, Err(GenGuardError::Exhausted { attempts: 3, .. })));
        assert_eq!(invocation.attempts.last().unwrap().delay_before_next, None);
        assert_eq!(invocation.total_delay(), Duration::from_secs(1 + 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_attempt_budget_runs_only_what_it_needs() {
        let service = Arc::new(ScriptedService::new(vec![Step::content("done")]));

        let invocation = run(&Orchestrator::default(), &service, &request(u32::MAX, None)).await;

        assert_eq!(invocation.result.as_deref().unwrap(), "done");
        assert_eq!(invocation.attempt_count(), 1);
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_failure_has_no_delay() {
        let service = Arc::new(ScriptedService::new(vec![Step::fail()]));

        let started = Instant::now();
        let invocation = run(&Orchestrator::default(), &service, &request(1, None)).await;

        assert!(started.elapsed() < Duration::from_millis(1));
        assert_eq!(invocation.attempt_count(), 1);
        assert_eq!(invocation.total_delay(), Duration::ZERO);
        assert_eq!(
            invocation.transitions,
            vec![
                InvocationState::Pending,
                InvocationState::Attempting { attempt_index: 0 },
                InvocationState::Exhausted { attempts: 1 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_follow_schedule_and_never_decrease() {
        let service = Arc::new(ScriptedService::new(vec![Step::fail(); 5]));
        let schedule = BackoffSchedule::new(Duration::from_millis(500), 3);
        let orchestrator = Orchestrator::new(schedule, RetryPolicy::RetryAll);

        let invocation = run(&orchestrator, &service, &request(5, None)).await;

        let delays: Vec<Duration> = invocation
            .attempts
            .iter()
            .filter_map(|a| a.delay_before_next)
            .collect();

        assert_eq!(delays, schedule.delays(5));
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_only_policy_stops_on_permanent_failure() {
        let service = Arc::new(ScriptedService::new(vec![
            Step::Fail(GenGuardError::authentication("bad key")),
            Step::content("unreachable"),
        ]));
        let orchestrator = Orchestrator::new(BackoffSchedule::default(), RetryPolicy::TransientOnly);

        let invocation = run(&orchestrator, &service, &request(3, None)).await;

        assert_eq!(service.call_count(), 1);
        let error = invocation.result.unwrap_err();
        assert!(matches!(error.root_cause(), GenGuardError::Authentication(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_all_policy_retries_permanent_failure() {
        let service = Arc::new(ScriptedService::new(vec![
            Step::Fail(GenGuardError::invalid_input("rejected")),
            Step::content("accepted"),
        ]));

        let invocation = run(&Orchestrator::default(), &service, &request(3, None)).await;

        assert_eq!(invocation.result.unwrap(), "accepted");
        assert_eq!(service.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_sees_every_transition_in_order() {
        let observer = Arc::new(RecordingObserver::default());
        let orchestrator = Orchestrator::default().with_observer(observer.clone());
        let service = Arc::new(ScriptedService::new(vec![Step::fail(), Step::content("ok")]));

        let invocation = run(&orchestrator, &service, &request(3, None)).await;

        let expected = vec![
            InvocationState::Pending,
            InvocationState::Attempting { attempt_index: 0 },
            InvocationState::Delaying {
                attempt_index: 0,
                delay: Duration::from_secs(1),
            },
            InvocationState::Attempting { attempt_index: 1 },
            InvocationState::Succeeded { attempt_index: 1 },
        ];
        assert_eq!(observer.states(), expected);
        assert_eq!(invocation.transitions, expected);
        assert!(invocation.transitions.last().unwrap().is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_observer_does_not_change_outcome() {
        let orchestrator = Orchestrator::default().with_observer(Arc::new(PanickingObserver));
        let service = Arc::new(ScriptedService::new(vec![Step::fail(), Step::content("still fine")]));

        let invocation = run(&orchestrator, &service, &request(2, None)).await;

        assert_eq!(invocation.result.unwrap(), "still fine");
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_success_after_deadline_is_discarded() {
        let service = Arc::new(ScriptedService::new(vec![
            Step::After(Duration::from_secs(10), Box::new(Step::content("late"))),
            Step::content("on time"),
        ]));

        let invocation = run(&Orchestrator::default(), &service, &request(2, Some(Duration::from_secs(5)))).await;

        assert_eq!(invocation.result.unwrap(), "on time");
        assert!(matches!(
            invocation.attempts[0].outcome,
            AttemptOutcome::Failure { kind: FailureKind::Timeout, .. }
        ));
    }
}
