//! Autonomous dialogue tests
//!
//! All tests run on a paused clock: sleeping in the test lets scheduled
//! continuations fire without waiting in real time.

mod common;

use agent_dialog::{
    AgentId, AgentRegistry, DialogConfig, DialogError, DialogEvent, Orchestrator, SessionState,
    Speaker,
};
use common::{
    agent_turns, all_turns, config_with_limit, notices, orchestrator, speakers, ScriptedGateway,
};
use std::time::Duration;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[tokio::test(start_paused = true)]
async fn test_uninterrupted_dialogue_alternates_until_limit() {
    for limit in [1u32, 2, 3, 5, 6] {
        let gateway = ScriptedGateway::new();
        let dialog = orchestrator(config_with_limit(limit), &gateway);

        dialog.start().await.unwrap();
        tokio::time::sleep(secs(60)).await;

        let turns = agent_turns(&dialog).await;
        let expected: Vec<_> = (0..limit)
            .map(|i| if i % 2 == 0 { "claude" } else { "deepseek" })
            .collect();
        assert_eq!(speakers(&turns), expected, "turn limit {limit}");
        let numbers: Vec<_> = turns.iter().map(|t| t.dialogue_turn).collect();
        assert_eq!(numbers, (1..=limit).map(Some).collect::<Vec<_>>());

        let notices = notices(&dialog).await;
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains(&format!("reached {limit} turns")));

        let snapshot = dialog.snapshot().await;
        assert_eq!(snapshot.state, SessionState::ActiveManual);
        assert_eq!(snapshot.turn_counter, limit);
        assert!(!snapshot.has_pending_continuation);
        assert_eq!(gateway.calls().len(), limit as usize);
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_continue_stop() {
    let gateway = ScriptedGateway::new();
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();
    let turns = all_turns(&dialog).await;
    assert_eq!(turns.len(), 1);
    assert!(turns[0].speaker.is_agent(&AgentId::new("claude")));
    assert_eq!(dialog.snapshot().await.turn_counter, 1);
    assert!(gateway.calls_for("claude")[0].history.is_empty());

    assert!(dialog.continue_dialog().await);
    let turns = all_turns(&dialog).await;
    assert_eq!(turns.len(), 2);
    assert!(turns[1].speaker.is_agent(&AgentId::new("deepseek")));

    dialog.stop().await;
    let snapshot = dialog.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Idle);
    assert_eq!(snapshot.turn_counter, 0);
    assert!(!snapshot.has_pending_continuation);

    tokio::time::sleep(secs(30)).await;
    assert_eq!(all_turns(&dialog).await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_start_needs_two_enabled_agents() {
    let gateway = ScriptedGateway::new();
    let mut config = DialogConfig::default();
    config.agents[1].enabled = false;
    let dialog = orchestrator(config, &gateway);

    let result = dialog.start().await;
    assert!(matches!(result, Err(DialogError::Validation(_))));

    let turns = all_turns(&dialog).await;
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].speaker, Speaker::System);
    assert_eq!(dialog.state().await, SessionState::Idle);
    assert!(gateway.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_intervention_composes_with_schedule() {
    let gateway = ScriptedGateway::new();
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();
    let before = dialog.snapshot().await;
    assert!(before.has_pending_continuation);

    let turn = dialog.intervene("hello").await.unwrap();
    assert!(turn.intervention);
    assert_eq!(turn.speaker, Speaker::Human);

    let after = dialog.snapshot().await;
    assert_eq!(after.turn_counter, before.turn_counter);
    assert!(after.has_pending_continuation);
    assert_eq!(all_turns(&dialog).await.len(), 2);

    tokio::time::sleep(secs(5)).await;

    let call = gateway.last_call();
    assert_eq!(call.agent, AgentId::new("deepseek"));
    let human = call.prompt.find("They said: \"hello\"").unwrap();
    let back = call.prompt.find("bring Claude back").unwrap();
    assert!(human < back);
    assert!(call.history_text().contains("[Human intervened]: hello"));
    assert!(call.history_text().contains("[Claude]: claude reply 1"));

    assert_eq!(dialog.snapshot().await.turn_counter, 2);
}

#[tokio::test(start_paused = true)]
async fn test_intervention_during_call_is_answered_next() {
    let gateway = ScriptedGateway::new();
    gateway.delay("deepseek", secs(10));
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();
    tokio::time::sleep(secs(5)).await;
    assert!(dialog.is_loading());

    dialog.intervene("please cover pricing").await.unwrap();
    tokio::time::sleep(secs(15)).await;

    let turns = all_turns(&dialog).await;
    let contents: Vec<_> = turns.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(
        contents,
        vec![
            "claude reply 1",
            "please cover pricing",
            "deepseek reply 2",
            "claude reply 3"
        ]
    );

    let in_flight = &gateway.calls_for("deepseek")[0];
    assert!(!in_flight.prompt.contains("please cover pricing"));

    let claude = &gateway.calls_for("claude")[1];
    let human = claude.prompt.find("They said: \"please cover pricing\"").unwrap();
    let back = claude.prompt.find("bring DeepSeek back").unwrap();
    assert!(human < back);

    tokio::time::sleep(secs(5)).await;
    let deepseek = &gateway.calls_for("deepseek")[1];
    assert!(deepseek.prompt.contains("Claude just said: \"claude reply 3\""));
}

#[tokio::test(start_paused = true)]
async fn test_reply_prompt_quotes_previous_agent() {
    let gateway = ScriptedGateway::new();
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();
    dialog.continue_dialog().await;

    let call = gateway.last_call();
    assert!(call.prompt.contains("Claude just said: \"claude reply 1\""));
    assert!(call.prompt.starts_with("You are DeepSeek, a Analyst."));
}

#[tokio::test(start_paused = true)]
async fn test_pause_twice_is_same_as_once() {
    let gateway = ScriptedGateway::new();
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();
    dialog.pause().await.unwrap();
    let once = dialog.snapshot().await;
    dialog.pause().await.unwrap();
    let twice = dialog.snapshot().await;

    assert_eq!(once, twice);
    assert_eq!(twice.state, SessionState::ActivePaused);
    assert!(!twice.has_pending_continuation);

    tokio::time::sleep(secs(30)).await;
    assert_eq!(agent_turns(&dialog).await.len(), 1);
    assert!(!dialog.continue_dialog().await);
}

#[tokio::test(start_paused = true)]
async fn test_resume_schedules_after_short_delay() {
    let gateway = ScriptedGateway::new();
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();
    dialog.pause().await.unwrap();
    dialog.resume().await.unwrap();
    assert_eq!(dialog.state().await, SessionState::ActiveAuto);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(
        speakers(&agent_turns(&dialog).await),
        vec!["claude", "deepseek"]
    );

    assert!(dialog.toggle_pause().await.unwrap());
    assert!(!dialog.toggle_pause().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_stop_discards_reply_in_flight() {
    let gateway = ScriptedGateway::new();
    gateway.delay("deepseek", secs(10));
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();
    let runner = dialog.clone();
    let step = tokio::spawn(async move { runner.continue_dialog().await });

    tokio::time::sleep(secs(1)).await;
    assert!(dialog.is_loading());

    dialog.stop().await;
    assert!(!step.await.unwrap());

    assert_eq!(agent_turns(&dialog).await.len(), 1);
    assert_eq!(dialog.state().await, SessionState::Idle);
    assert!(!dialog.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_pause_discards_reply_in_flight() {
    let gateway = ScriptedGateway::new();
    gateway.delay("deepseek", secs(10));
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();
    let runner = dialog.clone();
    let step = tokio::spawn(async move { runner.continue_dialog().await });

    tokio::time::sleep(secs(1)).await;
    dialog.pause().await.unwrap();
    assert!(!step.await.unwrap());

    assert_eq!(agent_turns(&dialog).await.len(), 1);
    assert_eq!(dialog.snapshot().await.turn_counter, 1);
    assert_eq!(dialog.state().await, SessionState::ActivePaused);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_call_times_out() {
    let gateway = ScriptedGateway::new();
    gateway.hang("deepseek");
    let config = DialogConfig {
        call_timeout_secs: 30,
        ..DialogConfig::default()
    };
    let dialog = orchestrator(config, &gateway);

    dialog.start().await.unwrap();
    assert!(dialog.continue_dialog().await);

    let notices = notices(&dialog).await;
    assert!(notices
        .iter()
        .any(|n| n.contains("deepseek did not answer within 30s")));
    assert_eq!(dialog.state().await, SessionState::ActiveAuto);
    assert!(!dialog.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_failure_becomes_notice_and_breaker_trips() {
    let gateway = ScriptedGateway::new();
    gateway.fail("deepseek");
    let config = DialogConfig {
        max_consecutive_failures: 2,
        ..DialogConfig::default()
    };
    let dialog = orchestrator(config, &gateway);

    dialog.start().await.unwrap();
    assert!(dialog.continue_dialog().await);
    assert_eq!(dialog.state().await, SessionState::ActiveAuto);
    assert_eq!(
        notices(&dialog).await,
        vec!["Error: Provider error 529: overloaded".to_string()]
    );

    assert!(dialog.continue_dialog().await);
    assert_eq!(dialog.state().await, SessionState::ActiveManual);
    let notices = notices(&dialog).await;
    assert!(notices.last().unwrap().contains("after 2 consecutive failures"));

    gateway.recover("deepseek");
    assert!(dialog.resume_after_intervention().await.unwrap());
    tokio::time::sleep(secs(3)).await;
    assert_eq!(
        speakers(&agent_turns(&dialog).await),
        vec!["claude", "deepseek"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_opening_keeps_session_active() {
    let gateway = ScriptedGateway::new();
    gateway.fail("claude");
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();

    assert!(agent_turns(&dialog).await.is_empty());
    assert_eq!(
        notices(&dialog).await,
        vec!["Error starting: Provider error 529: overloaded".to_string()]
    );
    assert_eq!(dialog.state().await, SessionState::ActiveAuto);
    assert!(!dialog.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_reenabling_auto_extends_turn_ceiling() {
    let gateway = ScriptedGateway::new();
    let dialog = orchestrator(config_with_limit(2), &gateway);

    dialog.start().await.unwrap();
    assert!(dialog.continue_dialog().await);
    assert_eq!(dialog.state().await, SessionState::ActiveManual);
    assert!(!dialog.continue_dialog().await);

    assert!(dialog.toggle_auto_mode().await.unwrap());
    assert_eq!(dialog.snapshot().await.turn_ceiling, 4);
    assert!(notices(&dialog)
        .await
        .contains(&"Auto mode resumed - AIs will continue conversing automatically".to_string()));

    tokio::time::sleep(secs(3)).await;
    let turns = agent_turns(&dialog).await;
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[2].dialogue_turn, Some(3));
    assert!(turns[2].speaker.is_agent(&AgentId::new("claude")));

    tokio::time::sleep(secs(30)).await;
    assert_eq!(agent_turns(&dialog).await.len(), 4);
    assert_eq!(dialog.state().await, SessionState::ActiveManual);
}

#[tokio::test(start_paused = true)]
async fn test_manual_mode_waits_for_human() {
    let gateway = ScriptedGateway::new();
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();
    assert!(!dialog.toggle_auto_mode().await.unwrap());
    assert!(!dialog.snapshot().await.has_pending_continuation);
    assert_eq!(
        notices(&dialog).await,
        vec!["Auto mode paused - AIs will wait for your intervention".to_string()]
    );

    dialog.intervene("focus on the budget").await.unwrap();
    tokio::time::sleep(secs(30)).await;
    assert_eq!(agent_turns(&dialog).await.len(), 1);

    assert!(dialog.resume_after_intervention().await.unwrap());
    assert!(!dialog.resume_after_intervention().await.unwrap());
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let call = gateway.last_call();
    assert_eq!(call.agent, AgentId::new("deepseek"));
    assert!(call.prompt.contains("They said: \"focus on the budget\""));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_participant_halts_dialogue() {
    let gateway = ScriptedGateway::new();
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();
    dialog
        .registry()
        .write()
        .await
        .set_enabled(&AgentId::new("deepseek"), false)
        .unwrap();

    assert!(dialog.continue_dialog().await);
    assert_eq!(dialog.state().await, SessionState::ActiveManual);
    assert!(notices(&dialog)
        .await
        .iter()
        .any(|n| n.contains("DeepSeek is no longer enabled")));
    assert_eq!(gateway.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_idle_session_rejects_transitions() {
    let gateway = ScriptedGateway::new();
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    assert!(matches!(
        dialog.pause().await,
        Err(DialogError::InvalidStateTransition { .. })
    ));
    assert!(dialog.resume().await.is_err());
    assert!(dialog.toggle_pause().await.is_err());
    assert!(dialog.toggle_auto_mode().await.is_err());
    assert!(dialog.resume_after_intervention().await.is_err());
    assert!(matches!(
        dialog.intervene("hello").await,
        Err(DialogError::InvalidStateTransition { .. })
    ));
    assert!(!dialog.continue_dialog().await);

    dialog.stop().await;
    assert_eq!(dialog.state().await, SessionState::Idle);
    assert!(all_turns(&dialog).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_intervention_is_rejected() {
    let gateway = ScriptedGateway::new();
    let dialog = orchestrator(DialogConfig::default(), &gateway);

    dialog.start().await.unwrap();
    assert!(matches!(
        dialog.intervene("   ").await,
        Err(DialogError::Validation(_))
    ));
    assert_eq!(all_turns(&dialog).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_observers_receive_events() {
    let gateway = ScriptedGateway::new();
    let dialog = orchestrator(DialogConfig::default(), &gateway);
    let mut events = dialog.subscribe();

    dialog.start().await.unwrap();

    let mut subjects = Vec::new();
    let mut loading = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DialogEvent::LoadingChanged(change) = &event {
            loading.push(change.loading);
        }
        subjects.push(event.subject());
    }

    assert_eq!(loading, vec![true, false]);
    assert!(subjects.contains(&"dialog.session.changed.v1"));
    assert!(subjects.contains(&"dialog.turn.appended.v1"));
}

#[tokio::test(start_paused = true)]
async fn test_custom_roster_opens_with_first_enabled_agent() {
    use agent_dialog::{Agent, ProviderKind};

    let gateway = ScriptedGateway::new();
    let registry = AgentRegistry::with_agents([
        Agent::new("critic", "Critic", "Reviewer", ProviderKind::Anthropic).disabled(),
        Agent::new("deepseek", "DeepSeek", "Analyst", ProviderKind::DeepSeek),
        Agent::new("claude", "Claude", "Strategist", ProviderKind::Anthropic),
    ])
    .unwrap();
    let dialog =
        Orchestrator::with_registry(DialogConfig::default(), registry, gateway.clone()).unwrap();

    dialog.start().await.unwrap();
    dialog.continue_dialog().await;

    assert_eq!(
        speakers(&agent_turns(&dialog).await),
        vec!["deepseek", "claude"]
    );
    let snapshot = dialog.snapshot().await;
    assert_eq!(
        snapshot.participants,
        Some((AgentId::new("deepseek"), AgentId::new("claude")))
    );
}
